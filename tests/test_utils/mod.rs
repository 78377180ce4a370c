#![allow(dead_code)]

pub mod http_sink;
pub mod shared_buffer;

pub use http_sink::{CapturedRequest, HttpSink};
pub use shared_buffer::SharedBuf;
