//! Buffered remote log shipping.
//!
//! This module defines [`SocketHandler`], a handler that serialises
//! [`LogRecord`](crate::log_record::LogRecord) values into JSON lines, keeps
//! them in memory, and ships them to an HTTP endpoint in one `POST` when
//! flushed or closed. The request is framed by hand and written to a single
//! non-blocking socket, optionally upgraded to TLS, with bounded readiness
//! polls standing in for blocking I/O.

pub mod buffer;
mod config;
mod endpoint;
mod error;
mod handler;
mod serialise;
pub mod transport;
pub mod writer;


pub use buffer::{Chunks, DRAIN_CHUNK_SIZE, RecordBuffer};
pub use config::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_HANDSHAKE_ATTEMPTS, DEFAULT_HANDSHAKE_POLL,
    DEFAULT_POLL_TIMEOUT, HandshakePolicy, SocketHandlerConfig, TlsOptions,
};
pub use endpoint::{DEFAULT_PATH, Endpoint};
pub use error::SocketHandlerError;
pub use handler::{FlushState, SocketHandler};
pub use serialise::WireRecord;
pub use transport::{Connection, ConnectionState, Handshake, HandshakeStatus, drive_handshake};
pub use writer::{NonBlockingWrite, WriteOutcome, write_with_backpressure};
