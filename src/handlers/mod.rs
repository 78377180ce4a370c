//! Handler builders.
//!
//! Builders collect and validate user supplied settings before a handler
//! is constructed, so configuration mistakes surface as typed errors at
//! build time rather than as lost records later.

pub mod socket_builder;

pub use socket_builder::{DEFAULT_INI_SECTION, SocketHandlerBuilder};
