//! Errors surfaced by the socket handler.

use std::io;

use thiserror::Error;

/// Failures that reach the caller of the socket handler.
///
/// Write degradation has no variant here: dropped bytes are only counted
/// and logged.
#[derive(Debug, Error)]
pub enum SocketHandlerError {
    /// The address or another builder value is malformed.
    #[error("invalid socket handler configuration: {0}")]
    Configuration(String),
    /// The socket could not be opened.
    #[error("unable to connect: {0}")]
    Connection(#[source] io::Error),
    /// The TLS handshake failed or did not finish within its attempt bound.
    #[error("TLS handshake failed: {0}")]
    Handshake(String),
}

impl SocketHandlerError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}
