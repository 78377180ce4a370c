//! Configuration structures consumed by the socket handler lifecycle.
//!
//! [`SocketHandlerBuilder`](crate::handlers::SocketHandlerBuilder) validates
//! these values before passing them to
//! [`SocketHandler`](super::SocketHandler) for runtime use.

use std::time::Duration;

use crate::rate_limited_warner::DEFAULT_WARN_INTERVAL;

use super::endpoint::Endpoint;

/// Default timeout applied when establishing the TCP connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
/// Default readiness poll timeout used before writing and while awaiting the
/// acknowledgment line.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(500);
/// Default poll applied between a zero-byte write and its single retry.
pub const DEFAULT_RETRY_POLL: Duration = Duration::ZERO;
/// Default upper bound on TLS handshake attempts.
pub const DEFAULT_HANDSHAKE_ATTEMPTS: u32 = 50;
/// Default readiness wait between TLS handshake attempts.
pub const DEFAULT_HANDSHAKE_POLL: Duration = Duration::from_millis(100);
/// Upper bound on bytes consumed while draining the acknowledgment line.
pub const ACK_LINE_LIMIT: usize = 1024;

/// TLS connection options.
#[derive(Clone, Debug, Default)]
pub struct TlsOptions {
    /// Domain presented during the handshake; the endpoint host when unset.
    pub domain: Option<String>,
    /// Skip certificate and hostname validation (intended for tests).
    pub insecure_skip_verify: bool,
}

/// Bounds for driving a non-blocking TLS handshake to completion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HandshakePolicy {
    pub max_attempts: u32,
    pub poll_interval: Duration,
}

impl Default for HandshakePolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_HANDSHAKE_ATTEMPTS,
            poll_interval: DEFAULT_HANDSHAKE_POLL,
        }
    }
}

/// Fully validated settings for one [`SocketHandler`](super::SocketHandler).
#[derive(Clone, Debug)]
pub struct SocketHandlerConfig {
    pub endpoint: Endpoint,
    pub connect_timeout: Duration,
    pub poll_timeout: Duration,
    pub retry_poll: Duration,
    pub handshake: HandshakePolicy,
    pub tls: TlsOptions,
    pub warn_interval: Duration,
}

impl SocketHandlerConfig {
    /// Configuration for `endpoint` with every tunable at its default.
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            retry_poll: DEFAULT_RETRY_POLL,
            handshake: HandshakePolicy::default(),
            tls: TlsOptions::default(),
            warn_interval: DEFAULT_WARN_INTERVAL,
        }
    }

    /// Domain name used for TLS verification.
    pub fn tls_domain(&self) -> &str {
        self.tls
            .domain
            .as_deref()
            .unwrap_or_else(|| self.endpoint.host())
    }
}
