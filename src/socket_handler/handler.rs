//! Buffered socket handler shipping records in a single HTTP request.

use std::time::Duration;

use log::{debug, warn};
use serde::Serialize;

use crate::{
    handler::{Handler, HandlerError},
    log_record::LogRecord,
    rate_limited_warner::RateLimitedWarner,
};

use super::{
    buffer::RecordBuffer,
    config::SocketHandlerConfig,
    endpoint::Endpoint,
    error::SocketHandlerError,
    serialise::{WireRecord, serialise_line},
    transport::{Connection, ConnectionState},
    writer::{NonBlockingWrite, WriteOutcome, write_with_backpressure},
};

/// Flush lifecycle of a [`SocketHandler`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlushState {
    Idle,
    Flushing,
    /// Terminal: the handler has been closed.
    Disposed,
}

/// Handler that buffers serialised records and ships them over one socket.
///
/// The connection is opened eagerly by [`SocketHandler::connect`], so an
/// unreachable host is reported before any record is buffered. Records are
/// only written when [`SocketHandler::flush`] or [`SocketHandler::close`]
/// runs; dropping the handler closes it.
///
/// Delivery is best-effort: bytes the peer does not accept after a single
/// poll-and-retry are dropped, counted, and reported via a rate-limited
/// `log::warn!`, never returned to the caller.
pub struct SocketHandler {
    config: SocketHandlerConfig,
    buffer: RecordBuffer,
    connection: Connection,
    state: FlushState,
    warner: RateLimitedWarner,
}

impl SocketHandler {
    /// Open the connection described by `config`.
    pub fn connect(config: SocketHandlerConfig) -> Result<Self, SocketHandlerError> {
        let mut connection = Connection::new();
        connection.connect(&config.endpoint, config.connect_timeout)?;
        debug!(
            "SocketHandler connected to {}:{}",
            config.endpoint.host(),
            config.endpoint.port()
        );
        let warner = RateLimitedWarner::new(config.warn_interval);
        Ok(Self {
            config,
            buffer: RecordBuffer::new(),
            connection,
            state: FlushState::Idle,
            warner,
        })
    }

    /// Run `body` against a freshly connected handler and close it afterwards.
    ///
    /// The final flush runs exactly once whether `body` succeeds or fails.
    pub fn scoped<T, E, F>(config: SocketHandlerConfig, body: F) -> Result<T, E>
    where
        F: FnOnce(&mut SocketHandler) -> Result<T, E>,
        E: From<SocketHandlerError>,
    {
        let mut handler = Self::connect(config)?;
        let result = body(&mut handler);
        handler.close();
        result
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.config.endpoint
    }

    pub fn state(&self) -> FlushState {
        self.state
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Bytes waiting for the next flush.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Flushes that lost data to backpressure or write errors, plus a close
    /// that had to discard undelivered records.
    pub fn degraded_writes(&self) -> u64 {
        self.warner.total_dropped()
    }

    /// Buffer raw, already framed bytes. Returns the number accepted.
    pub fn append(&mut self, bytes: &[u8]) -> usize {
        if self.state == FlushState::Disposed {
            return 0;
        }
        self.buffer.append(bytes)
    }

    /// Serialise `value` as a JSON line and buffer it.
    ///
    /// A value that fails to serialise is dropped without touching the buffer.
    pub fn append_json<T: Serialize + ?Sized>(&mut self, value: &T) -> usize {
        match serialise_line(value) {
            Ok(line) => self.append(&line),
            Err(err) => {
                warn!("SocketHandler serialisation error: {err}");
                0
            }
        }
    }

    /// Ship everything buffered so far in one request.
    ///
    /// Does nothing when the buffer is empty or the socket does not become
    /// writable within the poll timeout. Only a definitive TLS handshake
    /// failure is returned; lost writes are not.
    pub fn flush(&mut self) -> Result<(), SocketHandlerError> {
        if self.state != FlushState::Idle || self.buffer.is_empty() {
            return Ok(());
        }
        if !self.connection.poll_ready(true, self.config.poll_timeout) {
            debug!(
                "SocketHandler flush skipped; connection is {:?}",
                self.connection.state()
            );
            return Ok(());
        }
        self.state = FlushState::Flushing;
        let result = self.ship();
        self.state = FlushState::Idle;
        result
    }

    fn ship(&mut self) -> Result<(), SocketHandlerError> {
        if self.config.endpoint.is_secure() {
            self.connection.ensure_secure(
                self.config.tls_domain(),
                &self.config.tls,
                self.config.handshake,
            )?;
        }

        let report = write_request(
            &mut self.connection,
            &self.config.endpoint,
            &mut self.buffer,
            self.config.retry_poll,
        );
        if report.degraded {
            // A truncated request cannot be answered meaningfully.
            self.connection.mark_failed();
            self.warner.record_drop();
            self.warner.warn_if_due(|count| {
                warn!(
                    "SocketHandler delivered {} of {} body bytes; {count} flushes degraded",
                    report.body_written, report.content_length
                );
            });
        }

        self.connection.drain_ack_line(self.config.poll_timeout);
        self.buffer.reset();
        // The request asked the peer to close once it has answered.
        self.connection.close();
        Ok(())
    }

    /// Flush once, then release the socket and buffer. Idempotent.
    ///
    /// Errors from the final flush are logged, never returned. Records the
    /// final flush could not ship count as a degraded write.
    pub fn close(&mut self) {
        if self.state == FlushState::Disposed {
            return;
        }
        if let Err(err) = self.flush() {
            warn!("SocketHandler final flush failed: {err}");
        }
        self.state = FlushState::Disposed;
        self.connection.close();
        let discarded = self.buffer.len();
        if discarded > 0 {
            self.warner.record_drop();
        }
        self.buffer.release();
        self.warner.flush(|count| {
            warn!(
                "SocketHandler closed after {count} unreported degraded writes; \
                 {discarded} buffered bytes discarded"
            );
        });
    }
}

impl Handler for SocketHandler {
    fn handle(&mut self, record: &mut LogRecord) -> Result<(), HandlerError> {
        self.append_json(&WireRecord::from(&*record));
        Ok(())
    }
}

impl Drop for SocketHandler {
    fn drop(&mut self) {
        self.close();
    }
}

/// Byte accounting for one request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct RequestReport {
    pub content_length: usize,
    pub header_written: usize,
    pub body_written: usize,
    pub degraded: bool,
}

/// Write the request head and the drained buffer to `sink`.
///
/// `Content-Length` is the buffer length when this is called. Writing stops
/// at the first span the sink refuses; the rest of the body is abandoned.
pub(crate) fn write_request<W>(
    sink: &mut W,
    endpoint: &Endpoint,
    buffer: &mut RecordBuffer,
    retry_poll: Duration,
) -> RequestReport
where
    W: NonBlockingWrite + ?Sized,
{
    let content_length = buffer.len();
    let mut report = RequestReport {
        content_length,
        ..RequestReport::default()
    };
    let head = endpoint.request_headers(content_length);
    if !write_span(sink, head.as_bytes(), retry_poll, &mut report.header_written) {
        report.degraded = true;
        return report;
    }
    for chunk in buffer.drain() {
        if !write_span(sink, chunk, retry_poll, &mut report.body_written) {
            report.degraded = true;
            break;
        }
    }
    report
}

/// Push `bytes` through the backpressure writer, following short writes.
fn write_span<W>(sink: &mut W, bytes: &[u8], retry_poll: Duration, written: &mut usize) -> bool
where
    W: NonBlockingWrite + ?Sized,
{
    let mut offset = 0;
    while offset < bytes.len() {
        match write_with_backpressure(sink, &bytes[offset..], retry_poll) {
            WriteOutcome::Failed => return false,
            outcome => {
                offset += outcome.written();
                *written += outcome.written();
            }
        }
    }
    true
}
