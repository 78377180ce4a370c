//! Single-retry writes against a non-blocking socket.

use std::io;
use std::time::Duration;

/// Minimal surface of a non-blocking socket needed to push bytes.
pub trait NonBlockingWrite {
    /// Attempt one write. `Ok(0)` and `WouldBlock` both mean the send buffer
    /// is full.
    fn try_write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Report whether the socket becomes writable within `timeout`.
    fn poll_writable(&mut self, timeout: Duration) -> bool;
}

/// Result of a [`write_with_backpressure`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Every byte of the span was accepted.
    WrittenAll(usize),
    /// A prefix of this many bytes was accepted; the caller advances by it.
    WrittenPartial(usize),
    /// Nothing was accepted and the span is abandoned.
    Failed,
}

impl WriteOutcome {
    /// Bytes accepted by the socket.
    pub fn written(self) -> usize {
        match self {
            WriteOutcome::WrittenAll(n) | WriteOutcome::WrittenPartial(n) => n,
            WriteOutcome::Failed => 0,
        }
    }
}

/// Write `bytes` to `sink`, tolerating exactly one full send buffer.
///
/// A first attempt that accepts nothing is followed by a writability poll
/// bounded by `retry_poll` and, if the socket became writable, one final
/// attempt. A short write is reported as progress and never retried here.
pub fn write_with_backpressure<W>(sink: &mut W, bytes: &[u8], retry_poll: Duration) -> WriteOutcome
where
    W: NonBlockingWrite + ?Sized,
{
    if bytes.is_empty() {
        return WriteOutcome::WrittenAll(0);
    }

    match attempt(sink, bytes) {
        Some(0) => {}
        Some(n) => return classify(n, bytes.len()),
        None => return WriteOutcome::Failed,
    }

    if !sink.poll_writable(retry_poll) {
        return WriteOutcome::Failed;
    }

    match attempt(sink, bytes) {
        Some(0) | None => WriteOutcome::Failed,
        Some(n) => classify(n, bytes.len()),
    }
}

/// One write; `None` for a hard error, `Some(0)` for a full send buffer.
fn attempt<W>(sink: &mut W, bytes: &[u8]) -> Option<usize>
where
    W: NonBlockingWrite + ?Sized,
{
    loop {
        match sink.try_write(bytes) {
            Ok(n) => return Some(n),
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => return Some(0),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                log::debug!("socket write failed: {err}");
                return None;
            }
        }
    }
}

fn classify(written: usize, requested: usize) -> WriteOutcome {
    if written >= requested {
        WriteOutcome::WrittenAll(requested)
    } else {
        WriteOutcome::WrittenPartial(written)
    }
}
