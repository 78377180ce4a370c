//! Rate limiting for "records were dropped" warnings.
//!
//! Best-effort handlers lose records silently under backpressure. They still
//! report the loss through `log::warn!`, but a stalled peer could otherwise
//! emit one warning per write attempt.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Default minimum interval between two warnings.
pub const DEFAULT_WARN_INTERVAL: Duration = Duration::from_secs(5);

/// Counts dropped records and emits at most one warning per interval.
///
/// The caller increments the counter via [`RateLimitedWarner::record_drop`].
/// [`RateLimitedWarner::warn_if_due`] then invokes the callback with the
/// number of drops since the last warning, provided the interval has
/// elapsed. The first warning is never delayed.
#[derive(Debug)]
pub struct RateLimitedWarner {
    interval: Duration,
    origin: Instant,
    /// Milliseconds after `origin` of the last warning, offset by one so that
    /// zero means "never warned".
    last_warn: AtomicU64,
    dropped: AtomicU64,
    total: AtomicU64,
}

impl RateLimitedWarner {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            origin: Instant::now(),
            last_warn: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            total: AtomicU64::new(0),
        }
    }

    /// Increment the dropped-record counter.
    pub fn record_drop(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    /// Drops recorded over the warner's lifetime.
    pub fn total_dropped(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Emit a warning if the interval has elapsed since the previous one.
    pub fn warn_if_due(&self, warn: impl FnOnce(u64)) {
        self.warn_if_due_at(Instant::now(), warn);
    }

    pub(crate) fn warn_if_due_at(&self, now: Instant, warn: impl FnOnce(u64)) {
        let now_ms = self.millis_since_origin(now).saturating_add(1);
        let last = self.last_warn.load(Ordering::Relaxed);
        let interval_ms = u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX);
        if last != 0 && now_ms.saturating_sub(last) < interval_ms {
            return;
        }
        let count = self.dropped.swap(0, Ordering::Relaxed);
        if count > 0 {
            warn(count);
            self.last_warn.store(now_ms, Ordering::Relaxed);
        }
    }

    /// Warn immediately about any drops not yet reported.
    pub fn flush(&self, warn: impl FnOnce(u64)) {
        let count = self.dropped.swap(0, Ordering::Relaxed);
        if count > 0 {
            warn(count);
            let now_ms = self.millis_since_origin(Instant::now()).saturating_add(1);
            self.last_warn.store(now_ms, Ordering::Relaxed);
        }
    }

    fn millis_since_origin(&self, now: Instant) -> u64 {
        u64::try_from(now.saturating_duration_since(self.origin).as_millis()).unwrap_or(u64::MAX)
    }
}

impl Default for RateLimitedWarner {
    fn default() -> Self {
        Self::new(DEFAULT_WARN_INTERVAL)
    }
}
