//! Core logger implementation.
//!
//! [`Logger`] turns a level, message and context into a [`LogRecord`] and
//! runs it through a stack of handlers. The most recently pushed handler
//! runs first, so formatters are pushed after the handlers that write their
//! output.

mod convenience_methods;
mod interpolate;


use chrono::{FixedOffset, Offset, Utc};
use log::warn;
use parking_lot::Mutex;
use thiserror::Error;

use crate::{
    handler::Handler,
    level::LogLevel,
    log_record::{Context, LogRecord},
};

pub use interpolate::interpolate;

/// Errors returned by [`Logger`] entry points that accept untyped input.
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("invalid log level supplied: {0}")]
    InvalidLevel(String),
}

struct HandlerEntry {
    handler: Box<dyn Handler>,
    threshold: Option<LogLevel>,
}

impl HandlerEntry {
    fn accepts(&self, level: LogLevel) -> bool {
        self.threshold
            .is_none_or(|threshold| level.is_enabled_for(threshold))
    }
}

/// Logger dispatching records to a stack of handlers.
pub struct Logger {
    timezone: FixedOffset,
    handlers: Mutex<Vec<HandlerEntry>>,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger {
    /// Create a logger stamping records in UTC.
    pub fn new() -> Self {
        Self::with_timezone(Utc.fix())
    }

    /// Create a logger stamping records in `timezone`.
    pub fn with_timezone(timezone: FixedOffset) -> Self {
        Self {
            timezone,
            handlers: Mutex::new(Vec::new()),
        }
    }

    pub fn timezone(&self) -> FixedOffset {
        self.timezone
    }

    pub fn set_timezone(&mut self, timezone: FixedOffset) {
        self.timezone = timezone;
    }

    /// Every supported level, most severe first.
    pub fn levels(&self) -> &'static [LogLevel] {
        &LogLevel::ALL
    }

    /// Push a handler receiving every record.
    pub fn push_handler<H: Handler + 'static>(&self, handler: H) {
        self.push_entry(Box::new(handler), None);
    }

    /// Push a handler receiving records at least as severe as `threshold`.
    pub fn push_handler_with_level<H: Handler + 'static>(&self, handler: H, threshold: LogLevel) {
        self.push_entry(Box::new(handler), Some(threshold));
    }

    fn push_entry(&self, handler: Box<dyn Handler>, threshold: Option<LogLevel>) {
        self.handlers.lock().push(HandlerEntry { handler, threshold });
    }

    /// Remove and return the most recently pushed handler.
    pub fn pop_handler(&self) -> Option<Box<dyn Handler>> {
        self.handlers.lock().pop().map(|entry| entry.handler)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.lock().len()
    }

    /// Log `message` at `level`, replacing `{key}` placeholders from `context`.
    pub fn log(&self, level: LogLevel, message: &str, context: Context) {
        let message = interpolate(message, &context);
        let datetime = Utc::now().with_timezone(&self.timezone);
        let mut record = LogRecord::with_datetime(level, &message, context, datetime);
        self.dispatch(&mut record);
    }

    /// Like [`Logger::log`] but with the level given by name.
    pub fn log_str(&self, level: &str, message: &str, context: Context) -> Result<(), LoggerError> {
        let level = level
            .parse::<LogLevel>()
            .map_err(|err| LoggerError::InvalidLevel(err.0))?;
        self.log(level, message, context);
        Ok(())
    }

    /// Run `record` through the handler stack, newest handler first.
    pub fn dispatch(&self, record: &mut LogRecord) {
        let mut handlers = self.handlers.lock();
        for entry in handlers.iter_mut().rev() {
            if !entry.accepts(record.level()) {
                continue;
            }
            if let Err(err) = entry.handler.handle(record) {
                warn!("Logger handler failed: {err}");
            }
            if record.is_propagation_stopped() {
                break;
            }
        }
    }
}
