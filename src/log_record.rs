//! Log record representation.
//!
//! A [`LogRecord`] is created by the [`Logger`](crate::Logger) for every
//! accepted log call and passed by mutable reference down the handler
//! chain. Handlers may rewrite [`LogRecord::formatted`] for the handlers that
//! run after them, or stop the record from propagating any further.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};
use serde_json::Value;

use crate::level::LogLevel;

/// Structured values attached to a log call.
pub type Context = BTreeMap<String, Value>;

#[derive(Clone, Debug)]
pub struct LogRecord {
    level: LogLevel,
    message: String,
    context: Context,
    datetime: DateTime<FixedOffset>,
    /// Rendered output consumed by writing handlers. Starts as the message.
    pub formatted: String,
    propagation_stopped: bool,
}

impl LogRecord {
    /// Construct a record stamped with the current UTC time.
    pub fn new(level: LogLevel, message: &str) -> Self {
        Self::with_datetime(level, message, Context::new(), Utc::now().fixed_offset())
    }

    /// Construct a record with explicit context and timestamp.
    pub fn with_datetime(
        level: LogLevel,
        message: &str,
        context: Context,
        datetime: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            level,
            message: message.to_owned(),
            context,
            datetime,
            formatted: message.to_owned(),
            propagation_stopped: false,
        }
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn datetime(&self) -> DateTime<FixedOffset> {
        self.datetime
    }

    /// Seconds since the Unix epoch at which the record was created.
    pub fn timestamp(&self) -> i64 {
        self.datetime.timestamp()
    }

    /// Prevent handlers later in the chain from receiving this record.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.level, self.message)
    }
}
