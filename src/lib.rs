//! Buffered, best-effort remote log shipping.
//!
//! A [`Logger`] turns messages into [`LogRecord`]s and runs them through a
//! stack of [`Handler`]s. [`SocketHandler`] collects records as JSON lines
//! and ships them to a remote HTTP endpoint in a single request when flushed
//! or closed. [`FormatHandler`], [`StreamHandler`] and [`FileHandler`] cover
//! local output.

pub mod file_handler;
pub mod formatter;
pub mod handler;
pub mod handlers;
pub mod level;
pub mod log_record;
pub mod logger;
pub mod rate_limited_warner;
pub mod socket_handler;
pub mod stream_handler;

#[cfg(test)]
mod test_utils;

pub use file_handler::FileHandler;
pub use formatter::{FormatHandler, format_line};
pub use handler::{Handler, HandlerError};
pub use handlers::{DEFAULT_INI_SECTION, SocketHandlerBuilder};
pub use level::{LogLevel, ParseLevelError};
pub use log_record::{Context, LogRecord};
pub use logger::{Logger, LoggerError, interpolate};
pub use rate_limited_warner::{DEFAULT_WARN_INTERVAL, RateLimitedWarner};
pub use socket_handler::{
    Endpoint, FlushState, RecordBuffer, SocketHandler, SocketHandlerConfig, SocketHandlerError,
    WireRecord,
};
pub use stream_handler::StreamHandler;
