//! Record formatting.
//!
//! [`FormatHandler`] sits in the handler chain ahead of the writing
//! handlers and renders each record into [`LogRecord::formatted`].

use chrono::SecondsFormat;

use crate::{
    handler::{Handler, HandlerError},
    log_record::LogRecord,
};

/// Render `[datetime] [LEVEL] message` followed by a newline.
pub fn format_line(record: &LogRecord) -> String {
    format!(
        "[{}] [{}] {}\n",
        record.datetime().to_rfc3339_opts(SecondsFormat::Secs, false),
        record.level().as_str().to_ascii_uppercase(),
        record.message()
    )
}

/// Handler that rewrites a record's formatted output for later handlers.
#[derive(Copy, Clone, Debug, Default)]
pub struct FormatHandler;

impl Handler for FormatHandler {
    fn handle(&mut self, record: &mut LogRecord) -> Result<(), HandlerError> {
        record.formatted = format_line(record);
        Ok(())
    }
}
