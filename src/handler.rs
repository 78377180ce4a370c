use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::log_record::LogRecord;

/// Errors a handler may report back to the [`Logger`](crate::Logger).
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Writing to the underlying stream failed.
    #[error("handler I/O error: {0}")]
    Io(#[from] io::Error),
    /// The handler's target file could not be opened.
    #[error("unable to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Trait implemented by all log handlers.
///
/// Handlers receive the record mutably so they can rewrite its formatted
/// output or stop propagation for the handlers after them.
pub trait Handler: Send {
    /// Process a log record.
    fn handle(&mut self, record: &mut LogRecord) -> Result<(), HandlerError>;
}

impl<H: Handler + ?Sized> Handler for Box<H> {
    fn handle(&mut self, record: &mut LogRecord) -> Result<(), HandlerError> {
        (**self).handle(record)
    }
}
