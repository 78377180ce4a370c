//! File-based logging handler.
//!
//! The file is opened in append mode when the first record arrives and then
//! written through a [`StreamHandler`].

use std::{
    fs::OpenOptions,
    path::{Path, PathBuf},
};

use crate::{
    handler::{Handler, HandlerError},
    log_record::LogRecord,
    stream_handler::StreamHandler,
};

/// Handler that appends formatted records to a file.
pub struct FileHandler {
    path: PathBuf,
    permissions: Option<u32>,
    locking: bool,
    stream: Option<StreamHandler>,
}

impl FileHandler {
    /// Append to `path`, creating it on first use.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            permissions: None,
            locking: false,
            stream: None,
        }
    }

    /// Apply a unix permission mode after opening. Ignored elsewhere.
    pub fn with_permissions(mut self, mode: u32) -> Self {
        self.permissions = Some(mode);
        self
    }

    /// Hold an exclusive advisory lock while each record is written.
    pub fn with_locking(mut self, locking: bool) -> Self {
        self.locking = locking;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn stream(&mut self) -> Result<&mut StreamHandler, HandlerError> {
        let stream = match self.stream.take() {
            Some(stream) => stream,
            None => self.open()?,
        };
        Ok(self.stream.insert(stream))
    }

    fn open(&self) -> Result<StreamHandler, HandlerError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| self.open_error(source))?;
        if let Some(mode) = self.permissions {
            apply_permissions(&self.path, mode).map_err(|source| self.open_error(source))?;
        }
        StreamHandler::from_file(file, self.locking).map_err(|source| self.open_error(source))
    }

    fn open_error(&self, source: std::io::Error) -> HandlerError {
        HandlerError::Open {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(unix)]
fn apply_permissions(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn apply_permissions(_path: &Path, _mode: u32) -> std::io::Result<()> {
    Ok(())
}

impl Handler for FileHandler {
    fn handle(&mut self, record: &mut LogRecord) -> Result<(), HandlerError> {
        self.stream()?.handle(record)
    }
}
