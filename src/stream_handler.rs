//! Stream-based logging handler implementation.
//!
//! [`StreamHandler`] writes each record's formatted output to an arbitrary
//! `io::Write` target on the calling thread. Writes may be split into
//! fixed-size chunks, and file-backed streams may hold an exclusive advisory
//! lock for the duration of each record.

use std::{
    fs::File,
    io::{self, Write},
    num::NonZeroUsize,
};

use crate::{
    handler::{Handler, HandlerError},
    log_record::LogRecord,
};

/// Handler that writes formatted records to a stream.
pub struct StreamHandler {
    writer: Box<dyn Write + Send>,
    chunk_size: Option<NonZeroUsize>,
    lock: Option<File>,
}

impl StreamHandler {
    /// Write to an arbitrary writer, without chunking or locking.
    pub fn new<W>(writer: W) -> Self
    where
        W: Write + Send + 'static,
    {
        Self {
            writer: Box::new(writer),
            chunk_size: None,
            lock: None,
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    /// Write to `file`, taking an exclusive `flock` around every record when
    /// `locking` is set.
    pub fn from_file(file: File, locking: bool) -> io::Result<Self> {
        let lock = if locking {
            Some(file.try_clone()?)
        } else {
            None
        };
        Ok(Self {
            writer: Box::new(file),
            chunk_size: None,
            lock,
        })
    }

    /// Hand at most `chunk_size` bytes to each `write` call. Zero disables
    /// chunking.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = NonZeroUsize::new(chunk_size);
        self
    }
}

impl Handler for StreamHandler {
    fn handle(&mut self, record: &mut LogRecord) -> Result<(), HandlerError> {
        let _guard = self.lock.as_ref().map(FileLock::acquire).transpose()?;
        write_chunked(&mut self.writer, self.chunk_size, record.formatted.as_bytes())?;
        Ok(())
    }
}

fn write_chunked<W>(writer: &mut W, chunk_size: Option<NonZeroUsize>, data: &[u8]) -> io::Result<()>
where
    W: Write + ?Sized,
{
    let mut remaining = data;
    while !remaining.is_empty() {
        let limit = chunk_size.map_or(remaining.len(), |size| size.get().min(remaining.len()));
        match writer.write(&remaining[..limit]) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "unable to write to stream",
                ));
            }
            Ok(n) => remaining = &remaining[n..],
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    writer.flush()
}

/// Exclusive advisory lock released on drop.
struct FileLock<'a> {
    #[cfg_attr(not(unix), allow(dead_code))]
    file: &'a File,
}

impl<'a> FileLock<'a> {
    #[cfg(unix)]
    fn acquire(file: &'a File) -> io::Result<Self> {
        use std::os::fd::AsRawFd;
        // SAFETY: the descriptor stays open for the lifetime of `file`.
        if unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self { file })
    }

    #[cfg(not(unix))]
    fn acquire(file: &'a File) -> io::Result<Self> {
        Ok(Self { file })
    }
}

impl Drop for FileLock<'_> {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            use std::os::fd::AsRawFd;
            // SAFETY: see `acquire`.
            unsafe {
                libc::flock(self.file.as_raw_fd(), libc::LOCK_UN);
            }
        }
    }
}
