//! Shared buffer used to capture handler output in tests.

use std::{
    io::{self, Write},
    sync::{Arc, Mutex},
};

/// Thread-safe byte buffer implementing `Write`.
///
/// The inner `Arc<Mutex<Vec<u8>>>` is kept private so tests can't
/// accidentally bypass the `Write` implementation or mutate the buffer
/// without locking.
#[derive(Clone, Default)]
pub struct SharedBuf {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuf {
    /// Return a snapshot of the buffer contents.
    #[allow(dead_code)]
    pub fn contents(&self) -> Vec<u8> {
        self.buffer
            .lock()
            .expect("SharedBuf mutex poisoned")
            .clone()
    }

    /// Return the buffer contents as UTF-8 text.
    #[allow(dead_code)]
    pub fn text(&self) -> String {
        String::from_utf8(self.contents()).expect("Buffer contains invalid UTF-8")
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer
            .lock()
            .expect("SharedBuf mutex poisoned")
            .write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
