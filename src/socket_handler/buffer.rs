//! In-memory accumulator backing the request body.

/// Size of each slice yielded by [`RecordBuffer::drain`].
pub const DRAIN_CHUNK_SIZE: usize = 4096;

/// Append-only byte buffer with an exact running length.
///
/// `len` is maintained alongside the bytes and is what the request's
/// `Content-Length` is taken from. The only way to shrink the buffer is
/// [`RecordBuffer::reset`].
#[derive(Debug, Default)]
pub struct RecordBuffer {
    bytes: Vec<u8>,
    len: usize,
    drained: bool,
}

impl RecordBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `data` and return the number of bytes accepted.
    pub fn append(&mut self, data: &[u8]) -> usize {
        self.bytes.extend_from_slice(data);
        self.len += data.len();
        data.len()
    }

    /// Number of bytes appended since the last reset.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Walk the accumulated bytes front to back in [`DRAIN_CHUNK_SIZE`] slices.
    ///
    /// The cursor is single-pass: once a drain has started, further calls
    /// yield nothing until [`RecordBuffer::reset`].
    pub fn drain(&mut self) -> Chunks<'_> {
        let start = if self.drained { self.len } else { 0 };
        self.drained = true;
        Chunks {
            bytes: &self.bytes[start..self.len],
        }
    }

    /// Discard all bytes and restart the length counter.
    pub fn reset(&mut self) {
        self.bytes.clear();
        self.len = 0;
        self.drained = false;
    }

    /// Release the backing allocation.
    pub(crate) fn release(&mut self) {
        self.reset();
        self.bytes.shrink_to_fit();
    }
}

/// Forward cursor over a [`RecordBuffer`].
#[derive(Debug)]
pub struct Chunks<'a> {
    bytes: &'a [u8],
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.bytes.is_empty() {
            return None;
        }
        let take = self.bytes.len().min(DRAIN_CHUNK_SIZE);
        let (chunk, rest) = self.bytes.split_at(take);
        self.bytes = rest;
        Some(chunk)
    }
}
