use crate::error::ReadError;

/// One pooled block of compressed frame data.
///
/// The storage is allocated once with the stream's maximum frame size and
/// reused for every frame that passes through the pool slot. Buffers are
/// moved between queues, never copied or shared.
pub struct FrameBuffer {
    storage: Box<[u8]>,
    len: usize,
    /// Wrapped source frame number, `None` until filled.
    index: Option<u32>,
    /// Unwrapped playback time this buffer is published for.
    time: f64,
}

impl FrameBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            storage: vec![0u8; capacity].into_boxed_slice(),
            len: 0,
            index: None,
            time: f64::MAX,
        }
    }

    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Compressed bytes of the frame currently held.
    pub fn bytes(&self) -> &[u8] {
        &self.storage[..self.len]
    }

    pub fn index(&self) -> Option<u32> {
        self.index
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Copy a compressed frame into the buffer.
    pub fn fill(&mut self, data: &[u8]) -> Result<(), ReadError> {
        let dest = self.writable(data.len())?;
        dest.copy_from_slice(data);
        Ok(())
    }

    /// Expose `len` bytes of storage for a source to write into directly.
    /// The held frame is invalidated until the caller stamps a new index.
    pub fn writable(&mut self, len: usize) -> Result<&mut [u8], ReadError> {
        if len > self.storage.len() {
            return Err(ReadError::FrameTooLarge {
                size: len,
                capacity: self.storage.len(),
            });
        }
        self.index = None;
        self.len = len;
        Ok(&mut self.storage[..len])
    }

    pub(crate) fn stamp(&mut self, index: u32, time: f64) {
        self.index = Some(index);
        self.time = time;
    }

    pub(crate) fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    /// Forget the held frame so it is never matched for reuse.
    pub(crate) fn invalidate(&mut self) {
        self.index = None;
        self.len = 0;
        self.time = f64::MAX;
    }
}

impl std::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("index", &self.index)
            .field("time", &self.time)
            .field("len", &self.len)
            .field("capacity", &self.storage.len())
            .finish()
    }
}
