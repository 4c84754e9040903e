use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Most recently decoded frame.
#[derive(Debug)]
pub struct PixelFrame {
    pub data: Vec<u8>,
    /// Source frame the pixels came from; `None` until the first decode.
    pub index: Option<u32>,
    pub time: f64,
    /// Bumped on every successful decode.
    pub sequence: u64,
}

/// Fixed-size decoded pixel storage shared between the decoder and
/// presentation. Readers never observe a half-written frame.
#[derive(Debug)]
pub struct PixelBuffer {
    frame: RwLock<PixelFrame>,
    size: usize,
}

impl PixelBuffer {
    pub fn new(size: usize) -> Self {
        Self {
            frame: RwLock::new(PixelFrame {
                data: vec![0; size],
                index: None,
                time: 0.0,
                sequence: 0,
            }),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn read(&self) -> RwLockReadGuard<'_, PixelFrame> {
        self.frame.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, PixelFrame> {
        self.frame.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against the current pixels under the read lock.
    pub fn with_frame<R>(&self, f: impl FnOnce(&PixelFrame) -> R) -> R {
        f(&self.read())
    }

    pub fn sequence(&self) -> u64 {
        self.read().sequence
    }
}
