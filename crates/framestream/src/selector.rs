use std::sync::Arc;

use crate::buffer::FrameBuffer;
use crate::reader::ReaderShared;

/// Consumer side of the lookahead reader: picks the frame to show for a
/// playback time and hands spent buffers back to the pool.
///
/// The selector owns the current frame outright, so callers can decode
/// from it without holding any queue lock.
pub struct FrameSelector {
    shared: Arc<ReaderShared>,
    current: Option<FrameBuffer>,
}

impl FrameSelector {
    pub(crate) fn new(shared: Arc<ReaderShared>) -> Self {
        Self {
            shared,
            current: None,
        }
    }

    /// Move to the frame for `time`. Returns the new current frame if it
    /// changed, `None` if the previous frame still applies or nothing has
    /// been read yet. Always wakes the reader, since buffers may have been
    /// freed.
    pub fn advance(&mut self, time: f64) -> Option<&FrameBuffer> {
        let changed = self.shared.queues().select(&mut self.current, time);
        self.shared.wake.set();
        if changed { self.current.as_ref() } else { None }
    }

    /// The frame most recently adopted, if any.
    pub fn current(&self) -> Option<&FrameBuffer> {
        self.current.as_ref()
    }
}

impl Drop for FrameSelector {
    fn drop(&mut self) {
        self.shared.queues().return_current(&mut self.current);
        self.shared.wake.set();
    }
}
