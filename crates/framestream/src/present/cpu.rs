//! CPU-side presentation backends, used by the demo binary and tests.

use uuid::Uuid;

use super::registry::{self, CallbackToken};
use super::PresentationBackend;
use crate::pixels::PixelFrame;

/// A plain byte surface standing in for a texture.
#[derive(Debug, Default, Clone)]
pub struct CpuSurface {
    pub data: Vec<u8>,
    pub index: Option<u32>,
    pub sequence: u64,
    /// Number of uploads into this surface.
    pub uploads: u64,
}

impl CpuSurface {
    fn upload(&mut self, frame: &PixelFrame) {
        // Skip re-uploading a frame the surface already shows.
        if self.uploads > 0 && self.sequence == frame.sequence {
            return;
        }
        self.data.clear();
        self.data.extend_from_slice(&frame.data);
        self.index = frame.index;
        self.sequence = frame.sequence;
        self.uploads += 1;
    }
}

/// Copies pixels inline; has no deferred path.
#[derive(Debug, Default)]
pub struct ImmediateBackend;

impl PresentationBackend for ImmediateBackend {
    type Target = CpuSurface;

    fn supports_callback(&self) -> bool {
        false
    }

    fn copy_pixels(&mut self, frame: &PixelFrame, target: &mut CpuSurface) {
        target.upload(frame);
    }

    fn request_update(&mut self, token: &CallbackToken, target: &mut CpuSurface) {
        registry::service_update(token.id(), |frame| target.upload(frame));
    }
}

/// Queues update requests and services them in a later `service` call,
/// the way a render thread drains its command list.
#[derive(Debug, Default)]
pub struct DeferredBackend {
    pending: Vec<Uuid>,
}

impl DeferredBackend {
    pub fn pending(&self) -> Vec<Uuid> {
        self.pending.clone()
    }

    /// Service every queued request into `target`. Returns how many were
    /// still registered.
    pub fn service(&mut self, target: &mut CpuSurface) -> usize {
        self.pending
            .drain(..)
            .filter_map(|id| registry::service_update(id, |frame| target.upload(frame)))
            .count()
    }
}

impl PresentationBackend for DeferredBackend {
    type Target = CpuSurface;

    fn supports_callback(&self) -> bool {
        true
    }

    fn copy_pixels(&mut self, frame: &PixelFrame, target: &mut CpuSurface) {
        target.upload(frame);
    }

    fn request_update(&mut self, token: &CallbackToken, _target: &mut CpuSurface) {
        if !self.pending.contains(&token.id()) {
            self.pending.push(token.id());
        }
    }
}
