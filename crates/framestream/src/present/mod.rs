//! Presentation bridge: how decoded pixels reach the host's surface.

pub mod cpu;
pub mod registry;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::pixels::{PixelBuffer, PixelFrame};
pub use registry::CallbackToken;

/// How pixels are handed to the presentation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresentMode {
    /// Copy the pixels into the target every tick.
    DirectCopy,
    /// Ask the backend to fetch the pixels later through the registry.
    CallbackHandOff,
}

/// Host side of presentation.
pub trait PresentationBackend {
    type Target;

    /// Whether the backend can service deferred updates.
    fn supports_callback(&self) -> bool;

    fn copy_pixels(&mut self, frame: &PixelFrame, target: &mut Self::Target);

    /// Queue a deferred update; the backend later calls
    /// `registry::service_update(token.id(), ..)`.
    fn request_update(&mut self, token: &CallbackToken, target: &mut Self::Target);
}

/// Per-pipeline presenter. Shares the pipeline's registry entry, which
/// stays valid for as long as either side holds it.
pub struct FramePresenter {
    pixels: Arc<PixelBuffer>,
    token: Arc<CallbackToken>,
    mode: PresentMode,
}

impl FramePresenter {
    pub fn new(pixels: Arc<PixelBuffer>, token: Arc<CallbackToken>, mode: PresentMode) -> Self {
        log::debug!("Presenter for {} using {mode:?}", token.id());
        Self {
            pixels,
            token,
            mode,
        }
    }

    pub fn mode(&self) -> PresentMode {
        self.mode
    }

    pub fn token(&self) -> &CallbackToken {
        &self.token
    }

    /// Deliver the current pixels to `target`.
    pub fn present<B: PresentationBackend + ?Sized>(&self, backend: &mut B, target: &mut B::Target) {
        match self.mode {
            PresentMode::CallbackHandOff => backend.request_update(&self.token, target),
            PresentMode::DirectCopy => {
                self.pixels.with_frame(|frame| backend.copy_pixels(frame, target));
            }
        }
    }
}
