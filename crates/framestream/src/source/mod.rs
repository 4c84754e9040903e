pub mod memory;

use std::path::Path;

use crate::buffer::FrameBuffer;
use crate::codec::FrameCodec;
use crate::error::{OpenError, ReadError};
use crate::format::{CodecType, TextureFormat};
use crate::types::FrameTarget;

/// Immutable attributes of an opened stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    /// Video type byte; the low nibble selects the compressor.
    pub pixel_format: u8,
    /// Total duration in seconds.
    pub duration: f64,
    pub frame_count: u32,
    /// Largest compressed frame in the stream, in bytes.
    pub max_frame_size: usize,
}

impl StreamInfo {
    /// Reject attributes the pipeline cannot play.
    pub fn validate(&self) -> Result<(), OpenError> {
        if self.frame_count == 0 {
            return Err(OpenError::Corrupt("stream has no frames".into()));
        }
        if !(self.duration.is_finite() && self.duration > 0.0) {
            return Err(OpenError::Corrupt(format!(
                "invalid duration {}",
                self.duration
            )));
        }
        if self.width == 0 || self.height == 0 {
            return Err(OpenError::Corrupt(format!(
                "invalid frame size {}x{}",
                self.width, self.height
            )));
        }
        if self.texture_format().is_none() {
            return Err(OpenError::Unsupported(format!(
                "unknown video type 0x{:02x}",
                self.pixel_format
            )));
        }
        Ok(())
    }

    pub fn frame_duration(&self) -> f64 {
        self.duration / f64::from(self.frame_count)
    }

    pub fn frame_rate(&self) -> f64 {
        f64::from(self.frame_count) / self.duration
    }

    pub fn codec_type(&self) -> CodecType {
        CodecType::from_tag(self.pixel_format)
    }

    pub fn texture_format(&self) -> Option<TextureFormat> {
        TextureFormat::from_tag(self.pixel_format)
    }

    /// Decoded pixels are YCoCg and need conversion at presentation.
    pub fn needs_ycocg(&self) -> bool {
        TextureFormat::needs_ycocg(self.pixel_format)
    }

    /// Size of one decoded frame; zero for an unknown compressor.
    pub fn decoded_frame_size(&self) -> usize {
        self.texture_format()
            .map_or(0, |f| f.frame_size(self.width, self.height))
    }

    pub fn locate(&self, time: f64) -> FrameTarget {
        FrameTarget::locate(time, self.duration, self.frame_count)
    }
}

/// Demuxer side of a stream: metadata plus random access to compressed
/// frames. Dropping the source closes it.
pub trait StreamSource: Send {
    fn info(&self) -> &StreamInfo;

    /// Fill `dest` with the compressed bytes of frame `index`.
    fn read_frame(&mut self, index: u32, dest: &mut FrameBuffer) -> Result<(), ReadError>;
}

/// Opens sources and creates codecs for them.
pub trait MediaBackend: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn StreamSource>, OpenError>;

    fn create_codec(&self, info: &StreamInfo) -> Result<Box<dyn FrameCodec>, OpenError>;
}
