//! Stream format analysis.
//!
//! The low nibble of a stream's video type byte identifies the block
//! compressor used for every frame. It decides which codec family is
//! needed and how large the decoded pixel buffer has to be.

use serde::{Deserialize, Serialize};

/// Codec family of a stream, derived from its pixel-format tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodecType {
    Hap,
    HapAlpha,
    HapQ,
    Unsupported,
}

impl CodecType {
    pub fn from_tag(tag: u8) -> Self {
        match tag & 0xf {
            0xb => CodecType::Hap,
            0xe => CodecType::HapAlpha,
            0xf => CodecType::HapQ,
            _ => CodecType::Unsupported,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CodecType::Hap => "HAP",
            CodecType::HapAlpha => "HAP Alpha",
            CodecType::HapQ => "HAP Q",
            CodecType::Unsupported => "Unsupported",
        }
    }
}

/// Block-compressed texture layout of the decoded pixel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextureFormat {
    Dxt1,
    Dxt5,
    Bc7,
    Bc4,
}

impl TextureFormat {
    /// Texture format for a pixel-format tag, or `None` for an unknown
    /// compressor.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag & 0xf {
            0xb => Some(TextureFormat::Dxt1),
            0xe | 0xf => Some(TextureFormat::Dxt5),
            0xc => Some(TextureFormat::Bc7),
            0x1 => Some(TextureFormat::Bc4),
            _ => None,
        }
    }

    /// Bits per pixel of the compressed block layout.
    pub fn bits_per_pixel(self) -> usize {
        match self {
            TextureFormat::Dxt1 | TextureFormat::Bc4 => 4,
            TextureFormat::Dxt5 | TextureFormat::Bc7 => 8,
        }
    }

    /// Size in bytes of one decoded frame.
    pub fn frame_size(self, width: u32, height: u32) -> usize {
        width as usize * height as usize * self.bits_per_pixel() / 8
    }

    /// Whether sampling needs the YCoCg reconstruction pass (HAP Q).
    pub fn needs_ycocg(tag: u8) -> bool {
        tag & 0xf == 0xf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_type_uses_low_nibble() {
        assert_eq!(CodecType::from_tag(0xab), CodecType::Hap);
        assert_eq!(CodecType::from_tag(0xbe), CodecType::HapAlpha);
        assert_eq!(CodecType::from_tag(0x0f), CodecType::HapQ);
        assert_eq!(CodecType::from_tag(0xac), CodecType::Unsupported);
        assert_eq!(CodecType::from_tag(0x00), CodecType::Unsupported);
    }

    #[test]
    fn texture_format_table() {
        assert_eq!(TextureFormat::from_tag(0xb), Some(TextureFormat::Dxt1));
        assert_eq!(TextureFormat::from_tag(0xe), Some(TextureFormat::Dxt5));
        assert_eq!(TextureFormat::from_tag(0xf), Some(TextureFormat::Dxt5));
        assert_eq!(TextureFormat::from_tag(0xc), Some(TextureFormat::Bc7));
        assert_eq!(TextureFormat::from_tag(0x1), Some(TextureFormat::Bc4));
        assert_eq!(TextureFormat::from_tag(0x3), None);
    }

    #[test]
    fn frame_size_follows_bpp() {
        assert_eq!(TextureFormat::Dxt1.frame_size(1920, 1080), 1920 * 1080 / 2);
        assert_eq!(TextureFormat::Dxt5.frame_size(1920, 1080), 1920 * 1080);
        assert_eq!(TextureFormat::Bc4.frame_size(4, 4), 8);
        assert_eq!(TextureFormat::Bc7.frame_size(4, 4), 16);
    }

    #[test]
    fn only_hap_q_needs_ycocg() {
        assert!(TextureFormat::needs_ycocg(0xf));
        assert!(!TextureFormat::needs_ycocg(0xe));
        assert!(!TextureFormat::needs_ycocg(0xb));
    }
}
