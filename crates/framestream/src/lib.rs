//! Streaming playback of block-compressed video: a lookahead reader thread
//! keeps compressed frames buffered around a moving playback time, a
//! selector picks the frame for each tick, and a decode stage turns it
//! into pixels for presentation.

pub mod buffer;
pub mod codec;
pub mod config;
pub mod decoder;
pub mod error;
pub mod format;
pub mod pipeline;
pub mod pixels;
pub mod player;
pub mod present;
pub mod queue;
pub mod reader;
pub mod selector;
pub mod signal;
pub mod source;
pub mod types;

pub use buffer::FrameBuffer;
pub use config::{DecodeMode, PlayerConfig, PresentPreference};
pub use error::{DecodeError, OpenError, ReadError};
pub use format::{CodecType, TextureFormat};
pub use pipeline::Pipeline;
pub use player::Player;
pub use present::{PresentMode, PresentationBackend};
pub use source::{MediaBackend, StreamInfo, StreamSource};
