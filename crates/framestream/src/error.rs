use std::path::PathBuf;

/// Fatal failures detected once, while a pipeline is being opened.
/// A pipeline that fails with one of these never starts its threads.
#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    #[error("stream not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("unsupported stream: {0}")]
    Unsupported(String),
    #[error("corrupt stream: {0}")]
    Corrupt(String),
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Per-frame read failure reported by a `StreamSource`.
/// The reader logs these and skips the frame.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("frame {index} out of range (stream has {frame_count} frames)")]
    FrameOutOfRange { index: u32, frame_count: u32 },
    #[error("frame of {size} bytes exceeds buffer capacity of {capacity} bytes")]
    FrameTooLarge { size: usize, capacity: usize },
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-frame failure reported by a `FrameCodec`.
/// The decoder logs these and keeps the previously decoded pixels.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("compressed frame truncated: need {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("output buffer is {actual} bytes, codec needs {expected}")]
    OutputSize { expected: usize, actual: usize },
    #[error("codec error: {0}")]
    Codec(String),
}
