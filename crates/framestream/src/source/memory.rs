//! In-memory media backend.
//!
//! Clips live in a `MemoryLibrary` keyed by path, so the whole pipeline can
//! run without touching the filesystem. Frames use the pattern layout from
//! `codec`, which makes decoded pixels traceable back to their frame.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::{MediaBackend, StreamInfo, StreamSource};
use crate::buffer::FrameBuffer;
use crate::codec::{FrameCodec, PatternCodec, encode_pattern_frame, pattern_fill};
use crate::error::{OpenError, ReadError};

/// Default video type byte for pattern clips (HAP, DXT1).
pub const PATTERN_PIXEL_FORMAT: u8 = 0xbb;

/// A fully buffered compressed clip.
pub struct MemoryClip {
    info: StreamInfo,
    frames: Vec<Vec<u8>>,
    read_delay: Duration,
    /// Every frame index read from this clip, in read order.
    read_log: Mutex<Vec<u32>>,
}

impl MemoryClip {
    pub fn new(width: u32, height: u32, pixel_format: u8, duration: f64, frames: Vec<Vec<u8>>) -> Self {
        let max_frame_size = frames.iter().map(Vec::len).max().unwrap_or(0);
        let info = StreamInfo {
            width,
            height,
            pixel_format,
            duration,
            frame_count: frames.len() as u32,
            max_frame_size,
        };
        Self {
            info,
            frames,
            read_delay: Duration::ZERO,
            read_log: Mutex::new(Vec::new()),
        }
    }

    /// Pattern clip of `frame_count` frames at `fps`. Frame sizes vary so
    /// buffers are exercised below their capacity.
    pub fn pattern(width: u32, height: u32, frame_count: u32, fps: f64) -> Self {
        let frames = (0..frame_count)
            .map(|i| encode_pattern_frame(i, pattern_fill(i), (i % 7) as usize * 3))
            .collect();
        Self::new(
            width,
            height,
            PATTERN_PIXEL_FORMAT,
            f64::from(frame_count) / fps,
            frames,
        )
    }

    /// Simulate storage latency on every read.
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = delay;
        self
    }

    pub fn info(&self) -> &StreamInfo {
        &self.info
    }

    pub fn frame(&self, index: u32) -> Option<&[u8]> {
        self.frames.get(index as usize).map(Vec::as_slice)
    }

    /// Frame indices read so far.
    pub fn read_log(&self) -> Vec<u32> {
        self.read_log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn read_count(&self) -> usize {
        self.read_log.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Reader handle over a shared `MemoryClip`.
pub struct MemorySource {
    clip: Arc<MemoryClip>,
}

impl MemorySource {
    pub fn new(clip: Arc<MemoryClip>) -> Self {
        Self { clip }
    }
}

impl StreamSource for MemorySource {
    fn info(&self) -> &StreamInfo {
        &self.clip.info
    }

    fn read_frame(&mut self, index: u32, dest: &mut FrameBuffer) -> Result<(), ReadError> {
        let data = self.clip.frame(index).ok_or(ReadError::FrameOutOfRange {
            index,
            frame_count: self.clip.info.frame_count,
        })?;
        if !self.clip.read_delay.is_zero() {
            std::thread::sleep(self.clip.read_delay);
        }
        dest.fill(data)?;
        self.clip.read_log.lock().unwrap_or_else(PoisonError::into_inner).push(index);
        Ok(())
    }
}

/// Path-keyed set of in-memory clips.
#[derive(Default)]
pub struct MemoryLibrary {
    clips: Mutex<HashMap<PathBuf, Arc<MemoryClip>>>,
}

impl MemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, clip: MemoryClip) -> Arc<MemoryClip> {
        let clip = Arc::new(clip);
        self.clips
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.into(), Arc::clone(&clip));
        clip
    }

    pub fn get(&self, path: &Path) -> Option<Arc<MemoryClip>> {
        self.clips.lock().unwrap_or_else(PoisonError::into_inner).get(path).cloned()
    }
}

impl MediaBackend for MemoryLibrary {
    fn open(&self, path: &Path) -> Result<Box<dyn StreamSource>, OpenError> {
        let clip = self
            .get(path)
            .ok_or_else(|| OpenError::NotFound(path.to_path_buf()))?;
        clip.info.validate()?;
        Ok(Box::new(MemorySource::new(clip)))
    }

    fn create_codec(&self, info: &StreamInfo) -> Result<Box<dyn FrameCodec>, OpenError> {
        Ok(Box::new(PatternCodec::new(info.decoded_frame_size())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::pattern_index;

    #[test]
    fn pattern_clip_metadata() {
        let clip = MemoryClip::pattern(8, 8, 10, 30.0);
        let info = clip.info();
        assert_eq!(info.frame_count, 10);
        assert!((info.duration - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(info.max_frame_size, 5 + 6 * 3);
    }

    #[test]
    fn source_reads_requested_frame_and_logs_it() {
        let clip = Arc::new(MemoryClip::pattern(8, 8, 4, 30.0));
        let mut source = MemorySource::new(Arc::clone(&clip));
        let mut buf = FrameBuffer::with_capacity(clip.info().max_frame_size);
        source.read_frame(2, &mut buf).unwrap();
        assert_eq!(pattern_index(buf.bytes()), Some(2));
        assert_eq!(clip.read_log(), vec![2]);
    }

    #[test]
    fn source_rejects_out_of_range_index() {
        let clip = Arc::new(MemoryClip::pattern(8, 8, 4, 30.0));
        let mut source = MemorySource::new(clip);
        let mut buf = FrameBuffer::with_capacity(64);
        let err = source.read_frame(4, &mut buf).unwrap_err();
        assert!(matches!(err, ReadError::FrameOutOfRange { index: 4, frame_count: 4 }));
    }

    #[test]
    fn library_open_missing_path_is_not_found() {
        let lib = MemoryLibrary::new();
        let err = lib.open(Path::new("nope.mov")).err().unwrap();
        assert!(matches!(err, OpenError::NotFound(_)));
    }

    #[test]
    fn library_open_rejects_empty_clip() {
        let lib = MemoryLibrary::new();
        lib.insert("empty.mov", MemoryClip::new(8, 8, PATTERN_PIXEL_FORMAT, 1.0, Vec::new()));
        let err = lib.open(Path::new("empty.mov")).err().unwrap();
        assert!(matches!(err, OpenError::Corrupt(_)));
    }

    #[test]
    fn library_open_rejects_unknown_compressor() {
        let lib = MemoryLibrary::new();
        lib.insert("odd.mov", MemoryClip::new(8, 8, 0x03, 1.0, vec![vec![0; 8]]));
        let err = lib.open(Path::new("odd.mov")).err().unwrap();
        assert!(matches!(err, OpenError::Unsupported(_)));
    }

    #[test]
    fn library_codec_matches_decoded_size() {
        let lib = MemoryLibrary::new();
        let clip = lib.insert("a.mov", MemoryClip::pattern(8, 4, 3, 30.0));
        let mut codec = lib.create_codec(clip.info()).unwrap();
        let mut out = vec![0u8; clip.info().decoded_frame_size()];
        codec.decode(clip.frame(1).unwrap(), &mut out).unwrap();
        assert_eq!(pattern_index(&out), Some(1));
    }
}
