use std::path::Path;
use std::sync::Arc;

use uuid::Uuid;

use crate::decoder::Decoder;
use crate::error::OpenError;
use crate::pixels::PixelBuffer;
use crate::present::registry::{self, CallbackToken};
use crate::queue::{FrameStamp, PoolStats};
use crate::reader::LookaheadReader;
use crate::source::{MediaBackend, StreamInfo};

/// One open stream: reader thread, selector and decode thread.
pub struct Pipeline {
    /// Registry entry keyed by the pipeline id; shared with presenters.
    token: Arc<CallbackToken>,
    // Decoder before reader so the decode thread stops first.
    decoder: Decoder,
    reader: LookaheadReader,
}

impl Pipeline {
    /// Open `path` and start reading at `time`, stepping by `delta`.
    /// Fails before any thread is started if the stream cannot be used.
    pub fn open(
        backend: &dyn MediaBackend,
        path: &Path,
        time: f64,
        delta: f64,
        pool_size: usize,
    ) -> Result<Self, OpenError> {
        let source = backend.open(path)?;
        let info = source.info().clone();
        info.validate()?;
        let codec = backend.create_codec(&info)?;

        let (reader, selector) = LookaheadReader::spawn(source, time, delta, pool_size)?;
        let decoder = Decoder::spawn(selector, codec, info.decoded_frame_size())?;
        let token = Arc::new(registry::register(decoder.id(), decoder.pixels()));

        log::info!(
            "Opened {}: {}x{} {} ({:?}{}), {} frames, {:.2}s",
            path.display(),
            info.width,
            info.height,
            info.codec_type().label(),
            info.texture_format(),
            if info.needs_ycocg() { ", YCoCg" } else { "" },
            info.frame_count,
            info.duration
        );
        Ok(Self {
            token,
            decoder,
            reader,
        })
    }

    pub fn info(&self) -> &StreamInfo {
        self.reader.info()
    }

    pub fn id(&self) -> Uuid {
        self.decoder.id()
    }

    /// Registry entry for deferred presentation; removed when the
    /// pipeline and every presenter holding it are gone.
    pub fn callback_token(&self) -> &Arc<CallbackToken> {
        &self.token
    }

    /// See `LookaheadReader::restart`.
    pub fn restart(&self, time: f64, delta: f64) {
        self.reader.restart(time, delta);
    }

    pub fn update_sync(&self, time: f64) -> bool {
        self.decoder.update_sync(time)
    }

    pub fn update_async(&self, time: f64) {
        self.decoder.update_async(time);
    }

    pub fn pixels(&self) -> &Arc<PixelBuffer> {
        self.decoder.pixels()
    }

    pub fn decoded_frames(&self) -> u64 {
        self.decoder.decoded_frames()
    }

    pub fn stats(&self) -> PoolStats {
        self.reader.stats()
    }

    pub fn lead_snapshot(&self) -> Vec<FrameStamp> {
        self.reader.lead_snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::pattern_index;
    use crate::source::memory::{MemoryClip, MemoryLibrary, PATTERN_PIXEL_FORMAT};

    const FRAME: f64 = 1.0 / 30.0;

    #[test]
    fn open_and_decode_first_frame() {
        let lib = MemoryLibrary::new();
        lib.insert("clip.mov", MemoryClip::pattern(16, 8, 10, 30.0));
        let pipeline = Pipeline::open(&lib, Path::new("clip.mov"), 0.0, FRAME, 4).unwrap();
        assert_eq!(pipeline.info().frame_count, 10);
        assert_eq!(pipeline.pixels().size(), 16 * 8 * 4 / 8);

        pipeline.restart(0.0, FRAME);
        assert!(pipeline.update_sync(0.0));
        assert_eq!(pattern_index(&pipeline.pixels().read().data), Some(0));
        assert_eq!(pipeline.decoded_frames(), 1);
        assert!(pipeline.stats().is_conserved());
    }

    #[test]
    fn registered_under_pipeline_id_while_open() {
        let lib = MemoryLibrary::new();
        lib.insert("clip.mov", MemoryClip::pattern(8, 8, 10, 30.0));
        let pipeline = Pipeline::open(&lib, Path::new("clip.mov"), 0.0, FRAME, 4).unwrap();
        let id = pipeline.id();
        assert_eq!(pipeline.callback_token().id(), id);
        assert!(registry::is_registered(id));

        pipeline.restart(0.0, FRAME);
        pipeline.update_sync(0.0);
        let seen = registry::service_update(id, |frame| frame.index);
        assert_eq!(seen, Some(Some(0)));

        drop(pipeline);
        assert!(!registry::is_registered(id));
    }

    #[test]
    fn open_missing_clip_fails() {
        let lib = MemoryLibrary::new();
        let err = Pipeline::open(&lib, Path::new("missing.mov"), 0.0, FRAME, 4).err().unwrap();
        assert!(matches!(err, OpenError::NotFound(_)));
    }

    #[test]
    fn open_clip_with_unknown_compressor_fails() {
        let lib = MemoryLibrary::new();
        lib.insert("raw.mov", MemoryClip::new(8, 8, 0x02, 1.0, vec![vec![0; 8]; 4]));
        let err = Pipeline::open(&lib, Path::new("raw.mov"), 0.0, FRAME, 4).err().unwrap();
        assert!(matches!(err, OpenError::Unsupported(_)));
        // Known layouts still open.
        lib.insert("ok.mov", MemoryClip::new(8, 8, PATTERN_PIXEL_FORMAT, 1.0, vec![vec![0; 8]; 4]));
        assert!(Pipeline::open(&lib, Path::new("ok.mov"), 0.0, FRAME, 4).is_ok());
    }
}
