//! Per-tick playback driver: owns one pipeline, keeps transport state and
//! feeds presentation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{DecodeMode, PlayerConfig};
use crate::error::OpenError;
use crate::format::{CodecType, TextureFormat};
use crate::pipeline::Pipeline;
use crate::present::{FramePresenter, PresentationBackend};
use crate::source::{MediaBackend, StreamInfo};
use crate::types::TransportState;

/// Keeps a non-looping player off the frame that would wrap to the start.
const END_MARGIN: f64 = 1e-4;

struct OpenStream {
    // Presenter first: its registry entry goes before the pipeline.
    presenter: Option<FramePresenter>,
    pipeline: Pipeline,
    /// Time and speed the reader was last restarted with (or advanced to).
    applied_time: f64,
    applied_speed: f64,
    primed: bool,
}

pub struct Player {
    backend: Arc<dyn MediaBackend>,
    config: PlayerConfig,
    transport: TransportState,
    path: Option<PathBuf>,
    stream: Option<OpenStream>,
}

impl Player {
    pub fn new(backend: Arc<dyn MediaBackend>, config: PlayerConfig) -> Self {
        let config = config.validated();
        let transport = TransportState {
            looping: config.looping,
            speed: config.speed,
            time: 0.0,
        };
        Self {
            backend,
            config,
            transport,
            path: None,
            stream: None,
        }
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Open `path`, replacing any open stream. On failure the player is
    /// left invalid and `update` does nothing.
    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<(), OpenError> {
        let path = path.as_ref();
        self.close();
        self.path = Some(path.to_path_buf());

        let delta = self.transport.speed / self.config.nominal_tick_rate;
        match Pipeline::open(
            self.backend.as_ref(),
            path,
            self.transport.time,
            delta,
            self.config.pool_size,
        ) {
            Ok(pipeline) => {
                self.stream = Some(OpenStream {
                    presenter: None,
                    pipeline,
                    applied_time: self.transport.time,
                    applied_speed: self.transport.speed,
                    primed: false,
                });
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to open {}: {e}", path.display());
                Err(e)
            }
        }
    }

    /// Close and reopen the current path, keeping transport state.
    pub fn reopen(&mut self) -> Result<(), OpenError> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };
        log::info!("Reopening {}", path.display());
        self.open(path)
    }

    pub fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            log::debug!("Closing pipeline {}", stream.pipeline.id());
        }
    }

    /// Advance one tick of `dt` seconds: restart the reader if time or
    /// speed were changed from outside, decode, present, move time on.
    pub fn update<B: PresentationBackend + ?Sized>(
        &mut self,
        dt: f64,
        presentation: &mut B,
        target: &mut B::Target,
    ) {
        let Some(stream) = self.stream.as_mut() else {
            return;
        };

        let duration = stream.pipeline.info().duration;
        let time = if self.transport.looping {
            self.transport.time
        } else {
            self.transport.time.clamp(0.0, duration - END_MARGIN)
        };

        let changed = self.transport.time != stream.applied_time
            || self.transport.speed != stream.applied_speed;

        if changed || !stream.primed {
            let delta = self.transport.speed / self.config.nominal_tick_rate;
            stream.pipeline.restart(time, delta);
            stream.pipeline.update_sync(time);
            stream.applied_speed = self.transport.speed;
            stream.primed = true;
        } else {
            match self.config.decode_mode {
                DecodeMode::Async => stream.pipeline.update_async(time),
                DecodeMode::Sync => {
                    stream.pipeline.update_sync(time);
                }
            }
        }

        let presenter = stream.presenter.get_or_insert_with(|| {
            let mode = self
                .config
                .present_mode
                .resolve(presentation.supports_callback());
            FramePresenter::new(
                Arc::clone(stream.pipeline.pixels()),
                Arc::clone(stream.pipeline.callback_token()),
                mode,
            )
        });
        presenter.present(presentation, target);

        self.transport.time += dt * self.transport.speed;
        stream.applied_time = self.transport.time;
    }

    pub fn set_time(&mut self, time: f64) {
        self.transport.time = time;
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.transport.speed = speed;
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.transport.looping = looping;
    }

    pub fn time(&self) -> f64 {
        self.transport.time
    }

    pub fn speed(&self) -> f64 {
        self.transport.speed
    }

    pub fn is_looping(&self) -> bool {
        self.transport.looping
    }

    pub fn transport(&self) -> &TransportState {
        &self.transport
    }

    pub fn is_valid(&self) -> bool {
        self.stream.is_some()
    }

    pub fn pipeline(&self) -> Option<&Pipeline> {
        self.stream.as_ref().map(|s| &s.pipeline)
    }

    pub fn stream_info(&self) -> Option<&StreamInfo> {
        self.pipeline().map(Pipeline::info)
    }

    pub fn codec_type(&self) -> CodecType {
        self.stream_info()
            .map_or(CodecType::Unsupported, StreamInfo::codec_type)
    }

    pub fn texture_format(&self) -> Option<TextureFormat> {
        self.stream_info().and_then(StreamInfo::texture_format)
    }

    pub fn frame_rate(&self) -> f64 {
        self.stream_info().map_or(0.0, StreamInfo::frame_rate)
    }

    pub fn stream_duration(&self) -> f64 {
        self.stream_info().map_or(0.0, |i| i.duration)
    }

    pub fn frame_count(&self) -> u32 {
        self.stream_info().map_or(0, |i| i.frame_count)
    }

    pub fn frame_width(&self) -> u32 {
        self.stream_info().map_or(0, |i| i.width)
    }

    pub fn frame_height(&self) -> u32 {
        self.stream_info().map_or(0, |i| i.height)
    }
}
