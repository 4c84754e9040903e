//! Decode stage: turns the selected compressed frame into pixels, either
//! on the caller's thread or on a dedicated decode thread.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use uuid::Uuid;

use crate::codec::FrameCodec;
use crate::error::OpenError;
use crate::pixels::PixelBuffer;
use crate::selector::FrameSelector;
use crate::signal::Signal;

/// Selector and codec; locked together so sync and async updates never
/// interleave.
struct DecodeStage {
    selector: FrameSelector,
    codec: Box<dyn FrameCodec>,
}

struct DecoderShared {
    stage: Mutex<DecodeStage>,
    pixels: Arc<PixelBuffer>,
    /// Time of the latest update, sync or async, as `f64` bits.
    requested_time: AtomicU64,
    wake: Signal,
    terminate: AtomicBool,
    decoded: AtomicU64,
}

impl DecoderShared {
    fn stage(&self) -> MutexGuard<'_, DecodeStage> {
        self.stage.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn request(&self, time: f64) {
        self.requested_time.store(time.to_bits(), Ordering::Release);
    }

    /// Decode at the latest requested time. The time is read under the
    /// stage lock so a wake queued before a sync update never decodes at
    /// the older time.
    fn decode_requested(&self) -> bool {
        let mut stage = self.stage();
        let time = f64::from_bits(self.requested_time.load(Ordering::Acquire));
        Self::decode_locked(&mut stage, &self.pixels, &self.decoded, time)
    }

    /// Advance to `time` and decode if the frame changed. Returns `true`
    /// if new pixels were written.
    fn decode_locked(
        stage: &mut DecodeStage,
        pixels: &PixelBuffer,
        decoded: &AtomicU64,
        time: f64,
    ) -> bool {
        let DecodeStage { selector, codec } = stage;
        let Some(frame) = selector.advance(time) else {
            return false;
        };

        let mut pixels = pixels.write();
        match codec.decode(frame.bytes(), &mut pixels.data) {
            Ok(()) => {
                pixels.index = frame.index();
                pixels.time = frame.time();
                pixels.sequence += 1;
                decoded.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(e) => {
                log::warn!("Failed to decode frame {:?}: {e}", frame.index());
                false
            }
        }
    }
}

fn decode_loop(shared: &DecoderShared) {
    loop {
        shared.wake.wait();
        if shared.terminate.load(Ordering::Acquire) {
            return;
        }
        shared.decode_requested();
    }
}

pub struct Decoder {
    shared: Arc<DecoderShared>,
    thread: Option<JoinHandle<()>>,
    id: Uuid,
}

impl Decoder {
    /// Take over `selector` and start the decode thread. `frame_size` is
    /// the decoded size of one frame.
    pub fn spawn(
        selector: FrameSelector,
        codec: Box<dyn FrameCodec>,
        frame_size: usize,
    ) -> Result<Self, OpenError> {
        let shared = Arc::new(DecoderShared {
            stage: Mutex::new(DecodeStage { selector, codec }),
            pixels: Arc::new(PixelBuffer::new(frame_size)),
            requested_time: AtomicU64::new(0.0f64.to_bits()),
            wake: Signal::new(false),
            terminate: AtomicBool::new(false),
            decoded: AtomicU64::new(0),
        });

        let thread_shared = Arc::clone(&shared);
        let handle = std::thread::Builder::new()
            .name("framestream-decoder".into())
            .spawn(move || {
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    decode_loop(&thread_shared);
                }));
                if result.is_err() {
                    log::error!("Decoder thread panicked");
                }
            })
            .map_err(|source| OpenError::Spawn {
                name: "decoder",
                source,
            })?;

        let id = Uuid::new_v4();
        log::debug!("Decoder {id} started ({frame_size} byte frames)");

        Ok(Self {
            shared,
            thread: Some(handle),
            id,
        })
    }

    /// Decode the frame for `time` on the calling thread. Returns `true`
    /// if the pixels changed.
    pub fn update_sync(&self, time: f64) -> bool {
        // Recorded first so a pending async wake catches up to this time.
        self.shared.request(time);
        let mut stage = self.shared.stage();
        DecoderShared::decode_locked(&mut stage, &self.shared.pixels, &self.shared.decoded, time)
    }

    /// Hand `time` to the decode thread and return immediately.
    pub fn update_async(&self, time: f64) {
        self.shared.request(time);
        self.shared.wake.set();
    }

    /// Successful decodes so far.
    pub fn decoded_frames(&self) -> u64 {
        self.shared.decoded.load(Ordering::Relaxed)
    }

    pub fn pixels(&self) -> &Arc<PixelBuffer> {
        &self.shared.pixels
    }

    /// Unique identifier of this pipeline instance.
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Drop for Decoder {
    fn drop(&mut self) {
        self.shared.terminate.store(true, Ordering::Release);
        self.shared.wake.set();
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
        log::debug!("Decoder {} stopped", self.id);
    }
}
