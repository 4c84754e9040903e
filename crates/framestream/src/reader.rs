//! Lookahead reader: a dedicated thread that keeps the lead queue filled
//! with compressed frames ahead of a moving playback cursor.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use crate::error::OpenError;
use crate::queue::{Acquired, BufferQueues, FrameStamp, PoolStats};
use crate::selector::FrameSelector;
use crate::signal::Signal;
use crate::source::{StreamInfo, StreamSource};
use crate::types::PlaybackCursor;

/// Smallest pool that can always make progress after a restart: one
/// buffer may be held as the current frame, one is read into.
pub const MIN_POOL_SIZE: usize = 2;

#[derive(Default)]
struct RestartState {
    pending: Option<PlaybackCursor>,
    /// Ticket of the most recent request.
    requested: u64,
    /// Highest ticket the reader has served.
    completed: u64,
    /// The reader thread has exited; nobody will serve new tickets.
    finished: bool,
}

/// State shared between the reader thread, the selector and the owner.
pub(crate) struct ReaderShared {
    queues: Mutex<BufferQueues>,
    restart: Mutex<RestartState>,
    restarted: Condvar,
    pub(crate) wake: Signal,
    terminate: AtomicBool,
}

impl ReaderShared {
    pub(crate) fn new(pool_size: usize, capacity: usize) -> Self {
        Self {
            queues: Mutex::new(BufferQueues::new(pool_size, capacity)),
            restart: Mutex::new(RestartState::default()),
            restarted: Condvar::new(),
            wake: Signal::new(true),
            terminate: AtomicBool::new(false),
        }
    }

    /// Queue lock. A panicked holder leaves the queues consistent (every
    /// mutation is a single move), so poisoning is ignored.
    pub(crate) fn queues(&self) -> MutexGuard<'_, BufferQueues> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn restart_state(&self) -> MutexGuard<'_, RestartState> {
        self.restart.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_terminating(&self) -> bool {
        self.terminate.load(Ordering::Acquire)
    }

    /// Post a cursor change and return the ticket to wait on.
    fn post_restart(&self, cursor: PlaybackCursor) -> u64 {
        let mut state = self.restart_state();
        state.requested += 1;
        state.pending = Some(cursor);
        self.wake.set();
        state.requested
    }

    fn wait_restart(&self, ticket: u64) {
        let mut state = self.restart_state();
        while state.completed < ticket && !state.finished {
            state = self
                .restarted
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn mark_finished(&self) {
        let mut state = self.restart_state();
        state.finished = true;
        self.restarted.notify_all();
    }
}

/// Result of one reader step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Published,
    Failed,
    Exhausted,
    Terminated,
}

/// Reader-thread state: the source and the cursor it reads along.
struct ReaderCore {
    source: Box<dyn StreamSource>,
    info: StreamInfo,
    cursor: PlaybackCursor,
    /// Restart ticket to complete after the next read attempt.
    ticket: Option<u64>,
}

impl ReaderCore {
    fn new(source: Box<dyn StreamSource>, cursor: PlaybackCursor) -> Self {
        let info = source.info().clone();
        Self {
            source,
            info,
            cursor,
            ticket: None,
        }
    }

    /// Adopt a pending restart: flush the lead queue, take the new cursor.
    fn apply_restart(&mut self, shared: &ReaderShared) {
        let mut state = shared.restart_state();
        if let Some(cursor) = state.pending.take() {
            let flushed = shared.queues().flush_lead();
            log::debug!(
                "Reader restart at {:.3}s (delta {:+.4}s), flushed {flushed} frames",
                cursor.time,
                cursor.delta
            );
            self.cursor = cursor;
            self.ticket = Some(state.requested);
        }
    }

    fn complete_restart(&mut self, shared: &ReaderShared) {
        if let Some(ticket) = self.ticket.take() {
            let mut state = shared.restart_state();
            state.completed = state.completed.max(ticket);
            shared.restarted.notify_all();
        }
    }

    /// Read (or reuse) one frame at the cursor and publish it.
    fn step(&mut self, shared: &ReaderShared) -> Step {
        self.apply_restart(shared);

        let target = self.info.locate(self.cursor.time);
        let acquired = shared.queues().acquire(target.index);
        let Some(acquired) = acquired else {
            return Step::Exhausted;
        };

        let step = match acquired {
            Acquired::Reused(mut buffer) => {
                // Same bytes as a previous loop; only the time moves on.
                buffer.set_time(target.time);
                shared.queues().publish(buffer);
                Step::Published
            }
            Acquired::Fresh(mut buffer) => {
                let result = self.source.read_frame(target.index, &mut buffer);
                let mut queues = shared.queues();
                if shared.is_terminating() {
                    queues.discard_in_flight(buffer);
                    return Step::Terminated;
                }
                match result {
                    Ok(()) => {
                        buffer.stamp(target.index, target.time);
                        queues.publish(buffer);
                        Step::Published
                    }
                    Err(e) => {
                        log::warn!("Failed to read frame {}: {e}", target.index);
                        buffer.invalidate();
                        queues.release_in_flight(buffer);
                        Step::Failed
                    }
                }
            }
        };

        log::trace!(
            "Reader step {:?}: frame {} at {:.4}s",
            step,
            target.index,
            target.time
        );
        self.cursor.step();
        self.complete_restart(shared);
        step
    }
}

fn reader_loop(mut core: ReaderCore, shared: &ReaderShared) {
    loop {
        shared.wake.wait();
        loop {
            if shared.is_terminating() {
                return;
            }
            match core.step(shared) {
                Step::Published => {}
                // Failed reads retry on the next wake instead of spinning.
                Step::Failed | Step::Exhausted | Step::Terminated => break,
            }
        }
    }
}

/// Owner handle of the reader thread and its buffer pool.
pub struct LookaheadReader {
    shared: Arc<ReaderShared>,
    thread: Option<JoinHandle<()>>,
    info: StreamInfo,
}

impl LookaheadReader {
    /// Start reading `source` from `time`, stepping by `delta`. Returns the
    /// reader and the selector that consumes its output.
    pub fn spawn(
        source: Box<dyn StreamSource>,
        time: f64,
        delta: f64,
        pool_size: usize,
    ) -> Result<(Self, FrameSelector), OpenError> {
        let info = source.info().clone();
        info.validate()?;
        let pool_size = pool_size.max(MIN_POOL_SIZE);

        let shared = Arc::new(ReaderShared::new(pool_size, info.max_frame_size));
        let cursor = PlaybackCursor::new(time, delta, info.frame_duration());
        let core = ReaderCore::new(source, cursor);

        let thread_shared = Arc::clone(&shared);
        let handle = std::thread::Builder::new()
            .name("framestream-reader".into())
            .spawn(move || {
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    reader_loop(core, &thread_shared);
                }));
                if result.is_err() {
                    log::error!("Reader thread panicked");
                }
                thread_shared.mark_finished();
            })
            .map_err(|source| OpenError::Spawn {
                name: "reader",
                source,
            })?;

        log::debug!(
            "Reader started: {} frames, pool of {pool_size} x {} bytes",
            info.frame_count,
            info.max_frame_size
        );

        let selector = FrameSelector::new(Arc::clone(&shared));
        Ok((
            Self {
                shared,
                thread: Some(handle),
                info,
            },
            selector,
        ))
    }

    /// Seek and/or change rate. Blocks until the lead queue has been flushed
    /// and one frame has been read under the new cursor, so no frame from
    /// before the restart is published afterwards.
    pub fn restart(&self, time: f64, delta: f64) {
        let cursor = PlaybackCursor::new(time, delta, self.info.frame_duration());
        let ticket = self.shared.post_restart(cursor);
        self.shared.wait_restart(ticket);
    }

    pub fn info(&self) -> &StreamInfo {
        &self.info
    }

    pub fn stats(&self) -> PoolStats {
        self.shared.queues().stats()
    }

    /// Index and time of every frame waiting in the lead queue, front first.
    pub fn lead_snapshot(&self) -> Vec<FrameStamp> {
        self.shared.queues().lead_snapshot()
    }
}

impl Drop for LookaheadReader {
    fn drop(&mut self) {
        self.shared.terminate.store(true, Ordering::Release);
        self.shared.wake.set();
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
        log::debug!("Reader stopped");
    }
}
