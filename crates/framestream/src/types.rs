/// Logical read position and per-step advance of the lookahead reader.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackCursor {
    pub time: f64,
    /// Signed step; the sign is the direction.
    pub delta: f64,
}

impl PlaybackCursor {
    /// Build a cursor whose step is at least one frame long, so the reader
    /// never wastes a read on the frame it just produced. A zero delta
    /// plays forward.
    pub fn new(time: f64, delta: f64, frame_duration: f64) -> Self {
        let magnitude = delta.abs().max(frame_duration);
        let delta = if delta < 0.0 { -magnitude } else { magnitude };
        Self { time, delta }
    }

    pub fn step(&mut self) {
        self.time += self.delta;
    }
}

/// Where a playback time lands in the source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTarget {
    /// Source frame index folded into `[0, frame_count)`.
    pub index: u32,
    /// Unwrapped time snapped to the start of the frame.
    pub time: f64,
}

/// Absorbs float error when a time sits exactly on a frame boundary.
const SNAP_EPSILON: f64 = 1e-9;

impl FrameTarget {
    pub fn locate(time: f64, duration: f64, frame_count: u32) -> Self {
        let frames = f64::from(frame_count);
        let position = (time * frames / duration + SNAP_EPSILON).floor();
        let snapped = position * duration / frames;
        let index = (position as i64).rem_euclid(i64::from(frame_count)) as u32;
        Self {
            index,
            time: snapped,
        }
    }
}

/// Transport state of a player: what the host asked for.
#[derive(Debug, Clone)]
pub struct TransportState {
    pub looping: bool,
    pub speed: f64,
    /// Current position in seconds (unwrapped while looping).
    pub time: f64,
}

impl Default for TransportState {
    fn default() -> Self {
        Self {
            looping: true,
            speed: 1.0,
            time: 0.0,
        }
    }
}
