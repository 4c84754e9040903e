//! Buffer pool bookkeeping shared by the reader thread and the selector.
//!
//! Every `FrameBuffer` of a pipeline is in exactly one of four places: the
//! free list, the lead queue, in flight on the reader thread, or held as
//! the selector's current frame. Only metadata moves happen under the
//! queue lock; reads and decodes happen on buffers already moved out.

use std::collections::VecDeque;

use crate::buffer::FrameBuffer;

/// Snapshot of where the pool's buffers are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub pool_size: usize,
    pub free: usize,
    pub lead: usize,
    pub in_flight: usize,
    pub current: usize,
}

impl PoolStats {
    /// No buffer leaked or duplicated.
    pub fn is_conserved(&self) -> bool {
        self.free + self.lead + self.in_flight + self.current == self.pool_size
    }
}

/// Index and time of a buffered frame, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStamp {
    pub index: Option<u32>,
    pub time: f64,
}

/// Outcome of taking a buffer out of the free list.
#[derive(Debug)]
pub enum Acquired {
    /// Already holds the requested frame; only its time needs updating.
    Reused(FrameBuffer),
    /// Needs a read from the source.
    Fresh(FrameBuffer),
}

pub struct BufferQueues {
    pool_size: usize,
    free: Vec<FrameBuffer>,
    lead: VecDeque<FrameBuffer>,
    in_flight: usize,
    current_held: bool,
}

impl BufferQueues {
    pub fn new(pool_size: usize, capacity: usize) -> Self {
        Self {
            pool_size,
            free: (0..pool_size)
                .map(|_| FrameBuffer::with_capacity(capacity))
                .collect(),
            lead: VecDeque::with_capacity(pool_size),
            in_flight: 0,
            current_held: false,
        }
    }

    /// Check a buffer out for frame `index`, preferring one that already
    /// holds it. `None` means every buffer is in use.
    pub fn acquire(&mut self, index: u32) -> Option<Acquired> {
        let acquired = match self.free.iter().position(|b| b.index() == Some(index)) {
            Some(pos) => Acquired::Reused(self.free.swap_remove(pos)),
            None => Acquired::Fresh(self.free.pop()?),
        };
        self.in_flight += 1;
        Some(acquired)
    }

    /// Append a checked-out buffer to the lead queue.
    pub fn publish(&mut self, buffer: FrameBuffer) {
        debug_assert!(self.in_flight > 0);
        self.in_flight -= 1;
        self.lead.push_back(buffer);
    }

    /// Return a checked-out buffer to the free list without publishing it.
    pub fn release_in_flight(&mut self, buffer: FrameBuffer) {
        debug_assert!(self.in_flight > 0);
        self.in_flight -= 1;
        self.free.push(buffer);
    }

    /// Drop a checked-out buffer whose contents can no longer be trusted.
    /// The pool shrinks by one; only used on termination.
    pub fn discard_in_flight(&mut self, buffer: FrameBuffer) {
        debug_assert!(self.in_flight > 0);
        self.in_flight -= 1;
        self.pool_size -= 1;
        drop(buffer);
    }

    /// Move every lead buffer back to the free list. Returns how many moved.
    pub fn flush_lead(&mut self) -> usize {
        let flushed = self.lead.len();
        self.free.extend(self.lead.drain(..));
        flushed
    }

    /// Adopt the lead buffer nearest to `time` as the current frame,
    /// recycling the previous current frame and any buffers skipped over.
    /// Returns `true` if the current frame changed.
    ///
    /// The lead queue only ever runs in one direction, which the relation
    /// between the current frame and the queue front reveals:
    /// - forward (`current.time <= peek.time`): move on once `time` has
    ///   reached the next frame;
    /// - reverse: move on unless `time` is still past the current frame.
    pub fn select(&mut self, current: &mut Option<FrameBuffer>, time: f64) -> bool {
        let mut changed = false;
        while let Some(peek) = self.lead.front() {
            if let Some(cur) = current.take() {
                let stay = if cur.time() <= peek.time() {
                    time < peek.time()
                } else {
                    cur.time() < time
                };
                if stay {
                    *current = Some(cur);
                    break;
                }
                self.free.push(cur);
            }
            *current = self.lead.pop_front();
            changed = true;
        }
        self.current_held = current.is_some();
        changed
    }

    /// Give the current frame back to the free list.
    pub fn return_current(&mut self, current: &mut Option<FrameBuffer>) {
        if let Some(buffer) = current.take() {
            self.free.push(buffer);
        }
        self.current_held = false;
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            pool_size: self.pool_size,
            free: self.free.len(),
            lead: self.lead.len(),
            in_flight: self.in_flight,
            current: usize::from(self.current_held),
        }
    }

    pub fn lead_snapshot(&self) -> Vec<FrameStamp> {
        self.lead
            .iter()
            .map(|b| FrameStamp {
                index: b.index(),
                time: b.time(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: f64 = 1.0 / 30.0;

    /// Publish frames `indices` at consecutive frame times from `start`,
    /// stepping by `step` frames.
    fn fill_lead(q: &mut BufferQueues, start: f64, step: f64, indices: &[u32]) {
        for (n, &index) in indices.iter().enumerate() {
            let mut buf = match q.acquire(index).expect("free buffer") {
                Acquired::Reused(b) | Acquired::Fresh(b) => b,
            };
            buf.fill(&[index as u8]).unwrap();
            buf.stamp(index, start + step * FRAME * n as f64);
            q.publish(buf);
        }
    }

    #[test]
    fn new_pool_is_all_free() {
        let q = BufferQueues::new(4, 16);
        let s = q.stats();
        assert_eq!(s.free, 4);
        assert!(s.is_conserved());
    }

    #[test]
    fn acquire_reports_exhaustion() {
        let mut q = BufferQueues::new(2, 16);
        assert!(q.acquire(0).is_some());
        assert!(q.acquire(1).is_some());
        assert!(q.acquire(2).is_none());
        assert_eq!(q.stats().in_flight, 2);
        assert!(q.stats().is_conserved());
    }

    #[test]
    fn acquire_prefers_buffer_holding_the_frame() {
        let mut q = BufferQueues::new(4, 16);
        fill_lead(&mut q, 0.0, 1.0, &[0, 1, 2]);
        q.flush_lead();
        match q.acquire(1).unwrap() {
            Acquired::Reused(b) => assert_eq!(b.index(), Some(1)),
            Acquired::Fresh(_) => panic!("frame 1 should be reused"),
        }
        assert!(matches!(q.acquire(7).unwrap(), Acquired::Fresh(_)));
    }

    #[test]
    fn forward_select_picks_nearest_below() {
        let mut q = BufferQueues::new(4, 16);
        fill_lead(&mut q, 0.0, 1.0, &[0, 1, 2]);
        let mut cur = None;

        assert!(q.select(&mut cur, 0.0));
        assert_eq!(cur.as_ref().unwrap().index(), Some(0));

        // Halfway to frame 1: stay on frame 0.
        assert!(!q.select(&mut cur, 0.5 * FRAME));
        assert_eq!(cur.as_ref().unwrap().index(), Some(0));

        // Past frame 2: skip frame 1 entirely.
        assert!(q.select(&mut cur, 2.5 * FRAME));
        let c = cur.as_ref().unwrap();
        assert_eq!(c.index(), Some(2));
        assert!(c.time() <= 2.5 * FRAME);

        let s = q.stats();
        assert_eq!(s.free, 3);
        assert_eq!(s.current, 1);
        assert!(s.is_conserved());
    }

    #[test]
    fn first_select_adopts_front_regardless_of_time() {
        let mut q = BufferQueues::new(4, 16);
        fill_lead(&mut q, 1.0, 1.0, &[30, 31]);
        let mut cur = None;
        assert!(q.select(&mut cur, 0.0));
        assert_eq!(cur.as_ref().unwrap().index(), Some(30));
    }

    #[test]
    fn reverse_select_moves_once_time_reaches_current() {
        let mut q = BufferQueues::new(4, 16);
        // Frames 9, 8, 7 at descending times.
        fill_lead(&mut q, 9.0 * FRAME, -1.0, &[9, 8, 7]);
        let mut cur = None;

        assert!(q.select(&mut cur, 9.0 * FRAME + 0.001));
        assert_eq!(cur.as_ref().unwrap().index(), Some(9));

        // Still past the current frame: hold it.
        assert!(!q.select(&mut cur, 9.0 * FRAME + 0.0005));
        assert_eq!(cur.as_ref().unwrap().index(), Some(9));

        // Time has dropped below the current frame: step to frame 8 even
        // though frame 8 starts a full frame earlier. Reverse traversal
        // adopts the next frame one frame ahead of forward traversal.
        assert!(q.select(&mut cur, 8.5 * FRAME));
        assert_eq!(cur.as_ref().unwrap().index(), Some(8));
        assert!(q.stats().is_conserved());
    }

    #[test]
    fn reverse_and_forward_boundaries_differ() {
        // Forward: sitting exactly on the next frame time adopts it.
        let mut q = BufferQueues::new(4, 16);
        fill_lead(&mut q, 0.0, 1.0, &[0, 1]);
        let mut cur = None;
        q.select(&mut cur, 0.0);
        assert!(q.select(&mut cur, FRAME));
        assert_eq!(cur.as_ref().unwrap().index(), Some(1));

        // Reverse: sitting exactly on the current frame time also moves on.
        let mut q = BufferQueues::new(4, 16);
        fill_lead(&mut q, FRAME, -1.0, &[1, 0]);
        let mut cur = None;
        q.select(&mut cur, FRAME + 0.001);
        assert_eq!(cur.as_ref().unwrap().index(), Some(1));
        assert!(q.select(&mut cur, FRAME));
        assert_eq!(cur.as_ref().unwrap().index(), Some(0));
    }

    #[test]
    fn select_on_empty_lead_keeps_current() {
        let mut q = BufferQueues::new(4, 16);
        fill_lead(&mut q, 0.0, 1.0, &[0]);
        let mut cur = None;
        assert!(q.select(&mut cur, 0.0));
        assert!(!q.select(&mut cur, 10.0));
        assert_eq!(cur.as_ref().unwrap().index(), Some(0));
    }

    #[test]
    fn flush_returns_lead_to_free() {
        let mut q = BufferQueues::new(4, 16);
        fill_lead(&mut q, 0.0, 1.0, &[0, 1, 2]);
        assert_eq!(q.flush_lead(), 3);
        let s = q.stats();
        assert_eq!(s.lead, 0);
        assert_eq!(s.free, 4);
    }

    #[test]
    fn return_current_restores_pool() {
        let mut q = BufferQueues::new(4, 16);
        fill_lead(&mut q, 0.0, 1.0, &[0]);
        let mut cur = None;
        q.select(&mut cur, 0.0);
        q.return_current(&mut cur);
        assert!(cur.is_none());
        assert_eq!(q.stats().free, 4);
        assert!(q.stats().is_conserved());
    }

    #[test]
    fn discard_shrinks_pool_consistently() {
        let mut q = BufferQueues::new(3, 16);
        let buf = match q.acquire(0).unwrap() {
            Acquired::Reused(b) | Acquired::Fresh(b) => b,
        };
        q.discard_in_flight(buf);
        let s = q.stats();
        assert_eq!(s.pool_size, 2);
        assert!(s.is_conserved());
    }

    #[test]
    fn conservation_through_mixed_operations() {
        let mut q = BufferQueues::new(4, 16);
        let mut cur = None;
        let mut t = 0.0;
        for step in 0..40u32 {
            if let Some(acq) = q.acquire(step % 10) {
                let mut buf = match acq {
                    Acquired::Reused(b) | Acquired::Fresh(b) => b,
                };
                buf.stamp(step % 10, f64::from(step) * FRAME);
                if step % 5 == 4 {
                    q.release_in_flight(buf);
                } else {
                    q.publish(buf);
                }
            }
            assert!(q.stats().is_conserved());
            if step % 2 == 1 {
                t += FRAME;
                q.select(&mut cur, t);
                assert!(q.stats().is_conserved());
            }
            if step == 20 {
                q.flush_lead();
                assert!(q.stats().is_conserved());
            }
        }
    }
}
