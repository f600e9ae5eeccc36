//! Sliding history buffers for the temporal detectors.

use pullup_core::Frame;
use std::collections::VecDeque;

/// Number of frames of history the detectors look at.
pub const HISTORY_SIZE: usize = 3;

/// A fixed 3-slot sliding window of per-frame facts.
///
/// Slot 0 is the oldest entry, slot 2 the latest. Pushing slides everything
/// one slot toward the past.
#[derive(Debug, Clone, Copy)]
pub struct Window3<T> {
    slots: [T; HISTORY_SIZE],
}

impl<T: Copy> Window3<T> {
    /// Create a window with every slot set to `value`.
    pub fn filled(value: T) -> Self {
        Self {
            slots: [value; HISTORY_SIZE],
        }
    }

    /// Slide the window and make `value` the latest entry.
    pub fn push(&mut self, value: T) {
        self.slots[0] = self.slots[1];
        self.slots[1] = self.slots[2];
        self.slots[2] = value;
    }

    /// The latest entry.
    pub fn latest(&self) -> T {
        self.slots[HISTORY_SIZE - 1]
    }

    /// Overwrite the latest entry in place.
    pub fn set_latest(&mut self, value: T) {
        self.slots[HISTORY_SIZE - 1] = value;
    }

    /// The entry one frame older than the latest.
    pub fn previous(&self) -> T {
        self.slots[HISTORY_SIZE - 2]
    }

    /// The oldest entry.
    pub fn oldest(&self) -> T {
        self.slots[0]
    }

    /// Overwrite an arbitrary slot (0 = oldest). Used only while the filter
    /// is starting up and the window is not yet sliding.
    pub fn set(&mut self, slot: usize, value: T) {
        self.slots[slot] = value;
    }

    /// Read an arbitrary slot (0 = oldest).
    pub fn get(&self, slot: usize) -> T {
        self.slots[slot]
    }

    /// All slots, oldest first.
    pub fn as_slice(&self) -> &[T] {
        &self.slots
    }
}

impl<T: Copy + Default> Default for Window3<T> {
    fn default() -> Self {
        Self::filled(T::default())
    }
}

/// The Previous/Current/Next frame stencil.
///
/// Holds up to 3 frames; the newest pushed frame is Next. Previous and
/// Current are unavailable until enough frames have been seen.
#[derive(Debug, Default)]
pub struct FrameHistory {
    frames: VecDeque<Frame>,
}

impl FrameHistory {
    /// Create an empty stencil.
    pub fn new() -> Self {
        Self {
            frames: VecDeque::with_capacity(HISTORY_SIZE),
        }
    }

    /// Push a new frame as Next, discarding the oldest once full.
    pub fn push(&mut self, frame: Frame) {
        if self.frames.len() == HISTORY_SIZE {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
    }

    /// Number of frames currently held.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the stencil is empty.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Whether all three stencil slots are occupied.
    pub fn is_full(&self) -> bool {
        self.frames.len() == HISTORY_SIZE
    }

    /// The Next frame (the most recently pushed).
    pub fn next(&self) -> Option<&Frame> {
        self.frames.back()
    }

    /// The Current frame (one before Next).
    pub fn current(&self) -> Option<&Frame> {
        let len = self.frames.len();
        if len >= 2 {
            self.frames.get(len - 2)
        } else {
            None
        }
    }

    /// The Previous frame (two before Next).
    pub fn previous(&self) -> Option<&Frame> {
        let len = self.frames.len();
        if len >= 3 {
            self.frames.get(len - 3)
        } else {
            None
        }
    }

    /// Drop all frames.
    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pullup_core::{PixelFormat, TimeBase, Timestamp};

    #[test]
    fn test_window_push_slides() {
        let mut w = Window3::filled(0);
        w.push(1);
        w.push(2);
        w.push(3);
        assert_eq!(w.oldest(), 1);
        assert_eq!(w.previous(), 2);
        assert_eq!(w.latest(), 3);

        w.push(4);
        assert_eq!(w.oldest(), 2);
        assert_eq!(w.latest(), 4);
    }

    #[test]
    fn test_window_set_latest() {
        let mut w = Window3::filled(0u16);
        w.push(7);
        w.set_latest(9);
        assert_eq!(w.latest(), 9);
        assert_eq!(w.previous(), 0);
    }

    fn frame_at(pts: i64) -> Frame {
        let mut f = Frame::new(16, 16, PixelFormat::Gray8, TimeBase::MPEG);
        f.pts = Timestamp::new(pts, TimeBase::MPEG);
        f
    }

    #[test]
    fn test_frame_history_stencil_roles() {
        let mut h = FrameHistory::new();
        assert!(h.next().is_none());

        h.push(frame_at(0));
        assert_eq!(h.next().unwrap().pts.value, 0);
        assert!(h.current().is_none());
        assert!(h.previous().is_none());

        h.push(frame_at(1));
        assert_eq!(h.next().unwrap().pts.value, 1);
        assert_eq!(h.current().unwrap().pts.value, 0);
        assert!(h.previous().is_none());

        h.push(frame_at(2));
        assert!(h.is_full());
        assert_eq!(h.previous().unwrap().pts.value, 0);
        assert_eq!(h.current().unwrap().pts.value, 1);
        assert_eq!(h.next().unwrap().pts.value, 2);

        h.push(frame_at(3));
        assert_eq!(h.len(), 3);
        assert_eq!(h.previous().unwrap().pts.value, 1);
        assert_eq!(h.next().unwrap().pts.value, 3);
    }
}
