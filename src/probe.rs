//! Triangular probing over group-sized windows.

use crate::group::WIDTH;

/// The sequence of group offsets visited for one hash.
///
/// With `capacity + 1` a power of two and a multiple of [`WIDTH`], the
/// offsets `h1, h1 + W, h1 + 3W, h1 + 6W, ...` (mod `capacity + 1`) visit
/// every window of the ring exactly once in `(capacity + 1) / W` steps.
#[derive(Clone, Debug)]
pub struct ProbeSeq {
    offset: usize,
    index: usize,
    capacity: usize,
}

impl ProbeSeq {
    /// Starts the sequence at `h1 mod (capacity + 1)`.
    #[inline(always)]
    pub fn new(h1: usize, capacity: usize) -> Self {
        Self {
            offset: h1 & capacity,
            index: 0,
            capacity,
        }
    }

    /// Offset of the current group in the control array.
    #[inline(always)]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Distance travelled so far, in bytes. Grows by `W`, `2W`, `3W`, ...
    #[inline(always)]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Advances to the next group.
    #[inline(always)]
    pub fn next(&mut self) {
        self.index += WIDTH;
        self.offset = (self.offset + self.index) & self.capacity;
    }

    /// Slot index of `lane` within the current group.
    #[inline(always)]
    pub fn get_offset(&self, lane: usize) -> usize {
        (self.offset + lane) & self.capacity
    }

    /// Number of groups a full probe visits before repeating.
    #[inline(always)]
    pub fn group_count(capacity: usize) -> usize {
        ((capacity + 1) / WIDTH).max(1)
    }
}

/// Distance from the home offset of `h1` to `slot`, in whole groups.
///
/// Two slots with the same probe index are reached by the same step of the
/// sequence for `h1`.
#[inline(always)]
pub fn probe_index(slot: usize, h1: usize, capacity: usize) -> usize {
    (slot.wrapping_sub(h1) & capacity) / WIDTH
}
