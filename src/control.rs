//! The control byte alphabet.
//!
//! Every slot of a table has one control byte. A byte with the high bit clear
//! is `Full` and holds the 7-bit `h2` fragment of the element's hash. A byte
//! with the high bit set is special: [`EMPTY`], [`DELETED`] or [`SENTINEL`].
//!
//! The special encodings are picked so the group scans reduce to single bit
//! tests: Empty is the only special byte with bit 1 clear, and the Sentinel is
//! the only special byte with bit 0 set.

/// A slot that has never held an element, or was reclaimed.
pub const EMPTY: u8 = 0x80;

/// A tombstone: the slot held an element that was erased, and a probe chain
/// may still run through it.
pub const DELETED: u8 = 0xFE;

/// Marks the end of the slot range. Exactly one exists per table, at index
/// `capacity`.
pub const SENTINEL: u8 = 0xFF;

/// Mask selecting the `h2` bits of a hash.
pub const H2_MASK: u64 = 0x7F;

/// The 7-bit fragment stored in a `Full` control byte.
#[inline(always)]
pub fn h2(hash: u64) -> u8 {
    (hash & H2_MASK) as u8
}

/// The remaining hash bits, used to select the first probe group.
#[inline(always)]
pub fn h1(hash: u64) -> usize {
    (hash >> 7) as usize
}

/// `true` for `Full(_)`.
#[inline(always)]
pub fn is_full(ctrl: u8) -> bool {
    ctrl & 0x80 == 0
}

/// `true` for Empty, Deleted and Sentinel.
#[inline(always)]
pub fn is_special(ctrl: u8) -> bool {
    ctrl & 0x80 != 0
}

/// `true` for the states an insert may claim: Empty or Deleted.
#[inline(always)]
pub fn is_free(ctrl: u8) -> bool {
    ctrl == EMPTY || ctrl == DELETED
}
