//! Fixed-width windows of control bytes and their parallel match operations.
//!
//! A group is read with a single unaligned load and answers "which lanes
//! satisfy predicate X" in a handful of instructions. Two backends implement
//! [`ControlGroup`]: a portable word version and an SSE2 version. The one used
//! by the tables is chosen at build time and exported as [`Group`].

use core::fmt::Debug;

pub mod generic;
#[cfg(all(
    any(target_arch = "x86", target_arch = "x86_64"),
    target_feature = "sse2",
    not(miri)
))]
pub mod sse2;

cfg_if::cfg_if! {
    if #[cfg(all(
        any(target_arch = "x86", target_arch = "x86_64"),
        target_feature = "sse2",
        not(miri),
        not(feature = "generic-group")
    ))] {
        /// The group backend used by the tables on this target.
        pub type Group = sse2::Sse2Group;
    } else {
        /// The group backend used by the tables on this target.
        pub type Group = generic::GenericGroup;
    }
}

/// Lane count of [`Group`].
pub const WIDTH: usize = <Group as ControlGroup>::WIDTH;

/// The operations every group backend provides.
///
/// All operations are total. Lane `i` of a group loaded from `ptr` is the byte
/// at `ptr + i`.
pub trait ControlGroup: Copy + Debug {
    /// Number of control bytes in one group.
    const WIDTH: usize;

    /// Set of lanes produced by the match operations.
    type Mask: LaneSet;

    /// Loads `WIDTH` control bytes starting at `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads of `WIDTH` bytes. No alignment is
    /// required.
    unsafe fn load(ptr: *const u8) -> Self;

    /// Stores the group's `WIDTH` bytes starting at `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for writes of `WIDTH` bytes. No alignment is
    /// required.
    unsafe fn store(self, ptr: *mut u8);

    /// Lanes holding `Full(h2)` where `h2 == byte & 0x7F`.
    fn match_byte(self, byte: u8) -> Self::Mask;

    /// Lanes holding `EMPTY`.
    fn match_empty(self) -> Self::Mask;

    /// Lanes holding `EMPTY` or `DELETED`.
    fn match_free(self) -> Self::Mask;

    /// Length of the run of free lanes starting at lane 0.
    ///
    /// The run ends at the first `Full` lane or at the `SENTINEL`, and is
    /// `WIDTH` when every lane is free.
    fn count_leading_free_or_end(self) -> usize;

    /// Rewrites every `Full` lane to `DELETED` and every special lane to
    /// `EMPTY`.
    fn convert_special_to_empty_and_full_to_tomb(self) -> Self;
}

/// A set of lane indices, iterated in ascending order.
pub trait LaneSet: Copy + Debug + IntoIterator<Item = usize> {
    /// `true` when at least one lane is set.
    fn any(self) -> bool;

    /// The lowest set lane.
    fn lowest_set_lane(self) -> Option<usize>;

    /// Number of unset lanes below the lowest set lane, or the lane count
    /// when empty.
    fn trailing_lanes(self) -> usize;

    /// Number of unset lanes above the highest set lane, or the lane count
    /// when empty.
    fn leading_lanes(self) -> usize;
}

/// Match result over `LANES` lanes, each `STRIDE` bits wide.
///
/// Only the top bit of each lane may be set.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct BitMask<const STRIDE: u32, const LANES: u32>(pub(crate) u64);

impl<const STRIDE: u32, const LANES: u32> BitMask<STRIDE, LANES> {
    const BITS: u32 = STRIDE * LANES;

    /// Raw mask bits.
    pub fn bits(self) -> u64 {
        self.0
    }

    #[inline(always)]
    fn remove_lowest_bit(self) -> Self {
        Self(self.0 & self.0.wrapping_sub(1))
    }
}

impl<const STRIDE: u32, const LANES: u32> LaneSet for BitMask<STRIDE, LANES> {
    #[inline(always)]
    fn any(self) -> bool {
        self.0 != 0
    }

    #[inline(always)]
    fn lowest_set_lane(self) -> Option<usize> {
        if self.0 == 0 {
            None
        } else {
            Some((self.0.trailing_zeros() / STRIDE) as usize)
        }
    }

    #[inline(always)]
    fn trailing_lanes(self) -> usize {
        if self.0 == 0 {
            LANES as usize
        } else {
            (self.0.trailing_zeros() / STRIDE) as usize
        }
    }

    #[inline(always)]
    fn leading_lanes(self) -> usize {
        ((self.0.leading_zeros() - (u64::BITS - Self::BITS)) / STRIDE) as usize
    }
}

impl<const STRIDE: u32, const LANES: u32> IntoIterator for BitMask<STRIDE, LANES> {
    type IntoIter = BitMaskIter<STRIDE, LANES>;
    type Item = usize;

    #[inline(always)]
    fn into_iter(self) -> Self::IntoIter {
        BitMaskIter(self)
    }
}

impl<const STRIDE: u32, const LANES: u32> Debug for BitMask<STRIDE, LANES> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(*self).finish()
    }
}

/// Ascending iterator over the lanes of a [`BitMask`].
#[derive(Clone)]
pub struct BitMaskIter<const STRIDE: u32, const LANES: u32>(BitMask<STRIDE, LANES>);

impl<const STRIDE: u32, const LANES: u32> Iterator for BitMaskIter<STRIDE, LANES> {
    type Item = usize;

    #[inline(always)]
    fn next(&mut self) -> Option<usize> {
        let lane = self.0.lowest_set_lane()?;
        self.0 = self.0.remove_lowest_bit();
        Some(lane)
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;
    use crate::control::DELETED;
    use crate::control::EMPTY;
    use crate::control::SENTINEL;

    const BACKGROUNDS: [u8; 3] = [EMPTY, DELETED, SENTINEL];

    fn load<G: ControlGroup>(bytes: &[u8]) -> G {
        assert!(bytes.len() >= G::WIDTH);
        // SAFETY: The slice holds at least `WIDTH` bytes.
        unsafe { G::load(bytes.as_ptr()) }
    }

    fn check_match_byte<G: ControlGroup>() {
        let w = G::WIDTH;
        for background in BACKGROUNDS {
            for t in 0..=0x7Fu8 {
                let mut bytes = [background; 16];
                bytes[0] = t;
                bytes[w - 1] = t;

                let lanes: Vec<usize> = load::<G>(&bytes).match_byte(t).into_iter().collect();
                assert_eq!(lanes, [0, w - 1], "background {background:#04x} t {t:#04x}");

                // The high bit of the probe byte is ignored.
                let lanes: Vec<usize> = load::<G>(&bytes)
                    .match_byte(t | 0x80)
                    .into_iter()
                    .collect();
                assert_eq!(lanes, [0, w - 1]);
            }
        }
    }

    fn check_match_specials<G: ControlGroup>() {
        let w = G::WIDTH;
        let mut bytes = [0u8; 16];
        for (i, byte) in bytes.iter_mut().enumerate().take(w) {
            *byte = match i % 4 {
                0 => EMPTY,
                1 => DELETED,
                2 => 0x15,
                _ => 0x7F,
            };
        }
        bytes[w - 1] = SENTINEL;
        let group = load::<G>(&bytes);

        let expected_empty: Vec<usize> = (0..w).filter(|&i| bytes[i] == EMPTY).collect();
        let expected_free: Vec<usize> = (0..w)
            .filter(|&i| bytes[i] == EMPTY || bytes[i] == DELETED)
            .collect();
        let expected_full: Vec<usize> = (0..w).filter(|&i| bytes[i] == 0x15).collect();

        assert_eq!(group.match_empty().into_iter().collect::<Vec<_>>(), expected_empty);
        assert_eq!(group.match_free().into_iter().collect::<Vec<_>>(), expected_free);
        assert_eq!(group.match_byte(0x15).into_iter().collect::<Vec<_>>(), expected_full);
        assert!(!group.match_byte(0x16).any());
    }

    fn check_count_leading<G: ControlGroup>() {
        let w = G::WIDTH;
        for fill in [EMPTY, DELETED] {
            for stop in [SENTINEL, 0x00, 0x7F] {
                for index in 0..w {
                    let mut bytes = [fill; 16];
                    bytes[index] = stop;
                    assert_eq!(
                        load::<G>(&bytes).count_leading_free_or_end(),
                        index,
                        "fill {fill:#04x} stop {stop:#04x} at {index}"
                    );
                }
            }
            let bytes = [fill; 16];
            assert_eq!(load::<G>(&bytes).count_leading_free_or_end(), w);
        }
    }

    fn check_convert<G: ControlGroup>() {
        let w = G::WIDTH;
        let input: [u8; 16] = [
            EMPTY, DELETED, SENTINEL, 0x00, 0x01, 0x7F, 0x40, EMPTY, //
            0x22, DELETED, 0x00, SENTINEL, 0x33, EMPTY, 0x7E, 0x11,
        ];
        let mut output = [0u8; 16];
        // SAFETY: Both buffers hold 16 bytes, at least `WIDTH`.
        unsafe {
            load::<G>(&input)
                .convert_special_to_empty_and_full_to_tomb()
                .store(output.as_mut_ptr());
        }
        for i in 0..w {
            let expected = if input[i] & 0x80 == 0 { DELETED } else { EMPTY };
            assert_eq!(output[i], expected, "lane {i} from {:#04x}", input[i]);
        }
    }

    fn check_mask_lanes<G: ControlGroup>() {
        let w = G::WIDTH;
        let bytes = [EMPTY; 16];
        let all = load::<G>(&bytes).match_empty();
        assert_eq!(all.trailing_lanes(), 0);
        assert_eq!(all.leading_lanes(), 0);

        let free = load::<G>(&bytes).match_free().into_iter().count();
        assert_eq!(free, w);

        let nothing = load::<G>(&bytes).match_byte(0x00);
        assert!(!nothing.any());
        assert_eq!(nothing.lowest_set_lane(), None);
        assert_eq!(nothing.trailing_lanes(), w);
        assert_eq!(nothing.leading_lanes(), w);

        for lane in 0..w {
            let mut bytes = [DELETED; 16];
            bytes[lane] = EMPTY;
            let mask = load::<G>(&bytes).match_empty();
            assert_eq!(mask.lowest_set_lane(), Some(lane));
            assert_eq!(mask.trailing_lanes(), lane);
            assert_eq!(mask.leading_lanes(), w - 1 - lane);
        }
    }

    macro_rules! backend_tests {
        ($module:ident, $group:ty) => {
            mod $module {
                use super::*;

                #[test]
                fn match_byte_all_targets() {
                    check_match_byte::<$group>();
                }

                #[test]
                fn match_specials() {
                    check_match_specials::<$group>();
                }

                #[test]
                fn count_leading_free_or_end() {
                    check_count_leading::<$group>();
                }

                #[test]
                fn convert_special_and_full() {
                    check_convert::<$group>();
                }

                #[test]
                fn mask_lane_counts() {
                    check_mask_lanes::<$group>();
                }
            }
        };
    }

    backend_tests!(generic_backend, generic::GenericGroup);

    #[cfg(all(
        any(target_arch = "x86", target_arch = "x86_64"),
        target_feature = "sse2",
        not(miri)
    ))]
    backend_tests!(sse2_backend, sse2::Sse2Group);
}
