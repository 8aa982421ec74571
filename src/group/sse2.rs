//! SSE2 group backend: sixteen control bytes in an `__m128i`.

#[cfg(target_arch = "x86")]
use core::arch::x86::*;
#[cfg(target_arch = "x86_64")]
use core::arch::x86_64::*;

use super::BitMask;
use super::ControlGroup;
use crate::control::DELETED;
use crate::control::EMPTY;

/// Sixteen control bytes in a vector register. Matches come back through
/// `movemask`, one bit per lane.
#[derive(Clone, Copy, Debug)]
pub struct Sse2Group(__m128i);

impl ControlGroup for Sse2Group {
    type Mask = BitMask<1, 16>;

    const WIDTH: usize = 16;

    #[inline(always)]
    unsafe fn load(ptr: *const u8) -> Self {
        // SAFETY: Caller guarantees `ptr` is readable for 16 bytes; the load is
        // unaligned.
        Self(unsafe { _mm_loadu_si128(ptr.cast::<__m128i>()) })
    }

    #[inline(always)]
    unsafe fn store(self, ptr: *mut u8) {
        // SAFETY: Caller guarantees `ptr` is writable for 16 bytes; the store is
        // unaligned.
        unsafe { _mm_storeu_si128(ptr.cast::<__m128i>(), self.0) }
    }

    #[inline(always)]
    fn match_byte(self, byte: u8) -> Self::Mask {
        // SAFETY: SSE2 is statically enabled for this module.
        unsafe {
            let cmp = _mm_cmpeq_epi8(self.0, _mm_set1_epi8((byte & 0x7F) as i8));
            BitMask(_mm_movemask_epi8(cmp) as u16 as u64)
        }
    }

    #[inline(always)]
    fn match_empty(self) -> Self::Mask {
        // SAFETY: SSE2 is statically enabled for this module.
        unsafe {
            let cmp = _mm_cmpeq_epi8(self.0, _mm_set1_epi8(EMPTY as i8));
            BitMask(_mm_movemask_epi8(cmp) as u16 as u64)
        }
    }

    #[inline(always)]
    fn match_free(self) -> Self::Mask {
        // As i8: EMPTY is -128, DELETED is -2, SENTINEL is -1 and Full is
        // non-negative, so free is exactly `ctrl < -1`.
        // SAFETY: SSE2 is statically enabled for this module.
        unsafe {
            let cmp = _mm_cmpgt_epi8(_mm_set1_epi8(-1), self.0);
            BitMask(_mm_movemask_epi8(cmp) as u16 as u64)
        }
    }

    #[inline(always)]
    fn count_leading_free_or_end(self) -> usize {
        let free = self.match_free().0 as u16;
        (!free).trailing_zeros() as usize
    }

    #[inline(always)]
    fn convert_special_to_empty_and_full_to_tomb(self) -> Self {
        // SAFETY: SSE2 is statically enabled for this module.
        unsafe {
            let special = _mm_cmpgt_epi8(_mm_setzero_si128(), self.0);
            Self(_mm_or_si128(
                _mm_set1_epi8(EMPTY as i8),
                _mm_andnot_si128(special, _mm_set1_epi8((DELETED & !EMPTY) as i8)),
            ))
        }
    }
}
