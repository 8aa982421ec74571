//! Portable group backend: eight control bytes packed into a `u64`.

use super::BitMask;
use super::ControlGroup;

const LSB: u64 = 0x0101_0101_0101_0101;
const MSB: u64 = 0x8080_8080_8080_8080;

/// Eight control bytes in a little-endian machine word.
///
/// Every match sets bit 7 of the matching byte, so a [`BitMask`] over eight
/// lanes of eight bits each.
#[derive(Clone, Copy, Debug)]
pub struct GenericGroup(u64);

impl ControlGroup for GenericGroup {
    type Mask = BitMask<8, 8>;

    const WIDTH: usize = 8;

    #[inline(always)]
    unsafe fn load(ptr: *const u8) -> Self {
        // SAFETY: Caller guarantees `ptr` is readable for 8 bytes.
        Self(u64::from_le(unsafe { core::ptr::read_unaligned(ptr.cast::<u64>()) }))
    }

    #[inline(always)]
    unsafe fn store(self, ptr: *mut u8) {
        // SAFETY: Caller guarantees `ptr` is writable for 8 bytes.
        unsafe { core::ptr::write_unaligned(ptr.cast::<u64>(), self.0.to_le()) }
    }

    #[inline(always)]
    fn match_byte(self, byte: u8) -> Self::Mask {
        // Exact zero-byte detection: no false positives, unlike the cheaper
        // `(x - LSB) & !x & MSB` form.
        let z = self.0 ^ (LSB * (byte & 0x7F) as u64);
        let low = MSB - LSB;
        BitMask(!(((z & low).wrapping_add(low)) | low | z))
    }

    #[inline(always)]
    fn match_empty(self) -> Self::Mask {
        // High bit set, bit 1 clear.
        BitMask(self.0 & !(self.0 << 6) & MSB)
    }

    #[inline(always)]
    fn match_free(self) -> Self::Mask {
        // High bit set, bit 0 clear.
        BitMask(self.0 & !(self.0 << 7) & MSB)
    }

    #[inline(always)]
    fn count_leading_free_or_end(self) -> usize {
        // Bit 0 of each byte flags Full (high bit clear) or the Sentinel (bit 0 set).
        let stops = (self.0 | !(self.0 >> 7)) & LSB;
        (stops.trailing_zeros() / 8) as usize
    }

    #[inline(always)]
    fn convert_special_to_empty_and_full_to_tomb(self) -> Self {
        // special: 0x7F + 0x01 = 0x80, full: 0xFF + 0x00 = 0xFF, then clear bit 0.
        let special = self.0 & MSB;
        Self((!special).wrapping_add(special >> 7) & !LSB)
    }
}
