//! The untyped table engine.
//!
//! [`RawTable`] owns no memory. It keeps the control bytes and bookkeeping of
//! a swiss table over storage handed to it, addresses slots by index and
//! stride, and never constructs, drops or compares elements. Growth is
//! delegated to a resize callback passed to [`RawTable::insert`].

use core::ptr::NonNull;

use crate::control::DELETED;
use crate::control::EMPTY;
use crate::control::SENTINEL;
use crate::control::h1;
use crate::control::h2;
use crate::control::is_free;
use crate::control::is_full;
use crate::group::ControlGroup;
use crate::group::Group;
use crate::group::LaneSet;
use crate::group::WIDTH;
use crate::probe::ProbeSeq;

/// Control bytes of every zero-capacity table: the sentinel followed by
/// enough `EMPTY` lanes for one group load. Never written.
static EMPTY_GROUP: [u8; 16] = {
    let mut group = [EMPTY; 16];
    group[0] = SENTINEL;
    group
};

/// Length of the control array for `capacity` slots: the slot bytes, the
/// sentinel, then a `WIDTH`-byte mirror of the first group.
///
/// Only the first `WIDTH - 1` mirror bytes are ever loaded. The last one
/// absorbs the mirror write for slot `WIDTH - 1`.
#[inline(always)]
pub const fn ctrl_len(capacity: usize) -> usize {
    capacity + 1 + WIDTH
}

/// Number of elements a table of `capacity` slots may hold before its
/// resize callback runs.
///
/// The load factor is 7/8. Small tables keep two slots back so at least one
/// `EMPTY` lane always ends a lookup.
#[inline]
pub const fn max_load(capacity: usize) -> usize {
    if WIDTH <= 8 && capacity <= 8 {
        capacity.saturating_sub(2)
    } else {
        capacity - capacity / 8
    }
}

/// Smallest non-zero capacity: one group, less the sentinel.
pub const MIN_CAPACITY: usize = WIDTH - 1;

/// Smallest valid capacity whose [`max_load`] is at least `items`, or `None`
/// on overflow.
pub fn capacity_for(items: usize) -> Option<usize> {
    if items == 0 {
        return Some(0);
    }

    let mut capacity = MIN_CAPACITY;
    while max_load(capacity) < items {
        capacity = capacity.checked_mul(2)?.checked_add(1)?;
    }
    Some(capacity)
}

/// Fills a fresh control array: all `EMPTY`, with the sentinel at
/// `capacity`.
///
/// # Safety
///
/// `ctrl` must be valid for writes of [`ctrl_len(capacity)`](ctrl_len)
/// bytes, and `capacity + 1` must be a power of two no smaller than
/// [`WIDTH`].
pub unsafe fn init_ctrl(ctrl: NonNull<u8>, capacity: usize) {
    debug_assert!((capacity + 1).is_power_of_two() && capacity + 1 >= WIDTH);
    // SAFETY: Caller guarantees the array spans `ctrl_len(capacity)` bytes.
    unsafe {
        core::ptr::write_bytes(ctrl.as_ptr(), EMPTY, ctrl_len(capacity));
        ctrl.add(capacity).write(SENTINEL);
    }
}

/// Control bytes and bookkeeping of a swiss table over borrowed storage.
///
/// Between public operations:
///
/// - `ctrl[capacity]` is the only `SENTINEL` byte.
/// - `size + tombstones <= capacity`.
/// - `capacity` is zero, or `capacity + 1` is a power of two no smaller than
///   [`WIDTH`].
/// - the mirror bytes past the sentinel equal `ctrl[0..WIDTH - 1]`.
///
/// Every `Full(h2)` slot holds an element whose hash has low bits `h2`; the
/// owner of the storage upholds that, the engine only records it.
pub struct RawTable {
    slots: NonNull<u8>,
    ctrl: NonNull<u8>,
    stride: usize,
    capacity: usize,
    size: usize,
    free: usize,
}

// SAFETY: The engine only touches the storage through `&self`/`&mut self`;
// thread-safety of the elements is the owner's concern.
unsafe impl Send for RawTable {}
// SAFETY: As above; shared access only reads control bytes.
unsafe impl Sync for RawTable {}

impl core::fmt::Debug for RawTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use alloc::format;
        use alloc::string::String;
        use alloc::vec::Vec;

        f.debug_struct("RawTable")
            .field("capacity", &self.capacity)
            .field("size", &self.size)
            .field("free", &self.free)
            .field(
                "ctrl",
                &self
                    .ctrl_bytes()
                    .chunks(WIDTH)
                    .map(|group| {
                        group
                            .iter()
                            .map(|&b| match b {
                                EMPTY => String::from(".."),
                                DELETED => String::from("xx"),
                                SENTINEL => String::from("||"),
                                _ => format!("{b:02x}"),
                            })
                            .collect::<Vec<_>>()
                            .join(" ")
                    })
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl RawTable {
    /// A zero-capacity table. The first insert goes straight to the resize
    /// callback.
    pub fn new(stride: usize) -> Self {
        Self {
            slots: NonNull::dangling(),
            // Only ever read: every write path requires a non-zero capacity.
            ctrl: NonNull::from(&EMPTY_GROUP).cast(),
            stride,
            capacity: 0,
            size: 0,
            free: 0,
        }
    }

    /// Builds a table over existing storage.
    ///
    /// # Safety
    ///
    /// - `ctrl` must be valid for reads and writes of
    ///   [`ctrl_len(capacity)`](ctrl_len) bytes that satisfy the invariants
    ///   listed on [`RawTable`] (for instance after [`init_ctrl`]).
    /// - `slots` must be valid for `capacity * stride` bytes.
    /// - `size` must equal the number of `Full` bytes, and `size + free` must
    ///   leave at least one `EMPTY` slot when every free slot is claimed.
    /// - Both regions must stay valid until the table is dropped or replaced.
    pub unsafe fn from_raw_parts(
        slots: NonNull<u8>,
        ctrl: NonNull<u8>,
        stride: usize,
        capacity: usize,
        size: usize,
        free: usize,
    ) -> Self {
        debug_assert!((capacity + 1).is_power_of_two() && capacity + 1 >= WIDTH);
        debug_assert!(size + free <= capacity);
        Self {
            slots,
            ctrl,
            stride,
            capacity,
            size,
            free,
        }
    }

    /// Number of slots. Zero, or one less than a power of two.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of `Full` slots.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.size
    }

    /// `true` when no slot is `Full`.
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// `EMPTY` slots that inserts may still consume before the resize callback
    /// runs.
    #[inline(always)]
    pub fn free(&self) -> usize {
        self.free
    }

    /// Sets the remaining headroom. Used by resize strategies after
    /// rebuilding the control bytes.
    ///
    /// # Panics
    ///
    /// Panics if `size + free` exceeds the capacity.
    pub fn set_free(&mut self, free: usize) {
        assert!(self.size + free <= self.capacity);
        self.free = free;
    }

    /// Element size in bytes.
    #[inline(always)]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Base of the slot storage.
    #[inline(always)]
    pub fn slots(&self) -> NonNull<u8> {
        self.slots
    }

    /// Start of the control array.
    #[inline(always)]
    pub fn ctrl_ptr(&self) -> NonNull<u8> {
        self.ctrl
    }

    /// Address of slot `index`.
    ///
    /// # Safety
    ///
    /// `index` must be below the capacity.
    #[inline(always)]
    pub unsafe fn slot_ptr(&self, index: usize) -> NonNull<u8> {
        debug_assert!(index < self.capacity);
        // SAFETY: Caller guarantees `index < capacity`, so the offset stays
        // inside the slot storage.
        unsafe { self.slots.add(index * self.stride) }
    }

    /// The whole control array, mirror included.
    pub fn ctrl_bytes(&self) -> &[u8] {
        let len = if self.capacity == 0 {
            EMPTY_GROUP.len()
        } else {
            ctrl_len(self.capacity)
        };
        // SAFETY: The control array spans `len` initialized bytes.
        unsafe { core::slice::from_raw_parts(self.ctrl.as_ptr(), len) }
    }

    /// Control byte of slot `index`.
    #[inline(always)]
    pub fn ctrl(&self, index: usize) -> u8 {
        assert!(index <= self.capacity);
        // SAFETY: Checked above; `ctrl[capacity]` is the sentinel.
        unsafe { *self.ctrl.as_ptr().add(index) }
    }

    /// Number of `DELETED` slots.
    pub fn tombstones(&self) -> usize {
        self.ctrl_bytes()[..self.capacity]
            .iter()
            .filter(|&&b| b == DELETED)
            .count()
    }

    /// # Safety
    ///
    /// `offset` must be at most `capacity`.
    #[inline(always)]
    unsafe fn group_at(&self, offset: usize) -> Group {
        // SAFETY: The array extends `WIDTH` bytes past the sentinel, so any
        // offset up to `capacity` can load a full group.
        unsafe { Group::load(self.ctrl.as_ptr().add(offset)) }
    }

    /// Writes `byte` to slot `index` and to its mirror.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not a slot of a non-empty table.
    #[inline(always)]
    pub fn set_ctrl(&mut self, index: usize, byte: u8) {
        assert!(index < self.capacity);
        let mirror = (index.wrapping_sub(WIDTH) & self.capacity) + WIDTH;
        // SAFETY: `index < capacity` and `mirror <= capacity + WIDTH`, both inside
        // the control array of a non-zero capacity table.
        unsafe {
            *self.ctrl.as_ptr().add(index) = byte;
            *self.ctrl.as_ptr().add(mirror) = byte;
        }
    }

    /// First `EMPTY` or `DELETED` slot on the probe sequence of `hash`.
    ///
    /// A zero-capacity table answers slot 0, which is its sentinel.
    ///
    /// # Panics
    ///
    /// Panics if no slot is free, which the headroom kept by `free` rules out.
    #[inline]
    pub fn find_free_slot(&self, hash: u64) -> usize {
        let mut probe = ProbeSeq::new(h1(hash), self.capacity);
        for _ in 0..ProbeSeq::group_count(self.capacity) {
            // SAFETY: Probe offsets are masked by the capacity.
            let group = unsafe { self.group_at(probe.offset()) };
            if let Some(lane) = group.match_free().lowest_set_lane() {
                return probe.get_offset(lane);
            }
            probe.next();
        }
        panic!("no free slot in {self:?}")
    }

    /// Looks up `hash`, offering every slot whose control byte matches to
    /// `eq`. Stops at the first slot `eq` accepts, at a group holding an
    /// `EMPTY` lane, or once every group has been visited.
    #[inline]
    pub fn find(&self, hash: u64, mut eq: impl FnMut(usize) -> bool) -> Option<usize> {
        let tag = h2(hash);
        let mut probe = ProbeSeq::new(h1(hash), self.capacity);
        for _ in 0..ProbeSeq::group_count(self.capacity) {
            // SAFETY: Probe offsets are masked by the capacity.
            let group = unsafe { self.group_at(probe.offset()) };
            for lane in group.match_byte(tag) {
                let index = probe.get_offset(lane);
                if eq(index) {
                    return Some(index);
                }
            }
            if group.match_empty().any() {
                return None;
            }
            probe.next();
        }
        None
    }

    /// Claims a slot for an element with `hash` and marks it `Full`.
    ///
    /// When the table has no headroom and the probe would not reuse a
    /// tombstone, `resize` runs first and must leave room for one more
    /// element. If it fails, its error is returned and the table is exactly as
    /// before the call.
    ///
    /// The returned slot is uninitialized; the caller moves the element in.
    ///
    /// # Panics
    ///
    /// Panics if `resize` returns `Ok` without making room.
    #[inline]
    pub fn insert<E>(
        &mut self,
        hash: u64,
        resize: impl FnOnce(&mut Self, u64) -> Result<(), E>,
    ) -> Result<usize, E> {
        let index = self.prepare_insert(hash, resize)?;
        self.insert_at(index, hash);
        Ok(index)
    }

    /// The first half of [`insert`](Self::insert): finds the slot an element
    /// with `hash` will occupy, running `resize` if the table is full, but
    /// leaves every control byte as it is.
    ///
    /// Pass the result to [`insert_at`](Self::insert_at) before mutating the
    /// table in any other way.
    ///
    /// # Panics
    ///
    /// Panics if `resize` returns `Ok` without making room.
    #[inline]
    pub fn prepare_insert<E>(
        &mut self,
        hash: u64,
        resize: impl FnOnce(&mut Self, u64) -> Result<(), E>,
    ) -> Result<usize, E> {
        let index = self.find_free_slot(hash);
        if self.free > 0 || self.ctrl(index) == DELETED {
            return Ok(index);
        }

        resize(self, hash)?;
        let index = self.find_free_slot(hash);
        let previous = self.ctrl(index);
        assert!(
            previous == DELETED || (self.free > 0 && previous == EMPTY),
            "resize callback left no room: {self:?}"
        );
        Ok(index)
    }

    /// Marks the slot returned by [`prepare_insert`](Self::prepare_insert) as
    /// `Full(h2(hash))`.
    #[inline]
    pub fn insert_at(&mut self, index: usize, hash: u64) {
        let previous = self.ctrl(index);
        debug_assert!(is_free(previous), "slot {index} is not free: {self:?}");
        if previous == EMPTY {
            self.free -= 1;
        }
        self.size += 1;
        self.set_ctrl(index, h2(hash));
    }

    /// Drops every control byte back to `EMPTY` without touching the slots.
    /// The caller has already dropped or moved out every element.
    pub fn clear_no_drop(&mut self) {
        if self.capacity == 0 {
            return;
        }
        // SAFETY: A non-zero capacity table owns `ctrl_len(capacity)` bytes of
        // control array.
        unsafe { init_ctrl(self.ctrl, self.capacity) };
        self.size = 0;
        self.free = max_load(self.capacity);
    }

    /// Marks the `Full` slot `index` as vacated. The caller has already moved
    /// or dropped its element.
    ///
    /// The slot becomes `EMPTY` when no window of `WIDTH` bytes through it is
    /// free of `EMPTY` lanes, since then no probe can have passed over it;
    /// otherwise it becomes a `DELETED` tombstone.
    pub fn erase_slot(&mut self, index: usize) {
        debug_assert!(index < self.capacity && is_full(self.ctrl(index)));

        let before = index.wrapping_sub(WIDTH) & self.capacity;
        // SAFETY: Both offsets are at most `capacity`.
        let (empty_before, empty_after) = unsafe {
            (
                self.group_at(before).match_empty(),
                self.group_at(index).match_empty(),
            )
        };

        let byte = if empty_before.leading_lanes() + empty_after.trailing_lanes() >= WIDTH {
            DELETED
        } else {
            self.free += 1;
            EMPTY
        };
        self.set_ctrl(index, byte);
        self.size -= 1;
    }

    /// Rewrites every `Full` byte to `DELETED` and every other slot byte to
    /// `EMPTY`, then restores the sentinel and the mirror.
    ///
    /// Afterwards the `DELETED` slots are exactly those that held elements.
    /// `size` and `free` are left for the caller to fix up once the elements
    /// have been placed.
    pub fn convert_tomb_to_empty_and_full_to_tomb(&mut self) {
        if self.capacity == 0 {
            return;
        }

        let ctrl = self.ctrl.as_ptr();
        // SAFETY: `capacity + 1` is a multiple of `WIDTH`, so the groups tile
        // `ctrl[0..=capacity]` and the mirror copy stays inside the array.
        unsafe {
            for offset in (0..=self.capacity).step_by(WIDTH) {
                Group::load(ctrl.add(offset))
                    .convert_special_to_empty_and_full_to_tomb()
                    .store(ctrl.add(offset));
            }
            core::ptr::copy_nonoverlapping(ctrl, ctrl.add(self.capacity + 1), WIDTH);
            ctrl.add(self.capacity).write(SENTINEL);
        }
    }

    /// Iterates over the indices of `Full` slots in ascending order.
    pub fn iter(&self) -> RawIter<'_> {
        RawIter {
            table: self,
            index: 0,
        }
    }
}

/// Ascending iterator over `Full` slot indices of a [`RawTable`].
///
/// Free runs are skipped a group at a time; iteration ends at the sentinel.
#[derive(Clone)]
pub struct RawIter<'a> {
    table: &'a RawTable,
    index: usize,
}

impl<'a> RawIter<'a> {
    /// Starts iterating from slot `index`.
    pub fn starting_at(table: &'a RawTable, index: usize) -> Self {
        Self {
            table,
            index: index.min(table.capacity),
        }
    }
}

impl Iterator for RawIter<'_> {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        while self.index < self.table.capacity {
            // SAFETY: `index < capacity`.
            let skip = unsafe { self.table.group_at(self.index) }.count_leading_free_or_end();
            self.index += skip;
            if skip == WIDTH {
                continue;
            }
            if self.index >= self.table.capacity {
                // Stopped on the sentinel.
                break;
            }
            let index = self.index;
            self.index += 1;
            return Some(index);
        }
        self.index = self.table.capacity;
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.table.size))
    }
}

#[cfg(test)]
mod tests {
    use alloc::collections::BTreeSet;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::convert::Infallible;

    use rand::Rng;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    /// Control storage for an element-less table; slots are never touched.
    struct Storage {
        ctrl: Vec<u8>,
    }

    impl Storage {
        fn table(&mut self, capacity: usize) -> RawTable {
            self.ctrl = vec![0; ctrl_len(capacity)];
            let ctrl = NonNull::new(self.ctrl.as_mut_ptr()).unwrap();
            // SAFETY: The buffer holds `ctrl_len(capacity)` bytes and outlives the
            // table in every test; the stride is 0 so slots are never addressed.
            unsafe {
                init_ctrl(ctrl, capacity);
                RawTable::from_raw_parts(
                    NonNull::dangling(),
                    ctrl,
                    0,
                    capacity,
                    0,
                    max_load(capacity),
                )
            }
        }
    }

    fn no_resize(_: &mut RawTable, _: u64) -> Result<(), Infallible> {
        panic!("resize callback must not run")
    }

    fn assert_invariants(table: &RawTable) {
        let ctrl = table.ctrl_bytes();
        let capacity = table.capacity();
        assert!(capacity == 0 || (capacity + 1).is_power_of_two());
        assert_eq!(ctrl[capacity], SENTINEL, "{table:?}");
        assert_eq!(
            ctrl[..capacity].iter().filter(|&&b| b == SENTINEL).count(),
            0,
            "{table:?}"
        );
        if capacity > 0 {
            assert_eq!(
                &ctrl[capacity + 1..capacity + WIDTH],
                &ctrl[..WIDTH - 1],
                "mirror out of sync: {table:?}"
            );
        }
        let full = ctrl[..capacity].iter().filter(|&&b| is_full(b)).count();
        assert_eq!(full, table.len());
        assert!(table.len() + table.tombstones() <= capacity);
    }

    #[test]
    fn zero_capacity_routes_to_resize() {
        let mut table = RawTable::new(8);
        assert_eq!(table.capacity(), 0);
        assert_eq!(table.find(42, |_| true), None);
        assert_eq!(table.iter().count(), 0);
        assert_invariants(&table);

        let mut ran = false;
        let result: Result<usize, &str> = table.insert(42, |_, hash| {
            ran = true;
            assert_eq!(hash, 42);
            Err("out of memory")
        });
        assert!(ran);
        assert_eq!(result, Err("out of memory"));
        assert_eq!(table.len(), 0);
        assert_invariants(&table);
    }

    #[test]
    fn max_load_keeps_an_empty_lane() {
        let mut capacity = MIN_CAPACITY;
        while capacity < 1 << 20 {
            assert!(max_load(capacity) < capacity);
            assert!(max_load(capacity) > 0);
            capacity = capacity * 2 + 1;
        }
        assert_eq!(capacity_for(0), Some(0));
        assert_eq!(capacity_for(1), Some(MIN_CAPACITY));
        assert!(max_load(capacity_for(1000).unwrap()) >= 1000);
        assert_eq!(capacity_for(usize::MAX), None);
    }

    #[test]
    fn insert_until_full_then_resize() {
        let mut storage = Storage { ctrl: Vec::new() };
        let capacity = WIDTH * 4 - 1;
        let mut table = storage.table(capacity);
        let mut rng = SmallRng::seed_from_u64(7);

        let mut taken = BTreeSet::new();
        for _ in 0..max_load(capacity) {
            let hash: u64 = rng.random();
            let index = table.insert(hash, no_resize).unwrap();
            assert!(taken.insert(index), "slot {index} handed out twice");
            assert_eq!(table.ctrl(index), h2(hash));
            assert_invariants(&table);
        }
        assert_eq!(table.free(), 0);
        assert_eq!(table.len(), max_load(capacity));

        // Full: the next insert must consult the callback, and a failure leaves
        // every byte in place.
        let before = table.ctrl_bytes().to_vec();
        let result: Result<usize, ()> = table.insert(rng.random(), |_, _| Err(()));
        assert!(result.is_err());
        assert_eq!(table.ctrl_bytes(), &before[..]);
        assert_eq!(table.len(), max_load(capacity));
        assert_eq!(table.free(), 0);
    }

    #[test]
    #[should_panic(expected = "resize callback left no room")]
    fn resize_must_make_room() {
        let mut table = RawTable::new(0);
        let _ = table.insert(1, |_, _| Ok::<(), ()>(()));
    }

    #[test]
    fn tombstone_reuse_skips_resize() {
        let mut storage = Storage { ctrl: Vec::new() };
        let capacity = WIDTH * 2 - 1;
        let mut table = storage.table(capacity);

        // Every element shares h1 = 0, so the run of Full lanes starting at slot
        // 0 is longer than a group and the erase below must leave a tombstone.
        let mut indices = Vec::new();
        for i in 0..max_load(capacity) as u64 {
            indices.push(table.insert(i & 0x7F, no_resize).unwrap());
        }
        assert_eq!(table.free(), 0);

        let victim = indices[1];
        table.erase_slot(victim);
        assert_eq!(table.ctrl(victim), DELETED);
        assert_eq!(table.free(), 0);
        assert_invariants(&table);

        // The tombstone is claimed without a resize.
        let reused = table.insert(0x55, no_resize).unwrap();
        assert_eq!(reused, victim);
        assert_eq!(table.tombstones(), 0);
        assert_invariants(&table);
    }

    #[test]
    fn erase_isolated_slot_becomes_empty() {
        let mut storage = Storage { ctrl: Vec::new() };
        let capacity = WIDTH * 8 - 1;
        let mut table = storage.table(capacity);

        let hash = (3 * WIDTH as u64) << 7 | 0x11;
        let index = table.insert(hash, no_resize).unwrap();
        assert_eq!(index, 3 * WIDTH);
        let free = table.free();

        table.erase_slot(index);
        assert_eq!(table.ctrl(index), EMPTY);
        assert_eq!(table.free(), free + 1);
        assert_eq!(table.len(), 0);
        assert_invariants(&table);
    }

    #[test]
    fn lookup_survives_tombstones() {
        let mut storage = Storage { ctrl: Vec::new() };
        let capacity = WIDTH * 4 - 1;
        let mut table = storage.table(capacity);

        // One colliding chain much longer than a group, keyed by the slot's
        // position in `keys`.
        let hash_of = |key: u64| (5u64 << 7) | (key & 0x7F);
        let mut keys: Vec<Option<usize>> = Vec::new();
        for key in 0..(WIDTH as u64 * 3) {
            keys.push(Some(table.insert(hash_of(key), no_resize).unwrap()));
        }

        // Erase every third element; chains running through them must stay
        // intact.
        for key in (0..keys.len()).step_by(3) {
            let index = keys[key].take().unwrap();
            table.erase_slot(index);
            assert_ne!(table.ctrl(index), SENTINEL);
            assert!(is_free(table.ctrl(index)));
        }
        assert!(table.tombstones() > 0);
        assert_invariants(&table);

        let slot_to_key: Vec<(usize, u64)> = keys
            .iter()
            .enumerate()
            .filter_map(|(key, slot)| slot.map(|s| (s, key as u64)))
            .collect();
        for &(slot, key) in &slot_to_key {
            let found = table.find(hash_of(key), |candidate| {
                slot_to_key
                    .iter()
                    .any(|&(s, k)| s == candidate && k == key)
            });
            assert_eq!(found, Some(slot));
        }
    }

    #[test]
    fn interleaved_insert_erase_never_resizes() {
        let mut storage = Storage { ctrl: Vec::new() };
        let capacity = MIN_CAPACITY.max(15);
        let mut table = storage.table(capacity);
        let initial_free = table.free();

        for i in 0..16u64 {
            let key = (i * 128) % 256;
            let index = table.insert(key, no_resize).unwrap();
            assert_eq!(table.len(), 1);
            table.erase_slot(index);
            assert_eq!(table.len(), 0);
            assert_eq!(table.free(), initial_free);
            assert_eq!(table.tombstones(), 0);
            assert_invariants(&table);
        }
        assert_eq!(table.capacity(), capacity);
    }

    #[test]
    fn random_insert_erase_keeps_invariants() {
        let mut storage = Storage { ctrl: Vec::new() };
        let capacity = WIDTH * 16 - 1;
        let mut table = storage.table(capacity);
        let mut rng = SmallRng::seed_from_u64(0xC0FFEE);

        let mut live: Vec<usize> = Vec::new();
        let mut inserts = 0usize;
        let mut erases = 0usize;
        for _ in 0..5000 {
            let can_insert = table.free() > 0 || table.tombstones() > 0;
            if !live.is_empty() && (rng.random_bool(0.45) || !can_insert) {
                let victim = live.swap_remove(rng.random_range(0..live.len()));
                table.erase_slot(victim);
                erases += 1;
            } else if can_insert {
                let hash: u64 = rng.random();
                let free_slot = table.find_free_slot(hash);
                if table.free() == 0 && table.ctrl(free_slot) != DELETED {
                    continue;
                }
                let index = table.insert(hash, no_resize).unwrap();
                assert!(!live.contains(&index));
                live.push(index);
                inserts += 1;
            }
            assert_eq!(table.len(), inserts - erases);
        }
        assert_invariants(&table);

        let mut from_iter: Vec<usize> = table.iter().collect();
        from_iter.sort_unstable();
        live.sort_unstable();
        assert_eq!(from_iter, live);
    }

    #[test]
    fn convert_restores_single_sentinel() {
        let mut storage = Storage { ctrl: Vec::new() };
        let capacity = WIDTH * 2 - 1;
        let mut table = storage.table(capacity);
        let mut full = Vec::new();
        for i in 0..6u64 {
            full.push(table.insert(i * 0x1234_5678_9ABC, no_resize).unwrap());
        }
        let erased = full.pop().unwrap();
        table.erase_slot(erased);

        table.convert_tomb_to_empty_and_full_to_tomb();
        let ctrl = table.ctrl_bytes();
        assert_eq!(ctrl[capacity], SENTINEL);
        assert_eq!(ctrl.iter().filter(|&&b| b == SENTINEL).count(), 1);
        assert_eq!(&ctrl[capacity + 1..capacity + WIDTH], &ctrl[..WIDTH - 1]);
        for i in 0..capacity {
            let expected = if full.contains(&i) { DELETED } else { EMPTY };
            assert_eq!(ctrl[i], expected, "slot {i}");
        }
    }

    #[test]
    fn iteration_skips_free_runs() {
        let mut storage = Storage { ctrl: Vec::new() };
        let capacity = WIDTH * 8 - 1;
        let mut table = storage.table(capacity);

        let targets = [0, 1, WIDTH - 1, WIDTH, 3 * WIDTH + 2, capacity - 1];
        for &slot in &targets {
            table.set_ctrl(slot, 0x2A);
        }
        // Direct writes bypass the counters, so only the iterator is exercised.
        assert_eq!(table.iter().collect::<Vec<_>>(), targets);
        assert_eq!(
            RawIter::starting_at(&table, WIDTH).collect::<Vec<_>>(),
            &targets[3..]
        );

        table.set_ctrl(capacity - 1, DELETED);
        assert_eq!(table.iter().collect::<Vec<_>>(), &targets[..5]);
    }
}
