use core::alloc::Layout;
use core::fmt::Debug;
use core::marker::PhantomData;
use core::mem;
use core::ptr;
use core::ptr::NonNull;

use crate::control::DELETED;
use crate::control::EMPTY;
use crate::control::h1;
use crate::control::h2;
use crate::error::TryReserveError;
use crate::group::WIDTH;
use crate::probe::probe_index;
use crate::raw::MIN_CAPACITY;
use crate::raw::RawIter;
use crate::raw::RawTable;
use crate::raw::capacity_for;
use crate::raw::ctrl_len;
use crate::raw::init_ctrl;
use crate::raw::max_load;

#[cfg(test)]
std::thread_local! {
    /// Allocations of more slots than this fail with `AllocError` on the
    /// current thread.
    static SLOT_LIMIT: core::cell::Cell<usize> = const { core::cell::Cell::new(usize::MAX) };
}

/// One allocation per table: the slots at offset zero, then the control
/// array.
#[derive(Debug, Clone, Copy)]
struct DataLayout {
    layout: Layout,
    ctrl_offset: usize,
}

impl DataLayout {
    fn new<V>(capacity: usize) -> Result<Self, TryReserveError> {
        let slots_layout =
            Layout::array::<V>(capacity).map_err(|_| TryReserveError::CapacityOverflow)?;
        let ctrl_bytes = capacity
            .checked_add(1 + WIDTH)
            .ok_or(TryReserveError::CapacityOverflow)?;
        let ctrl_layout =
            Layout::array::<u8>(ctrl_bytes).map_err(|_| TryReserveError::CapacityOverflow)?;

        let (layout, ctrl_offset) = slots_layout
            .extend(ctrl_layout)
            .map_err(|_| TryReserveError::CapacityOverflow)?;

        Ok(DataLayout {
            layout,
            ctrl_offset,
        })
    }
}

/// Allocates and initializes storage for `capacity` slots of `V`.
fn allocate<V>(capacity: usize) -> Result<RawTable, TryReserveError> {
    debug_assert!(capacity >= MIN_CAPACITY);
    let layout = DataLayout::new::<V>(capacity)?;

    #[cfg(test)]
    if capacity > SLOT_LIMIT.with(core::cell::Cell::get) {
        return Err(TryReserveError::AllocError {
            layout: layout.layout,
        });
    }

    // SAFETY: The control array alone is at least `WIDTH` bytes, so the layout
    // is never zero-sized.
    let base = unsafe { alloc::alloc::alloc(layout.layout) };
    let base = NonNull::new(base).ok_or(TryReserveError::AllocError {
        layout: layout.layout,
    })?;

    // SAFETY: The allocation holds `capacity` slots at offset zero, aligned for
    // `V`, followed by `ctrl_len(capacity)` control bytes at `ctrl_offset`.
    unsafe {
        let ctrl = base.add(layout.ctrl_offset);
        init_ctrl(ctrl, capacity);
        Ok(RawTable::from_raw_parts(
            base,
            ctrl,
            mem::size_of::<V>(),
            capacity,
            0,
            max_load(capacity),
        ))
    }
}

/// Releases the storage behind `raw`. Elements are not dropped.
///
/// # Safety
///
/// `raw` must have been built by [`allocate::<V>`](allocate) (or be a
/// zero-capacity table), and must not be used afterwards.
unsafe fn deallocate<V>(raw: &RawTable) {
    if raw.capacity() == 0 {
        return;
    }
    // The layout was computed successfully when the storage was allocated.
    if let Ok(layout) = DataLayout::new::<V>(raw.capacity()) {
        // SAFETY: Caller guarantees `slots` is the base of this exact layout.
        unsafe { alloc::alloc::dealloc(raw.slots().as_ptr(), layout.layout) };
    }
}

/// The resize callback handed to [`RawTable::insert`]: grows the table, or
/// rehashes in place when it is mostly tombstones.
///
/// # Safety
///
/// Every `Full` slot of `raw` must hold an initialized `V` in storage from
/// [`allocate::<V>`](allocate), and `hasher` must be the hasher the elements
/// were inserted with.
#[cold]
#[inline(never)]
unsafe fn make_room<V>(
    raw: &mut RawTable,
    hasher: &impl Fn(&V) -> u64,
) -> Result<(), TryReserveError> {
    let capacity = raw.capacity();
    log::trace!(
        "table out of room: capacity {capacity}, {} elements",
        raw.len()
    );

    if capacity == 0 {
        // SAFETY: Forwarded from the caller.
        return unsafe { resize::<V>(raw, MIN_CAPACITY, hasher) };
    }

    if raw.len() <= max_load(capacity) / 2 {
        // SAFETY: Forwarded from the caller.
        unsafe { rehash_in_place::<V>(raw, hasher) };
        return Ok(());
    }

    let new_capacity = capacity
        .checked_mul(2)
        .and_then(|c| c.checked_add(1))
        .ok_or(TryReserveError::CapacityOverflow)?;
    // SAFETY: Forwarded from the caller.
    unsafe { resize::<V>(raw, new_capacity, hasher) }
}

/// Moves every element of `raw` into a fresh allocation of `capacity` slots
/// and frees the old storage.
///
/// The new storage is allocated before anything else happens, so an error
/// leaves `raw` untouched.
///
/// # Safety
///
/// Same as [`make_room`]; additionally `max_load(capacity) >= raw.len()`.
unsafe fn resize<V>(
    raw: &mut RawTable,
    capacity: usize,
    hasher: &impl Fn(&V) -> u64,
) -> Result<(), TryReserveError> {
    debug_assert!(max_load(capacity) >= raw.len());
    let mut new = allocate::<V>(capacity)?;
    log::debug!(
        "resizing table: {} -> {} slots, {} elements, {} tombstones dropped",
        raw.capacity(),
        capacity,
        raw.len(),
        max_load(raw.capacity()).saturating_sub(raw.len() + raw.free())
    );

    // Afterwards `DELETED` marks exactly the slots that hold elements.
    raw.convert_tomb_to_empty_and_full_to_tomb();
    for index in 0..raw.capacity() {
        if raw.ctrl(index) != DELETED {
            continue;
        }

        // SAFETY: The slot held a live element before the conversion. The new
        // table has room for all of them, so each target is a fresh `EMPTY`
        // slot.
        unsafe {
            let src = raw.slot_ptr(index).cast::<V>();
            let hash = hasher(src.as_ref());
            let target = new.find_free_slot(hash);
            new.insert_at(target, hash);
            ptr::copy_nonoverlapping(src.as_ptr(), new.slot_ptr(target).cast::<V>().as_ptr(), 1);
        }
    }
    debug_assert_eq!(new.len(), raw.len());

    // SAFETY: Every element was moved out; the old storage is not used again.
    unsafe { deallocate::<V>(raw) };
    *raw = new;
    Ok(())
}

/// Reclaims tombstones without allocating: every element is moved to the
/// earliest free slot of its probe sequence.
///
/// # Safety
///
/// Same as [`make_room`].
unsafe fn rehash_in_place<V>(raw: &mut RawTable, hasher: &impl Fn(&V) -> u64) {
    let capacity = raw.capacity();
    let free_before = raw.free();

    raw.convert_tomb_to_empty_and_full_to_tomb();
    let mut index = 0;
    while index < capacity {
        if raw.ctrl(index) != DELETED {
            index += 1;
            continue;
        }

        // SAFETY: `DELETED` marks a slot that still holds its element.
        let src = unsafe { raw.slot_ptr(index).cast::<V>() };
        // SAFETY: As above.
        let hash = hasher(unsafe { src.as_ref() });
        let target = raw.find_free_slot(hash);
        let home = h1(hash);

        if probe_index(index, home, capacity) == probe_index(target, home, capacity) {
            // Already in the first group a lookup would reach.
            raw.set_ctrl(index, h2(hash));
            index += 1;
            continue;
        }

        // SAFETY: `target` is a free slot in bounds, distinct from `index`.
        let dst = unsafe { raw.slot_ptr(target).cast::<V>() };
        if raw.ctrl(target) == EMPTY {
            raw.set_ctrl(target, h2(hash));
            // SAFETY: `target` was empty, so this moves the element out of
            // `index` and leaves no duplicate behind.
            unsafe { ptr::copy_nonoverlapping(src.as_ptr(), dst.as_ptr(), 1) };
            raw.set_ctrl(index, EMPTY);
            index += 1;
        } else {
            // `target` holds an element still waiting to be placed. Swap and
            // process `index` again.
            raw.set_ctrl(target, h2(hash));
            // SAFETY: Both slots hold initialized elements.
            unsafe { ptr::swap_nonoverlapping(src.as_ptr(), dst.as_ptr(), 1) };
        }
    }

    raw.set_free(max_load(capacity) - raw.len());
    log::debug!(
        "rehashed table in place: {capacity} slots, {} elements, free {} -> {}",
        raw.len(),
        free_before,
        raw.free()
    );
}

/// Debug statistics for hash table analysis.
///
/// Available in tests and with the `stats` feature.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of elements currently in the table
    pub populated: usize,
    /// Elements the table can hold before it must grow
    pub capacity: usize,
    /// Total number of slots allocated
    pub total_slots: usize,
    /// Number of `DELETED` slots
    pub tombstones: usize,
    /// Load factor (populated / total_slots)
    pub load_factor: f64,
    /// Fraction of slots that are either full or tombstones
    pub slot_utilization: f64,
    /// Total memory in bytes used by the table
    pub total_bytes: usize,
    /// Bytes of slot storage not holding an element
    pub wasted_bytes: usize,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hash Table Debug Statistics ===");
        println!(
            "Population: {}/{} slots ({:.2}% load factor, grows after {})",
            self.populated,
            self.total_slots,
            self.load_factor * 100.0,
            self.capacity
        );
        println!(
            "Slot Usage: {} tombstones ({:.2}% utilization)",
            self.tombstones,
            self.slot_utilization * 100.0
        );
        println!("Total Allocated: {} bytes", self.total_bytes);
        println!(
            "Memory: {} bytes wasted ({:.02}%)",
            self.wasted_bytes,
            if self.total_bytes == 0 {
                0.0
            } else {
                (self.wasted_bytes as f64 / self.total_bytes as f64) * 100.0
            }
        );
    }
}

/// How far elements sit from their home group.
///
/// `bins()[i]` counts the elements found in the `i`-th group of their probe
/// sequence. Available in tests and with the `stats` feature.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeHistogram {
    bins: alloc::vec::Vec<usize>,
}

#[cfg(any(test, feature = "stats"))]
impl ProbeHistogram {
    /// Element counts per probe distance, in groups.
    pub fn bins(&self) -> &[usize] {
        &self.bins
    }

    /// Total number of elements counted.
    pub fn total(&self) -> usize {
        self.bins.iter().sum()
    }

    /// Pretty-prints the histogram horizontally using stdout.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        let max = self.bins.iter().copied().max().unwrap_or(0);
        if max == 0 {
            println!("probe histogram: empty");
            return;
        }

        let max_bar = 60usize;
        let total_units = max_bar * 8;
        println!("probe histogram ({} entries):", self.total());

        let make_bar = |count: usize| -> alloc::string::String {
            if count == 0 {
                return alloc::string::String::new();
            }
            let units = ((count as u128 * total_units as u128).div_ceil(max as u128)) as usize;
            let mut bar = "█".repeat(units / 8);
            let partial = match units % 8 {
                1 => Some('▏'),
                2 => Some('▎'),
                3 => Some('▍'),
                4 => Some('▌'),
                5 => Some('▋'),
                6 => Some('▊'),
                7 => Some('▉'),
                _ => None,
            };
            bar.extend(partial);
            bar
        };

        for (i, &count) in self.bins.iter().enumerate() {
            println!("{:>3} | {} ({})", i, make_bar(count), count);
        }
    }
}

/// An open-addressing hash table with SIMD-probed control bytes.
///
/// `HashTable<V>` stores values of type `V` without storing their hashes.
/// Every operation takes the hash value and an equality predicate, and every
/// operation that may move elements also takes the `hasher` used to compute
/// those hashes.
///
/// ## Performance Characteristics
///
/// - **Memory**: 1 byte of control per slot, plus the size of `V`. Slots stay
///   at most 7/8 full.
/// - **Lookup**: one group of 8 or 16 control bytes is compared per probe
///   step.
///
/// ## Example
///
/// ```rust
/// # use std::hash::BuildHasher;
/// # use std::hash::RandomState;
/// use swiss_table::hash_table::Entry;
/// use swiss_table::hash_table::HashTable;
///
/// struct Account {
///     id: u64,
///     balance: i64,
/// }
///
/// let state = RandomState::new();
/// let hash_id = |id: u64| state.hash_one(id);
///
/// let mut accounts: HashTable<Account> = HashTable::with_capacity(100);
/// for (id, deposit) in [(7, 100), (9, 5), (7, 20)] {
///     match accounts.entry(hash_id(id), |a| a.id == id, |a| hash_id(a.id)) {
///         Entry::Vacant(entry) => {
///             entry.insert(Account { id, balance: deposit });
///         }
///         Entry::Occupied(mut entry) => entry.get_mut().balance += deposit,
///     }
/// }
///
/// assert_eq!(accounts.len(), 2);
/// assert_eq!(accounts.find(hash_id(7), |a| a.id == 7).map(|a| a.balance), Some(120));
/// ```
pub struct HashTable<V> {
    raw: RawTable,
    _phantom: PhantomData<V>,
}

impl<V> Debug for HashTable<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HashTable")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("raw", &self.raw)
            .finish()
    }
}

impl<V> Clone for HashTable<V>
where
    V: Clone,
{
    fn clone(&self) -> Self {
        let capacity = self.raw.capacity();
        if capacity == 0 {
            return Self::new();
        }

        let raw = allocate::<V>(capacity).unwrap_or_else(|e| e.abort());
        let mut new_table = Self {
            raw,
            _phantom: PhantomData,
        };

        for index in self.raw.iter() {
            // SAFETY: `index` is full in `self`, and both tables have the same
            // capacity. The clone is written before its control byte is set,
            // so a panicking `clone` leaves `new_table` droppable.
            unsafe {
                let value = self.slot(index).clone();
                new_table.raw.slot_ptr(index).cast::<V>().write(value);
            }
            new_table.raw.set_ctrl(index, self.raw.ctrl(index));
        }

        // SAFETY: Both control arrays span `ctrl_len(capacity)` bytes; copying
        // brings over the tombstones, after which the counters match `self`.
        unsafe {
            ptr::copy_nonoverlapping(
                self.raw.ctrl_ptr().as_ptr(),
                new_table.raw.ctrl_ptr().as_ptr(),
                ctrl_len(capacity),
            );
            new_table.raw = RawTable::from_raw_parts(
                new_table.raw.slots(),
                new_table.raw.ctrl_ptr(),
                mem::size_of::<V>(),
                capacity,
                self.raw.len(),
                self.raw.free(),
            );
        }

        new_table
    }
}

impl<V> Drop for HashTable<V> {
    fn drop(&mut self) {
        if mem::needs_drop::<V>() {
            for index in self.raw.iter() {
                // SAFETY: Full slots hold initialized values.
                unsafe { self.raw.slot_ptr(index).cast::<V>().drop_in_place() };
            }
        }

        // SAFETY: The storage came from `allocate::<V>` and is not used again.
        unsafe { deallocate::<V>(&self.raw) };
    }
}

impl<V> Default for HashTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> HashTable<V> {
    /// Creates an empty table. Nothing is allocated until the first insert.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use swiss_table::hash_table::HashTable;
    /// #
    /// let table: HashTable<u64> = HashTable::new();
    /// assert_eq!(table.capacity(), 0);
    /// ```
    pub fn new() -> Self {
        Self {
            raw: RawTable::new(mem::size_of::<V>()),
            _phantom: PhantomData,
        }
    }

    /// Creates a new hash table with the specified capacity.
    ///
    /// The actual capacity may be larger than requested since the slot count
    /// is always one less than a power of two.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use swiss_table::hash_table::HashTable;
    /// #
    /// // Create a table that can hold at least 100 items without resizing
    /// let table: HashTable<String> = HashTable::with_capacity(100);
    /// assert!(table.capacity() >= 100);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        Self::try_with_capacity(capacity).unwrap_or_else(|e| e.abort())
    }

    /// Fallible version of [`with_capacity`](Self::with_capacity).
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use swiss_table::TryReserveError;
    /// # use swiss_table::hash_table::HashTable;
    /// #
    /// assert!(HashTable::<u64>::try_with_capacity(16).is_ok());
    /// assert_eq!(
    ///     HashTable::<u64>::try_with_capacity(usize::MAX).unwrap_err(),
    ///     TryReserveError::CapacityOverflow
    /// );
    /// ```
    pub fn try_with_capacity(capacity: usize) -> Result<Self, TryReserveError> {
        let slots = capacity_for(capacity).ok_or(TryReserveError::CapacityOverflow)?;
        if slots == 0 {
            return Ok(Self::new());
        }

        Ok(Self {
            raw: allocate::<V>(slots)?,
            _phantom: PhantomData,
        })
    }

    /// # Safety
    ///
    /// `index` must be a full slot.
    #[inline(always)]
    unsafe fn slot(&self, index: usize) -> &V {
        // SAFETY: Caller guarantees the slot holds an initialized value.
        unsafe { self.raw.slot_ptr(index).cast::<V>().as_ref() }
    }

    /// # Safety
    ///
    /// `index` must be a full slot.
    #[inline(always)]
    unsafe fn slot_mut(&mut self, index: usize) -> &mut V {
        // SAFETY: Caller guarantees the slot holds an initialized value.
        unsafe { self.raw.slot_ptr(index).cast::<V>().as_mut() }
    }

    /// Moves the value out of `index` and erases the slot.
    ///
    /// # Safety
    ///
    /// `index` must be a full slot.
    #[inline(always)]
    unsafe fn take(&mut self, index: usize) -> V {
        // SAFETY: Caller guarantees the slot holds an initialized value; the
        // erase right after keeps it from being read twice.
        let value = unsafe { self.raw.slot_ptr(index).cast::<V>().read() };
        self.raw.erase_slot(index);
        value
    }

    /// The first full slot at or after `from`.
    #[inline(always)]
    fn next_full(&self, from: usize) -> Option<usize> {
        RawIter::starting_at(&self.raw, from).next()
    }

    #[inline(always)]
    fn find_index(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<usize> {
        self.raw.find(hash, |index| {
            // SAFETY: `find` only offers full slots.
            eq(unsafe { self.slot(index) })
        })
    }

    /// Returns an iterator over all values in the table.
    ///
    /// The iterator yields `&V` references in an arbitrary order.
    /// The iteration order is not specified and may change between versions.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use std::hash::BuildHasher;
    /// # use std::hash::RandomState;
    /// # use swiss_table::HashTable;
    /// #
    /// let state = RandomState::new();
    /// let hash_str = |s: &str| state.hash_one(s);
    /// let mut table = HashTable::with_capacity(10);
    /// for key in ["key1", "key2"] {
    ///     table
    ///         .entry(hash_str(key), |s: &String| s == key, |s: &String| hash_str(s.as_str()))
    ///         .or_insert(key.to_string());
    /// }
    ///
    /// for value in table.iter() {
    ///     println!("Value: {}", value);
    /// }
    /// assert_eq!(table.iter().len(), 2);
    /// ```
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            raw: &self.raw,
            inner: self.raw.iter(),
            remaining: self.raw.len(),
            _phantom: PhantomData,
        }
    }

    /// Returns an iterator over mutable references to all values.
    ///
    /// Mutating a value must not change its hash or equality.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use swiss_table::hash_table::HashTable;
    /// #
    /// # #[derive(Debug)]
    /// # struct Counter {
    /// #     id: u64,
    /// #     hits: u32,
    /// # }
    /// #
    /// let mut table = HashTable::new();
    /// for id in 0..4u64 {
    ///     table.insert_unique(id, Counter { id, hits: 0 }, |c: &Counter| c.id);
    /// }
    ///
    /// for counter in table.iter_mut() {
    ///     counter.hits += 1;
    /// }
    /// assert!(table.iter().all(|c| c.hits == 1));
    /// ```
    pub fn iter_mut(&mut self) -> IterMut<'_, V> {
        let raw: &RawTable = &self.raw;
        IterMut {
            raw,
            inner: raw.iter(),
            remaining: raw.len(),
            _phantom: PhantomData,
        }
    }

    /// Returns an iterator that removes and yields all values from the table.
    ///
    /// After calling `drain()`, the table will be empty, even if the iterator
    /// is dropped early. The iterator yields owned values in an arbitrary
    /// order and the allocation is kept.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use std::hash::BuildHasher;
    /// # use std::hash::RandomState;
    /// # use swiss_table::HashTable;
    /// #
    /// let state = RandomState::new();
    /// let hash_str = |s: &str| state.hash_one(s);
    /// let mut table = HashTable::with_capacity(10);
    /// table
    ///     .entry(hash_str("key1"), |s: &String| s == "key1", |s: &String| hash_str(s.as_str()))
    ///     .or_insert("key1".to_string());
    ///
    /// let values: Vec<String> = table.drain().collect();
    /// assert!(table.is_empty());
    /// assert_eq!(values.len(), 1);
    /// ```
    pub fn drain(&mut self) -> Drain<'_, V> {
        Drain {
            table: self,
            index: 0,
        }
    }

    /// Removes and yields every value for which `f` returns `true`.
    ///
    /// Values for which `f` returns `false` stay in the table. If the
    /// iterator is dropped early, the remaining values are kept.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use swiss_table::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// for n in 0..10u64 {
    ///     table.insert_unique(n, n, |&n: &u64| n);
    /// }
    ///
    /// let mut evens: Vec<u64> = table.extract_if(|n| *n % 2 == 0).collect();
    /// evens.sort();
    /// assert_eq!(evens, [0, 2, 4, 6, 8]);
    /// assert_eq!(table.len(), 5);
    /// ```
    pub fn extract_if<F>(&mut self, f: F) -> ExtractIf<'_, V, F>
    where
        F: FnMut(&mut V) -> bool,
    {
        ExtractIf {
            table: self,
            index: 0,
            pred: f,
        }
    }

    /// Keeps only the values for which `f` returns `true`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use swiss_table::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// for n in 0..10u64 {
    ///     table.insert_unique(n, n, |&n: &u64| n);
    /// }
    ///
    /// table.retain(|n| *n < 3);
    /// assert_eq!(table.len(), 3);
    /// assert_eq!(table.find(1, |&n| n == 1), Some(&1));
    /// assert_eq!(table.find(7, |&n| n == 7), None);
    /// ```
    pub fn retain(&mut self, mut f: impl FnMut(&mut V) -> bool) {
        self.extract_if(|v| !f(v)).for_each(drop);
    }

    /// Returns `true` if the table contains no elements.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use swiss_table::hash_table::HashTable;
    /// #
    /// let table: HashTable<i32> = HashTable::with_capacity(10);
    /// assert!(table.is_empty());
    /// ```
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Returns the number of elements in the table.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use std::hash::BuildHasher;
    /// # use std::hash::RandomState;
    /// # use swiss_table::HashTable;
    /// #
    /// let state = RandomState::new();
    /// let hash_u64 = |n: u64| state.hash_one(n);
    /// let mut table = HashTable::with_capacity(10);
    /// assert_eq!(table.len(), 0);
    ///
    /// table
    ///     .entry(hash_u64(1), |&n: &u64| n == 1, |&n: &u64| hash_u64(n))
    ///     .or_insert(1);
    /// assert_eq!(table.len(), 1);
    /// ```
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Removes all elements from the table.
    ///
    /// This operation preserves the table's allocated capacity and also
    /// clears every tombstone.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use swiss_table::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(10);
    /// table.insert_unique(1, 1u64, |&n: &u64| n);
    /// table.insert_unique(2, 2u64, |&n: &u64| n);
    /// let capacity = table.capacity();
    ///
    /// table.clear();
    /// assert!(table.is_empty());
    /// assert_eq!(table.capacity(), capacity);
    /// ```
    pub fn clear(&mut self) {
        if mem::needs_drop::<V>() {
            // Erases each slot before its value is dropped.
            drop(self.drain());
        } else {
            self.raw.clear_no_drop();
        }
    }

    /// Shrinks the capacity of the hash table as much as possible.
    ///
    /// If the table is empty, its storage is released and it returns to the
    /// zero-capacity state.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use swiss_table::HashTable;
    ///
    /// let mut table: HashTable<u64> = HashTable::with_capacity(1000);
    /// assert!(table.capacity() >= 1000);
    ///
    /// table.insert_unique(42, 5, |&v| v);
    /// table.insert_unique(123, 10, |&v| v);
    ///
    /// table.shrink_to_fit(|&v| v);
    /// assert!(table.capacity() < 1000);
    /// assert!(table.capacity() >= 2);
    /// ```
    pub fn shrink_to_fit(&mut self, hasher: impl Fn(&V) -> u64) {
        if self.raw.is_empty() {
            // SAFETY: No element is left; the storage is replaced right away.
            unsafe { deallocate::<V>(&self.raw) };
            self.raw = RawTable::new(mem::size_of::<V>());
            return;
        }

        let Some(capacity) = capacity_for(self.raw.len()) else {
            return;
        };
        if capacity < self.raw.capacity() {
            // SAFETY: The table's own elements, hashed with the caller's hasher.
            if let Err(e) = unsafe { resize::<V>(&mut self.raw, capacity, &hasher) } {
                e.abort();
            }
        }
    }

    /// Reserves capacity for at least `additional` more elements.
    ///
    /// After calling `reserve`, the next `additional` insertions will not
    /// resize the table. Does nothing if there is already room.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use swiss_table::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<u64> = HashTable::with_capacity(15);
    /// for i in 0..15 {
    ///     table.insert_unique(i, i, |&n| n);
    /// }
    /// let original_capacity = table.capacity();
    ///
    /// // Reserve space for 50 more elements
    /// table.reserve(50, |&n| n);
    /// assert!(table.capacity() >= table.len() + 50);
    /// assert!(table.capacity() > original_capacity);
    /// ```
    pub fn reserve(&mut self, additional: usize, hasher: impl Fn(&V) -> u64) {
        if let Err(e) = self.try_reserve(additional, hasher) {
            e.abort();
        }
    }

    /// Fallible version of [`reserve`](Self::reserve). On error the table is
    /// unchanged.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use swiss_table::TryReserveError;
    /// # use swiss_table::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<u64> = HashTable::new();
    /// table.insert_unique(7, 7, |&n| n);
    ///
    /// assert_eq!(
    ///     table.try_reserve(usize::MAX, |&n| n),
    ///     Err(TryReserveError::CapacityOverflow)
    /// );
    /// assert_eq!(table.find(7, |&n| n == 7), Some(&7));
    /// ```
    pub fn try_reserve(
        &mut self,
        additional: usize,
        hasher: impl Fn(&V) -> u64,
    ) -> Result<(), TryReserveError> {
        if additional <= self.raw.free() {
            return Ok(());
        }

        let required = self
            .raw
            .len()
            .checked_add(additional)
            .ok_or(TryReserveError::CapacityOverflow)?;
        let capacity = capacity_for(required)
            .ok_or(TryReserveError::CapacityOverflow)?
            .max(self.raw.capacity());

        // SAFETY: The table's own elements, hashed with the caller's hasher.
        unsafe { resize::<V>(&mut self.raw, capacity, &hasher) }
    }

    /// Removes and returns a value from the table.
    ///
    /// The value is identified by its hash and an equality predicate. If the
    /// value is found, it is removed from the table and returned.
    /// Otherwise, `None` is returned.
    ///
    /// # Arguments
    ///
    /// * `hash` - The hash value of the entry to remove
    /// * `eq` - A predicate function that returns `true` for the value to
    ///   remove
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use std::hash::BuildHasher;
    /// # use std::hash::RandomState;
    /// # use swiss_table::HashTable;
    /// #
    /// let state = RandomState::new();
    /// let hash_u64 = |n: u64| state.hash_one(n);
    /// let mut table = HashTable::with_capacity(10);
    /// table.insert_unique(hash_u64(42), 42, |&n: &u64| hash_u64(n));
    ///
    /// let removed = table.remove(hash_u64(42), |&n| n == 42);
    /// assert_eq!(removed, Some(42));
    /// assert!(table.is_empty());
    ///
    /// // Removing non-existent value returns None
    /// let not_found = table.remove(hash_u64(99), |&n| n == 99);
    /// assert_eq!(not_found, None);
    /// ```
    pub fn remove(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<V> {
        let index = self.find_index(hash, eq)?;
        // SAFETY: `find_index` returned a full slot.
        Some(unsafe { self.take(index) })
    }

    /// Inserts `value` without checking whether an equal value is present.
    ///
    /// Returns a mutable reference to the inserted value. The table grows
    /// through `hasher` when it is out of room.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use swiss_table::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// *table.insert_unique(3, 30u64, |&n| n / 10) += 1;
    /// assert_eq!(table.find(3, |&n| n == 31), Some(&31));
    /// ```
    pub fn insert_unique(&mut self, hash: u64, value: V, hasher: impl Fn(&V) -> u64) -> &mut V {
        let index = self
            .raw
            .insert(hash, |raw, _| {
                // SAFETY: `raw` is this table's storage and `hasher` hashes its
                // elements.
                unsafe { make_room::<V>(raw, &hasher) }
            })
            .unwrap_or_else(|e| e.abort());

        // SAFETY: `insert` returned a slot it just marked full; it holds no
        // value yet.
        unsafe {
            let slot = self.raw.slot_ptr(index).cast::<V>();
            slot.write(value);
            &mut *slot.as_ptr()
        }
    }

    /// Gets an entry for the given hash and equality predicate.
    ///
    /// If no value matches, a slot for the new value is reserved right away,
    /// growing the table through `hasher` if needed, so
    /// [`VacantEntry::insert`] cannot fail.
    ///
    /// # Arguments
    ///
    /// * `hash` - The hash value for the entry
    /// * `eq` - A predicate function that returns `true` for matching values
    /// * `hasher` - Recomputes the hash of any stored value
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use std::hash::BuildHasher;
    /// # use std::hash::RandomState;
    /// # use swiss_table::HashTable;
    /// #
    /// let state = RandomState::new();
    /// let hash_str = |s: &str| state.hash_one(s);
    /// let mut table = HashTable::with_capacity(10);
    /// let hash = hash_str("hello");
    ///
    /// // Insert or update pattern
    /// match table.entry(hash, |s: &String| s == "hello", |s: &String| hash_str(s.as_str())) {
    ///     swiss_table::hash_table::Entry::Vacant(entry) => {
    ///         entry.insert("hello".to_string());
    ///     }
    ///     swiss_table::hash_table::Entry::Occupied(mut entry) => {
    ///         *entry.get_mut() = "updated".to_string();
    ///     }
    /// }
    ///
    /// // Or use the convenience method
    /// table
    ///     .entry(hash, |s: &String| s == "hello", |s: &String| hash_str(s.as_str()))
    ///     .or_insert("hello".to_string());
    /// assert_eq!(table.len(), 1);
    /// ```
    #[inline]
    pub fn entry(
        &mut self,
        hash: u64,
        eq: impl Fn(&V) -> bool,
        hasher: impl Fn(&V) -> u64,
    ) -> Entry<'_, V> {
        self.try_entry(hash, eq, hasher).unwrap_or_else(|e| e.abort())
    }

    /// Fallible version of [`entry`](Self::entry): reports a failed grow
    /// instead of aborting. On error the table is unchanged.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use swiss_table::hash_table::Entry;
    /// # use swiss_table::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// match table.try_entry(5, |&n: &u64| n == 5, |&n: &u64| n) {
    ///     Ok(Entry::Vacant(entry)) => {
    ///         entry.insert(5);
    ///     }
    ///     Ok(Entry::Occupied(_)) => unreachable!(),
    ///     Err(e) => panic!("allocation failed: {e}"),
    /// }
    /// assert_eq!(table.len(), 1);
    /// ```
    pub fn try_entry(
        &mut self,
        hash: u64,
        eq: impl Fn(&V) -> bool,
        hasher: impl Fn(&V) -> u64,
    ) -> Result<Entry<'_, V>, TryReserveError> {
        if let Some(index) = self.find_index(hash, eq) {
            return Ok(Entry::Occupied(OccupiedEntry { table: self, index }));
        }

        let index = self.raw.prepare_insert(hash, |raw, _| {
            // SAFETY: `raw` is this table's storage and `hasher` hashes its
            // elements.
            unsafe { make_room::<V>(raw, &hasher) }
        })?;

        Ok(Entry::Vacant(VacantEntry {
            table: self,
            hash,
            index,
        }))
    }

    /// Finds a value in the table by hash and equality predicate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use std::hash::BuildHasher;
    /// # use std::hash::RandomState;
    /// # use swiss_table::HashTable;
    /// #
    /// let state = RandomState::new();
    /// let hash_str = |s: &str| state.hash_one(s);
    /// let mut table = HashTable::with_capacity(10);
    /// table.insert_unique(hash_str("key"), "key".to_string(), |s: &String| hash_str(s.as_str()));
    ///
    /// assert_eq!(
    ///     table.find(hash_str("key"), |s| s == "key"),
    ///     Some(&"key".to_string())
    /// );
    /// assert_eq!(table.find(hash_str("nope"), |s| s == "nope"), None);
    /// ```
    #[inline]
    pub fn find(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&V> {
        let index = self.find_index(hash, eq)?;
        // SAFETY: `find_index` returned a full slot.
        Some(unsafe { self.slot(index) })
    }

    /// Finds a value in the table by hash and equality predicate, returning a
    /// mutable reference.
    ///
    /// Mutating the value must not change its hash or equality.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use swiss_table::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// table.insert_unique(1, (1u64, 10u32), |&(k, _): &(u64, u32)| k);
    ///
    /// if let Some((_, v)) = table.find_mut(1, |&(k, _)| k == 1) {
    ///     *v += 5;
    /// }
    /// assert_eq!(table.find(1, |&(k, _)| k == 1), Some(&(1, 15)));
    /// ```
    #[inline]
    pub fn find_mut(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&mut V> {
        let index = self.find_index(hash, eq)?;
        // SAFETY: `find_index` returned a full slot.
        Some(unsafe { self.slot_mut(index) })
    }

    /// Returns the number of elements the table can hold before it must grow
    /// or rehash.
    ///
    /// Erased elements that left tombstones keep counting against this until
    /// the next rehash.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use swiss_table::hash_table::HashTable;
    /// #
    /// let table: HashTable<i32> = HashTable::with_capacity(100);
    /// assert!(table.capacity() >= 100);
    /// ```
    pub fn capacity(&self) -> usize {
        self.raw.len() + self.raw.free()
    }

    /// Computes how many groups past its home group each element sits.
    ///
    /// Available in tests and with the `stats` feature.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self, hasher: impl Fn(&V) -> u64) -> ProbeHistogram {
        let mut bins = alloc::vec::Vec::new();
        let capacity = self.raw.capacity();
        for index in self.raw.iter() {
            // SAFETY: `iter` yields full slots.
            let hash = hasher(unsafe { self.slot(index) });
            let distance = probe_index(index, h1(hash), capacity);
            if bins.len() <= distance {
                bins.resize(distance + 1, 0);
            }
            bins[distance] += 1;
        }
        ProbeHistogram { bins }
    }

    /// Returns detailed utilization statistics for debugging.
    ///
    /// Available in tests and with the `stats` feature.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        let total_slots = self.raw.capacity();
        let tombstones = self.raw.tombstones();
        let total_bytes = if total_slots == 0 {
            0
        } else {
            DataLayout::new::<V>(total_slots).map_or(0, |l| l.layout.size())
        };

        DebugStats {
            populated: self.len(),
            capacity: self.capacity(),
            total_slots,
            tombstones,
            load_factor: if total_slots == 0 {
                0.0
            } else {
                self.len() as f64 / total_slots as f64
            },
            slot_utilization: if total_slots == 0 {
                0.0
            } else {
                (self.len() + tombstones) as f64 / total_slots as f64
            },
            total_bytes,
            wasted_bytes: (total_slots - self.len()) * mem::size_of::<V>(),
        }
    }
}

impl<V> IntoIterator for HashTable<V> {
    type IntoIter = IntoIter<V>;
    type Item = V;

    fn into_iter(self) -> IntoIter<V> {
        IntoIter {
            table: self,
            index: 0,
        }
    }
}

impl<'a, V> IntoIterator for &'a HashTable<V> {
    type IntoIter = Iter<'a, V>;
    type Item = &'a V;

    fn into_iter(self) -> Iter<'a, V> {
        self.iter()
    }
}

impl<'a, V> IntoIterator for &'a mut HashTable<V> {
    type IntoIter = IterMut<'a, V>;
    type Item = &'a mut V;

    fn into_iter(self) -> IterMut<'a, V> {
        self.iter_mut()
    }
}

/// A view into a single entry in the hash table, which may be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashTable`].
///
/// [`entry`]: HashTable::entry
///
/// # Examples
///
/// ```rust
/// # use std::hash::BuildHasher;
/// # use std::hash::RandomState;
/// # use swiss_table::hash_table::Entry;
/// # use swiss_table::hash_table::HashTable;
/// #
/// let state = RandomState::new();
/// let hash_str = |s: &str| state.hash_one(s);
/// let mut table = HashTable::with_capacity(10);
/// let hash = hash_str("key");
///
/// match table.entry(hash, |s: &String| s == "key", |s: &String| hash_str(s.as_str())) {
///     Entry::Vacant(entry) => {
///         entry.insert("key".to_string());
///     }
///     Entry::Occupied(entry) => {
///         println!("Key already exists with value: {}", entry.get());
///     }
/// }
/// ```
pub enum Entry<'a, V> {
    /// A vacant entry - no value matched
    Vacant(VacantEntry<'a, V>),
    /// An occupied entry - a matching value is present
    Occupied(OccupiedEntry<'a, V>),
}

impl<'a, V> Entry<'a, V> {
    /// Inserts `default` if the entry is vacant and returns a mutable
    /// reference to the value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use swiss_table::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// table.entry(8, |&n: &u64| n == 8, |&n: &u64| n).or_insert(8);
    /// let value = table.entry(8, |&n: &u64| n == 8, |&n: &u64| n).or_insert(100);
    /// assert_eq!(*value, 8);
    /// ```
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts the result of `default` if the entry is vacant and returns a
    /// mutable reference to the value. `default` only runs when needed.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use swiss_table::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// let mut calls = 0;
    /// for _ in 0..3 {
    ///     table
    ///         .entry(1, |s: &String| s == "one", |_: &String| 1)
    ///         .or_insert_with(|| {
    ///             calls += 1;
    ///             "one".to_string()
    ///         });
    /// }
    /// assert_eq!(calls, 1);
    /// ```
    pub fn or_insert_with(self, default: impl FnOnce() -> V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Calls `f` on the value if the entry is occupied.
    ///
    /// Returns a mutable reference to the modified value, or `None` if the
    /// entry was vacant.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use swiss_table::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// table.insert_unique(2, (2u64, 0u32), |&(k, _): &(u64, u32)| k);
    ///
    /// let hit = table
    ///     .entry(2, |&(k, _)| k == 2, |&(k, _)| k)
    ///     .and_modify(|(_, v)| *v += 1);
    /// assert_eq!(hit, Some(&mut (2, 1)));
    ///
    /// let miss = table
    ///     .entry(3, |&(k, _)| k == 3, |&(k, _)| k)
    ///     .and_modify(|(_, v)| *v += 1);
    /// assert!(miss.is_none());
    /// ```
    pub fn and_modify(self, f: impl FnOnce(&mut V)) -> Option<&'a mut V> {
        match self {
            Entry::Occupied(entry) => {
                let value = entry.into_mut();
                f(value);
                Some(value)
            }
            Entry::Vacant(_) => None,
        }
    }

    /// Inserts `V::default()` if the entry is vacant and returns a mutable
    /// reference to the value.
    pub fn or_default(self) -> &'a mut V
    where
        V: Default,
    {
        self.or_insert_with(V::default)
    }
}

/// A view into a vacant entry in the hash table.
///
/// The slot for the new value was reserved when the entry was created.
///
/// This struct is created by the [`entry`] method on [`HashTable`] when no
/// value matched.
///
/// [`entry`]: HashTable::entry
pub struct VacantEntry<'a, V> {
    table: &'a mut HashTable<V>,
    hash: u64,
    index: usize,
}

impl<'a, V> VacantEntry<'a, V> {
    /// Inserts a value into the vacant entry and returns a mutable reference to
    /// it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use std::hash::BuildHasher;
    /// # use std::hash::RandomState;
    /// # use swiss_table::hash_table::Entry;
    /// # use swiss_table::hash_table::HashTable;
    /// #
    /// let state = RandomState::new();
    /// let hash_str = |s: &str| state.hash_one(s);
    /// let mut table = HashTable::with_capacity(10);
    /// let hash = hash_str("key");
    ///
    /// match table.entry(hash, |s: &String| s == "key", |s: &String| hash_str(s.as_str())) {
    ///     Entry::Vacant(entry) => {
    ///         let value_ref = entry.insert("key".to_string());
    ///         assert_eq!(value_ref, "key");
    ///     }
    ///     Entry::Occupied(_) => unreachable!("Entry should be vacant"),
    /// }
    /// ```
    pub fn insert(self, value: V) -> &'a mut V {
        self.table.raw.insert_at(self.index, self.hash);
        // SAFETY: The slot was reserved by `prepare_insert` and nothing has
        // touched the table since; it is now full but holds no value yet.
        unsafe {
            let slot = self.table.raw.slot_ptr(self.index).cast::<V>();
            slot.write(value);
            &mut *slot.as_ptr()
        }
    }

    /// The hash this entry was looked up with.
    pub fn hash(&self) -> u64 {
        self.hash
    }
}

/// A view into an occupied entry in the hash table.
///
/// This struct is created by the [`entry`] method on [`HashTable`] when the
/// requested value is present in the table.
///
/// [`entry`]: HashTable::entry
pub struct OccupiedEntry<'a, V> {
    table: &'a mut HashTable<V>,
    index: usize,
}

impl<'a, V> OccupiedEntry<'a, V> {
    /// Gets a reference to the value in the entry.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use swiss_table::hash_table::Entry;
    /// # use swiss_table::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// table.insert_unique(4, 4u64, |&n| n);
    ///
    /// match table.entry(4, |&n| n == 4, |&n| n) {
    ///     Entry::Occupied(entry) => assert_eq!(entry.get(), &4),
    ///     Entry::Vacant(_) => unreachable!(),
    /// }
    /// ```
    pub fn get(&self) -> &V {
        // SAFETY: The entry points at a full slot and holds the table borrow.
        unsafe { self.table.slot(self.index) }
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut V {
        // SAFETY: The entry points at a full slot and holds the table borrow.
        unsafe { self.table.slot_mut(self.index) }
    }

    /// Converts the entry into a mutable reference bound to the table's
    /// borrow.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use swiss_table::hash_table::Entry;
    /// # use swiss_table::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// table.insert_unique(9, (9u64, 1u8), |&(k, _): &(u64, u8)| k);
    ///
    /// let value = match table.entry(9, |&(k, _)| k == 9, |&(k, _)| k) {
    ///     Entry::Occupied(entry) => entry.into_mut(),
    ///     Entry::Vacant(_) => unreachable!(),
    /// };
    /// value.1 = 2;
    /// assert_eq!(table.find(9, |&(k, _)| k == 9), Some(&(9, 2)));
    /// ```
    pub fn into_mut(self) -> &'a mut V {
        // SAFETY: The entry points at a full slot and consumes the table
        // borrow.
        unsafe { self.table.slot_mut(self.index) }
    }

    /// Removes the value from the table and returns it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use swiss_table::hash_table::Entry;
    /// # use swiss_table::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// table.insert_unique(6, 6u64, |&n| n);
    ///
    /// if let Entry::Occupied(entry) = table.entry(6, |&n| n == 6, |&n| n) {
    ///     assert_eq!(entry.remove(), 6);
    /// }
    /// assert!(table.is_empty());
    /// ```
    pub fn remove(self) -> V {
        // SAFETY: The entry points at a full slot.
        unsafe { self.table.take(self.index) }
    }
}

/// An iterator over the values in a [`HashTable`].
///
/// This struct is created by the [`iter`] method on [`HashTable`].
///
/// [`iter`]: HashTable::iter
pub struct Iter<'a, V> {
    raw: &'a RawTable,
    inner: RawIter<'a>,
    remaining: usize,
    _phantom: PhantomData<&'a V>,
}

impl<V> Clone for Iter<'_, V> {
    fn clone(&self) -> Self {
        Self {
            raw: self.raw,
            inner: self.inner.clone(),
            remaining: self.remaining,
            _phantom: PhantomData,
        }
    }
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = &'a V;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let index = self.inner.next()?;
        self.remaining -= 1;
        // SAFETY: `RawIter` yields full slots of a table borrowed for `'a`.
        Some(unsafe { self.raw.slot_ptr(index).cast::<V>().as_ref() })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}

/// A mutable iterator over the values in a [`HashTable`].
///
/// This struct is created by the [`iter_mut`] method on [`HashTable`].
///
/// [`iter_mut`]: HashTable::iter_mut
pub struct IterMut<'a, V> {
    raw: &'a RawTable,
    inner: RawIter<'a>,
    remaining: usize,
    _phantom: PhantomData<&'a mut V>,
}

impl<'a, V> Iterator for IterMut<'a, V> {
    type Item = &'a mut V;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let index = self.inner.next()?;
        self.remaining -= 1;
        // SAFETY: The table is exclusively borrowed for `'a` and each full slot
        // is yielded once.
        Some(unsafe { self.raw.slot_ptr(index).cast::<V>().as_mut() })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for IterMut<'_, V> {}

/// A draining iterator over the values in a [`HashTable`].
///
/// This struct is created by the [`drain`] method on [`HashTable`].
/// It yields owned `V` values and empties the table as it iterates.
///
/// [`drain`]: HashTable::drain
///
/// # Examples
///
/// ```rust
/// # use swiss_table::hash_table::HashTable;
/// #
/// let mut table = HashTable::new();
/// table.insert_unique(1, "1".to_string(), |s: &String| s.len() as u64);
/// table.insert_unique(2, "22".to_string(), |s: &String| s.len() as u64);
///
/// let values: Vec<String> = table.drain().collect();
/// assert!(table.is_empty());
/// assert_eq!(values.len(), 2);
/// ```
pub struct Drain<'a, V> {
    table: &'a mut HashTable<V>,
    index: usize,
}

impl<V> Drop for Drain<'_, V> {
    fn drop(&mut self) {
        for _ in &mut *self {}
        self.table.raw.clear_no_drop();
    }
}

impl<V> Iterator for Drain<'_, V> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.table.next_full(self.index)?;
        self.index = index + 1;
        // SAFETY: `RawIter` yields full slots.
        Some(unsafe { self.table.take(index) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.table.len(), Some(self.table.len()))
    }
}

impl<V> ExactSizeIterator for Drain<'_, V> {}

/// An owning iterator over the values of a [`HashTable`].
pub struct IntoIter<V> {
    table: HashTable<V>,
    index: usize,
}

impl<V> Iterator for IntoIter<V> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.table.next_full(self.index)?;
        self.index = index + 1;
        // SAFETY: `RawIter` yields full slots.
        Some(unsafe { self.table.take(index) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.table.len(), Some(self.table.len()))
    }
}

impl<V> ExactSizeIterator for IntoIter<V> {}

/// A draining, filtering iterator over a [`HashTable`].
///
/// This struct is created by the [`extract_if`] method on [`HashTable`].
///
/// [`extract_if`]: HashTable::extract_if
pub struct ExtractIf<'a, V, F> {
    table: &'a mut HashTable<V>,
    index: usize,
    pred: F,
}

impl<V, F> Iterator for ExtractIf<'_, V, F>
where
    F: FnMut(&mut V) -> bool,
{
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(index) = self.table.next_full(self.index) {
            self.index = index + 1;
            // SAFETY: `RawIter` yields full slots.
            unsafe {
                if (self.pred)(self.table.slot_mut(index)) {
                    return Some(self.table.take(index));
                }
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.table.len()))
    }
}
