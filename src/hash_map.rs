use core::borrow::Borrow;
use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::ops::Index;

use crate::DefaultHashBuilder;
use crate::TryReserveError;
use crate::hash_table::Entry as TableEntry;
use crate::hash_table::HashTable;

/// Hashes the key half of a stored pair.
fn make_hasher<K, V, S>(hash_builder: &S) -> impl Fn(&(K, V)) -> u64 + '_
where
    K: Hash,
    S: BuildHasher,
{
    move |(k, _)| hash_builder.hash_one(k)
}

/// Matches stored pairs whose key equals `key`.
fn equivalent_key<Q, K, V>(key: &Q) -> impl Fn(&(K, V)) -> bool + '_
where
    K: Borrow<Q>,
    Q: Eq + ?Sized,
{
    move |(k, _)| k.borrow() == key
}

/// A hash map implemented using the swiss [`HashTable`] as the underlying
/// storage.
///
/// `HashMap<K, V, S>` stores key-value pairs where keys implement `Hash + Eq`
/// and uses a configurable hasher builder `S` to hash keys. `S` defaults to
/// [`DefaultHashBuilder`].
///
/// # Performance Characteristics
///
/// - **Memory**: 1 control byte per slot plus the size of `(K, V)`; slots are
///   at most 7/8 full.
#[derive(Clone)]
pub struct HashMap<K, V, S = DefaultHashBuilder> {
    table: HashTable<(K, V)>,
    hash_builder: S,
}

impl<K, V, S> Debug for HashMap<K, V, S>
where
    K: Debug,
    V: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S> HashMap<K, V, S> {
    /// Creates an empty map that hashes keys with `hash_builder`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(feature = "std")]
    /// # {
    /// use std::hash::RandomState;
    ///
    /// use swiss_table::HashMap;
    ///
    /// let mut map = HashMap::with_hasher(RandomState::new());
    /// map.insert("a", 1);
    /// assert_eq!(map.len(), 1);
    /// # }
    /// ```
    pub fn with_hasher(hash_builder: S) -> Self {
        Self {
            table: HashTable::new(),
            hash_builder,
        }
    }

    /// Creates an empty map with room for at least `capacity` pairs that hashes
    /// keys with `hash_builder`.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self {
            table: HashTable::with_capacity(capacity),
            hash_builder,
        }
    }

    /// Returns a reference to the map's hasher builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// Returns the number of pairs in the map.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map contains no elements.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of elements the map can hold before it must grow.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Removes every pair, keeping the allocation.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Keeps only the pairs for which `f` returns `true`. Values may be
    /// updated in place on the way.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use swiss_table::HashMap;
    ///
    /// let mut map: HashMap<u32, u32> = (0..8).map(|i| (i, i)).collect();
    /// map.retain(|&k, v| {
    ///     *v *= 10;
    ///     k % 2 == 0
    /// });
    /// assert_eq!(map.len(), 4);
    /// assert_eq!(map[&6], 60);
    /// # }
    /// ```
    pub fn retain(&mut self, mut f: impl FnMut(&K, &mut V) -> bool) {
        self.table.retain(|(k, v)| f(k, v));
    }

    /// Visits every pair in arbitrary order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Returns an iterator over the pairs with mutable references to the
    /// values.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            inner: self.table.iter_mut(),
        }
    }

    /// Returns an iterator over the keys of the map.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    /// Returns an iterator over the values of the map.
    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    /// Returns an iterator over mutable references to the values of the map.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    /// Removes every pair and yields it. The map is empty once the iterator is
    /// dropped, even if it was not exhausted.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use swiss_table::HashMap;
    ///
    /// let mut map: HashMap<u32, char> = HashMap::new();
    /// map.insert(1, 'a');
    /// map.insert(2, 'b');
    ///
    /// let mut pairs: Vec<_> = map.drain().collect();
    /// pairs.sort();
    /// assert_eq!(pairs, [(1, 'a'), (2, 'b')]);
    /// assert!(map.is_empty());
    /// # }
    /// ```
    pub fn drain(&mut self) -> Drain<'_, K, V> {
        Drain {
            inner: self.table.drain(),
        }
    }
}

impl<K, V, S> HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Shrinks the storage to the smallest capacity that holds the current
    /// pairs, releasing it entirely when the map is empty.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use swiss_table::HashMap;
    ///
    /// let mut map: HashMap<u32, u32> = HashMap::with_capacity(100);
    /// map.insert(1, 1);
    /// map.insert(2, 4);
    /// map.shrink_to_fit();
    ///
    /// assert!(map.capacity() >= 2);
    /// assert!(map.capacity() < 100);
    /// # }
    /// ```
    pub fn shrink_to_fit(&mut self) {
        self.table.shrink_to_fit(make_hasher(&self.hash_builder));
    }

    /// Reserves capacity for at least `additional` more elements.
    pub fn reserve(&mut self, additional: usize) {
        self.table
            .reserve(additional, make_hasher(&self.hash_builder));
    }

    /// Tries to reserve room for at least `additional` more pairs. On error the
    /// map is unchanged.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use swiss_table::HashMap;
    ///
    /// use swiss_table::TryReserveError;
    ///
    /// let mut map: HashMap<u64, u64> = HashMap::new();
    /// assert!(map.try_reserve(10).is_ok());
    /// assert_eq!(map.try_reserve(usize::MAX), Err(TryReserveError::CapacityOverflow));
    /// # }
    /// ```
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
        self.table
            .try_reserve(additional, make_hasher(&self.hash_builder))
    }

    /// Inserts a pair. If the key was present its value is replaced and the old
    /// value returned; the stored key is kept.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use swiss_table::HashMap;
    ///
    /// let mut map: HashMap<u32, &str> = HashMap::new();
    /// assert_eq!(map.insert(37, "a"), None);
    /// assert_eq!(map.insert(37, "b"), Some("a"));
    /// assert_eq!(map[&37], "b");
    /// # }
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.try_insert(key, value).unwrap_or_else(|e| e.abort())
    }

    /// Fallible version of [`insert`](Self::insert): reports a failed grow
    /// instead of aborting. On error the map is unchanged and the pair is
    /// dropped.
    pub fn try_insert(&mut self, key: K, value: V) -> Result<Option<V>, TryReserveError> {
        let hash = self.hash_builder.hash_one(&key);
        let entry = self.table.try_entry(
            hash,
            equivalent_key(&key),
            make_hasher(&self.hash_builder),
        )?;
        match entry {
            TableEntry::Occupied(mut entry) => {
                Ok(Some(core::mem::replace(&mut entry.get_mut().1, value)))
            }
            TableEntry::Vacant(entry) => {
                entry.insert((key, value));
                Ok(None)
            }
        }
    }

    /// Returns the value stored under `key`.
    ///
    /// `key` may be any borrowed form of `K` whose `Hash` and `Eq` agree with
    /// `K`'s.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use swiss_table::HashMap;
    ///
    /// let mut map: HashMap<String, u32> = HashMap::new();
    /// map.insert("one".to_string(), 1);
    /// assert_eq!(map.get("one"), Some(&1));
    /// assert_eq!(map.get("two"), None);
    /// # }
    /// ```
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_key_value(key).map(|(_, v)| v)
    }

    /// Returns the stored key and its value.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_builder.hash_one(key);
        self.table
            .find(hash, equivalent_key(key))
            .map(|(k, v)| (k, v))
    }

    /// Returns a mutable reference to the value stored under `key`.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_builder.hash_one(key);
        self.table
            .find_mut(hash, equivalent_key(key))
            .map(|(_, v)| v)
    }

    /// Returns `true` if the map contains a value for the specified key.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_key_value(key).is_some()
    }

    /// Removes `key`, returning its value if it was present.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.remove_entry(key).map(|(_, v)| v)
    }

    /// Removes a key from the map, returning the stored key and value if the
    /// key was previously in the map.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let hash = self.hash_builder.hash_one(key);
        self.table.remove(hash, equivalent_key(key))
    }

    /// Gets the entry for `key` for in-place manipulation.
    ///
    /// A vacant entry already holds the slot its pair will go in, so the map may
    /// grow here rather than on insert.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use swiss_table::HashMap;
    ///
    /// let mut counts: HashMap<char, usize> = HashMap::new();
    /// for c in "swiss".chars() {
    ///     *counts.entry(c).or_insert(0) += 1;
    /// }
    /// assert_eq!(counts[&'s'], 3);
    /// assert_eq!(counts[&'w'], 1);
    /// # }
    /// ```
    pub fn entry(&mut self, key: K) -> Entry<'_, K, V> {
        let hash = self.hash_builder.hash_one(&key);
        match self.table.entry(
            hash,
            equivalent_key(&key),
            make_hasher(&self.hash_builder),
        ) {
            TableEntry::Occupied(entry) => Entry::Occupied(OccupiedEntry { entry }),
            TableEntry::Vacant(entry) => Entry::Vacant(VacantEntry { entry, key }),
        }
    }
}

impl<K, V, S> HashMap<K, V, S>
where
    S: Default,
{
    /// Creates an empty map with a default-constructed hasher builder.
    pub fn new() -> Self {
        Self::with_hasher(S::default())
    }

    /// Creates an empty map with room for at least `capacity` pairs and a
    /// default-constructed hasher builder.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, S::default())
    }
}

impl<K, V, S> Default for HashMap<K, V, S>
where
    S: Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> PartialEq for HashMap<K, V, S>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|o| v == o))
    }
}

impl<K, V, S> Eq for HashMap<K, V, S>
where
    K: Hash + Eq,
    V: Eq,
    S: BuildHasher,
{
}

impl<K, Q, V, S> Index<&Q> for HashMap<K, V, S>
where
    K: Hash + Eq + Borrow<Q>,
    Q: Hash + Eq + ?Sized,
    S: BuildHasher,
{
    type Output = V;

    /// # Panics
    ///
    /// Panics if the key is not present in the map.
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("key not found in HashMap")
    }
}

impl<K, V, S> Extend<(K, V)> for HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        // Duplicate keys are common enough that the lower bound is only a
        // hint for empty maps.
        let additional = if self.is_empty() {
            iter.size_hint().0
        } else {
            iter.size_hint().0.div_ceil(2)
        };
        self.reserve(additional);
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for HashMap<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<'a, K, V, S> IntoIterator for &'a HashMap<K, V, S> {
    type IntoIter = Iter<'a, K, V>;
    type Item = (&'a K, &'a V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S> IntoIterator for &'a mut HashMap<K, V, S> {
    type IntoIter = IterMut<'a, K, V>;
    type Item = (&'a K, &'a mut V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<K, V, S> IntoIterator for HashMap<K, V, S> {
    type IntoIter = IntoIter<K, V>;
    type Item = (K, V);

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.table.into_iter(),
        }
    }
}

/// A view into a single entry in the map, which may either be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashMap`].
///
/// [`entry`]: HashMap::entry
pub enum Entry<'a, K, V> {
    /// A vacant entry.
    Vacant(VacantEntry<'a, K, V>),
    /// An occupied entry.
    Occupied(OccupiedEntry<'a, K, V>),
}

impl<'a, K, V> Entry<'a, K, V> {
    /// Inserts a default value if the entry is vacant and returns a mutable
    /// reference.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts a value computed from a closure if the entry is vacant and
    /// returns a mutable reference.
    pub fn or_insert_with<F>(self, default: F) -> &'a mut V
    where
        F: FnOnce() -> V,
    {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Provides in-place mutable access to an occupied entry before any
    /// potential inserts.
    pub fn and_modify<F>(self, f: F) -> Self
    where
        F: FnOnce(&mut V),
    {
        match self {
            Entry::Occupied(mut entry) => {
                f(entry.get_mut());
                Entry::Occupied(entry)
            }
            Entry::Vacant(entry) => Entry::Vacant(entry),
        }
    }

    /// Returns a reference to this entry's key.
    pub fn key(&self) -> &K {
        match self {
            Entry::Occupied(entry) => entry.key(),
            Entry::Vacant(entry) => entry.key(),
        }
    }
}

impl<'a, K, V> Entry<'a, K, V>
where
    V: Default,
{
    /// Inserts the default value if the entry is vacant and returns a mutable
    /// reference.
    pub fn or_default(self) -> &'a mut V {
        self.or_insert_with(Default::default)
    }
}

/// A view into a vacant entry in the map.
pub struct VacantEntry<'a, K, V> {
    entry: crate::hash_table::VacantEntry<'a, (K, V)>,
    key: K,
}

impl<'a, K, V> VacantEntry<'a, K, V> {
    /// Gets a reference to the key that would be used when inserting a value.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Take ownership of the key.
    pub fn into_key(self) -> K {
        self.key
    }

    /// Inserts the value into the map and returns a mutable reference to it.
    pub fn insert(self, value: V) -> &'a mut V {
        &mut self.entry.insert((self.key, value)).1
    }
}

/// A view into an occupied entry in the map.
pub struct OccupiedEntry<'a, K, V> {
    entry: crate::hash_table::OccupiedEntry<'a, (K, V)>,
}

impl<'a, K, V> OccupiedEntry<'a, K, V> {
    /// Gets a reference to the key in the entry.
    pub fn key(&self) -> &K {
        &self.entry.get().0
    }

    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &V {
        &self.entry.get().1
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut V {
        &mut self.entry.get_mut().1
    }

    /// Converts the entry into a mutable reference to the value.
    pub fn into_mut(self) -> &'a mut V {
        &mut self.entry.into_mut().1
    }

    /// Inserts a value into the entry and returns the old value.
    pub fn insert(&mut self, value: V) -> V {
        core::mem::replace(&mut self.entry.get_mut().1, value)
    }

    /// Removes the entry from the map and returns the value.
    pub fn remove(self) -> V {
        self.entry.remove().1
    }

    /// Removes the entry from the map and returns the key and value.
    pub fn remove_entry(self) -> (K, V) {
        self.entry.remove()
    }
}

/// An iterator over the key-value pairs of a `HashMap`.
pub struct Iter<'a, K, V> {
    inner: crate::hash_table::Iter<'a, (K, V)>,
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

/// A mutable iterator over the key-value pairs of a `HashMap`.
pub struct IterMut<'a, K, V> {
    inner: crate::hash_table::IterMut<'a, (K, V)>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (&*k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}

/// An iterator over the keys of a `HashMap`.
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}

/// An iterator over the values of a `HashMap`.
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}

/// A mutable iterator over the values of a `HashMap`.
pub struct ValuesMut<'a, K, V> {
    inner: IterMut<'a, K, V>,
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for ValuesMut<'_, K, V> {}

/// A draining iterator over the key-value pairs of a `HashMap`.
pub struct Drain<'a, K, V> {
    inner: crate::hash_table::Drain<'a, (K, V)>,
}

impl<K, V> Iterator for Drain<'_, K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Drain<'_, K, V> {}

/// An owning iterator over the key-value pairs of a `HashMap`.
pub struct IntoIter<K, V> {
    inner: crate::hash_table::IntoIter<(K, V)>,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}

#[cfg(test)]
mod tests {
    use alloc::collections::BTreeMap;
    use alloc::format;
    use alloc::string::String;
    use alloc::string::ToString;
    use alloc::vec;
    use alloc::vec::Vec;

    use rand::Rng;
    use rand::SeedableRng;
    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use rand::rngs::SmallRng;
    use siphasher::sip::SipHasher;

    use super::*;

    #[derive(Clone)]
    struct SipHashBuilder {
        k1: u64,
        k2: u64,
    }

    impl BuildHasher for SipHashBuilder {
        type Hasher = SipHasher;

        fn build_hasher(&self) -> Self::Hasher {
            SipHasher::new_with_keys(self.k1, self.k2)
        }
    }

    impl Default for SipHashBuilder {
        fn default() -> Self {
            let mut rng = OsRng;
            Self {
                k1: rng.try_next_u64().unwrap_or(0),
                k2: rng.try_next_u64().unwrap_or(0),
            }
        }
    }

    type Map<K, V> = HashMap<K, V, SipHashBuilder>;

    fn sorted_pairs<K: Ord + Clone, V: Clone>(map: &Map<K, V>) -> Vec<(K, V)> {
        let mut pairs: Vec<(K, V)> = map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        pairs
    }

    #[test]
    fn construction() {
        let map: Map<u32, String> = HashMap::new();
        assert!(map.is_empty());
        assert_eq!(map.capacity(), 0);

        let map: Map<u32, String> = HashMap::with_capacity(100);
        assert!(map.capacity() >= 100);
        assert_eq!(map.len(), 0);

        let map = HashMap::<u32, u32, _>::with_capacity_and_hasher(0, SipHashBuilder::default());
        assert_eq!(map.capacity(), 0);

        let map: Map<u32, u32> = Default::default();
        assert!(map.is_empty());
    }

    #[test]
    #[cfg(any(feature = "foldhash", feature = "std"))]
    fn default_hasher_map() {
        let mut map: HashMap<u32, u32> = HashMap::new();
        for i in 0..64 {
            map.insert(i, i + 1);
        }
        assert_eq!(map.len(), 64);
        assert_eq!(map.get(&63), Some(&64));
    }

    #[test]
    fn insert_replaces_value_and_keeps_key() {
        #[derive(Debug, Clone)]
        struct Tagged(u32, &'static str);

        impl PartialEq for Tagged {
            fn eq(&self, other: &Self) -> bool {
                self.0 == other.0
            }
        }
        impl Eq for Tagged {}
        impl core::hash::Hash for Tagged {
            fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
                self.0.hash(state);
            }
        }

        let mut map = Map::default();
        assert_eq!(map.insert(Tagged(1, "first"), 'a'), None);
        assert_eq!(map.insert(Tagged(1, "second"), 'b'), Some('a'));
        assert_eq!(map.len(), 1);

        let (key, value) = map.get_key_value(&Tagged(1, "probe")).unwrap();
        assert_eq!(key.1, "first");
        assert_eq!(*value, 'b');
    }

    #[test]
    fn try_insert_reports_previous() {
        let mut map = Map::default();
        assert_eq!(map.try_insert(1, 'a'), Ok(None));
        assert_eq!(map.try_insert(1, 'b'), Ok(Some('a')));
        assert_eq!(map.get(&1), Some(&'b'));
    }

    #[test]
    fn lookups_and_mutation() {
        let mut map = Map::default();
        map.insert(7, vec![1]);

        assert!(map.contains_key(&7));
        assert!(!map.contains_key(&8));
        assert_eq!(map.get(&8), None);
        assert_eq!(map.get_mut(&8), None);

        map.get_mut(&7).unwrap().push(2);
        assert_eq!(map[&7], [1, 2]);
    }

    #[test]
    fn remove_and_remove_entry() {
        let mut map: Map<u32, String> = (0..4).map(|i| (i, i.to_string())).collect();

        assert_eq!(map.remove(&1), Some("1".to_string()));
        assert_eq!(map.remove(&1), None);
        assert_eq!(map.remove_entry(&2), Some((2, "2".to_string())));
        assert_eq!(map.remove_entry(&9), None);
        assert_eq!(sorted_pairs(&map), [(0, "0".to_string()), (3, "3".to_string())]);
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut map: Map<u32, String> = (0..20).map(|i| (i, format!("v{i}"))).collect();
        let capacity = map.capacity();

        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.capacity(), capacity);
        assert_eq!(map.get(&3), None);

        map.insert(3, "again".to_string());
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn reserve_and_shrink() {
        let mut map: Map<u32, u32> = HashMap::new();
        map.reserve(1000);
        assert!(map.capacity() >= 1000);

        map.extend((0..10).map(|i| (i, i)));
        map.shrink_to_fit();
        assert!(map.capacity() >= 10);
        assert!(map.capacity() < 1000);
        assert_eq!(map.len(), 10);

        assert_eq!(
            map.try_reserve(usize::MAX),
            Err(TryReserveError::CapacityOverflow)
        );
        assert_eq!(map.len(), 10);
    }

    #[test]
    fn entry_helpers() {
        let mut map: Map<&str, u32> = HashMap::new();

        *map.entry("a").or_insert(0) += 1;
        *map.entry("a").or_insert(0) += 1;
        map.entry("b").or_insert_with(|| 10);
        map.entry("b").and_modify(|v| *v *= 2).or_insert(0);
        map.entry("c").and_modify(|v| *v *= 2).or_insert(5);
        *map.entry("d").or_default() += 7;

        assert_eq!(map.entry("zzz").key(), &"zzz");
        assert_eq!(
            sorted_pairs(&map),
            [("a", 2), ("b", 20), ("c", 5), ("d", 7)]
        );
    }

    #[test]
    fn occupied_entry_operations() {
        let mut map = Map::default();
        map.insert(1, "hello".to_string());

        let Entry::Occupied(mut entry) = map.entry(1) else {
            panic!("expected an occupied entry");
        };
        assert_eq!(entry.key(), &1);
        entry.get_mut().push_str(" world");
        assert_eq!(entry.insert("new".to_string()), "hello world");
        assert_eq!(entry.remove_entry(), (1, "new".to_string()));
        assert!(map.is_empty());

        map.insert(2, "two".to_string());
        let Entry::Occupied(entry) = map.entry(2) else {
            panic!("expected an occupied entry");
        };
        entry.into_mut().push('!');
        assert_eq!(map[&2], "two!");
    }

    #[test]
    fn vacant_entry_operations() {
        let mut map: Map<String, u32> = HashMap::new();

        let Entry::Vacant(entry) = map.entry("k".to_string()) else {
            panic!("expected a vacant entry");
        };
        assert_eq!(entry.key(), "k");
        assert_eq!(entry.into_key(), "k");
        assert!(map.is_empty());

        let Entry::Vacant(entry) = map.entry("k".to_string()) else {
            panic!("expected a vacant entry");
        };
        *entry.insert(1) += 1;
        assert_eq!(map.get("k"), Some(&2));
    }

    #[test]
    fn iterators_agree() {
        let mut map: Map<u32, u32> = (0..50).map(|i| (i, i * i)).collect();

        assert_eq!(map.iter().len(), 50);
        assert_eq!(map.keys().copied().sum::<u32>(), (0..50).sum());
        assert_eq!(map.values().copied().sum::<u32>(), (0..50).map(|i| i * i).sum());

        for v in map.values_mut() {
            *v += 1;
        }
        for (k, v) in &mut map {
            *v -= k * k;
        }
        assert!(map.values().all(|&v| v == 1));

        let visited: usize = (&map).into_iter().count();
        assert_eq!(visited, 50);
    }

    #[test]
    fn drain_and_into_iter() {
        let mut map: Map<u32, char> = [(1, 'a'), (2, 'b'), (3, 'c')].into_iter().collect();

        let drained: BTreeMap<u32, char> = map.drain().collect();
        assert_eq!(drained, BTreeMap::from([(1, 'a'), (2, 'b'), (3, 'c')]));
        assert!(map.is_empty());

        map.extend([(4, 'd'), (5, 'e')]);
        let mut owned: Vec<(u32, char)> = map.into_iter().collect();
        owned.sort();
        assert_eq!(owned, [(4, 'd'), (5, 'e')]);
    }

    #[test]
    fn retain_updates_and_filters() {
        let mut map: Map<u32, u32> = (0..100).map(|i| (i, i)).collect();

        map.retain(|&k, v| {
            *v *= 2;
            k % 10 == 0
        });

        assert_eq!(map.len(), 10);
        for i in 0..100 {
            assert_eq!(map.get(&i).copied(), (i % 10 == 0).then_some(i * 2));
        }
    }

    #[test]
    fn matches_btreemap_under_random_operations() {
        let mut rng = SmallRng::seed_from_u64(0xB7EE);
        let mut map = Map::default();
        let mut reference = BTreeMap::new();

        for _ in 0..20_000 {
            let key: u16 = rng.random_range(0..512);
            match rng.random_range(0..4) {
                0 | 1 => {
                    let value: u32 = rng.random();
                    assert_eq!(map.insert(key, value), reference.insert(key, value));
                }
                2 => assert_eq!(map.remove(&key), reference.remove(&key)),
                _ => assert_eq!(map.get(&key), reference.get(&key)),
            }
            assert_eq!(map.len(), reference.len());
        }

        let pairs: BTreeMap<u16, u32> = map.iter().map(|(k, v)| (*k, *v)).collect();
        assert_eq!(pairs, reference);
    }

    #[test]
    fn string_keys_borrow_as_str() {
        let mut map = Map::default();
        for word in ["hello", "world", "rust"] {
            map.insert(word.to_string(), word.len());
        }

        assert_eq!(map.get("hello"), Some(&5));
        assert_eq!(map["rust"], 4);
        assert_eq!(map.get("missing"), None);
        assert_eq!(map.remove("world"), Some(5));
        assert!(!map.contains_key("world"));
    }

    #[test]
    fn eq_clone_and_debug() {
        let map: Map<i32, i32> = (0..50).map(|i| (i, -i)).collect();

        let mut other: Map<i32, i32> = HashMap::new();
        other.extend((25..50).map(|i| (i, -i)));
        assert_ne!(map, other);
        other.extend((0..25).map(|i| (i, -i)));
        assert_eq!(map, other);
        other.insert(0, 1);
        assert_ne!(map, other);

        let cloned = map.clone();
        assert_eq!(cloned, map);

        let single: Map<&str, Vec<u8>> = [("k", vec![1, 2])].into_iter().collect();
        assert_eq!(format!("{single:?}"), "{\"k\": [1, 2]}");
    }

    #[test]
    #[should_panic(expected = "key not found")]
    fn index_missing_key_panics() {
        let map: Map<u32, u32> = HashMap::new();
        let _ = map[&1];
    }
}
