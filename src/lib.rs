#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;
#[cfg(all(test, not(feature = "std")))]
extern crate std;

pub mod control;
pub mod error;
pub mod group;
pub mod probe;
pub mod raw;

/// A typed swiss table addressed by caller-supplied hashes.
///
/// [`HashTable`] owns the element storage for a [`raw::RawTable`] and is the
/// building block for [`HashMap`] and [`HashSet`]. It stores no hasher, so
/// operations that may move elements take one as a closure.
pub mod hash_table;

/// A `HashMap` over [`HashTable`] with a configurable hasher builder.
pub mod hash_map;

/// A `HashSet` over [`HashTable`] with a configurable hasher builder.
pub mod hash_set;

pub use error::TryReserveError;
pub use hash_map::Entry;
pub use hash_map::HashMap;
pub use hash_set::HashSet;
pub use hash_table::HashTable;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// The hasher builder [`HashMap`] and [`HashSet`] use by default.
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// The hasher builder [`HashMap`] and [`HashSet`] use by default.
        pub type DefaultHashBuilder = std::hash::RandomState;
    } else {
        /// Stand-in default for builds without a hasher. It has no values, so
        /// maps and sets must be given a hasher with `with_hasher`.
        #[derive(Clone, Copy, Debug)]
        pub enum DefaultHashBuilder {}

        impl core::hash::BuildHasher for DefaultHashBuilder {
            type Hasher = Self;

            fn build_hasher(&self) -> Self {
                match *self {}
            }
        }

        impl core::hash::Hasher for DefaultHashBuilder {
            fn finish(&self) -> u64 {
                match *self {}
            }

            fn write(&mut self, _bytes: &[u8]) {
                match *self {}
            }
        }
    }
}
