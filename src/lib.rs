#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod hash_table;

/// Default seeded hash functions matching the [`HashFn`] signature.
///
/// Built on `foldhash` with fixed seeds, so probe positions are stable
/// across runs. Gated behind the `foldhash` feature (on by default).
#[cfg(feature = "foldhash")]
pub mod hashers;

/// Prime selection for table sizing.
pub mod prime;

pub use hash_table::Config;
pub use hash_table::DeletionPolicy;
pub use hash_table::Error;
pub use hash_table::HashFn;
pub use hash_table::HashTable;
pub use hash_table::KeyBuf;
pub use hash_table::MAX_KEY_LEN;
pub use hash_table::ReleaseFn;
pub use hash_table::Slot;
pub use hash_table::Stats;
