use alloc::boxed::Box;
use alloc::string::String;
use core::cell::Cell;
use core::fmt;
use core::fmt::Debug;
use core::mem;

use crate::prime;

/// Maximum key length in bytes.
///
/// Keys are stored inline in their slot so that a slot is a flat,
/// pointer-free unit; anything longer is rejected as [`Error::InvalidKey`]
/// rather than silently truncated, which would let two distinct keys collapse
/// into one stored entry.
pub const MAX_KEY_LEN: usize = 31;

/// A pluggable hash function.
///
/// Called as `hash(key, table_size)` and expected to return an index in
/// `[0, table_size)`. Out-of-range results are wrapped with a modulo rather
/// than trusted. The same signature serves the secondary (stride) function,
/// which is called with `table_size - 1` and whose result is incremented by
/// one so a stride is never zero.
pub type HashFn = fn(&str, usize) -> usize;

/// Release hook for stored values.
///
/// Invoked synchronously whenever the table discards a value: on removal, on
/// overwrite of an existing key, on [`HashTable::clear`], and on drop. Values
/// in tables without a hook are simply dropped.
pub type ReleaseFn<V> = fn(V);

/// Errors reported by table operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The key was empty or longer than [`MAX_KEY_LEN`].
    InvalidKey,
    /// No occupied slot matched the key.
    NotFound,
    /// The probe sequence completed a full cycle without finding a free
    /// slot. Unreachable while growth is configured sanely, but reported
    /// rather than ignored.
    OutOfMemory,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::InvalidKey => "key is empty or exceeds the maximum key length",
            Error::NotFound => "key not in table",
            Error::OutOfMemory => "probe sequence cycled without finding a free slot",
        };
        f.write_str(msg)
    }
}

impl core::error::Error for Error {}

/// How removal treats the vacated slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionPolicy {
    /// Clear the slot and immediately compact the cluster behind it, so
    /// probe sequences never cross removal-made gaps.
    Pack,
    /// Leave a tombstone. Cheap removal; tombstones keep counting toward
    /// probe-sequence length until an insert reuses them.
    Mark,
}

/// A key stored inline in its slot.
///
/// Holds up to [`MAX_KEY_LEN`] bytes of UTF-8 plus a length; unused bytes
/// stay zeroed.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct KeyBuf {
    len: u8,
    bytes: [u8; MAX_KEY_LEN],
}

impl KeyBuf {
    fn new(key: &str) -> Self {
        debug_assert!(!key.is_empty() && key.len() <= MAX_KEY_LEN);
        let mut bytes = [0u8; MAX_KEY_LEN];
        bytes[..key.len()].copy_from_slice(key.as_bytes());
        KeyBuf {
            len: key.len() as u8,
            bytes,
        }
    }

    /// Borrows the stored key.
    pub fn as_str(&self) -> &str {
        // SAFETY: `bytes[..len]` is always a whole `&str` copied verbatim in
        // `KeyBuf::new`, so it is valid UTF-8.
        unsafe { core::str::from_utf8_unchecked(&self.bytes[..self.len as usize]) }
    }
}

impl Debug for KeyBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Debug::fmt(self.as_str(), f)
    }
}

/// One element of the slot array.
///
/// Exposed read-only through [`HashTable::slots`] for diagnostics and tests.
#[derive(Clone, Debug)]
pub enum Slot<V> {
    /// Free slot. Terminates probe sequences.
    Unoccupied,
    /// Tombstone left by a [`DeletionPolicy::Mark`] removal. Logically empty
    /// but kept in probe sequences; reused by the next insert that passes
    /// over it.
    Deleted,
    /// A live entry.
    Occupied {
        /// The entry's key.
        key: KeyBuf,
        /// The entry's value, owned by the slot.
        value: V,
    },
}

/// Construction-time configuration. Immutable once the table is built.
pub struct Config<V> {
    /// Requested slot count; rounded up to the nearest prime.
    pub initial_size: usize,
    /// Primary hash function, mapping a key to its probe-sequence start.
    pub primary_hash: HashFn,
    /// Optional stride function for double hashing. `None` means a stride of
    /// one, i.e. plain linear probing.
    pub secondary_hash: Option<HashFn>,
    /// Load-factor ceiling in `(0, 1]`; exceeding it triggers growth.
    pub max_load_factor: f64,
    /// Capacity multiplier applied on growth; must be greater than one.
    pub growth_factor: f64,
    /// Removal behavior.
    pub deletion_policy: DeletionPolicy,
    /// Optional hook receiving every discarded value.
    pub release: Option<ReleaseFn<V>>,
}

impl<V> Config<V> {
    /// Creates a configuration with the given primary hash function and
    /// defaults for everything else: 11 requested slots, linear probing,
    /// load factor 0.75, growth factor 2.0, [`DeletionPolicy::Mark`], no
    /// release hook.
    ///
    /// Combine with struct update syntax to adjust individual fields:
    ///
    /// ```rust
    /// # use oa_hash::Config;
    /// # use oa_hash::DeletionPolicy;
    /// # use oa_hash::hashers;
    /// #
    /// let config: Config<u32> = Config {
    ///     initial_size: 101,
    ///     deletion_policy: DeletionPolicy::Pack,
    ///     ..Config::new(hashers::primary)
    /// };
    /// assert_eq!(config.max_load_factor, 0.75);
    /// ```
    pub fn new(primary_hash: HashFn) -> Self {
        Config {
            initial_size: 11,
            primary_hash,
            secondary_hash: None,
            max_load_factor: 0.75,
            growth_factor: 2.0,
            deletion_policy: DeletionPolicy::Mark,
            release: None,
        }
    }
}

impl<V> Clone for Config<V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for Config<V> {}

impl<V> Debug for Config<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("initial_size", &self.initial_size)
            .field("primary_hash", &self.primary_hash)
            .field("secondary_hash", &self.secondary_hash)
            .field("max_load_factor", &self.max_load_factor)
            .field("growth_factor", &self.growth_factor)
            .field("deletion_policy", &self.deletion_policy)
            .field("release", &self.release.is_some())
            .finish()
    }
}

/// A point-in-time statistics snapshot, from [`HashTable::stats`].
#[derive(Debug, Clone, Copy)]
pub struct Stats {
    /// Physical slot count. Always prime.
    pub table_size: usize,
    /// Number of occupied slots.
    pub count: usize,
    /// Lifetime total of probe steps across all operations, successful and
    /// failed alike.
    pub probes: u64,
    /// Number of growths performed.
    pub expansions: usize,
    /// `count / table_size`.
    pub load_factor: f64,
    /// The primary hash function the table was built with.
    pub primary_hash: HashFn,
    /// The secondary hash function, if one was configured.
    pub secondary_hash: Option<HashFn>,
}

/// An open-addressing hash table mapping bounded-length string keys to
/// values of type `V`.
///
/// Collisions are resolved by double hashing: the primary hash function
/// picks the starting slot and the optional secondary hash function picks
/// the probe stride (omitted, the table degrades to linear probing). All
/// entries live directly in one contiguous slot array, which is replaced
/// wholesale when the configured load factor would be exceeded. Removal
/// behavior is explicit: tombstones ([`DeletionPolicy::Mark`]) or eager
/// cluster compaction ([`DeletionPolicy::Pack`]).
///
/// The table is single-threaded by design; the interior probe counter makes
/// it `!Sync`, so sharing it across threads requires external
/// synchronization and a wrapper type.
///
/// ## Example
///
/// ```rust
/// use oa_hash::Config;
/// use oa_hash::HashTable;
/// use oa_hash::hashers;
///
/// let mut table = HashTable::new(Config {
///     initial_size: 31,
///     secondary_hash: Some(hashers::secondary),
///     ..Config::new(hashers::primary)
/// });
///
/// table.insert("flywheel", 12u32)?;
/// assert_eq!(table.find("flywheel")?, &12);
/// # Ok::<(), oa_hash::Error>(())
/// ```
pub struct HashTable<V> {
    slots: Box<[Slot<V>]>,
    count: usize,
    probes: Cell<u64>,
    expansions: usize,
    config: Config<V>,
}

fn new_slots<V>(size: usize) -> Box<[Slot<V>]> {
    (0..size).map(|_| Slot::Unoccupied).collect()
}

fn valid_key(key: &str) -> bool {
    !key.is_empty() && key.len() <= MAX_KEY_LEN
}

// f64::ceil lives in std, not core; a cast-based ceiling is enough for the
// positive sizes used here.
fn ceil_to_usize(x: f64) -> usize {
    let truncated = x as usize;
    if (truncated as f64) < x {
        truncated + 1
    } else {
        truncated
    }
}

impl<V> HashTable<V> {
    /// Creates a table from a configuration. The slot count is the nearest
    /// prime at or above `config.initial_size`.
    ///
    /// # Panics
    ///
    /// Panics if `config.max_load_factor` is outside `(0, 1]` or
    /// `config.growth_factor` is not greater than one.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use oa_hash::Config;
    /// # use oa_hash::HashTable;
    /// # use oa_hash::hashers;
    /// #
    /// let table: HashTable<u32> = HashTable::new(Config {
    ///     initial_size: 100,
    ///     ..Config::new(hashers::primary)
    /// });
    /// assert_eq!(table.capacity(), 101);
    /// assert!(table.is_empty());
    /// ```
    pub fn new(config: Config<V>) -> Self {
        assert!(
            config.max_load_factor > 0.0 && config.max_load_factor <= 1.0,
            "max_load_factor must be in (0, 1]"
        );
        assert!(
            config.growth_factor > 1.0,
            "growth_factor must be greater than 1"
        );

        let size = prime::next_prime(config.initial_size);
        HashTable {
            slots: new_slots(size),
            count: 0,
            probes: Cell::new(0),
            expansions: 0,
            config,
        }
    }

    /// Returns the number of occupied slots.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns the physical slot count.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Looks up `key` and borrows its value.
    ///
    /// Walks the probe sequence until an occupied slot with an identical key
    /// is found; stops with [`Error::NotFound`] on reaching an unoccupied
    /// slot or completing a full cycle. Does not modify the table, but every
    /// probe step, including those of a failed lookup, counts toward the
    /// lifetime probe total.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use oa_hash::Config;
    /// # use oa_hash::Error;
    /// # use oa_hash::HashTable;
    /// # use oa_hash::hashers;
    /// #
    /// let mut table = HashTable::new(Config::new(hashers::primary));
    /// table.insert("camshaft", 8u32)?;
    ///
    /// assert_eq!(table.find("camshaft")?, &8);
    /// assert_eq!(table.find("crankpin"), Err(Error::NotFound));
    /// # Ok::<(), Error>(())
    /// ```
    pub fn find(&self, key: &str) -> Result<&V, Error> {
        if !valid_key(key) {
            return Err(Error::NotFound);
        }

        let size = self.slots.len();
        let origin = (self.config.primary_hash)(key, size) % size;
        let stride = self.stride_for(key);

        let mut index = origin;
        let mut steps: u64 = 0;
        loop {
            steps += 1;
            match &self.slots[index] {
                Slot::Occupied { key: existing, value } if existing.as_str() == key => {
                    self.bump_probes(steps);
                    return Ok(value);
                }
                Slot::Unoccupied => break,
                _ => {}
            }
            index = (index + stride) % size;
            if index == origin {
                break;
            }
        }

        self.bump_probes(steps);
        Err(Error::NotFound)
    }

    /// Inserts `key` with `value`.
    ///
    /// If placing one more entry would push the load factor past the
    /// configured ceiling, the table grows first. The probe walk remembers
    /// the first tombstone it crosses and keeps going; the entry lands on
    /// that tombstone if one was seen, otherwise on the first unoccupied
    /// slot. Inserting a key that is already present overwrites its value in
    /// place; the old value goes to the release hook (or is dropped) and
    /// `len` is unchanged.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidKey`] for an empty key or one longer than
    /// [`MAX_KEY_LEN`]; [`Error::OutOfMemory`] if a full probe cycle finds
    /// neither a free slot nor a tombstone. A failed insert leaves the table
    /// untouched.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use oa_hash::Config;
    /// # use oa_hash::Error;
    /// # use oa_hash::HashTable;
    /// # use oa_hash::hashers;
    /// #
    /// let mut table = HashTable::new(Config::new(hashers::primary));
    /// table.insert("piston", 4u32)?;
    /// table.insert("piston", 6)?; // overwrite, still one entry
    ///
    /// assert_eq!(table.len(), 1);
    /// assert_eq!(table.find("piston")?, &6);
    /// assert_eq!(table.insert("", 0), Err(Error::InvalidKey));
    /// # Ok::<(), Error>(())
    /// ```
    pub fn insert(&mut self, key: &str, value: V) -> Result<(), Error> {
        if !valid_key(key) {
            return Err(Error::InvalidKey);
        }
        if self.growth_required() {
            self.grow()?;
        }
        self.probe_insert(key, value)
    }

    /// Removes the entry for `key`.
    ///
    /// The stored value is handed to the release hook (or dropped), then the
    /// deletion policy decides what the vacated slot becomes: a tombstone
    /// under [`DeletionPolicy::Mark`], or an unoccupied slot followed by
    /// cluster compaction under [`DeletionPolicy::Pack`].
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the key is invalid, the walk reaches an
    /// unoccupied slot, or a full cycle completes without a match. A failed
    /// remove leaves the table untouched.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use oa_hash::Config;
    /// # use oa_hash::Error;
    /// # use oa_hash::HashTable;
    /// # use oa_hash::hashers;
    /// #
    /// let mut table = HashTable::new(Config::new(hashers::primary));
    /// table.insert("rocker", 1u32)?;
    ///
    /// table.remove("rocker")?;
    /// assert_eq!(table.remove("rocker"), Err(Error::NotFound));
    /// assert!(table.is_empty());
    /// # Ok::<(), Error>(())
    /// ```
    pub fn remove(&mut self, key: &str) -> Result<(), Error> {
        if !valid_key(key) {
            return Err(Error::NotFound);
        }

        let size = self.slots.len();
        let origin = (self.config.primary_hash)(key, size) % size;
        let stride = self.stride_for(key);

        let mut index = origin;
        let mut steps: u64 = 0;
        let mut found = None;
        loop {
            steps += 1;
            match &self.slots[index] {
                Slot::Occupied { key: existing, .. } if existing.as_str() == key => {
                    found = Some(index);
                    break;
                }
                Slot::Unoccupied => break,
                _ => {}
            }
            index = (index + stride) % size;
            if index == origin {
                break;
            }
        }
        self.bump_probes(steps);

        let Some(index) = found else {
            return Err(Error::NotFound);
        };

        let replacement = match self.config.deletion_policy {
            DeletionPolicy::Mark => Slot::Deleted,
            DeletionPolicy::Pack => Slot::Unoccupied,
        };
        let vacated = mem::replace(&mut self.slots[index], replacement);
        self.count -= 1;
        if let Slot::Occupied { value, .. } = vacated {
            self.release(value);
        }

        if self.config.deletion_policy == DeletionPolicy::Pack {
            // The compaction pass reuses the stride of the key just removed.
            self.pack(index, stride);
        }
        Ok(())
    }

    /// Empties every slot, handing each live value to the release hook (or
    /// dropping it). Capacity, probe total, and expansion count are kept.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use oa_hash::Config;
    /// # use oa_hash::HashTable;
    /// # use oa_hash::hashers;
    /// #
    /// let mut table = HashTable::new(Config::new(hashers::primary));
    /// table.insert("intake", 1u32)?;
    /// table.insert("exhaust", 2)?;
    ///
    /// table.clear();
    /// assert!(table.is_empty());
    /// assert_eq!(table.capacity(), 11);
    /// # Ok::<(), oa_hash::Error>(())
    /// ```
    pub fn clear(&mut self) {
        for index in 0..self.slots.len() {
            let slot = mem::replace(&mut self.slots[index], Slot::Unoccupied);
            if let Slot::Occupied { value, .. } = slot {
                self.release(value);
            }
        }
        self.count = 0;
    }

    /// Takes a statistics snapshot.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use oa_hash::Config;
    /// # use oa_hash::HashTable;
    /// # use oa_hash::hashers;
    /// #
    /// let mut table = HashTable::new(Config::new(hashers::primary));
    /// table.insert("sprocket", 5u32)?;
    ///
    /// let stats = table.stats();
    /// assert_eq!(stats.table_size, 11);
    /// assert_eq!(stats.count, 1);
    /// assert!(stats.probes >= 1);
    /// assert_eq!(stats.expansions, 0);
    /// # Ok::<(), oa_hash::Error>(())
    /// ```
    pub fn stats(&self) -> Stats {
        Stats {
            table_size: self.slots.len(),
            count: self.count,
            probes: self.probes.get(),
            expansions: self.expansions,
            load_factor: self.count as f64 / self.slots.len() as f64,
            primary_hash: self.config.primary_hash,
            secondary_hash: self.config.secondary_hash,
        }
    }

    /// Borrows the slot array, in physical order. Intended for diagnostics
    /// and tests; there is no mutable counterpart.
    pub fn slots(&self) -> &[Slot<V>] {
        &self.slots
    }

    /// Stride for `key`: secondary hash of the key over `table_size - 1`,
    /// plus one so it can never be zero. Without a secondary function the
    /// stride is one.
    fn stride_for(&self, key: &str) -> usize {
        match self.config.secondary_hash {
            Some(secondary) => secondary(key, self.slots.len() - 1) + 1,
            None => 1,
        }
    }

    fn bump_probes(&self, steps: u64) {
        self.probes.set(self.probes.get() + steps);
    }

    fn release(&self, value: V) {
        match self.config.release {
            Some(hook) => hook(value),
            None => drop(value),
        }
    }

    fn growth_required(&self) -> bool {
        if self.config.max_load_factor == 1.0 {
            return self.count == self.slots.len();
        }
        (self.count + 1) as f64 / self.slots.len() as f64 > self.config.max_load_factor
    }

    /// Replaces the slot array with a fresh one sized to the nearest prime
    /// at or above `old_size * growth_factor`, then re-inserts every live
    /// entry through the normal insert path so probe positions are
    /// re-derived under the new size. Physical order is not preserved.
    fn grow(&mut self) -> Result<(), Error> {
        let target = ceil_to_usize(self.slots.len() as f64 * self.config.growth_factor);
        let new_size = prime::next_prime(target);

        let old = mem::replace(&mut self.slots, new_slots(new_size));
        self.count = 0;
        self.expansions += 1;

        for slot in old {
            if let Slot::Occupied { key, value } = slot {
                self.insert(key.as_str(), value)?;
            }
        }
        Ok(())
    }

    fn probe_insert(&mut self, key: &str, value: V) -> Result<(), Error> {
        let size = self.slots.len();
        let origin = (self.config.primary_hash)(key, size) % size;
        let stride = self.stride_for(key);

        let mut index = origin;
        let mut steps: u64 = 0;
        let mut tombstone = None;
        let mut found = None;
        loop {
            steps += 1;
            match &mut self.slots[index] {
                Slot::Deleted => {
                    if tombstone.is_none() {
                        tombstone = Some(index);
                    }
                }
                Slot::Unoccupied => {
                    // A tombstone seen earlier in the walk takes priority
                    // over the gap that ended it.
                    found = Some(tombstone.unwrap_or(index));
                    break;
                }
                Slot::Occupied { key: existing, value: stored } if existing.as_str() == key => {
                    let old = mem::replace(stored, value);
                    self.bump_probes(steps);
                    self.release(old);
                    return Ok(());
                }
                Slot::Occupied { .. } => {}
            }
            index = (index + stride) % size;
            if index == origin {
                break;
            }
        }
        self.bump_probes(steps);

        match found.or(tombstone) {
            Some(target) => {
                self.slots[target] = Slot::Occupied {
                    key: KeyBuf::new(key),
                    value,
                };
                self.count += 1;
                Ok(())
            }
            None => Err(Error::OutOfMemory),
        }
    }

    /// Cluster fix-up after a `Pack` removal.
    ///
    /// Walks `stride` (derived from the key that was just removed, not from
    /// each entry it passes) to the slot just before the first gap, then
    /// lifts every entry up to that point and re-inserts it through the
    /// normal insert path so it can settle earlier in its own sequence.
    /// Entries whose own probe sequences cross the vacated slot at a
    /// different stride are not revisited; that approximation is part of the
    /// table's observable behavior.
    fn pack(&mut self, vacated: usize, stride: usize) {
        let size = self.slots.len();
        let back = stride % size;

        let mut current = vacated;
        let stopping = loop {
            current = (current + stride) % size;
            if matches!(self.slots[current], Slot::Unoccupied) {
                break (current + size - back) % size;
            }
            if current == vacated {
                break current;
            }
        };

        let mut current = vacated;
        while current != stopping {
            current = (current + stride) % size;
            if let Slot::Occupied { key, value } =
                mem::replace(&mut self.slots[current], Slot::Unoccupied)
            {
                self.count -= 1;
                let reinserted = self.insert(key.as_str(), value);
                debug_assert!(reinserted.is_ok());
            }
        }
    }
}

impl<V> Debug for HashTable<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let occupancy: String = self
            .slots
            .iter()
            .map(|slot| match slot {
                Slot::Unoccupied => '.',
                Slot::Deleted => 'x',
                Slot::Occupied { .. } => 'o',
            })
            .collect();

        f.debug_struct("HashTable")
            .field("table_size", &self.slots.len())
            .field("count", &self.count)
            .field("probes", &self.probes.get())
            .field("expansions", &self.expansions)
            .field("slots", &occupancy)
            .finish()
    }
}

impl<V> Clone for HashTable<V>
where
    V: Clone,
{
    fn clone(&self) -> Self {
        HashTable {
            slots: self.slots.clone(),
            count: self.count,
            probes: self.probes.clone(),
            expansions: self.expansions,
            config: self.config,
        }
    }
}

impl<V> Drop for HashTable<V> {
    fn drop(&mut self) {
        // Routes every remaining value through the release hook.
        self.clear();
    }
}
