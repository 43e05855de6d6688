//! The probing table core: a bucket index over a parallel value store.
//!
//! The table keeps two arrays of identical, power-of-two capacity. The
//! *bucket index* holds small metadata entries (full hash, occupancy state,
//! slot reference) and is the only array touched while probing. The *value
//! store* holds the copied key bytes and the values, appended through a
//! monotonically advancing cursor. Removal tombstones the bucket and keeps
//! its slot reference so a later colliding key can reclaim the slot in
//! place; growth rebuilds the index from live buckets and discards the
//! tombstones.

use core::fmt;
use core::fmt::Debug;
use core::mem;

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;

use crate::policy::BytewiseEq;
use crate::policy::Djb2;
use crate::policy::DropRelease;
use crate::policy::KeyEq;
use crate::policy::KeyHasher;
use crate::policy::Release;

/// Maximum key length in bytes. Longer keys are rejected.
///
/// Keys are copied inline into the value store with explicit length
/// tracking, so the full budget is usable; there is no terminator byte.
pub const MAX_KEY_LEN: usize = 32;

/// Smallest capacity a table will be created with.
pub const DEFAULT_CAPACITY: usize = 16;

/// Hard ceiling on table capacity.
pub const MAX_CAPACITY: usize = 1 << 30;

/// Load factor used when none is supplied, or when the supplied one is out
/// of range.
pub const DEFAULT_LOAD_FACTOR: f32 = 0.75;

#[inline(always)]
fn round_up_pow2(value: usize) -> usize {
    value.next_power_of_two()
}

#[inline(always)]
fn growth_threshold(load_factor: f32, capacity: usize) -> usize {
    (f64::from(load_factor) * capacity as f64) as usize
}

#[inline(always)]
fn probe_pos(hash: u64, probe: usize, mask: usize) -> usize {
    // The probe offset is added to the hash before masking rather than to
    // the previous position; keys sharing a starting bucket still walk the
    // same chain, but the chain is a function of the full hash.
    (hash.wrapping_add(probe as u64) as usize) & mask
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BucketState {
    Empty,
    Occupied,
    Deleted,
}

/// Metadata entry in the bucket index.
///
/// `hash` and `slot` are only meaningful while `state` is `Occupied`, with
/// one exception: a `Deleted` bucket retains its `slot` so the slot can be
/// reused by a key whose probe sequence lands on this exact bucket.
#[derive(Debug, Clone, Copy)]
struct Bucket {
    hash: u64,
    slot: usize,
    state: BucketState,
}

impl Bucket {
    const EMPTY: Bucket = Bucket {
        hash: 0,
        slot: 0,
        state: BucketState::Empty,
    };
}

/// Entry in the value store: inline key bytes, key length, and the value.
struct Slot<V> {
    key: [u8; MAX_KEY_LEN],
    key_len: u8,
    value: Option<V>,
}

impl<V> Slot<V> {
    fn vacant() -> Self {
        Slot {
            key: [0; MAX_KEY_LEN],
            key_len: 0,
            value: None,
        }
    }

    #[inline]
    fn key(&self) -> &[u8] {
        &self.key[..usize::from(self.key_len)]
    }
}

fn vacant_slots<V>(capacity: usize) -> Box<[Slot<V>]> {
    let mut slots = Vec::with_capacity(capacity);
    slots.resize_with(capacity, Slot::vacant);
    slots.into_boxed_slice()
}

/// Occupancy and probe statistics for a [`ProbeMap`].
///
/// Only available with the `stats` cargo feature.
#[cfg(feature = "stats")]
#[derive(Debug, Clone)]
pub struct MapStats {
    /// Number of live keys.
    pub len: usize,
    /// Current capacity of both backing arrays.
    pub capacity: usize,
    /// Live-key count at which the next insertion triggers growth.
    pub growth_threshold: usize,
    /// Next never-used value-store slot.
    pub cursor: usize,
    /// Deepest probe sequence currently needed to reach any live key.
    pub max_probe: usize,
    /// Number of tombstoned buckets awaiting reuse or the next growth.
    pub tombstones: usize,
    /// `len / capacity`.
    pub load: f64,
}

#[cfg(feature = "stats")]
impl MapStats {
    /// Pretty-print the statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== ProbeMap Statistics ===");
        println!(
            "Population: {}/{} ({:.2}% load, grows past {})",
            self.len,
            self.capacity,
            self.load * 100.0,
            self.growth_threshold
        );
        println!(
            "Value store: cursor at {}/{}, {} tombstoned bucket(s)",
            self.cursor, self.capacity, self.tombstones
        );
        println!("Max probe length: {}", self.max_probe);
    }
}

/// Errors returned by [`ProbeMap::insert`].
///
/// Both variants hand the rejected value back to the caller so nothing is
/// silently dropped.
pub enum InsertError<V> {
    /// The key exceeds [`MAX_KEY_LEN`] bytes. The table was not mutated.
    KeyTooLong(V),
    /// No free or reusable bucket was found even after growth. This cannot
    /// happen while the table's invariants hold.
    Saturated(V),
}

impl<V> InsertError<V> {
    /// Recovers the value that was rejected.
    pub fn into_value(self) -> V {
        match self {
            InsertError::KeyTooLong(value) | InsertError::Saturated(value) => value,
        }
    }
}

impl<V> Debug for InsertError<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InsertError::KeyTooLong(_) => "KeyTooLong(..)",
            InsertError::Saturated(_) => "Saturated(..)",
        })
    }
}

impl<V> fmt::Display for InsertError<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsertError::KeyTooLong(_) => {
                write!(f, "key exceeds the maximum length of {MAX_KEY_LEN} bytes")
            }
            InsertError::Saturated(_) => {
                f.write_str("no free bucket found after growth; table invariants are broken")
            }
        }
    }
}

impl<V> core::error::Error for InsertError<V> {}

impl<V> PartialEq for InsertError<V>
where
    V: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (InsertError::KeyTooLong(a), InsertError::KeyTooLong(b)) => a == b,
            (InsertError::Saturated(a), InsertError::Saturated(b)) => a == b,
            _ => false,
        }
    }
}

impl<V> Eq for InsertError<V> where V: Eq {}

/// A byte-keyed hash table using linear probing over a split
/// bucket-index/value-store layout.
///
/// `ProbeMap<V, H, E, R>` maps short byte-string keys (at most
/// [`MAX_KEY_LEN`] bytes, copied into the table) to values of type `V`. The
/// hashing policy `H`, key-equality policy `E`, and value-release policy `R`
/// are injected at construction; [`ProbeMap::new`] wires up the defaults.
///
/// The table is single-threaded by design: no internal synchronization, no
/// atomics. Callers that need concurrent access must wrap operations in
/// their own lock or shard keys across independent tables.
///
/// ## Performance Characteristics
///
/// - **Memory**: one bucket (hash + state + slot index) plus one slot
///   (32-byte inline key + length + `Option<V>`) per capacity unit, across
///   two parallel arrays.
/// - **Lookups**: bounded by the deepest probe sequence ever in use; an
///   empty bucket ends a miss immediately, tombstones are scanned past.
///
/// ## Example
///
/// ```rust
/// # use probe_hash::ProbeMap;
/// let mut map: ProbeMap<&str> = ProbeMap::new(16);
///
/// map.insert(b"fast", "linear probing").unwrap();
/// assert_eq!(map.get(b"fast"), Some(&"linear probing"));
///
/// let displaced = map.insert(b"fast", "still linear probing").unwrap();
/// assert_eq!(displaced, Some("linear probing"));
/// assert_eq!(map.len(), 1);
/// ```
pub struct ProbeMap<V, H = Djb2, E = BytewiseEq, R = DropRelease>
where
    R: Release<V>,
{
    index: Box<[Bucket]>,
    slots: Box<[Slot<V>]>,

    len: usize,
    threshold: usize,
    max_probe: usize,
    cursor: usize,
    load_factor: f32,

    hasher: H,
    key_eq: E,
    release: R,
}

impl<V> ProbeMap<V> {
    /// Creates a table with the default policies: djb2 hashing, bytewise
    /// key equality, and drop-on-teardown release.
    ///
    /// The requested capacity is clamped to
    /// [`DEFAULT_CAPACITY`]..=[`MAX_CAPACITY`] and rounded up to the next
    /// power of two.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_hash::ProbeMap;
    /// let map: ProbeMap<i32> = ProbeMap::new(30);
    /// assert_eq!(map.capacity(), 32);
    /// assert!(map.is_empty());
    /// ```
    pub fn new(requested_capacity: usize) -> Self {
        Self::with_policies(
            requested_capacity,
            DEFAULT_LOAD_FACTOR,
            Djb2,
            BytewiseEq,
            DropRelease,
        )
    }
}

impl<V> Default for ProbeMap<V> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl<V, H, E, R> ProbeMap<V, H, E, R>
where
    H: KeyHasher,
    E: KeyEq,
    R: Release<V>,
{
    /// Creates a table with explicit policies and load factor.
    ///
    /// The requested capacity is clamped to
    /// [`DEFAULT_CAPACITY`]..=[`MAX_CAPACITY`] and rounded up to the next
    /// power of two. A load factor outside `0.1..=1.0` falls back to
    /// [`DEFAULT_LOAD_FACTOR`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_hash::{BytewiseEq, Djb2, DropRelease, ProbeMap};
    /// let map: ProbeMap<i32, _, _, _> =
    ///     ProbeMap::with_policies(100, 0.5, Djb2, BytewiseEq, DropRelease);
    /// assert_eq!(map.capacity(), 128);
    /// assert_eq!(map.growth_threshold(), 64);
    /// ```
    pub fn with_policies(
        requested_capacity: usize,
        load_factor: f32,
        hasher: H,
        key_eq: E,
        release: R,
    ) -> Self {
        let requested = requested_capacity.clamp(DEFAULT_CAPACITY, MAX_CAPACITY);
        let load_factor = if (0.1..=1.0).contains(&load_factor) {
            load_factor
        } else {
            DEFAULT_LOAD_FACTOR
        };
        let capacity = round_up_pow2(requested);

        Self {
            index: vec![Bucket::EMPTY; capacity].into_boxed_slice(),
            slots: vacant_slots(capacity),
            len: 0,
            threshold: growth_threshold(load_factor, capacity),
            max_probe: 0,
            cursor: 0,
            load_factor,
            hasher,
            key_eq,
            release,
        }
    }

    /// Returns the number of live keys in the table.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_hash::ProbeMap;
    /// let mut map = ProbeMap::new(16);
    /// assert_eq!(map.len(), 0);
    /// map.insert(b"one", 1).unwrap();
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the table contains no live keys.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the current capacity of the backing arrays.
    ///
    /// Always a power of two; the table grows before the live-key count can
    /// reach it.
    pub fn capacity(&self) -> usize {
        self.index.len()
    }

    /// Returns the live-key count past which the next insertion grows the
    /// table.
    pub fn growth_threshold(&self) -> usize {
        self.threshold
    }

    /// Inserts a key-value pair, or updates the value of an existing key.
    ///
    /// On an update the displaced value is returned as `Ok(Some(old))`; a
    /// fresh insertion returns `Ok(None)`. Keys longer than [`MAX_KEY_LEN`]
    /// are rejected with [`InsertError::KeyTooLong`] without mutating the
    /// table; the error carries the value back.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_hash::{InsertError, ProbeMap};
    /// let mut map = ProbeMap::new(16);
    ///
    /// assert_eq!(map.insert(b"key", 1), Ok(None));
    /// assert_eq!(map.insert(b"key", 2), Ok(Some(1)));
    ///
    /// let oversized = [0u8; 33];
    /// let err = map.insert(&oversized, 3).unwrap_err();
    /// assert_eq!(err.into_value(), 3);
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn insert(&mut self, key: &[u8], value: V) -> Result<Option<V>, InsertError<V>> {
        if key.len() > MAX_KEY_LEN {
            return Err(InsertError::KeyTooLong(value));
        }

        // Grow before probing: past the threshold, out of buckets, or out
        // of virgin value-store slots (tombstone slots may still exist, but
        // only a colliding key can reclaim those in place).
        if self.len > self.threshold || self.len == self.capacity() || self.cursor == self.capacity()
        {
            self.grow();
        }

        let hash = self.hasher.hash_key(key);
        let mask = self.capacity() - 1;

        for probe in 0..=self.capacity() {
            let pos = probe_pos(hash, probe, mask);
            let bucket = self.index[pos];

            match bucket.state {
                BucketState::Occupied => {
                    if bucket.hash == hash && self.slot_key_matches(bucket.slot, key) {
                        return Ok(self.slots[bucket.slot].value.replace(value));
                    }
                }
                state => {
                    let slot = if state == BucketState::Empty {
                        let slot = self.cursor;
                        self.cursor += 1;
                        slot
                    } else {
                        // Tombstone: reuse the slot it still references.
                        bucket.slot
                    };

                    let entry = &mut self.slots[slot];
                    entry.key[..key.len()].copy_from_slice(key);
                    entry.key_len = key.len() as u8;
                    entry.value = Some(value);

                    self.index[pos] = Bucket {
                        hash,
                        slot,
                        state: BucketState::Occupied,
                    };

                    if probe > self.max_probe {
                        self.max_probe = probe;
                    }
                    self.len += 1;

                    return Ok(None);
                }
            }
        }

        Err(InsertError::Saturated(value))
    }

    /// Returns a reference to the value stored under `key`.
    ///
    /// Absence is unambiguous: `None` means the key is not in the table.
    /// (A table of nullable values can use `V = Option<T>` and still tell a
    /// stored `None` apart from a missing key.)
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_hash::ProbeMap;
    /// let mut map = ProbeMap::new(16);
    /// map.insert(b"key", 7).unwrap();
    /// assert_eq!(map.get(b"key"), Some(&7));
    /// assert_eq!(map.get(b"other"), None);
    /// ```
    pub fn get(&self, key: &[u8]) -> Option<&V> {
        let pos = self.find(key)?;
        self.slots[self.index[pos].slot].value.as_ref()
    }

    /// Returns a mutable reference to the value stored under `key`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_hash::ProbeMap;
    /// let mut map = ProbeMap::new(16);
    /// map.insert(b"count", 1).unwrap();
    /// *map.get_mut(b"count").unwrap() += 1;
    /// assert_eq!(map.get(b"count"), Some(&2));
    /// ```
    pub fn get_mut(&mut self, key: &[u8]) -> Option<&mut V> {
        let pos = self.find(key)?;
        self.slots[self.index[pos].slot].value.as_mut()
    }

    /// Returns `true` if `key` is present in the table.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_hash::ProbeMap;
    /// let mut map = ProbeMap::new(16);
    /// map.insert(b"key", ()).unwrap();
    /// assert!(map.contains_key(b"key"));
    /// assert!(!map.contains_key(b"missing"));
    /// ```
    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.find(key).is_some()
    }

    /// Removes `key` from the table and returns its value.
    ///
    /// Ownership of the value transfers to the caller; the table's release
    /// policy will not run on it. The bucket becomes a tombstone that keeps
    /// its value-store slot reserved for reuse by a colliding key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_hash::ProbeMap;
    /// let mut map = ProbeMap::new(16);
    /// map.insert(b"key", 42).unwrap();
    ///
    /// assert_eq!(map.remove(b"key"), Some(42));
    /// assert_eq!(map.remove(b"key"), None);
    /// assert!(!map.contains_key(b"key"));
    /// ```
    pub fn remove(&mut self, key: &[u8]) -> Option<V> {
        let pos = self.find(key)?;
        let slot = self.index[pos].slot;

        let entry = &mut self.slots[slot];
        let value = entry.value.take();
        entry.key = [0; MAX_KEY_LEN];
        entry.key_len = 0;

        let bucket = &mut self.index[pos];
        bucket.state = BucketState::Deleted;
        bucket.hash = 0;

        self.len -= 1;
        value
    }

    /// Returns an iterator over `(key, value)` pairs in arbitrary order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use probe_hash::ProbeMap;
    /// let mut map = ProbeMap::new(16);
    /// map.insert(b"a", 1).unwrap();
    /// map.insert(b"b", 2).unwrap();
    ///
    /// let mut total = 0;
    /// for (key, value) in map.iter() {
    ///     assert!(!key.is_empty());
    ///     total += value;
    /// }
    /// assert_eq!(total, 3);
    /// ```
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            index: &self.index,
            slots: &self.slots,
            pos: 0,
            remaining: self.len,
        }
    }

    /// Collects occupancy and probe statistics.
    ///
    /// Only available with the `stats` cargo feature.
    #[cfg(feature = "stats")]
    pub fn stats(&self) -> MapStats {
        MapStats {
            len: self.len,
            capacity: self.capacity(),
            growth_threshold: self.threshold,
            cursor: self.cursor,
            max_probe: self.max_probe,
            tombstones: self
                .index
                .iter()
                .filter(|bucket| bucket.state == BucketState::Deleted)
                .count(),
            load: self.len as f64 / self.capacity() as f64,
        }
    }

    /// Walks the probe sequence for `key` and returns the position of the
    /// bucket that owns it.
    ///
    /// Bounded by `max_probe`: no live key sits deeper than that, so the
    /// scan can stop early on an empty bucket or once the bound is
    /// exhausted. Tombstones are scanned past.
    fn find(&self, key: &[u8]) -> Option<usize> {
        if key.len() > MAX_KEY_LEN {
            return None;
        }

        let hash = self.hasher.hash_key(key);
        let mask = self.capacity() - 1;

        for probe in 0..=self.max_probe {
            let pos = probe_pos(hash, probe, mask);
            let bucket = &self.index[pos];

            match bucket.state {
                BucketState::Occupied => {
                    if bucket.hash == hash && self.slot_key_matches(bucket.slot, key) {
                        return Some(pos);
                    }
                }
                BucketState::Empty => return None,
                BucketState::Deleted => {}
            }
        }

        None
    }

    #[inline]
    fn slot_key_matches(&self, slot: usize, key: &[u8]) -> bool {
        let entry = &self.slots[slot];
        usize::from(entry.key_len) == key.len() && self.key_eq.eq_keys(key, entry.key())
    }

    /// Doubles the capacity and rebuilds the bucket index.
    ///
    /// The value store is carried over positionally, so slot references in
    /// surviving buckets stay valid and the insertion cursor is preserved.
    /// Only occupied buckets are reinserted; tombstones are discarded,
    /// which is the one mechanism that reclaims dead bucket positions.
    fn grow(&mut self) {
        let old_capacity = self.capacity();
        let new_capacity = round_up_pow2((old_capacity * 2).min(MAX_CAPACITY));

        let old_index = mem::replace(
            &mut self.index,
            vec![Bucket::EMPTY; new_capacity].into_boxed_slice(),
        );
        let old_slots = mem::replace(&mut self.slots, vacant_slots(new_capacity));

        self.threshold = growth_threshold(self.load_factor, new_capacity);
        self.max_probe = 0;

        for (i, slot) in old_slots.into_vec().into_iter().enumerate() {
            self.slots[i] = slot;
        }

        let mask = new_capacity - 1;
        for bucket in old_index.iter() {
            if bucket.state != BucketState::Occupied {
                continue;
            }

            let mut placed = false;
            for probe in 0..=new_capacity {
                let pos = probe_pos(bucket.hash, probe, mask);
                if self.index[pos].state != BucketState::Occupied {
                    self.index[pos] = *bucket;
                    if probe > self.max_probe {
                        self.max_probe = probe;
                    }
                    placed = true;
                    break;
                }
            }

            if !placed {
                panic!(
                    "probe-hash: rehash found no bucket for a live key at double capacity; \
                     the table's invariants were already broken"
                );
            }
        }
    }
}

impl<V, H, E, R> Drop for ProbeMap<V, H, E, R>
where
    R: Release<V>,
{
    fn drop(&mut self) {
        for i in 0..self.index.len() {
            let bucket = self.index[i];
            if bucket.state == BucketState::Occupied {
                if let Some(value) = self.slots[bucket.slot].value.take() {
                    self.release.release(value);
                }
            }
        }
    }
}

impl<V, H, E, R> Debug for ProbeMap<V, H, E, R>
where
    V: Debug,
    H: KeyHasher,
    E: KeyEq,
    R: Release<V>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, value) in self.iter() {
            map.entry(&key, value);
        }
        map.finish()
    }
}

/// Iterator over the `(key, value)` pairs of a [`ProbeMap`].
///
/// Created by [`ProbeMap::iter`]. Order is arbitrary and may change as the
/// table grows.
pub struct Iter<'a, V> {
    index: &'a [Bucket],
    slots: &'a [Slot<V>],
    pos: usize,
    remaining: usize,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a [u8], &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.index.len() {
            let bucket = &self.index[self.pos];
            self.pos += 1;

            if bucket.state == BucketState::Occupied {
                let entry = &self.slots[bucket.slot];
                if let Some(value) = entry.value.as_ref() {
                    self.remaining -= 1;
                    return Some((entry.key(), value));
                }
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}

impl<'a, V, H, E, R> IntoIterator for &'a ProbeMap<V, H, E, R>
where
    H: KeyHasher,
    E: KeyEq,
    R: Release<V>,
{
    type Item = (&'a [u8], &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
