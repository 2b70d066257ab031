//! HashSet: separate chaining over an arena of linked entries.

use crate::error::{Failure, Result};
use crate::reentrancy::DebugReentrancy;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::iter::FusedIterator;
use core::mem;
use slotmap::{DefaultKey, SlotMap};
use std::collections::hash_map::RandomState;

/// Bucket count of a fresh set unless another minimum is chosen through `N`.
pub const DEFAULT_MIN_BUCKETS: usize = 7;

/// Upper bound on `len / bucket_count` once an insertion completes.
pub const MAX_LOAD_FACTOR: f64 = 0.7;

// MAX_LOAD_FACTOR as an exact ratio; growth checks never touch floats.
const LOAD_NUM: u128 = 7;
const LOAD_DEN: u128 = 10;

/// Opaque reference to one entry of the arena.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Handle(DefaultKey);

/// A place in the iteration sequence of a set.
///
/// Positions are plain values: they borrow nothing and are resolved against
/// the set with `key_at` and `next_position`. A rehash moves entries to new
/// buckets, so positions taken before it must not be advanced afterward.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Position {
    At { bucket: usize, entry: Handle },
    End,
}

impl Position {
    pub fn is_end(&self) -> bool {
        matches!(self, Position::End)
    }

    pub fn bucket(&self) -> Option<usize> {
        match self {
            Position::At { bucket, .. } => Some(*bucket),
            Position::End => None,
        }
    }
}

#[derive(Debug)]
struct Entry<K> {
    key: K,
    hash: u64,
    next: Option<DefaultKey>,
}

// Bucket heads plus the arena they link into. Knows nothing of hashing:
// callers pass the hash in, so `K: Hash` never runs while chains change.
struct Table<K> {
    buckets: Vec<Option<DefaultKey>>, // chain heads, indexed by hash % len
    slots: SlotMap<DefaultKey, Entry<K>>,
}

/// Unordered set of unique keys, chained per bucket.
///
/// `S` builds the hasher, `N` is the smallest bucket count the table ever
/// has. The table grows (never shrinks) so that `len() <= 0.7 * bucket_count()`
/// after every insertion, and each growth lands on an odd bucket count.
pub struct HashSet<K, S = RandomState, const N: usize = { DEFAULT_MIN_BUCKETS }> {
    hasher: S,
    table: Table<K>,
    reentrancy: DebugReentrancy,
}

#[inline]
fn bucket_for(hash: u64, bucket_count: usize) -> usize {
    (hash % bucket_count as u64) as usize
}

/// Whether `bucket_count` buckets hold `n` keys within the load factor.
#[inline]
fn holds(bucket_count: usize, n: usize) -> bool {
    bucket_count as u128 * LOAD_NUM >= n as u128 * LOAD_DEN
}

fn min_buckets_for(len: usize) -> Result<usize> {
    let needed = (len as u128 * LOAD_DEN).div_ceil(LOAD_NUM);
    usize::try_from(needed).map_err(|_| Failure::CapacityOverflow)
}

fn alloc_buckets(bucket_count: usize) -> Result<Vec<Option<DefaultKey>>> {
    let mut buckets = Vec::new();
    buckets.try_reserve_exact(bucket_count)?;
    buckets.resize(bucket_count, None);
    Ok(buckets)
}

#[cold]
fn growth_failed(failure: Failure) -> ! {
    panic!("HashSet growth failed: {}", failure)
}

impl<K> Table<K> {
    fn new(bucket_count: usize) -> Self {
        Self {
            buckets: vec![None; bucket_count],
            slots: SlotMap::with_key(),
        }
    }

    fn bucket_of(&self, hash: u64) -> usize {
        bucket_for(hash, self.buckets.len())
    }

    fn at(&self, hash: u64, k: DefaultKey) -> Position {
        Position::At {
            bucket: self.bucket_of(hash),
            entry: Handle(k),
        }
    }

    fn entries(&self) -> Entries<'_, K> {
        Entries {
            buckets: self.buckets.iter(),
            slots: &self.slots,
            cursor: None,
        }
    }

    fn first_from(&self, bucket: usize) -> Position {
        self.buckets
            .iter()
            .enumerate()
            .skip(bucket)
            .find_map(|(i, head)| {
                head.map(|k| Position::At {
                    bucket: i,
                    entry: Handle(k),
                })
            })
            .unwrap_or(Position::End)
    }

    fn locate<Q>(&self, hash: u64, q: &Q) -> Option<DefaultKey>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let mut cur = self.buckets[self.bucket_of(hash)];
        while let Some(k) = cur {
            let entry = &self.slots[k];
            if entry.hash == hash && entry.key.borrow() == q {
                return Some(k);
            }
            cur = entry.next;
        }
        None
    }

    fn insert(&mut self, hash: u64, key: K, min_buckets: usize) -> Result<(Position, bool)>
    where
        K: Eq,
    {
        if let Some(k) = self.locate(hash, &key) {
            return Ok((self.at(hash, k), false));
        }
        // Room for the entry first: a failure here leaves the table as it was.
        self.slots.try_reserve(1)?;
        self.reserve_for(self.slots.len() + 1, min_buckets)?;
        Ok((self.link(hash, key), true))
    }

    // Prepend to the chain for `hash`. Capacity must already be reserved.
    fn link(&mut self, hash: u64, key: K) -> Position {
        let bucket = self.bucket_of(hash);
        let next = self.buckets[bucket];
        let k = self.slots.insert(Entry { key, hash, next });
        self.buckets[bucket] = Some(k);
        Position::At {
            bucket,
            entry: Handle(k),
        }
    }

    fn unlink<Q>(&mut self, hash: u64, q: &Q) -> Option<Entry<K>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let bucket = self.bucket_of(hash);
        let mut prev: Option<DefaultKey> = None;
        let mut cur = self.buckets[bucket];
        while let Some(k) = cur {
            let entry = &self.slots[k];
            let next = entry.next;
            if entry.hash == hash && entry.key.borrow() == q {
                match prev {
                    None => self.buckets[bucket] = next,
                    Some(p) => self.slots[p].next = next,
                }
                return self.slots.remove(k);
            }
            prev = cur;
            cur = next;
        }
        None
    }

    fn reserve_for(&mut self, n: usize, min_buckets: usize) -> Result<()> {
        if holds(self.buckets.len(), n) {
            return Ok(());
        }
        self.grow_for(n, min_buckets).map_err(|failure| {
            log::warn!("HashSet cannot grow to hold {} keys: {}", n, failure);
            failure
        })
    }

    fn grow_for(&mut self, n: usize, min_buckets: usize) -> Result<()> {
        let mut bucket_count = self.buckets.len();
        while !holds(bucket_count, n) {
            bucket_count = bucket_count
                .checked_mul(2)
                .ok_or(Failure::CapacityOverflow)?;
        }
        self.rehash_to(bucket_count | 1, min_buckets)
    }

    fn rehash_to(&mut self, n: usize, min_buckets: usize) -> Result<()> {
        let bucket_count = n
            .max(min_buckets)
            .max(min_buckets_for(self.slots.len())?);
        // Nothing below may fail: the table is only touched once this succeeds.
        let mut buckets = alloc_buckets(bucket_count)?;

        // Walking each old chain head-first and prepending reverses the
        // relative order of keys that land in the same new bucket.
        for &head in &self.buckets {
            let mut cur = head;
            while let Some(k) = cur {
                let entry = &mut self.slots[k];
                cur = entry.next;
                let bucket = bucket_for(entry.hash, bucket_count);
                entry.next = buckets[bucket];
                buckets[bucket] = Some(k);
            }
        }

        let old = mem::replace(&mut self.buckets, buckets);
        log::debug!(
            "HashSet rehashed {} keys: {} -> {} buckets",
            self.slots.len(),
            old.len(),
            bucket_count
        );
        Ok(())
    }
}

impl<K> HashSet<K> {
    pub fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }
}

impl<K, S: Default, const N: usize> Default for HashSet<K, S, N> {
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, S, const N: usize> HashSet<K, S, N> {
    const MIN_BUCKETS: usize = {
        assert!(N > 0, "HashSet needs at least one bucket");
        N
    };

    pub fn with_hasher(hasher: S) -> Self {
        Self {
            hasher,
            table: Table::new(Self::MIN_BUCKETS),
            reentrancy: DebugReentrancy::new(),
        }
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    pub fn len(&self) -> usize {
        self.table.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.slots.is_empty()
    }

    pub fn bucket_count(&self) -> usize {
        self.table.buckets.len()
    }

    pub fn load_factor(&self) -> f64 {
        self.len() as f64 / self.bucket_count() as f64
    }

    pub fn max_load_factor(&self) -> f64 {
        MAX_LOAD_FACTOR
    }

    /// Keys of one chain, newest first. Empty for an out-of-range index.
    pub fn bucket(&self, index: usize) -> Chain<'_, K> {
        Chain {
            slots: &self.table.slots,
            cursor: self.table.buckets.get(index).copied().flatten(),
        }
    }

    pub fn bucket_len(&self, index: usize) -> usize {
        self.bucket(index).count()
    }

    pub fn iter(&self) -> Iter<'_, K> {
        Iter {
            entries: self.table.entries(),
            remaining: self.len(),
        }
    }

    pub fn begin(&self) -> Position {
        self.table.first_from(0)
    }

    pub fn end(&self) -> Position {
        Position::End
    }

    /// The position after `pos`: the next entry of the same chain, else the
    /// head of the next non-empty bucket, else `End`.
    pub fn next_position(&self, pos: Position) -> Position {
        match pos {
            Position::End => Position::End,
            Position::At { bucket, entry } => {
                match self.table.slots.get(entry.0).and_then(|e| e.next) {
                    Some(next) => Position::At {
                        bucket,
                        entry: Handle(next),
                    },
                    None => self.table.first_from(bucket.saturating_add(1)),
                }
            }
        }
    }

    /// The key at `pos`, or `None` for `End` and for erased entries.
    pub fn key_at(&self, pos: Position) -> Option<&K> {
        match pos {
            Position::At { entry, .. } => self.table.slots.get(entry.0).map(|e| &e.key),
            Position::End => None,
        }
    }

    /// Drop every key and go back to `N` buckets. The hasher is kept.
    pub fn clear(&mut self) {
        let old = {
            let _g = self.reentrancy.enter();
            mem::replace(&mut self.table, Table::new(Self::MIN_BUCKETS))
        };
        // Keys are dropped once the set is consistent again.
        drop(old);
    }

    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    /// Make room for `n` keys in total without exceeding the load factor.
    pub fn try_reserve(&mut self, n: usize) -> Result<()> {
        let _g = self.reentrancy.enter();
        self.table.reserve_for(n, Self::MIN_BUCKETS)
    }

    pub fn reserve(&mut self, n: usize) {
        if let Err(failure) = self.try_reserve(n) {
            growth_failed(failure)
        }
    }

    /// Rebuild the table with `max(N, n, ceil(len / 0.7))` buckets.
    pub fn try_rehash(&mut self, n: usize) -> Result<()> {
        let _g = self.reentrancy.enter();
        self.table.rehash_to(n, Self::MIN_BUCKETS)
    }

    pub fn rehash(&mut self, n: usize) {
        if let Err(failure) = self.try_rehash(n) {
            growth_failed(failure)
        }
    }

    /// A `Display` adapter listing every bucket and its chain, one per line.
    pub fn dump(&self) -> Dump<'_, K, S, N> {
        Dump { set: self }
    }
}

impl<K, S, const N: usize> HashSet<K, S, N>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    /// Index of the bucket `q` hashes to under the current bucket count.
    pub fn bucket_index<Q>(&self, q: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        self.table.bucket_of(self.make_hash(q))
    }

    pub fn find<Q>(&self, q: &Q) -> Position
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        let hash = self.make_hash(q);
        match self.table.locate(hash, q) {
            Some(k) => self.table.at(hash, k),
            None => Position::End,
        }
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        let k = self.table.locate(self.make_hash(q), q)?;
        Some(&self.table.slots[k].key)
    }

    pub fn contains<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        self.table.locate(self.make_hash(q), q).is_some()
    }

    /// 1 if `q` is present, 0 otherwise.
    pub fn count<Q>(&self, q: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        usize::from(self.contains(q))
    }

    /// Insert `key` unless an equal key is present.
    ///
    /// Returns the position of the key in the set and whether it was
    /// inserted. An insertion may first rehash, which invalidates earlier
    /// positions; the new key is prepended to its chain.
    pub fn try_insert(&mut self, key: K) -> Result<(Position, bool)> {
        let _g = self.reentrancy.enter();
        let hash = self.hasher.hash_one(&key);
        self.table.insert(hash, key, Self::MIN_BUCKETS)
    }

    pub fn insert(&mut self, key: K) -> (Position, bool) {
        match self.try_insert(key) {
            Ok(inserted) => inserted,
            Err(failure) => growth_failed(failure),
        }
    }

    /// Insert every key in order, skipping those already present.
    ///
    /// On failure the keys inserted so far stay in the set.
    pub fn try_extend<I>(&mut self, iter: I) -> Result<()>
    where
        I: IntoIterator<Item = K>,
    {
        let _g = self.reentrancy.enter();
        for key in iter {
            let hash = self.hasher.hash_one(&key);
            self.table.insert(hash, key, Self::MIN_BUCKETS)?;
        }
        Ok(())
    }

    /// Remove `q`; returns 1 if it was present, 0 otherwise. Never shrinks.
    pub fn erase<Q>(&mut self, q: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let removed = {
            let _g = self.reentrancy.enter();
            let hash = self.hasher.hash_one(q);
            self.table.unlink(hash, q)
        };
        // `K::drop` runs outside the guard.
        usize::from(removed.is_some())
    }
}

#[cfg(test)]
impl<K, S, const N: usize> HashSet<K, S, N>
where
    K: Hash,
    S: BuildHasher,
{
    /// Panics unless every entry sits in the bucket its cached hash selects,
    /// the cached hash is current, and every arena entry is reachable.
    pub(crate) fn assert_layout(&self) {
        let buckets = &self.table.buckets;
        let mut linked = 0;
        for (index, &head) in buckets.iter().enumerate() {
            let mut cur = head;
            while let Some(k) = cur {
                let entry = &self.table.slots[k];
                assert_eq!(entry.hash, self.hasher.hash_one(&entry.key), "stale cached hash");
                assert_eq!(
                    bucket_for(entry.hash, buckets.len()),
                    index,
                    "entry chained into the wrong bucket"
                );
                linked += 1;
                cur = entry.next;
            }
        }
        assert_eq!(linked, self.len(), "arena holds unlinked entries");
        assert!(buckets.len() >= N, "bucket count below the minimum");
        assert!(holds(buckets.len(), self.len()), "load factor exceeded");
    }
}

impl<K, S, const N: usize> Clone for HashSet<K, S, N>
where
    K: Clone,
    S: Clone,
{
    /// Same bucket count as `self`, keys re-inserted in iteration order.
    ///
    /// Cached hashes are reused, so `S` clones must hash like the source set's hasher.
    fn clone(&self) -> Self {
        let mut table = Table {
            buckets: vec![None; self.bucket_count()],
            slots: SlotMap::with_capacity_and_key(self.len()),
        };
        for entry in self.table.entries() {
            table.link(entry.hash, entry.key.clone());
        }
        Self {
            hasher: self.hasher.clone(),
            table,
            reentrancy: DebugReentrancy::new(),
        }
    }
}

impl<K, S1, S2, const N1: usize, const N2: usize> PartialEq<HashSet<K, S2, N2>>
    for HashSet<K, S1, N1>
where
    K: Eq + Hash,
    S1: BuildHasher,
    S2: BuildHasher,
{
    fn eq(&self, other: &HashSet<K, S2, N2>) -> bool {
        self.len() == other.len() && self.iter().all(|k| other.contains(k))
    }
}

impl<K, S, const N: usize> Eq for HashSet<K, S, N>
where
    K: Eq + Hash,
    S: BuildHasher,
{
}

impl<K, S, const N: usize> fmt::Debug for HashSet<K, S, N>
where
    K: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<K, S, const N: usize> Extend<K> for HashSet<K, S, N>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        if let Err(failure) = self.try_extend(iter) {
            growth_failed(failure)
        }
    }
}

impl<'a, K, S, const N: usize> Extend<&'a K> for HashSet<K, S, N>
where
    K: Eq + Hash + Copy + 'a,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = &'a K>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

impl<K, S, const N: usize> FromIterator<K> for HashSet<K, S, N>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
{
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut set = Self::default();
        set.extend(iter);
        set
    }
}

impl<K, const M: usize> From<[K; M]> for HashSet<K>
where
    K: Eq + Hash,
{
    fn from(keys: [K; M]) -> Self {
        let mut set = Self::new();
        set.extend(keys);
        set
    }
}

// Walks buckets in index order and each chain head-first.
struct Entries<'a, K> {
    buckets: core::slice::Iter<'a, Option<DefaultKey>>,
    slots: &'a SlotMap<DefaultKey, Entry<K>>,
    cursor: Option<DefaultKey>,
}

impl<'a, K> Clone for Entries<'a, K> {
    fn clone(&self) -> Self {
        Entries {
            buckets: self.buckets.clone(),
            slots: self.slots,
            cursor: self.cursor,
        }
    }
}

impl<'a, K> Iterator for Entries<'a, K> {
    type Item = &'a Entry<K>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(k) = self.cursor {
                let slots: &'a SlotMap<DefaultKey, Entry<K>> = self.slots;
                let entry = &slots[k];
                self.cursor = entry.next;
                return Some(entry);
            }
            self.cursor = *self.buckets.next()?;
        }
    }
}

/// Iterator over the keys of a `HashSet`, in bucket order.
pub struct Iter<'a, K> {
    entries: Entries<'a, K>,
    remaining: usize,
}

impl<'a, K> Clone for Iter<'a, K> {
    fn clone(&self) -> Self {
        Iter {
            entries: self.entries.clone(),
            remaining: self.remaining,
        }
    }
}

impl<'a, K> Iterator for Iter<'a, K> {
    type Item = &'a K;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.entries.next()?;
        self.remaining -= 1;
        Some(&entry.key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K> ExactSizeIterator for Iter<'_, K> {}
impl<K> FusedIterator for Iter<'_, K> {}

impl<'a, K, S, const N: usize> IntoIterator for &'a HashSet<K, S, N> {
    type Item = &'a K;
    type IntoIter = Iter<'a, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Owning iterator over the keys of a `HashSet`, in bucket order.
pub struct IntoIter<K> {
    buckets: std::vec::IntoIter<Option<DefaultKey>>,
    slots: SlotMap<DefaultKey, Entry<K>>,
    cursor: Option<DefaultKey>,
}

impl<K> Iterator for IntoIter<K> {
    type Item = K;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.cursor.take().and_then(|k| self.slots.remove(k)) {
                self.cursor = entry.next;
                return Some(entry.key);
            }
            self.cursor = self.buckets.next()?;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.slots.len(), Some(self.slots.len()))
    }
}

impl<K> ExactSizeIterator for IntoIter<K> {}
impl<K> FusedIterator for IntoIter<K> {}

impl<K, S, const N: usize> IntoIterator for HashSet<K, S, N> {
    type Item = K;
    type IntoIter = IntoIter<K>;

    fn into_iter(self) -> Self::IntoIter {
        let Table { buckets, slots } = self.table;
        IntoIter {
            buckets: buckets.into_iter(),
            slots,
            cursor: None,
        }
    }
}

/// Keys of a single chain, head first.
pub struct Chain<'a, K> {
    slots: &'a SlotMap<DefaultKey, Entry<K>>,
    cursor: Option<DefaultKey>,
}

impl<'a, K> Iterator for Chain<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        let slots: &'a SlotMap<DefaultKey, Entry<K>> = self.slots;
        let entry = &slots[self.cursor?];
        self.cursor = entry.next;
        Some(&entry.key)
    }
}

impl<K> FusedIterator for Chain<'_, K> {}

/// Text dump of a set's table, see `HashSet::dump`.
///
/// ```text
/// table_size = 7, current_size = 3
/// 0:
/// 1:
/// 2:
/// 3: --{17} --{10} --{3}
/// ...
/// ```
pub struct Dump<'a, K, S, const N: usize> {
    set: &'a HashSet<K, S, N>,
}

impl<K, S, const N: usize> fmt::Display for Dump<'_, K, S, N>
where
    K: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "table_size = {}, current_size = {}",
            self.set.bucket_count(),
            self.set.len()
        )?;
        for index in 0..self.set.bucket_count() {
            write!(f, "{}:", index)?;
            for key in self.set.bucket(index) {
                write!(f, " --{{{:?}}}", key)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
