//! chain-hashset: a single-threaded HashSet built on separate chaining,
//! with chains linked by index through an arena instead of by pointer.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a set whose table layout is fully determined (bucket index,
//!   chain order, growth sequence) so it can be inspected and reasoned
//!   about, while staying in safe Rust.
//! - Layers:
//!   - Table<K>: bucket heads (`Vec<Option<key>>`) plus a `SlotMap` arena
//!     of entries. Each entry holds its key, its cached hash and the arena
//!     key of the next entry in its chain. Never hashes anything itself.
//!   - HashSet<K, S, N>: owns the hasher `S` and the table; hashes once per
//!     operation and hands the hash down; guards entry points with a
//!     debug-only reentrancy check.
//!
//! Constraints
//! - Single-threaded: the set is `Send` but not `Sync`.
//! - Unique keys; a duplicate insert reports the existing position.
//! - `len() <= 0.7 * bucket_count()` after every insertion, and
//!   `bucket_count() >= N` always.
//! - Growth doubles the bucket count until the load factor holds, then
//!   makes it odd. Erasing never shrinks the table.
//!
//! Chain order
//! - Inserts prepend, so a chain lists newest keys first.
//! - A rehash walks old buckets in index order and each chain head-first,
//!   prepending into the new chains. Keys that share a bucket before and
//!   after come out reversed.
//! - Iteration visits buckets in index order and each chain head-first.
//!
//! Hasher and rehashing invariants
//! - Each entry stores its precomputed `u64` hash; rehash and clone use the
//!   stored hash, so `K: Hash` is never invoked after insertion.
//! - Lookups compare the stored hash before calling `K: Eq`.
//!
//! Failure
//! - An insert reserves arena room for its entry, then growth allocates the
//!   new bucket array, both before touching the table, so a failed
//!   `try_insert`/`try_reserve`/`try_rehash` leaves the set exactly as it was. The non-`try` methods panic on the same failure.
//!
//! Positions
//! - `Position` is `At { bucket, entry }` or `End`. Entry handles are
//!   generational arena keys: an erased entry's position never resolves to a
//!   later key. Positions are invalidated by any rehash.
//!
//! Notes and non-goals
//! - No shrinking, no ordered iteration, no multiset semantics.
//! - Equality of keys comes from `K: Eq`; wrap keys in a newtype to change it.

mod error;
pub mod hash_set;
mod hash_set_proptest;
mod reentrancy;

// Public surface
pub use error::{Failure, Result};
pub use hash_set::{HashSet, Position, DEFAULT_MIN_BUCKETS, MAX_LOAD_FACTOR};
