#![cfg(test)]

// Property tests for HashSet kept inside the crate so they can check the
// table layout (chain placement, cached hashes) after every operation.

use crate::hash_set::{HashSet, Position};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashSet as StdHashSet};
use std::hash::{BuildHasher, Hasher};

#[derive(Clone, Debug)]
enum Op {
    Insert(u16),
    Extend(Vec<u16>),
    Erase(u16),
    Find(u16),
    Rehash(usize),
    Reserve(usize),
    Clear,
    Iterate,
}

fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    let key = 0u16..64;
    let op = prop_oneof![
        6 => key.clone().prop_map(Op::Insert),
        1 => proptest::collection::vec(key.clone(), 0..12).prop_map(Op::Extend),
        3 => key.clone().prop_map(Op::Erase),
        2 => key.prop_map(Op::Find),
        1 => (0usize..80).prop_map(Op::Rehash),
        1 => (0usize..80).prop_map(Op::Reserve),
        1 => Just(Op::Clear),
        1 => Just(Op::Iterate),
    ];
    proptest::collection::vec(op, 1..120)
}

// Collision variant: few distinct hashes, long chains.
#[derive(Clone, Default)]
struct NarrowBuildHasher;
#[derive(Default)]
struct NarrowHasher(u64);
impl BuildHasher for NarrowBuildHasher {
    type Hasher = NarrowHasher;
    fn build_hasher(&self) -> Self::Hasher {
        NarrowHasher(0)
    }
}
impl Hasher for NarrowHasher {
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = self.0.wrapping_add(u64::from(b));
        }
    }
    fn finish(&self) -> u64 {
        self.0 % 3
    }
}

fn run<S: BuildHasher + Default, const N: usize>(ops: Vec<Op>) -> Result<(), TestCaseError> {
    let mut sut: HashSet<u16, S, N> = HashSet::default();
    let mut model: StdHashSet<u16> = StdHashSet::new();

    for op in ops {
        let buckets_before = sut.bucket_count();
        match op {
            Op::Insert(k) => {
                let (pos, inserted) = sut.insert(k);
                prop_assert_eq!(inserted, model.insert(k));
                prop_assert_eq!(sut.key_at(pos), Some(&k));
                prop_assert_eq!(pos, sut.find(&k));
            }
            Op::Extend(keys) => {
                sut.extend(keys.iter().copied());
                model.extend(keys);
            }
            Op::Erase(k) => {
                let removed = sut.erase(&k);
                prop_assert_eq!(removed, usize::from(model.remove(&k)));
                prop_assert_eq!(sut.bucket_count(), buckets_before, "erase never resizes");
            }
            Op::Find(k) => {
                let pos = sut.find(&k);
                prop_assert_eq!(pos != Position::End, model.contains(&k));
                prop_assert_eq!(sut.count(&k), usize::from(model.contains(&k)));
                if let Position::At { bucket, .. } = pos {
                    prop_assert_eq!(bucket, sut.bucket_index(&k));
                }
            }
            Op::Rehash(n) => {
                let before: BTreeSet<u16> = sut.iter().copied().collect();
                sut.rehash(n);
                let after: BTreeSet<u16> = sut.iter().copied().collect();
                prop_assert_eq!(before, after);
                prop_assert!(sut.bucket_count() >= n.max(N));
            }
            Op::Reserve(n) => {
                sut.reserve(n);
                prop_assert!(sut.bucket_count() * 7 >= n * 10);
                if sut.bucket_count() != buckets_before {
                    prop_assert_eq!(sut.bucket_count() % 2, 1, "growth lands on odd counts");
                }
            }
            Op::Clear => {
                sut.clear();
                model.clear();
                prop_assert_eq!(sut.bucket_count(), N);
            }
            Op::Iterate => {
                let keys: Vec<u16> = sut.iter().copied().collect();
                prop_assert_eq!(keys.len(), sut.len());
                let s_keys: BTreeSet<u16> = keys.into_iter().collect();
                let m_keys: BTreeSet<u16> = model.iter().copied().collect();
                prop_assert_eq!(s_keys, m_keys);
            }
        }

        sut.assert_layout();
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
    }
    Ok(())
}

// Property: state-machine equivalence against std::collections::HashSet.
// After each op the table layout is checked: every entry in the bucket its
// cached hash selects, no unreachable arena entries, load factor held.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine(ops in arb_ops()) {
        run::<std::collections::hash_map::RandomState, 7>(ops)?;
    }

    #[test]
    fn prop_state_machine_small_minimum(ops in arb_ops()) {
        run::<std::collections::hash_map::RandomState, 1>(ops)?;
    }

    #[test]
    fn prop_state_machine_with_collisions(ops in arb_ops()) {
        run::<NarrowBuildHasher, 3>(ops)?;
    }
}
