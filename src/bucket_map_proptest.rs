#![cfg(test)]

// Property tests for BucketMap kept inside the crate so they can inspect
// individual buckets.

use crate::bucket_map::BucketMap;
use crate::hash::IdentityState;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::{BuildHasher, Hasher};

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations shrink toward earlier keys and shorter op lists.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, i32),
    TryRemove(usize),
    Get(usize),
    Contains(String),
    Mutate(usize, i32),
    KeyList,
    Copy,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=8).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            3 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Insert(i, v)),
            2 => idx.clone().prop_map(OpI::TryRemove),
            1 => idx.clone().prop_map(OpI::Get),
            1 => prop_oneof![contains_pool, "[a-z]{0,5}"].prop_map(OpI::Contains),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            1 => Just(OpI::KeyList),
            1 => Just(OpI::Copy),
        ];
        proptest::collection::vec(op, 1..60).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Drive `sut` and a std HashMap model through the same operations.
// Invariants exercised after every op:
// - `insert` returns the previous value iff the model already had the key.
// - `try_remove` is Some iff present, and the key is gone afterwards.
// - `get`/`contains_key` parity with the model (borrowed `&str` lookups).
// - `key_list` holds exactly the live keys, once each.
// - Every key sits in bucket `hash % bucket_count`; each bucket's key and
//   value lists have equal length.
// - A copy taken mid-run is unaffected by later mutation of the original.
fn run_state_machine<S>(
    mut sut: BucketMap<Key, i32, S>,
    pool: Vec<String>,
    ops: Vec<OpI>,
) -> Result<(), TestCaseError>
where
    S: BuildHasher + Clone,
{
    let mut model: HashMap<Key, i32> = HashMap::new();
    let mut snapshots: Vec<(BucketMap<Key, i32, S>, HashMap<Key, i32>)> = Vec::new();

    for op in ops {
        match op {
            OpI::Insert(i, v) => {
                let k = key_from(&pool, i);
                let prev = sut.insert(k.clone(), v);
                prop_assert_eq!(prev, model.insert(k, v));
            }
            OpI::TryRemove(i) => {
                let k = key_from(&pool, i);
                let before = sut.len();
                let removed = sut.try_remove(k.0.as_str());
                prop_assert_eq!(removed, model.remove(&k));
                if removed.is_some() {
                    prop_assert_eq!(sut.len(), before - 1);
                } else {
                    prop_assert_eq!(sut.len(), before);
                }
                prop_assert!(!sut.contains_key(&k));
            }
            OpI::Get(i) => {
                let k = key_from(&pool, i);
                prop_assert_eq!(sut.get(&k), model.get(&k));
            }
            OpI::Contains(s) => {
                let has_model = model.keys().any(|k| k.0 == s);
                prop_assert_eq!(sut.contains_key(s.as_str()), has_model);
            }
            OpI::Mutate(i, d) => {
                let k = key_from(&pool, i);
                if let Some(mv) = model.get_mut(&k) {
                    let sv = sut.value_mut(&k);
                    *sv = sv.saturating_add(d);
                    *mv = mv.saturating_add(d);
                } else {
                    prop_assert!(sut.get_mut(&k).is_none());
                }
            }
            OpI::KeyList => {
                let keys = sut.key_list();
                let set: BTreeSet<Key> = keys.iter().cloned().collect();
                prop_assert_eq!(keys.len(), set.len(), "key_list must not repeat keys");
                let m_keys: BTreeSet<Key> = model.keys().cloned().collect();
                prop_assert_eq!(set, m_keys);
                prop_assert_eq!(sut.value_list().len(), keys.len());
            }
            OpI::Copy => snapshots.push((sut.clone(), model.clone())),
        }

        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());

        let n = sut.bucket_count() as u64;
        for b in 0..sut.bucket_count() {
            let bucket = sut.bucket(b);
            prop_assert_eq!(bucket.keys().len(), bucket.values().len());
            for k in bucket.keys() {
                prop_assert_eq!((sut.hasher().hash_one(k) % n) as usize, b);
            }
        }
    }

    for (copy, frozen) in snapshots {
        prop_assert_eq!(copy.len(), frozen.len());
        for (k, v) in &frozen {
            prop_assert_eq!(copy.get(k), Some(v));
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario(), buckets in 1usize..=16) {
        run_state_machine(BucketMap::new(buckets, 1), pool, ops)?;
    }
}

// Constant hasher: every key collides into bucket 0.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

// Property: same invariants under worst-case collisions, where lookups
// depend entirely on the in-bucket `Eq` scan.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario(), buckets in 1usize..=4) {
        run_state_machine(BucketMap::with_hasher(ConstBuildHasher, buckets, 1), pool, ops)?;
    }
}

// Property: with the identity hasher, each integer key sits in bucket
// `k % bucket_count` and buckets keep insertion order.
proptest! {
    #[test]
    fn prop_identity_bucket_placement(keys in proptest::collection::vec(0u32..1000, 0..64), buckets in 1usize..=8) {
        let mut m: BucketMap<u32, u32, IdentityState> = BucketMap::with_hasher(IdentityState, buckets, 1);
        let mut order: Vec<Vec<u32>> = vec![Vec::new(); buckets];
        for k in keys {
            if m.insert(k, k).is_none() {
                order[k as usize % buckets].push(k);
            }
        }
        for (b, expected) in order.iter().enumerate() {
            prop_assert_eq!(m.bucket(b).keys(), expected.as_slice());
        }
    }
}
