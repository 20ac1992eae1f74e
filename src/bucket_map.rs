//! BucketMap: open hashing over a fixed array of growable buckets.
//!
//! Each bucket keeps two parallel `List`s (keys and values) that always have
//! equal length. A key lives in bucket `hash(key) % bucket_count`; the bucket
//! count is chosen at construction and never changes, so there is no global
//! rehash. A skewed hash distribution degrades the affected buckets to a
//! linear scan; `load_factor` and `longest_bucket` make that visible.

use crate::hash::FixedState;
use crate::list::List;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::ops::Index;

/// One slot of the bucket array.
#[derive(Clone)]
pub struct Bucket<K, V> {
    keys: List<K>,
    values: List<V>,
}

impl<K, V> Bucket<K, V> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            keys: List::with_capacity(capacity),
            values: List::with_capacity(capacity),
        }
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> &[K] {
        self.keys.as_slice()
    }

    /// Values paired index-for-index with `keys()`.
    pub fn values(&self) -> &[V] {
        self.values.as_slice()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn position<Q>(&self, q: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        self.keys.iter().position(|k| k.borrow() == q)
    }

    fn remove_at(&mut self, i: usize) -> (K, V) {
        let k = self
            .keys
            .remove_at(i)
            .expect("bucket position must index its key list");
        let v = self
            .values
            .remove_at(i)
            .expect("value list must match key list length");
        (k, v)
    }
}

pub struct BucketMap<K, V, S = FixedState> {
    hasher: S,
    buckets: Box<[Bucket<K, V>]>,
    len: usize,
}

impl<K, V> BucketMap<K, V>
where
    K: Eq + Hash,
{
    /// Create a map with the default deterministic hasher.
    pub fn new(bucket_count: usize, bucket_capacity: usize) -> Self {
        Self::with_hasher(FixedState::new(), bucket_count, bucket_capacity)
    }
}

/// Iterator over entries in bucket order.
pub struct Iter<'a, K, V> {
    buckets: core::slice::Iter<'a, Bucket<K, V>>,
    current: Option<core::iter::Zip<core::slice::Iter<'a, K>, core::slice::Iter<'a, V>>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(it) = self.current.as_mut() {
                if let Some(item) = it.next() {
                    return Some(item);
                }
            }
            let b = self.buckets.next()?;
            self.current = Some(b.keys.iter().zip(b.values.iter()));
        }
    }
}

/// Mutable iterator over entries in bucket order.
pub struct IterMut<'a, K, V> {
    buckets: core::slice::IterMut<'a, Bucket<K, V>>,
    current: Option<core::iter::Zip<core::slice::Iter<'a, K>, core::slice::IterMut<'a, V>>>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(it) = self.current.as_mut() {
                if let Some(item) = it.next() {
                    return Some(item);
                }
            }
            let b = self.buckets.next()?;
            self.current = Some(b.keys.iter().zip(b.values.iter_mut()));
        }
    }
}

impl<K, V, S> BucketMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Create a map with `bucket_count` buckets, each pre-sized for
    /// `bucket_capacity` entries.
    ///
    /// Panics if either count is zero.
    pub fn with_hasher(hasher: S, bucket_count: usize, bucket_capacity: usize) -> Self {
        assert!(bucket_count > 0, "BucketMap bucket_count must be non-zero");
        assert!(
            bucket_capacity > 0,
            "BucketMap bucket_capacity must be non-zero"
        );
        let buckets = (0..bucket_count)
            .map(|_| Bucket::with_capacity(bucket_capacity))
            .collect();
        Self {
            hasher,
            buckets,
            len: 0,
        }
    }

    fn bucket_index<Q>(&self, q: &Q) -> usize
    where
        Q: ?Sized + Hash,
    {
        (self.hasher.hash_one(q) % self.buckets.len() as u64) as usize
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    /// Entries per bucket.
    pub fn load_factor(&self) -> f64 {
        self.len as f64 / self.buckets.len() as f64
    }

    /// Length of the fullest bucket: the worst-case scan for a lookup.
    pub fn longest_bucket(&self) -> usize {
        self.buckets.iter().map(Bucket::len).max().unwrap_or(0)
    }

    /// Panics if `index >= bucket_count()`.
    pub fn bucket(&self, index: usize) -> &Bucket<K, V> {
        &self.buckets[index]
    }

    /// Insert or overwrite. Returns the previous value when `key` was present;
    /// the entry count only grows for new keys.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let bi = self.bucket_index(&key);
        let bucket = &mut self.buckets[bi];
        match bucket.position(&key) {
            Some(i) => Some(
                bucket
                    .values
                    .replace_at(i, value)
                    .expect("value list must match key list length"),
            ),
            None => {
                bucket.keys.push(key);
                bucket.values.push(value);
                self.len += 1;
                None
            }
        }
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.buckets[self.bucket_index(q)].position(q).is_some()
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let bucket = &self.buckets[self.bucket_index(q)];
        let i = bucket.position(q)?;
        bucket.values.get(i)
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let bi = self.bucket_index(q);
        let bucket = &mut self.buckets[bi];
        let i = bucket.position(q)?;
        bucket.values.get_mut(i)
    }

    /// Borrow the value for a key known to be present.
    ///
    /// Panics if the key is absent; check with `contains_key` or use `get`
    /// when presence is not guaranteed.
    pub fn value<Q>(&self, q: &Q) -> &V
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        match self.get(q) {
            Some(v) => v,
            None => panic!("BucketMap::value: key not present"),
        }
    }

    /// Mutable counterpart of `value`; panics if the key is absent.
    pub fn value_mut<Q>(&mut self, q: &Q) -> &mut V
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        match self.get_mut(q) {
            Some(v) => v,
            None => panic!("BucketMap::value_mut: key not present"),
        }
    }

    /// Remove a key known to be present; panics otherwise.
    pub fn remove<Q>(&mut self, q: &Q) -> V
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        match self.try_remove(q) {
            Some(v) => v,
            None => panic!("BucketMap::remove: key not present"),
        }
    }

    /// Remove a key if present. The bucket is compacted immediately.
    pub fn try_remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.try_remove_entry(q).map(|(_, v)| v)
    }

    pub fn try_remove_entry<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let bi = self.bucket_index(q);
        let bucket = &mut self.buckets[bi];
        let i = bucket.position(q)?;
        let entry = bucket.remove_at(i);
        self.len -= 1;
        Some(entry)
    }

    /// Drop every entry; buckets keep their allocations.
    pub fn clear(&mut self) {
        for b in self.buckets.iter_mut() {
            b.keys.clear();
            b.values.clear();
        }
        self.len = 0;
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            buckets: self.buckets.iter(),
            current: None,
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            buckets: self.buckets.iter_mut(),
            current: None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, v)| v)
    }

    /// Copy every key into a fresh list, bucket by bucket.
    pub fn key_list(&self) -> List<K>
    where
        K: Clone,
    {
        let mut out = List::with_capacity(self.len);
        for b in self.buckets.iter() {
            out.extend_from_list(&b.keys);
        }
        out
    }

    /// Copy every value into a fresh list, in the same order as `key_list`.
    pub fn value_list(&self) -> List<V>
    where
        V: Clone,
    {
        let mut out = List::with_capacity(self.len);
        for b in self.buckets.iter() {
            out.extend_from_list(&b.values);
        }
        out
    }
}

impl<K, V, S> Clone for BucketMap<K, V, S>
where
    K: Clone,
    V: Clone,
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            hasher: self.hasher.clone(),
            buckets: self.buckets.clone(),
            len: self.len,
        }
    }
}

impl<K, V, S> fmt::Debug for BucketMap<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut m = f.debug_map();
        for b in self.buckets.iter() {
            m.entries(b.keys.iter().zip(b.values.iter()));
        }
        m.finish()
    }
}

impl<K, V, S, Q> Index<&Q> for BucketMap<K, V, S>
where
    K: Eq + Hash + Borrow<Q>,
    Q: ?Sized + Hash + Eq,
    S: BuildHasher,
{
    type Output = V;

    fn index(&self, q: &Q) -> &V {
        self.value(q)
    }
}

impl<K, V, S> Extend<(K, V)> for BucketMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<'a, K, V, S> IntoIterator for &'a BucketMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::IdentityState;
    use std::collections::BTreeSet;

    fn identity_map(buckets: usize) -> BucketMap<u32, String, IdentityState> {
        BucketMap::with_hasher(IdentityState, buckets, 2)
    }

    /// Invariant: inserted keys are found with the last value written.
    #[test]
    fn insert_then_lookup() {
        let mut m: BucketMap<String, i32> = BucketMap::new(8, 2);
        assert!(m.insert("a".to_string(), 1).is_none());
        assert!(m.insert("b".to_string(), 2).is_none());
        assert!(m.contains_key("a"));
        assert_eq!(m.get("b"), Some(&2));
        assert_eq!(*m.value("a"), 1);
        assert_eq!(m["b"], 2);
        assert!(m.get("c").is_none());
        assert_eq!(m.len(), 2);
    }

    /// Invariant: reinserting a key overwrites in place without growing the map.
    #[test]
    fn reinsert_is_last_write_wins() {
        let mut m: BucketMap<String, i32> = BucketMap::new(4, 1);
        m.insert("k".to_string(), 1);
        assert_eq!(m.insert("k".to_string(), 2), Some(1));
        assert_eq!(m.len(), 1);
        assert_eq!(m.get("k"), Some(&2));
    }

    /// Invariant: keys land in `hash % bucket_count`, in insertion order.
    #[test]
    fn keys_land_in_hash_mod_bucket() {
        let mut m = identity_map(4);
        for k in 1..=5u32 {
            m.insert(k, format!("v{}", k));
        }
        assert_eq!(m.len(), 5);
        assert_eq!(m.bucket(0).keys(), &[4]);
        assert_eq!(m.bucket(1).keys(), &[1, 5]);
        assert_eq!(m.bucket(1).values(), &["v1".to_string(), "v5".to_string()]);
        assert_eq!(m.bucket(2).keys(), &[2]);
        assert_eq!(m.bucket(3).keys(), &[3]);
        assert_eq!(m.longest_bucket(), 2);
        assert!((m.load_factor() - 1.25).abs() < f64::EPSILON);
    }

    /// Invariant: removal compacts the bucket and keeps the parallel lists aligned.
    #[test]
    fn remove_compacts_bucket() {
        let mut m = identity_map(4);
        for k in [1u32, 5, 9] {
            m.insert(k, k.to_string());
        }
        assert_eq!(m.remove(&5), "5");
        assert_eq!(m.bucket(1).keys(), &[1, 9]);
        assert_eq!(m.bucket(1).values(), &["1".to_string(), "9".to_string()]);
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn try_remove_absent_is_noop() {
        let mut m = identity_map(2);
        m.insert(1, "one".to_string());
        assert!(m.try_remove(&2).is_none());
        assert_eq!(m.len(), 1);
        assert_eq!(m.try_remove(&1), Some("one".to_string()));
        assert!(m.is_empty());
        assert!(!m.contains_key(&1));
    }

    #[test]
    #[should_panic(expected = "key not present")]
    fn value_of_absent_key_panics() {
        let m = identity_map(2);
        let _ = m.value(&3);
    }

    #[test]
    #[should_panic(expected = "key not present")]
    fn remove_of_absent_key_panics() {
        let mut m = identity_map(2);
        let _ = m.remove(&3);
    }

    #[test]
    #[should_panic(expected = "bucket_count must be non-zero")]
    fn zero_buckets_rejected() {
        let _m: BucketMap<u32, u32> = BucketMap::new(0, 1);
    }

    #[test]
    #[should_panic(expected = "bucket_capacity must be non-zero")]
    fn zero_bucket_capacity_rejected() {
        let _m: BucketMap<u32, u32> = BucketMap::new(1, 0);
    }

    /// Invariant: `value_mut`/`get_mut`/`iter_mut` write through to stored values.
    #[test]
    fn mutation_paths_write_through() {
        let mut m: BucketMap<&'static str, i32> = BucketMap::new(3, 1);
        m.insert("x", 1);
        m.insert("y", 2);
        *m.value_mut("x") += 10;
        *m.get_mut("y").unwrap() += 20;
        for (_k, v) in m.iter_mut() {
            *v *= 2;
        }
        assert_eq!(m["x"], 22);
        assert_eq!(m["y"], 44);
    }

    /// Invariant: `key_list`/`value_list` follow bucket order and pair up index-wise.
    #[test]
    fn key_and_value_lists_follow_bucket_order() {
        let mut m = identity_map(3);
        for k in [3u32, 1, 4, 6, 2] {
            m.insert(k, format!("v{}", k));
        }
        let keys = m.key_list();
        let values = m.value_list();
        assert_eq!(keys.as_slice(), &[3, 6, 1, 4, 2]);
        for (k, v) in keys.iter().zip(values.iter()) {
            assert_eq!(*v, format!("v{}", k));
        }
        let from_iter: Vec<u32> = m.keys().copied().collect();
        assert_eq!(from_iter.as_slice(), keys.as_slice());
    }

    /// Invariant: a clone is deep; mutations on either side stay local.
    #[test]
    fn clone_is_independent() {
        let mut src: BucketMap<String, Vec<i32>> = BucketMap::new(4, 1);
        src.insert("a".to_string(), vec![1]);
        src.insert("b".to_string(), vec![2]);

        let mut copy = src.clone();
        assert_eq!(copy.bucket_count(), src.bucket_count());
        for (k, v) in src.iter() {
            assert_eq!(copy.get(k.as_str()), Some(v));
        }

        copy.value_mut("a").push(9);
        copy.insert("c".to_string(), vec![3]);
        copy.remove("b");

        assert_eq!(src.get("a"), Some(&vec![1]));
        assert!(src.contains_key("b"));
        assert!(!src.contains_key("c"));
        assert_eq!(src.len(), 2);
    }

    /// Invariant: every key colliding into one bucket is still resolved by `Eq`.
    #[test]
    fn single_bucket_degrades_to_linear_scan() {
        let mut m: BucketMap<String, usize> = BucketMap::new(1, 1);
        for i in 0..50 {
            m.insert(format!("k{}", i), i);
        }
        assert_eq!(m.longest_bucket(), 50);
        for i in 0..50 {
            assert_eq!(m[format!("k{}", i).as_str()], i);
        }
    }

    #[test]
    fn clear_and_extend() {
        let mut m: BucketMap<u32, u32> = BucketMap::new(4, 1);
        m.extend((0..10).map(|i| (i, i * i)));
        assert_eq!(m.len(), 10);
        let seen: BTreeSet<u32> = (&m).into_iter().map(|(k, _)| *k).collect();
        assert_eq!(seen, (0..10).collect());
        m.clear();
        assert!(m.is_empty());
        assert_eq!(m.iter().count(), 0);
        assert_eq!(m.bucket_count(), 4);
    }
}
