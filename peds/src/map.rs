//! A persistent hash map.
//!
//! The map is a [`Vector`] of buckets. Each bucket holds the items whose keys
//! hash to its index, in insertion order, and is replaced as a whole whenever
//! one of its items changes. Because the buckets are stored in a persistent
//! vector, an update copies one bucket plus the path to it and shares
//! everything else with the previous version.
//!
//! The number of buckets follows the number of items: when the average
//! bucket size leaves the range allowed by the map's [`Config`], all the
//! items are redistributed into a bucket vector of a better size.

use std::{
    borrow::Borrow,
    fmt,
    hash::{BuildHasher, Hash},
    iter::FusedIterator,
    marker::PhantomData,
    sync::Arc,
};

use crate::{
    config::Config,
    hash::{bucket_index, BuildCrc32Hasher},
    metrics::increment,
    vector::{self, Vector},
};

// Empty buckets are always stored as `None`.
type Bucket<K, V> = Option<Arc<[(K, V)]>>;

/// A persistent hash map.
///
/// # Examples
///
/// ```rust
/// use peds::Map;
///
/// let m1 = Map::new().insert("a", 1);
/// let m2 = m1.insert("b", 2);
/// assert_eq!(m1.get("b"), None);
/// assert_eq!(m2.get("b"), Some(&2));
/// assert_eq!(m2.remove("a").len(), 1);
/// ```
pub struct Map<K, V, S = BuildCrc32Hasher> {
    buckets: Vector<Bucket<K, V>>,
    length: usize,
    hasher: S,
    config: Config,
}

impl<K, V, S: Clone> Clone for Map<K, V, S> {
    fn clone(&self) -> Self {
        Map {
            buckets: self.buckets.clone(),
            length: self.length,
            hasher: self.hasher.clone(),
            config: self.config,
        }
    }
}

impl<K, V> Map<K, V> {
    pub fn new() -> Self {
        Self::with_hasher_and_config(BuildCrc32Hasher, Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self::with_hasher_and_config(BuildCrc32Hasher, config)
    }
}

impl<K, V, S> Map<K, V, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_hasher_and_config(hasher, Config::default())
    }

    pub fn with_hasher_and_config(hasher: S, config: Config) -> Self {
        Map {
            buckets: Vector::new().push(None),
            length: 0,
            hasher,
            config,
        }
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    pub fn config(&self) -> Config {
        self.config
    }

    /// Iterates over the items, bucket by bucket.
    ///
    /// The order is unspecified but stable: iterating twice over the same
    /// map gives the same order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            buckets: self.buckets.iter(),
            items: Default::default(),
            remaining: self.length,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    /// Returns true if both maps are the same version. In particular, removing
    /// a key that isn't present returns a map that is `ptr_eq` to the original.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.buckets.ptr_eq(&other.buckets)
    }

    fn bucket(&self, idx: usize) -> &[(K, V)] {
        match self.buckets.get(idx) {
            Ok(Some(bucket)) => &bucket[..],
            _ => &[],
        }
    }
}

impl<K, V, S> Map<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn pos<Q: Hash + ?Sized>(&self, key: &Q) -> usize {
        bucket_index(&self.hasher, key, self.buckets.len())
    }

    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.bucket(self.pos(key))
            .iter()
            .find(|(k, _)| k.borrow() == key)
            .map(|(k, v)| (k, v))
    }

    /// Gets the value associated with `key`, if there is one.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_key_value(key).map(|(_, v)| v)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.get_key_value(key).is_some()
    }

    /// Panics if the internal structure is inconsistent.
    pub fn check_invariants(&self) {
        self.buckets.check_invariants();
        assert!(!self.buckets.is_empty());

        let mut count = 0;
        for (idx, bucket) in self.buckets.iter().enumerate() {
            let Some(bucket) = bucket else {
                continue;
            };
            assert!(!bucket.is_empty(), "empty bucket stored as present");
            for (i, (k, _)) in bucket.iter().enumerate() {
                assert_eq!(self.pos(k), idx, "item in the wrong bucket");
                assert!(
                    bucket[..i].iter().all(|(other, _)| other != k),
                    "duplicate key"
                );
            }
            count += bucket.len();
        }
        assert_eq!(count, self.length);
        assert!(!self.config.needs_grow(self.length, self.buckets.len()));
        assert!(!self.config.needs_shrink(self.length, self.buckets.len()));
    }
}

impl<K, V, S> Map<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher + Clone,
{
    /// Returns a new map in which `key` is associated with `value`.
    ///
    /// If `key` was already present, its value is replaced and the length
    /// stays the same.
    pub fn insert(&self, key: K, value: V) -> Self {
        let idx = self.pos(&key);
        let bucket = self.bucket(idx);
        let existing = bucket.iter().position(|(k, _)| *k == key);

        if existing.is_none() && self.config.needs_grow(self.length + 1, self.buckets.len()) {
            let mut buckets = Buckets::new(&self.config, self.length + 1);
            buckets.add_all(&self.hasher, self.iter().map(|(k, v)| (k.clone(), v.clone())));
            buckets.add_item(&self.hasher, key, value);

            let ret = buckets.into_map(self.hasher.clone(), self.config);
            log::debug!(
                "growing map of {} items from {} to {} buckets",
                ret.length,
                self.buckets.len(),
                ret.buckets.len()
            );
            increment!("peds::map::grow");
            return ret;
        }

        let (new_bucket, length) = match existing {
            Some(i) => {
                let mut new_bucket = bucket.to_vec();
                new_bucket[i] = (key, value);
                (new_bucket, self.length)
            }
            None => {
                let mut new_bucket = Vec::with_capacity(bucket.len() + 1);
                new_bucket.extend_from_slice(bucket);
                new_bucket.push((key, value));
                (new_bucket, self.length + 1)
            }
        };

        Map {
            buckets: self.buckets.assoc(idx, Some(Arc::from(new_bucket))),
            length,
            hasher: self.hasher.clone(),
            config: self.config,
        }
    }

    /// Returns a new map without `key`.
    ///
    /// If `key` isn't present, the returned map is [`ptr_eq`](Map::ptr_eq) to
    /// this one.
    pub fn remove<Q>(&self, key: &Q) -> Self
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.pos(key);
        let bucket = self.bucket(idx);
        if !bucket.iter().any(|(k, _)| k.borrow() == key) {
            return self.clone();
        }

        let remaining: Vec<(K, V)> = bucket
            .iter()
            .filter(|(k, _)| k.borrow() != key)
            .cloned()
            .collect();
        let length = self.length - (bucket.len() - remaining.len());
        let new_bucket = if remaining.is_empty() {
            None
        } else {
            Some(Arc::from(remaining))
        };

        let ret = Map {
            buckets: self.buckets.assoc(idx, new_bucket),
            length,
            hasher: self.hasher.clone(),
            config: self.config,
        };

        if self.config.needs_shrink(ret.length, ret.buckets.len()) {
            let mut buckets = Buckets::new(&self.config, ret.length);
            buckets.add_all(&self.hasher, ret.iter().map(|(k, v)| (k.clone(), v.clone())));
            let shrunk = buckets.into_map(self.hasher.clone(), self.config);
            log::debug!(
                "shrinking map of {} items from {} to {} buckets",
                shrunk.length,
                ret.buckets.len(),
                shrunk.buckets.len()
            );
            increment!("peds::map::shrink");
            shrunk
        } else {
            ret
        }
    }

    /// Builds a map out of `items`, with a bucket vector sized for them.
    /// Later items override earlier ones with the same key.
    pub fn from_iter_with<I>(items: I, hasher: S, config: Config) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let items: Vec<_> = items.into_iter().collect();
        let mut buckets = Buckets::new(&config, items.len());
        buckets.add_all(&hasher, items);
        buckets.into_map(hasher, config)
    }
}

/// The mutable buckets that a map is built from when it gets (re)allocated.
struct Buckets<K, V> {
    buckets: Vec<Vec<(K, V)>>,
    length: usize,
}

impl<K: Hash + Eq, V> Buckets<K, V> {
    fn new(config: &Config, item_count: usize) -> Self {
        Buckets {
            buckets: std::iter::repeat_with(Vec::new)
                .take(config.bucket_count(item_count))
                .collect(),
            length: 0,
        }
    }

    fn add_item<S: BuildHasher>(&mut self, hasher: &S, key: K, value: V) {
        let idx = bucket_index(hasher, &key, self.buckets.len());
        let bucket = &mut self.buckets[idx];
        if let Some(item) = bucket.iter_mut().find(|(k, _)| *k == key) {
            *item = (key, value);
        } else {
            bucket.push((key, value));
            self.length += 1;
        }
    }

    fn add_all<S: BuildHasher>(&mut self, hasher: &S, items: impl IntoIterator<Item = (K, V)>) {
        for (key, value) in items {
            self.add_item(hasher, key, value);
        }
    }

    fn into_map<S>(self, hasher: S, config: Config) -> Map<K, V, S> {
        let buckets = self
            .buckets
            .into_iter()
            .map(|bucket| (!bucket.is_empty()).then(|| Arc::from(bucket)))
            .collect();
        Map {
            buckets,
            length: self.length,
            hasher,
            config,
        }
    }
}

/// A borrowing iterator over the items of a [`Map`].
pub struct Iter<'a, K, V> {
    buckets: vector::Iter<'a, Bucket<K, V>>,
    items: std::slice::Iter<'a, (K, V)>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((k, v)) = self.items.next() {
                self.remaining -= 1;
                return Some((k, v));
            }
            if let Some(bucket) = self.buckets.next()? {
                self.items = bucket.iter();
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// An owning iterator over the items of a [`Map`].
pub struct IntoIter<K, V> {
    buckets: vector::IntoIter<Bucket<K, V>>,
    items: std::vec::IntoIter<(K, V)>,
    remaining: usize,
}

impl<K: Clone, V: Clone> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.items.next() {
                self.remaining -= 1;
                return Some(item);
            }
            if let Some(bucket) = self.buckets.next()? {
                self.items = bucket.to_vec().into_iter();
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K: Clone, V: Clone> ExactSizeIterator for IntoIter<K, V> {}

impl<'a, K, V, S> IntoIterator for &'a Map<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: Clone, V: Clone, S> IntoIterator for Map<K, V, S> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            buckets: self.buckets.into_iter(),
            items: Default::default(),
            remaining: self.length,
        }
    }
}

impl<K, V> Default for Map<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> FromIterator<(K, V)> for Map<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher + Clone + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_iter_with(iter, S::default(), Config::default())
    }
}

impl<K, V, S> Extend<(K, V)> for Map<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: BuildHasher + Clone,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            *self = self.insert(key, value);
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for Map<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S> PartialEq for Map<K, V, S>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
            || (self.len() == other.len()
                && self.iter().all(|(k, v)| other.get(k) == Some(v)))
    }
}

impl<K: Hash + Eq, V: Eq, S: BuildHasher> Eq for Map<K, V, S> {}

impl<K: serde::Serialize, V: serde::Serialize, S> serde::Serialize for Map<K, V, S> {
    fn serialize<Ser>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error>
    where
        Ser: serde::Serializer,
    {
        serializer.collect_map(self.iter())
    }
}

struct MapVisitor<K, V, S> {
    marker: PhantomData<fn() -> Map<K, V, S>>,
}

impl<'de, K, V, S> serde::de::Visitor<'de> for MapVisitor<K, V, S>
where
    K: serde::Deserialize<'de> + Hash + Eq + Clone,
    V: serde::Deserialize<'de> + Clone,
    S: BuildHasher + Clone + Default,
{
    type Value = Map<K, V, S>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        let mut items = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some(item) = access.next_entry()? {
            items.push(item);
        }
        Ok(items.into_iter().collect())
    }
}

impl<'de, K, V, S> serde::Deserialize<'de> for Map<K, V, S>
where
    K: serde::Deserialize<'de> + Hash + Eq + Clone,
    V: serde::Deserialize<'de> + Clone,
    S: BuildHasher + Clone + Default,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_map(MapVisitor {
            marker: PhantomData,
        })
    }
}
