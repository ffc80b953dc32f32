//! A persistent hash set, implemented as a [`Map`] with `()` values.

use std::{
    borrow::Borrow,
    fmt,
    hash::{BuildHasher, Hash},
    iter::FusedIterator,
};

use crate::{
    config::Config,
    hash::BuildCrc32Hasher,
    map::{self, Map},
};

/// A persistent hash set.
///
/// # Examples
///
/// ```rust
/// use peds::Set;
///
/// let a: Set<_> = [1, 2, 3].into_iter().collect();
/// let b: Set<_> = [2, 3, 4].into_iter().collect();
/// assert_eq!(a.intersection(&b), [2, 3].into_iter().collect::<Set<_>>());
/// assert!(a.insert(4).is_superset(&b));
/// ```
pub struct Set<T, S = BuildCrc32Hasher> {
    map: Map<T, (), S>,
}

impl<T, S: Clone> Clone for Set<T, S> {
    fn clone(&self) -> Self {
        Set {
            map: self.map.clone(),
        }
    }
}

impl<T> Set<T> {
    pub fn new() -> Self {
        Set { map: Map::new() }
    }

    pub fn with_config(config: Config) -> Self {
        Set {
            map: Map::with_config(config),
        }
    }
}

impl<T, S> Set<T, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Set {
            map: Map::with_hasher(hasher),
        }
    }

    pub fn with_hasher_and_config(hasher: S, config: Config) -> Self {
        Set {
            map: Map::with_hasher_and_config(hasher, config),
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            inner: self.map.iter(),
        }
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.map.ptr_eq(&other.map)
    }
}

impl<T, S> Set<T, S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    pub fn contains<Q>(&self, elt: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.contains_key(elt)
    }

    /// Returns true if every element of `self` is also in `other`.
    pub fn is_subset<S2: BuildHasher>(&self, other: &Set<T, S2>) -> bool {
        other.len() >= self.len() && self.iter().all(|elt| other.contains(elt))
    }

    /// Returns true if every element of `other` is also in `self`.
    pub fn is_superset<S2: BuildHasher>(&self, other: &Set<T, S2>) -> bool {
        other.is_subset(self)
    }

    pub fn is_disjoint<S2: BuildHasher>(&self, other: &Set<T, S2>) -> bool {
        self.iter().all(|elt| !other.contains(elt))
    }

    pub fn check_invariants(&self) {
        self.map.check_invariants();
    }
}

impl<T, S> Set<T, S>
where
    T: Hash + Eq + Clone,
    S: BuildHasher + Clone,
{
    /// Returns a new set that also contains `elt`.
    pub fn insert(&self, elt: T) -> Self {
        Set {
            map: self.map.insert(elt, ()),
        }
    }

    /// Returns a new set without `elt`.
    ///
    /// If `elt` wasn't in the set, the result is [`ptr_eq`](Set::ptr_eq) to
    /// `self`.
    pub fn remove<Q>(&self, elt: &Q) -> Self
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        Set {
            map: self.map.remove(elt),
        }
    }

    /// Builds a set with the same hasher and configuration as `self`.
    fn rebuild<I: IntoIterator<Item = T>>(&self, elts: I) -> Self {
        Set {
            map: Map::from_iter_with(
                elts.into_iter().map(|elt| (elt, ())),
                self.map.hasher().clone(),
                self.map.config(),
            ),
        }
    }

    /// Returns a set with the elements that are in `self`, in `other`, or in
    /// both.
    pub fn union<S2: BuildHasher>(&self, other: &Set<T, S2>) -> Self {
        other
            .iter()
            .fold(self.clone(), |acc, elt| acc.insert(elt.clone()))
    }

    /// Returns a set with the elements that are in both `self` and `other`.
    pub fn intersection<S2: BuildHasher>(&self, other: &Set<T, S2>) -> Self {
        self.rebuild(self.iter().filter(|elt| other.contains(*elt)).cloned())
    }

    /// Returns a set with the elements of `self` that aren't in `other`.
    pub fn difference<S2: BuildHasher>(&self, other: &Set<T, S2>) -> Self {
        self.rebuild(only_in(self, other))
    }

    /// Returns a set with the elements that are in exactly one of `self` and
    /// `other`.
    pub fn symmetric_difference<S2: BuildHasher>(&self, other: &Set<T, S2>) -> Self {
        self.rebuild(only_in(self, other).chain(only_in(other, self)))
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

/// The elements of `set` that aren't in `other`.
fn only_in<'a, T, S1, S2>(
    set: &'a Set<T, S1>,
    other: &'a Set<T, S2>,
) -> impl Iterator<Item = T> + 'a
where
    T: Hash + Eq + Clone,
    S2: BuildHasher,
{
    set.iter().filter(move |elt| !other.contains(*elt)).cloned()
}

/// A borrowing iterator over the elements of a [`Set`].
pub struct Iter<'a, T> {
    inner: map::Iter<'a, T, ()>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(elt, ())| elt)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

impl<'a, T, S> IntoIterator for &'a Set<T, S> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Clone, S> IntoIterator for Set<T, S> {
    type Item = T;
    type IntoIter = std::iter::Map<map::IntoIter<T, ()>, fn((T, ())) -> T>;

    fn into_iter(self) -> Self::IntoIter {
        let key: fn((T, ())) -> T = |(elt, ())| elt;
        self.map.into_iter().map(key)
    }
}

impl<T> Default for Set<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S> FromIterator<T> for Set<T, S>
where
    T: Hash + Eq + Clone,
    S: BuildHasher + Clone + Default,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Set {
            map: iter.into_iter().map(|elt| (elt, ())).collect(),
        }
    }
}

impl<T, S> Extend<T> for Set<T, S>
where
    T: Hash + Eq + Clone,
    S: BuildHasher + Clone,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.map.extend(iter.into_iter().map(|elt| (elt, ())));
    }
}

impl<T: fmt::Debug, S> fmt::Debug for Set<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T: Hash + Eq, S: BuildHasher> PartialEq for Set<T, S> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.is_subset(other)
    }
}

impl<T: Hash + Eq, S: BuildHasher> Eq for Set<T, S> {}

impl<T: serde::Serialize, S> serde::Serialize for Set<T, S> {
    fn serialize<Ser>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error>
    where
        Ser: serde::Serializer,
    {
        serializer.collect_seq(self.iter())
    }
}

impl<'de, T, S> serde::Deserialize<'de> for Set<T, S>
where
    T: serde::Deserialize<'de> + Hash + Eq + Clone,
    S: BuildHasher + Clone + Default,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let elts: Vec<T> = Vec::deserialize(deserializer)?;
        Ok(elts.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn set(elts: &[i32]) -> Set<i32> {
        elts.iter().copied().collect()
    }

    #[test]
    fn insert() {
        let s = Set::new();
        assert_eq!(s.len(), 0);

        let s2 = s.insert(1);
        assert!(!s.contains(&1));
        assert!(s2.contains(&1));
        assert!(!s2.contains(&2));
    }

    #[test]
    fn remove() {
        let s = set(&[1, 2, 3]);
        assert_eq!(s.len(), 3);
        assert!(s.contains(&1));

        let s2 = s.remove(&1);
        assert_eq!(s2.len(), 2);
        assert!(!s2.contains(&1));
        assert!(s.contains(&1));

        assert!(s.remove(&10).ptr_eq(&s));
    }

    #[test]
    fn subsets() {
        // Empty sets are subsets of empty sets.
        assert!(set(&[]).is_subset(&set(&[])));
        // Empty sets are subsets of non-empty sets.
        assert!(set(&[]).is_subset(&set(&[1, 2, 3])));
        // Equal non-empty sets are subsets of each other.
        assert!(set(&[1, 2]).is_subset(&set(&[1, 2])));
        // Strict subset.
        assert!(set(&[1, 2]).is_subset(&set(&[1, 2, 3])));
        // Overlapping but not subset.
        assert!(!set(&[1, 2]).is_subset(&set(&[2, 3])));
        // Non-overlapping.
        assert!(!set(&[1, 2]).is_subset(&set(&[3, 4])));
        // Bigger sets are never subsets.
        assert!(!set(&[1, 2, 3]).is_subset(&set(&[1, 2])));

        assert!(set(&[1, 2, 3]).is_superset(&set(&[1, 3])));
        assert!(!set(&[1, 2]).is_superset(&set(&[1, 3])));
    }

    #[test]
    fn algebra() {
        let a = set(&[1, 2, 3]);
        let b = set(&[2, 3, 4]);
        assert_eq!(a.union(&b), set(&[1, 2, 3, 4]));
        assert_eq!(a.intersection(&b), set(&[2, 3]));
        assert_eq!(a.difference(&b), set(&[1]));
        assert_eq!(b.difference(&a), set(&[4]));
        assert_eq!(a.symmetric_difference(&b), set(&[1, 4]));
        assert!(a.is_subset(&set(&[1, 2, 3, 4])));
        assert!(!a.is_disjoint(&b));
        assert!(a.is_disjoint(&set(&[5, 6])));

        // The operands don't change.
        assert_eq!(a, set(&[1, 2, 3]));
        assert_eq!(b, set(&[2, 3, 4]));
    }

    #[test]
    fn algebra_keeps_config() {
        let config = Config::new(3.0, 1.0).unwrap();
        let a: Set<i32> = (0..100).fold(Set::with_config(config), |s, x| s.insert(x));
        let b: Set<i32> = (50..150).collect();
        assert_eq!(a.difference(&b).map.config(), config);
        assert_eq!(a.intersection(&b).len(), 50);
        a.symmetric_difference(&b).check_invariants();
    }

    #[test]
    fn equality() {
        assert_eq!(set(&[1, 2, 3]), set(&[3, 2, 1]));
        assert_ne!(set(&[1, 2, 3]), set(&[1, 2]));
        assert_ne!(set(&[1, 2, 3]), set(&[1, 2, 4]));
    }

    #[test]
    fn conversions() {
        let s = set(&[5, 1, 3]);
        let mut elts = s.to_vec();
        elts.sort();
        assert_eq!(elts, vec![1, 3, 5]);

        let mut owned: Vec<_> = s.clone().into_iter().collect();
        owned.sort();
        assert_eq!(owned, elts);

        let json = serde_json::to_string(&set(&[7])).unwrap();
        assert_eq!(json, "[7]");
        let back: Set<i32> = serde_json::from_str("[1, 2, 2]").unwrap();
        assert_eq!(back, set(&[1, 2]));
        assert_eq!(format!("{:?}", set(&[7])), "{7}");
    }

    #[test]
    fn extend() {
        let mut s = set(&[1]);
        s.extend([2, 3, 1]);
        assert_eq!(s, set(&[1, 2, 3]));
    }
}
