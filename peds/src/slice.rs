use std::{
    fmt,
    hash::{Hash, Hasher},
    ops::Index,
};

use crate::{
    error::{check_index, check_range, Result},
    vector::{IntoIter, Iter},
};

use super::Vector;

/// A view of the elements `start..stop` of a [`Vector`].
///
/// A slice shares the storage of the vector it was taken from. Like the
/// vector, it is immutable: every update returns a new slice, and other
/// slices of the same vector never see it.
pub struct Slice<T> {
    vec: Vector<T>,
    // Our slice involves the range of indices [start, stop), like most slicing.
    start: usize,
    stop: usize,
}

impl<T> Clone for Slice<T> {
    fn clone(&self) -> Self {
        Slice {
            vec: self.vec.clone(),
            start: self.start,
            stop: self.stop,
        }
    }
}

impl<T> Default for Slice<T> {
    fn default() -> Self {
        Slice {
            vec: Default::default(),
            start: 0,
            stop: 0,
        }
    }
}

impl<T> Slice<T> {
    /// The range must already be checked against the vector's length.
    pub(crate) fn from_parts(vec: Vector<T>, start: usize, stop: usize) -> Self {
        debug_assert!(start <= stop && stop <= vec.len());
        Slice { vec, start, stop }
    }

    /// The number of elements in this slice.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use peds::Slice;
    /// let arr = Slice::from_iter([0, 1, 2, 3, 4, 5]);
    /// assert_eq!(arr.len(), 6);
    /// ```
    pub fn len(&self) -> usize {
        self.stop - self.start
    }

    /// Returns `true` if the length is zero.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use peds::Slice;
    /// let arr = Slice::from_iter([0, 1, 2, 3, 4, 5]);
    /// assert!(!arr.is_empty());
    /// assert!(Slice::<i32>::default().is_empty());
    /// ```
    pub fn is_empty(&self) -> bool {
        self.stop == self.start
    }

    /// Gets an element at a given index.
    ///
    /// Indices are relative to the start of the slice, and fail with
    /// [`Error::IndexOutOfBounds`](crate::Error::IndexOutOfBounds) if they
    /// are past its end, even if the underlying vector is longer.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use peds::Vector;
    /// let vec: Vector<_> = (0..10).collect();
    /// let arr = vec.slice(2, 6).unwrap();
    /// assert_eq!(arr.get(0), Ok(&2));
    /// assert!(arr.get(4).is_err());
    /// ```
    pub fn get(&self, idx: usize) -> Result<&T> {
        check_index(idx, self.len())?;
        self.vec.get(self.start + idx)
    }

    /// Returns the sub-slice from index `from` (inclusive) to index `to`
    /// (exclusive), relative to this slice.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use peds::Slice;
    /// let arr = Slice::from_iter([0, 1, 2, 3, 4, 5]);
    /// let arr = arr.slice(1, 5).unwrap();
    /// assert_eq!(arr.to_vec(), vec![1, 2, 3, 4]);
    /// let arr = arr.slice(1, 3).unwrap();
    /// assert_eq!(arr.to_vec(), vec![2, 3]);
    /// assert!(arr.slice(0, 3).is_err());
    /// ```
    pub fn slice(&self, from: usize, to: usize) -> Result<Self> {
        check_range(from, to, self.len())?;
        Ok(Slice {
            vec: self.vec.clone(),
            start: self.start + from,
            stop: self.start + to,
        })
    }

    /// Returns an iterator over references to the elements.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(&self.vec, self.start, self.stop)
    }
}

impl<T: Clone> Slice<T> {
    /// Returns a new slice with the element at `idx` replaced by `elt`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use peds::Vector;
    /// let vec: Vector<_> = (0..10).collect();
    /// let arr = vec.slice(2, 6).unwrap();
    /// let updated = arr.set(1, 30).unwrap();
    /// assert_eq!(updated.to_vec(), vec![2, 30, 4, 5]);
    /// assert_eq!(arr.to_vec(), vec![2, 3, 4, 5]);
    /// assert_eq!(vec.get(3), Ok(&3));
    /// ```
    pub fn set(&self, idx: usize, elt: T) -> Result<Self> {
        check_index(idx, self.len())?;
        Ok(Slice {
            vec: self.vec.assoc(self.start + idx, elt),
            start: self.start,
            stop: self.stop,
        })
    }

    /// Returns a new slice with `elt` added at the end.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use peds::Slice;
    /// let arr = Slice::from_iter([0, 1, 2, 3, 4, 5]);
    /// assert_eq!(arr.push(6).to_vec(), vec![0, 1, 2, 3, 4, 5, 6]);
    /// ```
    pub fn push(&self, elt: T) -> Self {
        self.append(std::iter::once(elt))
    }

    /// Returns a new slice with all of `items` added at the end.
    ///
    /// If the underlying vector extends past the end of this slice, the first
    /// items overwrite those trailing elements (in a new version of the
    /// vector), so that the existing trie capacity is reused. Any remaining
    /// items are appended to the vector.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use peds::Vector;
    /// let vec: Vector<_> = (0..6).collect();
    /// let arr = vec.slice(0, 2).unwrap();
    /// let longer = arr.append([10, 11, 12]);
    /// assert_eq!(longer.to_vec(), vec![0, 1, 10, 11, 12]);
    /// assert_eq!(vec.to_vec(), vec![0, 1, 2, 3, 4, 5]);
    /// ```
    pub fn append<I: IntoIterator<Item = T>>(&self, items: I) -> Self {
        let mut iter = items.into_iter();
        let mut vec = self.vec.clone();
        let mut stop = self.stop;

        while stop < vec.len() {
            let Some(elt) = iter.next() else {
                break;
            };
            vec = vec.assoc(stop, elt);
            stop += 1;
        }

        if stop == vec.len() {
            vec = vec.append(iter);
            stop = vec.len();
        }

        Slice {
            vec,
            start: self.start,
            stop,
        }
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

impl<T: Clone> IntoIterator for Slice<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.vec.into_iter_range(self.start, self.stop)
    }
}

impl<'a, T> IntoIterator for &'a Slice<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Clone> Extend<T> for Slice<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        *self = self.append(iter);
    }
}

impl<T> Index<usize> for Slice<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        match self.get(index) {
            Ok(elt) => elt,
            Err(e) => panic!("{e}"),
        }
    }
}

impl<T: Clone> FromIterator<T> for Slice<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let vec: Vector<_> = iter.into_iter().collect();
        Self::from(vec)
    }
}

impl<T> From<Vector<T>> for Slice<T> {
    fn from(vec: Vector<T>) -> Self {
        Slice {
            start: 0,
            stop: vec.len(),
            vec,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Slice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq> PartialEq for Slice<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T: Eq> Eq for Slice<T> {}

impl<T: Hash> Hash for Slice<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len());
        for elt in self {
            elt.hash(state);
        }
    }
}

impl<T: serde::Serialize> serde::Serialize for Slice<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeSeq;

        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for elt in self.iter() {
            seq.serialize_element(elt)?;
        }
        seq.end()
    }
}

impl<'de, T: Clone + serde::Deserialize<'de>> serde::Deserialize<'de> for Slice<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let vec: Vec<T> = Vec::deserialize(deserializer)?;
        Ok(vec.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn range_vector(len: usize) -> Vector<usize> {
        (0..len).collect()
    }

    #[test]
    fn composed_views() {
        let vec = range_vector(2000);
        let view = vec.slice(0, 1000).unwrap().slice(3, 7).unwrap();
        assert_eq!(view.get(0), vec.get(3));
        assert_eq!(view.to_vec(), vec![3, 4, 5, 6]);
        assert_eq!(view.get(4), Err(Error::IndexOutOfBounds { index: 4, len: 4 }));
    }

    #[test]
    fn invalid_ranges() {
        let vec = range_vector(10);
        assert_eq!(
            vec.slice(2, 1).unwrap_err(),
            Error::InvalidRange {
                start: 2,
                stop: 1,
                len: 10
            }
        );
        assert!(vec.slice(0, 11).is_err());
        let view = vec.slice(2, 8).unwrap();
        assert!(view.slice(0, 7).is_err());
        assert!(view.slice(0, 6).is_ok());
    }

    #[test]
    fn set_inside_window_only() {
        let vec = range_vector(100);
        let view = vec.slice(10, 20).unwrap();
        let updated = view.set(0, 1000).unwrap();
        assert_eq!(updated[0], 1000);
        assert_eq!(view[0], 10);
        assert_eq!(vec[10], 10);
        assert_eq!(
            view.set(10, 0).unwrap_err(),
            Error::IndexOutOfBounds { index: 10, len: 10 }
        );
    }

    #[test]
    fn append_reuses_trailing_elements() {
        let vec = range_vector(100);
        let first = vec.slice(0, 50).unwrap();
        let second = vec.slice(0, 60).unwrap();

        let appended = first.append([1000, 1001]);
        assert_eq!(appended.len(), 52);
        assert_eq!(appended[50], 1000);
        assert_eq!(appended[51], 1001);
        // The backing vector didn't grow.
        assert_eq!(appended.vec.len(), 100);

        // Other views of the same vector are unaffected.
        assert_eq!(second[50], 50);
        assert_eq!(vec[51], 51);
    }

    #[test]
    fn append_past_the_end_of_the_vector() {
        let vec = range_vector(40);
        let view = vec.slice(30, 38).unwrap();
        let appended = view.append(100..110);
        assert_eq!(
            appended.to_vec(),
            [30, 31, 32, 33, 34, 35, 36, 37]
                .into_iter()
                .chain(100..110)
                .collect::<Vec<_>>()
        );
        assert_eq!(appended.vec.len(), 48);
        appended.vec.check_invariants();
        assert_eq!(vec.len(), 40);
    }

    #[test]
    fn iteration() {
        let vec = range_vector(300);
        let view = vec.slice(31, 97).unwrap();
        assert_eq!(view.iter().len(), 66);
        assert_eq!(
            view.iter().copied().collect::<Vec<_>>(),
            (31..97).collect::<Vec<_>>()
        );
        assert_eq!(
            view.clone().into_iter().collect::<Vec<_>>(),
            (31..97).collect::<Vec<_>>()
        );
        assert_eq!(view.iter().rev().next(), Some(&96));
    }

    #[test]
    fn clone_without_clonable_elements() {
        struct Opaque;

        let view = Vector::<Opaque>::new().slice(0, 0).unwrap();
        let copy = view.clone();
        assert!(copy.is_empty());
        assert!(copy.vec.ptr_eq(&view.vec));
    }

    #[test]
    fn equality() {
        let a = range_vector(10).slice(2, 5).unwrap();
        let b = Slice::from_iter([2, 3, 4]);
        assert_eq!(a, b);
        assert_eq!(format!("{a:?}"), "[2, 3, 4]");
        assert_eq!(serde_json::to_string(&a).unwrap(), "[2,3,4]");
    }
}
