use std::{
    fmt,
    hash::{Hash, Hasher},
    iter::FusedIterator,
    ops::Index,
    sync::Arc,
};

use imbl_sized_chunks::Chunk;

use crate::{
    error::{check_index, check_range, Result},
    metrics::increment,
    slice::Slice,
    trie::{child_index, copy_replace, new_path, Interior, Leaf, Node, BRANCHING, MASK, SHIFT},
};

/// A persistent vector.
///
/// Elements are stored in a trie with 32-way branching, except for the last
/// (up to) 32 elements, which live in a separate tail buffer. Appending only
/// touches the tail until it fills up, at which point the whole tail is moved
/// into the trie as a new leaf.
///
/// Cloning is `O(1)`, [`get`](Vector::get) and [`set`](Vector::set) are
/// `O(log32 n)`, and appending is amortized `O(1)`.
pub struct Vector<T> {
    root: Arc<Node<T>>,
    // Holds indices `tail_offset()..length`. Only empty if the whole vector is.
    tail: Arc<Leaf<T>>,
    length: usize,
    // The height of the trie, times `SHIFT`. The root is always interior, so
    // this is never zero.
    shift: u32,
}

impl<T> Clone for Vector<T> {
    fn clone(&self) -> Self {
        Vector {
            root: Arc::clone(&self.root),
            tail: Arc::clone(&self.tail),
            length: self.length,
            shift: self.shift,
        }
    }
}

impl<T> Vector<T> {
    pub fn new() -> Self {
        Vector {
            root: Arc::new(Node::empty_interior()),
            tail: Arc::new(Chunk::new()),
            length: 0,
            shift: SHIFT,
        }
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// The index of the first element stored in the tail.
    fn tail_offset(&self) -> usize {
        if self.length < BRANCHING {
            0
        } else {
            ((self.length - 1) >> SHIFT) << SHIFT
        }
    }

    /// Finds the leaf (or the tail) holding the element at `idx`.
    ///
    /// `idx` must be in bounds.
    pub(crate) fn leaf_for(&self, idx: usize) -> &Leaf<T> {
        if idx >= self.tail_offset() {
            return &self.tail;
        }

        let mut node = self.root.as_ref();
        let mut shift = self.shift;
        loop {
            match node {
                Node::Interior { children } => {
                    node = children[child_index(idx, shift)].as_ref();
                    shift -= SHIFT;
                }
                Node::Leaf { data } => {
                    debug_assert_eq!(shift, 0);
                    return data;
                }
            }
        }
    }

    /// Gets the element at `idx`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use peds::{Error, Vector};
    /// let vec = Vector::from_iter([0, 1, 2]);
    /// assert_eq!(vec.get(2), Ok(&2));
    /// assert_eq!(vec.get(3), Err(Error::IndexOutOfBounds { index: 3, len: 3 }));
    /// ```
    pub fn get(&self, idx: usize) -> Result<&T> {
        check_index(idx, self.length)?;
        Ok(&self.leaf_for(idx)[idx & MASK])
    }

    pub fn first(&self) -> Option<&T> {
        self.get(0).ok()
    }

    pub fn last(&self) -> Option<&T> {
        self.length
            .checked_sub(1)
            .and_then(|idx| self.get(idx).ok())
    }

    /// Returns a view of the elements from index `start` (inclusive) to index
    /// `stop` (exclusive). No elements are copied.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use peds::Vector;
    /// let vec: Vector<_> = (0..10).collect();
    /// let slice = vec.slice(2, 5).unwrap();
    /// assert_eq!(slice.to_vec(), vec![2, 3, 4]);
    /// assert!(vec.slice(5, 2).is_err());
    /// ```
    pub fn slice(&self, start: usize, stop: usize) -> Result<Slice<T>> {
        check_range(start, stop, self.length)?;
        Ok(Slice::from_parts(self.clone(), start, stop))
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self, 0, self.length)
    }

    /// Iterates over the elements with indices in `start..stop`.
    pub fn iter_range(&self, start: usize, stop: usize) -> Result<Iter<'_, T>> {
        check_range(start, stop, self.length)?;
        Ok(Iter::new(self, start, stop))
    }

    /// Returns true if both vectors are the same version, i.e. one is a clone
    /// of the other (or they came out of the same no-op update).
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.length == other.length
            && Arc::ptr_eq(&self.root, &other.root)
            && Arc::ptr_eq(&self.tail, &other.tail)
    }

    /// Panics if the internal structure is inconsistent.
    pub fn check_invariants(&self) {
        let tail_offset = self.tail_offset();
        assert_eq!(self.tail.len(), self.length - tail_offset);
        assert!(self.is_empty() || !self.tail.is_empty());
        assert_eq!(self.root.len(), tail_offset);
        assert!(matches!(self.root.as_ref(), Node::Interior { .. }));
        self.root.check_invariants(self.shift);
        if self.shift > SHIFT {
            let Node::Interior { children } = self.root.as_ref() else {
                unreachable!();
            };
            assert!(children.len() > 1, "root with a single child");
        }
    }
}

impl<T: Clone> Vector<T> {
    /// Returns a new vector with the element at `idx` replaced by `elt`.
    ///
    /// Only the path from the root to the affected leaf is copied.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use peds::Vector;
    /// let vec = Vector::from_iter([0, 1, 2]);
    /// let updated = vec.set(1, 10).unwrap();
    /// assert_eq!(updated.to_vec(), vec![0, 10, 2]);
    /// assert_eq!(vec.to_vec(), vec![0, 1, 2]);
    /// ```
    pub fn set(&self, idx: usize, elt: T) -> Result<Self> {
        check_index(idx, self.length)?;
        Ok(self.assoc(idx, elt))
    }

    /// Like [`Vector::set`], but `idx` must already be known to be in bounds.
    pub(crate) fn assoc(&self, idx: usize, elt: T) -> Self {
        debug_assert!(idx < self.length);

        if idx >= self.tail_offset() {
            return Vector {
                tail: Arc::new(copy_replace(&self.tail, idx & MASK, elt)),
                ..self.clone()
            };
        }

        Vector {
            root: Arc::new(self.root.assoc(self.shift, idx, elt)),
            ..self.clone()
        }
    }

    /// Returns a new vector with `elt` added at the end.
    pub fn push(&self, elt: T) -> Self {
        self.append(std::iter::once(elt))
    }

    /// Returns a new vector with all of `items` added at the end.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use peds::Vector;
    /// let vec = Vector::from_iter([0, 1, 2]);
    /// let longer = vec.append(3..100);
    /// assert_eq!(longer.len(), 100);
    /// assert_eq!(longer.get(99), Ok(&99));
    /// assert_eq!(vec.len(), 3);
    /// ```
    pub fn append<I: IntoIterator<Item = T>>(&self, items: I) -> Self {
        // Make the iterator peekable, because we only want to move a full tail
        // into the trie if there's something to put in the new tail.
        let mut iter = items.into_iter().peekable();
        let mut ret = self.clone();

        while iter.peek().is_some() {
            if ret.tail.is_full() {
                ret.push_leaf_node();
            }

            // The first time around this clones the tail we share with `self`;
            // after that `ret` owns its tail and fills it in place.
            let tail = Arc::make_mut(&mut ret.tail);
            let old_len = tail.len();
            tail.extend((&mut iter).take(BRANCHING - old_len));
            ret.length += tail.len() - old_len;
        }

        ret
    }

    /// Moves the (full) tail into the trie, leaving an empty tail behind.
    ///
    /// This temporarily breaks the invariant that the tail is non-empty, so
    /// it must be followed by adding an element.
    fn push_leaf_node(&mut self) {
        debug_assert!(self.tail.is_full());
        let tail = std::mem::replace(&mut self.tail, Arc::new(Chunk::new()));
        let leaf = Arc::new(Node::Leaf {
            data: Arc::unwrap_or_clone(tail),
        });

        // The trie is full at its current height: the new leaf goes into a
        // brand new right subtree, under a new root.
        if (self.length >> SHIFT) > (1 << self.shift) {
            let path = new_path(self.shift, leaf);
            self.root = Arc::new(Node::Interior {
                children: Chunk::pair(Arc::clone(&self.root), path),
            });
            self.shift += SHIFT;
            log::trace!(
                "vector of length {} grew to height {}",
                self.length,
                self.shift / SHIFT
            );
            increment!("peds::vector::root_overflow");
        } else {
            let Node::Interior { children } = self.root.as_ref() else {
                unreachable!();
            };
            self.root = Arc::new(Node::Interior {
                children: push_tail(self.length, self.shift, children, leaf),
            });
        }
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }

    pub(crate) fn into_iter_range(self, start: usize, stop: usize) -> IntoIter<T> {
        IntoIter {
            vector: self,
            pos: start,
            stop,
            leaf: Vec::new().into_iter(),
        }
    }
}

/// Inserts `leaf` as the rightmost leaf below an interior node at `shift`,
/// copying the nodes along the way. `length` is the length of the vector
/// including the elements of `leaf`.
fn push_tail<T>(
    length: usize,
    shift: u32,
    children: &Interior<T>,
    leaf: Arc<Node<T>>,
) -> Interior<T> {
    let sub_idx = child_index(length - 1, shift);
    let to_insert = if shift == SHIFT {
        leaf
    } else if let Some(child) = children.get(sub_idx) {
        let Node::Interior {
            children: grandchildren,
        } = child.as_ref()
        else {
            unreachable!();
        };
        Arc::new(Node::Interior {
            children: push_tail(length, shift - SHIFT, grandchildren, leaf),
        })
    } else {
        new_path(shift - SHIFT, leaf)
    };

    copy_replace(children, sub_idx, to_insert)
}

/// A borrowing iterator over (a range of) a [`Vector`].
///
/// The leaf being visited is cached, so the trie is only walked once every
/// 32 elements.
#[derive(Debug)]
pub struct Iter<'a, T> {
    vector: &'a Vector<T>,
    front_leaf: &'a [T],
    back_leaf: &'a [T],
    // The remaining indices are `front..back`.
    front: usize,
    back: usize,
}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Iter { ..*self }
    }
}

impl<'a, T> Iter<'a, T> {
    pub(crate) fn new(vector: &'a Vector<T>, start: usize, stop: usize) -> Self {
        let (front_leaf, back_leaf): (&[T], &[T]) = if start < stop {
            (&vector.leaf_for(start)[..], &vector.leaf_for(stop - 1)[..])
        } else {
            (&[], &[])
        };
        Iter {
            vector,
            front_leaf,
            back_leaf,
            front: start,
            back: stop,
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        if self.front & MASK == 0 {
            self.front_leaf = &self.vector.leaf_for(self.front)[..];
        }
        let ret = &self.front_leaf[self.front & MASK];
        self.front += 1;
        Some(ret)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.back - self.front;
        (len, Some(len))
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        if self.back & MASK == MASK {
            self.back_leaf = &self.vector.leaf_for(self.back)[..];
        }
        Some(&self.back_leaf[self.back & MASK])
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

/// An owning iterator over (a range of) a [`Vector`].
///
/// Elements are cloned out of the shared leaves one leaf at a time.
pub struct IntoIter<T> {
    vector: Vector<T>,
    // Indices `pos..stop` haven't been copied into `leaf` yet.
    pos: usize,
    stop: usize,
    leaf: std::vec::IntoIter<T>,
}

impl<T: Clone> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(ret) = self.leaf.next() {
            return Some(ret);
        }
        if self.pos >= self.stop {
            return None;
        }

        let leaf_start = self.pos & !MASK;
        let leaf = self.vector.leaf_for(self.pos);
        let end = leaf.len().min(self.stop - leaf_start);
        self.leaf = leaf[(self.pos & MASK)..end].to_vec().into_iter();
        self.pos = leaf_start + end;
        self.leaf.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.leaf.len() + (self.stop - self.pos);
        (len, Some(len))
    }
}

impl<T: Clone> ExactSizeIterator for IntoIter<T> {}

impl<T: Clone> FusedIterator for IntoIter<T> {}

impl<'a, T> IntoIterator for &'a Vector<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Clone> IntoIterator for Vector<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        let len = self.len();
        self.into_iter_range(0, len)
    }
}

impl<T> Default for Vector<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> FromIterator<T> for Vector<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Vector::new().append(iter)
    }
}

impl<T: Clone> Extend<T> for Vector<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        *self = self.append(iter);
    }
}

impl<T> Index<usize> for Vector<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        match self.get(index) {
            Ok(elt) => elt,
            Err(e) => panic!("{e}"),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Vector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq> PartialEq for Vector<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || (self.len() == other.len() && self.iter().eq(other.iter()))
    }
}

impl<T: Eq> Eq for Vector<T> {}

impl<T: Hash> Hash for Vector<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len());
        for elt in self {
            elt.hash(state);
        }
    }
}

impl<T: serde::Serialize> serde::Serialize for Vector<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.iter())
    }
}

impl<'de, T: Clone + serde::Deserialize<'de>> serde::Deserialize<'de> for Vector<T> {
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

    // Sizes around the points where the tail moves into the trie and where
    // the trie gets taller.
    const SIZES: &[usize] = &[
        0, 1, 20, 31, 32, 33, 50, 500, 1023, 1024, 1025, 1056, 1057, 10000, 32768, 32769,
    ];

    fn range_vector(len: usize) -> Vector<usize> {
        (0..len).collect()
    }

    #[test]
    fn basic() {
        let vec = Vector::<u32>::new();
        vec.check_invariants();
        let vec = vec.push(1);
        assert_eq!(vec.get(0), Ok(&1));
        assert_eq!(
            vec.get(1),
            Err(Error::IndexOutOfBounds { index: 1, len: 1 })
        );
        vec.check_invariants();

        let vec = vec.push(2).push(3);
        vec.check_invariants();
        assert_eq!(vec.get(0), Ok(&1));
        assert_eq!(vec.get(1), Ok(&2));
        assert_eq!(vec.get(2), Ok(&3));
        assert!(vec.get(3).is_err());

        let mut iter = vec.iter();
        assert_eq!(iter.next(), Some(&1));
        assert_eq!(iter.next(), Some(&2));
        assert_eq!(iter.next(), Some(&3));
        assert_eq!(iter.next(), None);

        let mut vec = vec;
        vec.extend([1, 2, 3]);
        vec.check_invariants();
        assert_eq!(6, vec.len());
        assert_eq!(
            vec.iter().copied().collect::<Vec<_>>(),
            vec![1, 2, 3, 1, 2, 3]
        );
        assert_eq!(vec.into_iter().collect::<Vec<_>>(), vec![1, 2, 3, 1, 2, 3]);
    }

    #[test]
    fn sizes() {
        for &len in SIZES {
            let vec = range_vector(len);
            vec.check_invariants();
            assert_eq!(vec.len(), len);
            for i in 0..len {
                assert_eq!(vec[i], i);
            }
            assert!(vec.get(len).is_err());
        }
    }

    #[test]
    fn one_at_a_time() {
        let mut vec = Vector::new();
        for i in 0..2000 {
            let next = vec.push(i);
            next.check_invariants();
            assert_eq!(next.len(), vec.len() + 1);
            assert_eq!(next.get(vec.len()), Ok(&i));
            vec = next;
        }
    }

    #[test]
    fn set_every_index() {
        for &len in SIZES {
            let vec = range_vector(len);
            for i in 0..len {
                let updated = vec.set(i, usize::MAX).unwrap();
                updated.check_invariants();
                assert_eq!(updated[i], usize::MAX);
                assert_eq!(vec[i], i);
                if i > 0 {
                    assert_eq!(updated[i - 1], i - 1);
                }
                if i + 1 < len {
                    assert_eq!(updated[i + 1], i + 1);
                }
            }
            assert_eq!(
                vec.set(len, 0).unwrap_err(),
                Error::IndexOutOfBounds { index: len, len }
            );
        }
    }

    #[test]
    fn set_shares_untouched_parts() {
        let vec = range_vector(100);
        let in_tail = vec.set(99, 0).unwrap();
        assert!(Arc::ptr_eq(&vec.root, &in_tail.root));
        assert!(!Arc::ptr_eq(&vec.tail, &in_tail.tail));

        let in_trie = vec.set(3, 0).unwrap();
        assert!(Arc::ptr_eq(&vec.tail, &in_trie.tail));
        let (Node::Interior { children: old }, Node::Interior { children: new }) =
            (vec.root.as_ref(), in_trie.root.as_ref())
        else {
            panic!("expected interior roots");
        };
        assert!(!Arc::ptr_eq(&old[0], &new[0]));
        assert!(Arc::ptr_eq(&old[1], &new[1]));
        assert!(Arc::ptr_eq(&old[2], &new[2]));
    }

    #[test]
    fn append_leaves_old_version_alone() {
        let vec = range_vector(40);
        let longer = vec.append(40..2000);
        longer.check_invariants();
        assert_eq!(vec.len(), 40);
        assert_eq!(vec.to_vec(), (0..40).collect::<Vec<_>>());
        assert_eq!(longer.to_vec(), (0..2000).collect::<Vec<_>>());

        // Appending to an old version again doesn't affect the first branch.
        let other = vec.append([7; 10]);
        assert_eq!(other.get(45), Ok(&7));
        assert_eq!(longer.get(45), Ok(&45));
    }

    #[test]
    fn empty_append() {
        let vec = range_vector(33);
        let same = vec.append(std::iter::empty());
        assert!(same.ptr_eq(&vec));
    }

    #[test]
    fn ranges() {
        let vec = range_vector(1100);
        let collected: Vec<_> = vec.iter_range(30, 1070).unwrap().copied().collect();
        assert_eq!(collected, (30..1070).collect::<Vec<_>>());
        assert_eq!(vec.iter_range(30, 1070).unwrap().len(), 1040);
        assert_eq!(vec.iter_range(5, 5).unwrap().next(), None);
        assert!(vec.iter_range(5, 4).is_err());
        assert!(vec.iter_range(0, 1101).is_err());

        let rev: Vec<_> = vec.iter_range(20, 100).unwrap().rev().copied().collect();
        assert_eq!(rev, (20..100).rev().collect::<Vec<_>>());

        let owned: Vec<_> = vec.clone().into_iter_range(31, 1057).collect();
        assert_eq!(owned, (31..1057).collect::<Vec<_>>());
    }

    #[test]
    fn double_ended_meet() {
        let vec = range_vector(70);
        let mut iter = vec.iter();
        let mut front = Vec::new();
        let mut back = Vec::new();
        while let Some(x) = iter.next() {
            front.push(*x);
            if let Some(y) = iter.next_back() {
                back.push(*y);
            }
        }
        assert_eq!(front.len() + back.len(), 70);
        assert_eq!(front.last(), Some(&34));
        assert_eq!(back.last(), Some(&35));
    }

    #[test]
    fn early_termination() {
        let vec = range_vector(5000);
        let found = vec.iter().position(|&x| x == 1234);
        assert_eq!(found, Some(1234));
        // The vector itself is unaffected, so iteration can start over.
        assert_eq!(vec.iter().next(), Some(&0));
    }

    #[test]
    fn equality_and_debug() {
        let a = range_vector(40);
        let b = range_vector(39).push(39);
        assert_eq!(a, b);
        assert!(!a.ptr_eq(&b));
        assert_ne!(a, a.set(0, 1).unwrap());
        assert_eq!(format!("{:?}", range_vector(3)), "[0, 1, 2]");
        assert_eq!(a.first(), Some(&0));
        assert_eq!(a.last(), Some(&39));
        assert_eq!(Vector::<u8>::new().last(), None);
    }

    #[test]
    fn serde() {
        let vec = range_vector(100);
        let json = serde_json::to_string(&vec).unwrap();
        assert_eq!(json, serde_json::to_string(&vec.to_vec()).unwrap());
        let back: Vector<usize> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vec);
        back.check_invariants();
    }

    #[test]
    fn threads() {
        let vec = range_vector(10000);
        std::thread::scope(|s| {
            for t in 0..4 {
                let vec = &vec;
                s.spawn(move || {
                    let updated = vec.set(t, 0).unwrap();
                    assert_eq!(updated.iter().sum::<usize>(), vec.iter().sum::<usize>() - t);
                });
            }
        });
    }
}
