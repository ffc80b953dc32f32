//! The node model shared by every persistent collection in this crate.
//!
//! A trie of height `h` stores `BRANCHING^(h+1)` elements at most. Heights are
//! stored as bit-shift amounts (`shift = SHIFT * h`), so that the child of an
//! interior node containing a given index can be found with a shift and a
//! mask.

use std::sync::Arc;

use imbl_sized_chunks::Chunk;

/// log2 of the branching factor.
pub(crate) const SHIFT: u32 = 5;
/// Number of children of an interior node, and of elements in a full leaf.
pub(crate) const BRANCHING: usize = 1 << SHIFT;
pub(crate) const MASK: usize = BRANCHING - 1;

pub(crate) type Leaf<T> = Chunk<T, BRANCHING>;
pub(crate) type Interior<T> = Chunk<Arc<Node<T>>, BRANCHING>;

// Nodes are never modified once they're reachable from a collection that was
// handed out: all updates go through `copy_replace`, which leaves its input
// alone.
#[derive(Debug, Clone)]
pub(crate) enum Node<T> {
    Leaf { data: Leaf<T> },
    Interior { children: Interior<T> },
}

/// `idx` is the global index into the root node, and we are some interior
/// node at the given `shift`. Which of our children does the index belong to?
pub(crate) fn child_index(idx: usize, shift: u32) -> usize {
    (idx >> shift) & MASK
}

/// Returns a copy of `chunk` with the entry at `idx` replaced by `value`.
///
/// `idx` may also point one past the end, in which case the value is added
/// at the end (the chunk must not be full).
pub(crate) fn copy_replace<A: Clone>(
    chunk: &Chunk<A, BRANCHING>,
    idx: usize,
    value: A,
) -> Chunk<A, BRANCHING> {
    debug_assert!(idx <= chunk.len());
    let mut ret = chunk.clone();
    if idx < ret.len() {
        ret.set(idx, value);
    } else {
        ret.push_back(value);
    }
    ret
}

/// Wraps `node` into single-child interior nodes until it sits at `shift`.
pub(crate) fn new_path<T>(shift: u32, node: Arc<Node<T>>) -> Arc<Node<T>> {
    let mut node = node;
    let mut level = 0;
    while level < shift {
        node = Arc::new(Node::Interior {
            children: Chunk::unit(node),
        });
        level += SHIFT;
    }
    node
}

impl<T> Node<T> {
    pub(crate) fn empty_interior() -> Self {
        Node::Interior {
            children: Chunk::new(),
        }
    }

    /// Number of elements below this node. Only used for checking invariants.
    pub(crate) fn len(&self) -> usize {
        match self {
            Node::Leaf { data } => data.len(),
            Node::Interior { children } => children.iter().map(|c| c.len()).sum(),
        }
    }

    /// Checks that every leaf below this node is full and sits at height zero.
    pub(crate) fn check_invariants(&self, shift: u32) {
        match self {
            Node::Leaf { data } => {
                assert_eq!(shift, 0, "leaf at a non-zero height");
                assert!(data.is_full(), "partially filled leaf in the trie");
            }
            Node::Interior { children } => {
                assert!(shift >= SHIFT, "interior node at height zero");
                for child in children.iter() {
                    child.check_invariants(shift - SHIFT);
                }
            }
        }
    }
}

impl<T: Clone> Node<T> {
    /// Returns a copy of this subtree with the element at `idx` replaced.
    ///
    /// Only the nodes on the path to `idx` are copied; everything else is
    /// shared with `self`.
    pub(crate) fn assoc(&self, shift: u32, idx: usize, elt: T) -> Node<T> {
        match self {
            Node::Leaf { data } => {
                debug_assert_eq!(shift, 0);
                Node::Leaf {
                    data: copy_replace(data, idx & MASK, elt),
                }
            }
            Node::Interior { children } => {
                let sub_idx = child_index(idx, shift);
                let child = children[sub_idx].assoc(shift - SHIFT, idx, elt);
                Node::Interior {
                    children: copy_replace(children, sub_idx, Arc::new(child)),
                }
            }
        }
    }
}
