use super::NodeId;

/// The depth of a hash tree holding `len` leaves, ie. the number of levels above the leaves.
///
/// `None` when `len` is beyond the largest power of two a `usize` holds.
#[inline]
pub(super) fn depth(len: usize) -> Option<usize> {
    len.max(1).checked_next_power_of_two().map(|len| len.ilog2() as usize)
}

/// A level of a hash tree, as a contiguous range of nodes in the tree arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Level {
    start: usize,
    len: usize,
}

impl Level {
    /// The bottom level, leaves being stored first in the arena.
    #[inline]
    pub fn leaves(len: usize) -> Self {
        Self { start: 0, len }
    }

    /// The level right above this one, stored right after it.
    ///
    /// An odd trailing node still gets a parent, paired with itself.
    #[inline]
    pub fn parent(&self) -> Self {
        Self {
            start: self.start + self.len,
            len: self.len.div_ceil(2),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.len == 1
    }

    #[inline]
    pub fn node(&self, index: usize) -> Option<NodeId> {
        (index < self.len).then(|| NodeId(self.start + index))
    }

    /// The node paired with the one at `index`, which is the node itself at the end of an odd level.
    #[inline]
    pub fn sibling(&self, index: usize) -> NodeId {
        debug_assert!(index < self.len);
        self.node(index ^ 1).unwrap_or(NodeId(self.start + index))
    }

    /// The children `(left, right)` of the node at `index` of the parent level.
    #[inline]
    pub fn pair(&self, index: usize) -> (NodeId, NodeId) {
        let left = NodeId(self.start + 2 * index);
        (left, self.sibling(2 * index))
    }

    /// All levels of a tree with `len` leaves, from the leaves up to the root.
    pub fn all(len: usize) -> impl Iterator<Item = Self> {
        std::iter::successors((len > 0).then(|| Self::leaves(len)), |level| {
            (!level.is_root()).then(|| level.parent())
        })
    }
}
