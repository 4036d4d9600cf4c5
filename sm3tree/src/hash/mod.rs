use std::fmt::Debug;
use std::sync::OnceLock;

use tracing::debug;

use crate::sm3::{Sm3, Sm3Output};

mod absence;
mod level;
mod proof;

pub use absence::{Bounds, NonInclusionProof};
pub use proof::InclusionProof;

use level::Level;

/// Maximum number of leaves a hash tree can hold.
pub const MAX_LEAVES: usize = 100_000;

/// An enum to deal with errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("a hash tree needs at least one leaf")]
    NoLeaves,
    #[error("{count} leaves exceed the capacity of a hash tree ({max})")]
    TooManyLeaves { count: usize, max: usize },
    #[error("leaf index {index} is out of range, the hash tree has {len} leaves")]
    LeafIndexOutOfRange { index: usize, len: usize },
    #[error("hash tree leaves are not sorted")]
    UnsortedLeaves,
}

/// A hasher trait to produce hash values.
pub trait Hasher: Default {
    type Hash: AsRef<[u8]> + Clone + Debug + PartialEq;

    fn write(&mut self, bytes: &[u8]);
    fn finish(self) -> Self::Hash;

    /// Hash the concatenation of two values, eg. the hashes of two sibling nodes.
    fn hash(first: impl AsRef<[u8]>, second: impl AsRef<[u8]>) -> Self::Hash
    where
        Self: Sized,
    {
        let mut hasher = Self::default();
        hasher.write(first.as_ref());
        hasher.write(second.as_ref());
        hasher.finish()
    }
}

impl Hasher for Sm3 {
    type Hash = Sm3Output;

    fn write(&mut self, bytes: &[u8]) {
        self.update(bytes);
    }

    fn finish(self) -> Self::Hash {
        self.finalize()
    }
}

/// A handle onto a node of a hash tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in the tree arena.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A hash node in the hash tree.
#[derive(Debug)]
pub struct HashNode<H: Hasher> {
    hash: H::Hash,
    nodes: Option<(NodeId, NodeId)>,
}

impl<H: Hasher> HashNode<H> {
    fn leaf(hash: impl Into<H::Hash>) -> Self {
        Self {
            hash: hash.into(),
            nodes: None,
        }
    }

    fn branch(hash: H::Hash, left: NodeId, right: NodeId) -> Self {
        Self {
            hash,
            nodes: Some((left, right)),
        }
    }

    pub fn hash(&self) -> &H::Hash {
        &self.hash
    }

    /// Children of a branch, both being the same node for a self-paired one.
    pub fn nodes(&self) -> Option<(NodeId, NodeId)> {
        self.nodes
    }

    pub fn is_leaf(&self) -> bool {
        self.nodes.is_none()
    }
}

/// A hash tree.
///
/// Nodes live in a single arena, level after level from the leaves up to the root, and refer to each
/// other with [`NodeId`] handles: dropping the tree frees every node at once, whatever its depth.
#[derive(Debug)]
pub struct HashTree<H: Hasher> {
    nodes: Vec<HashNode<H>>,
    root: NodeId,
    leaves: Vec<NodeId>,
    levels: Vec<Level>,
    sorted: OnceLock<bool>,
}

impl<H: Hasher> HashTree<H> {
    /// Build a hash tree from the given leaf hashes, pairing nodes level by level.
    ///
    /// The last node of an odd level is paired with itself.
    pub fn build<T: Into<H::Hash>>(hashes: impl IntoIterator<Item = T>) -> Result<Self, Error> {
        let mut nodes: Vec<HashNode<H>> = hashes.into_iter().map(HashNode::leaf).collect();

        match nodes.len() {
            0 => return Err(Error::NoLeaves),
            count if count > MAX_LEAVES => return Err(Error::TooManyLeaves { count, max: MAX_LEAVES }),
            _ => (),
        }

        let len = nodes.len();
        let levels: Vec<_> = Level::all(len).collect();
        nodes.reserve(levels.iter().skip(1).map(Level::len).sum());

        for (level, parent) in levels.iter().zip(levels.iter().skip(1)) {
            for index in 0..parent.len() {
                let (left, right) = level.pair(index);
                let hash = H::hash(&nodes[left.0].hash, &nodes[right.0].hash);
                nodes.push(HashNode::branch(hash, left, right));
            }
        }

        let root = NodeId(nodes.len() - 1);
        debug!(leaves = len, nodes = nodes.len(), depth = levels.len() - 1, "hash tree built");

        Ok(Self {
            nodes,
            root,
            leaves: (0..len).map(NodeId).collect(),
            levels,
            sorted: OnceLock::new(),
        })
    }

    /// The root hash value.
    pub fn root(&self) -> &H::Hash {
        self.nodes[self.root.0].hash()
    }

    pub fn root_node(&self) -> &HashNode<H> {
        &self.nodes[self.root.0]
    }

    /// Number of leaves.
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// A hash tree is never empty, it holds at least one leaf.
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Number of levels above the leaves, ie. the length of an inclusion proof.
    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    pub fn node(&self, id: NodeId) -> Option<&HashNode<H>> {
        self.nodes.get(id.0)
    }

    pub fn leaf(&self, index: usize) -> Option<&H::Hash> {
        self.leaves.get(index).map(|id| self.nodes[id.0].hash())
    }

    pub fn leaves(&self) -> impl Iterator<Item = &H::Hash> {
        self.leaves.iter().map(|id| self.nodes[id.0].hash())
    }

    pub fn leaf_index(&self, hash: &H::Hash) -> Option<usize> {
        self.leaves().position(|leaf| leaf == hash)
    }

    /// Visit nodes depth-first, left before right, starting from the root.
    ///
    /// The traversal is iterative. A self-paired node is visited twice, once per parent edge.
    pub fn visit_nodes(&self) -> impl Iterator<Item = &HashNode<H>> {
        let mut rights = Vec::with_capacity(self.depth());

        std::iter::successors(Some(self.root_node()), move |&node| match node.nodes() {
            Some((left, right)) => {
                rights.push(right);
                Some(&self.nodes[left.0])
            }
            None => rights.pop().map(|right| &self.nodes[right.0]),
        })
    }
}

impl<H: Hasher> TryFrom<Vec<H::Hash>> for HashTree<H> {
    type Error = Error;

    fn try_from(hashes: Vec<H::Hash>) -> Result<Self, Self::Error> {
        Self::build(hashes)
    }
}
