//! Non-inclusion proofs, over hash trees whose leaves are sorted.

use std::fmt;

use tracing::{trace, warn};

use super::{Error, HashTree, Hasher, InclusionProof};

/// Where a target value falls among the sorted leaves of a hash tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bounds<T> {
    /// The target is one of the leaves: there is nothing to prove.
    Present,
    /// The target is lower than the first leaf, given here.
    Below(T),
    /// The target is greater than the last leaf, given here.
    Above(T),
    /// The target falls between two consecutive leaves.
    Between(T, T),
}

impl<T> Bounds<T> {
    /// Neighbor leaves, lower one first.
    pub fn hashes(&self) -> Vec<&T> {
        match self {
            Self::Present => vec![],
            Self::Below(upper) => vec![upper],
            Self::Above(lower) => vec![lower],
            Self::Between(lower, upper) => vec![lower, upper],
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present)
    }
}

/// A non-inclusion proof.
///
/// It holds the leaves surrounding the target value along with `neighbor_index`, the position the target would be
/// inserted at (or its actual position when present). Every neighbor comes with its own inclusion proof, which only
/// [`NonInclusionProof::verify_strict`] relies on.
pub struct NonInclusionProof<H: Hasher> {
    neighbor_index: usize,
    bounds: Bounds<H::Hash>,
    witnesses: Vec<InclusionProof<H>>,
}

impl<H: Hasher> HashTree<H>
where
    H::Hash: Ord,
{
    /// Whether leaves are sorted in ascending order, checked once and for all.
    pub fn is_sorted(&self) -> bool {
        *self.sorted.get_or_init(|| self.leaves().zip(self.leaves().skip(1)).all(|(prev, next)| prev <= next))
    }

    /// Build the non-inclusion proof of the given value.
    ///
    /// Leaves must be sorted. If the value is actually one of the leaves, [`Bounds::Present`] is returned, which no
    /// verification accepts.
    pub fn prove_non_inclusion(&self, target: &H::Hash) -> Result<NonInclusionProof<H>, Error> {
        if !self.is_sorted() {
            warn!(len = self.len(), "non-inclusion proof requested over unsorted leaves");
            return Err(Error::UnsortedLeaves);
        }

        let leaf = |index: usize| self.nodes[self.leaves[index].0].hash().clone();
        let last = self.len() - 1;

        let (neighbor_index, bounds, neighbors) = match self.leaves.binary_search_by(|id| self.nodes[id.0].hash().cmp(target)) {
            Ok(index) => (index, Bounds::Present, vec![]),
            Err(0) => (0, Bounds::Below(leaf(0)), vec![0]),
            Err(index) if index > last => (index, Bounds::Above(leaf(last)), vec![last]),
            Err(index) => (index, Bounds::Between(leaf(index - 1), leaf(index)), vec![index - 1, index]),
        };

        let witnesses = neighbors
            .into_iter()
            .map(|index| self.prove_inclusion(index))
            .collect::<Result<_, _>>()?;

        trace!(neighbor_index, present = bounds.is_present(), "non-inclusion proof built");

        Ok(NonInclusionProof {
            neighbor_index,
            bounds,
            witnesses,
        })
    }

    /// Check that `target` falls between the neighbors given by the proof.
    ///
    /// This is a weak check: a single neighbor only has to differ from `target`, two neighbors have to surround it.
    /// Neither `_root` nor `_len` is consulted, see [`NonInclusionProof::verify_strict`] for a check tying the
    /// neighbors to the tree.
    pub fn verify_non_inclusion(_root: &H::Hash, target: &H::Hash, _len: usize, proof: &NonInclusionProof<H>) -> bool {
        match &proof.bounds {
            Bounds::Present => false,
            Bounds::Below(upper) => target != upper,
            Bounds::Above(lower) => target != lower,
            Bounds::Between(lower, upper) => lower < target && target < upper,
        }
    }
}

impl<H: Hasher> NonInclusionProof<H>
where
    H::Hash: Ord,
{
    pub fn neighbor_index(&self) -> usize {
        self.neighbor_index
    }

    pub fn bounds(&self) -> &Bounds<H::Hash> {
        &self.bounds
    }

    /// Neighbor leaves, lower one first: empty when the target is present.
    pub fn hashes(&self) -> Vec<&H::Hash> {
        self.bounds.hashes()
    }

    /// Inclusion proofs of the neighbor leaves, in the same order as [`NonInclusionProof::hashes`].
    pub fn witnesses(&self) -> &[InclusionProof<H>] {
        &self.witnesses
    }

    /// Same as [`HashTree::verify_non_inclusion`].
    pub fn verify(&self, root: &H::Hash, target: &H::Hash, len: usize) -> bool {
        HashTree::<H>::verify_non_inclusion(root, target, len, self)
    }

    /// Check that `target` is strictly ordered wrt. the neighbors, that the neighbor index is consistent with a tree
    /// of `len` leaves and that the neighbors are adjacent leaves (or the first / last one) of the tree with the given
    /// root.
    pub fn verify_strict(&self, root: &H::Hash, target: &H::Hash, len: usize) -> bool {
        if len == 0 || !self.verify(root, target, len) {
            return false;
        }

        let index = self.neighbor_index;
        let (ordered, positions) = match &self.bounds {
            Bounds::Present => return false,
            Bounds::Below(upper) => (index == 0 && target < upper, vec![0]),
            Bounds::Above(lower) => (index == len && target > lower, vec![len - 1]),
            Bounds::Between(..) if 0 < index && index < len => (true, vec![index - 1, index]),
            Bounds::Between(..) => return false,
        };

        ordered
            && self.witnesses.len() == positions.len()
            && self.hashes().into_iter().zip(&self.witnesses).zip(positions).all(|((hash, witness), position)| {
                witness.leaf_index() == position && witness.leaf_count() == len && witness.verify(root, hash)
            })
    }
}

// Don't derive those as it would require `Hasher` to implement them as well.
impl<H: Hasher> fmt::Debug for NonInclusionProof<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NonInclusionProof")
            .field("neighbor_index", &self.neighbor_index)
            .field("bounds", &self.bounds)
            .field("witnesses", &self.witnesses)
            .finish()
    }
}

impl<H: Hasher> Clone for NonInclusionProof<H> {
    fn clone(&self) -> Self {
        Self {
            neighbor_index: self.neighbor_index,
            bounds: self.bounds.clone(),
            witnesses: self.witnesses.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{super::tests::SimpleHasher, *};

    use assert_matches::assert_matches;

    fn tree(leaves: &str) -> HashTree<SimpleHasher> {
        HashTree::build(leaves.chars()).unwrap()
    }

    #[test]
    fn bounds() {
        let tree = tree("bdfh");
        let root = tree.root();

        for (target, index, bounds) in [
            ("a", 0, Bounds::Below(String::from("b"))),
            ("c", 1, Bounds::Between(String::from("b"), String::from("d"))),
            ("e", 2, Bounds::Between(String::from("d"), String::from("f"))),
            ("g", 3, Bounds::Between(String::from("f"), String::from("h"))),
            ("i", 4, Bounds::Above(String::from("h"))),
            ("d", 1, Bounds::Present),
            ("h", 3, Bounds::Present),
        ] {
            let target = String::from(target);
            let proof = tree.prove_non_inclusion(&target).unwrap();

            assert_eq!(proof.neighbor_index(), index, "{target}");
            assert_eq!(*proof.bounds(), bounds, "{target}");
            assert_eq!(proof.hashes().len(), proof.witnesses().len());

            let absent = !bounds.is_present();
            assert_eq!(proof.verify(root, &target, tree.len()), absent, "{target}");
            assert_eq!(proof.verify_strict(root, &target, tree.len()), absent, "{target}");
        }
    }

    #[test]
    fn proof_lengths() {
        let tree = tree("bdfh");

        for (target, len) in [("a", 1), ("e", 2), ("z", 1), ("f", 0)] {
            assert_eq!(tree.prove_non_inclusion(&String::from(target)).unwrap().hashes().len(), len, "{target}");
        }
    }

    #[test]
    fn single_leaf() {
        let tree = tree("m");
        let root = tree.root();

        for (target, bounds) in [("a", Bounds::Below(String::from("m"))), ("z", Bounds::Above(String::from("m")))] {
            let target = String::from(target);
            let proof = tree.prove_non_inclusion(&target).unwrap();

            assert_eq!(*proof.bounds(), bounds);
            assert!(proof.verify_strict(root, &target, 1));
        }
    }

    #[test]
    fn unsorted_leaves() {
        let tree = tree("bad");

        assert!(!tree.is_sorted());
        assert_matches!(tree.prove_non_inclusion(&String::from("c")), Err(Error::UnsortedLeaves));

        // duplicates are fine
        assert!(self::tree("abbc").is_sorted());
    }

    #[test]
    fn reject_misplaced_target() {
        let tree = tree("bdfh");
        let root = tree.root();
        let len = tree.len();

        let proof = tree.prove_non_inclusion(&String::from("e")).unwrap();
        for target in ["a", "d", "f", "z"] {
            assert!(!proof.verify(root, &String::from(target), len), "{target}");
        }

        // the weak check ignores the leaf count, the strict one doesn't
        let target = String::from("z");
        let proof = tree.prove_non_inclusion(&target).unwrap();
        for len in [len, len + 3, 1] {
            assert!(proof.verify(root, &target, len), "{len}");
            assert!(HashTree::<SimpleHasher>::verify_non_inclusion(root, &target, len, &proof), "{len}");
        }
        assert!(proof.verify_strict(root, &target, len));
        assert!(!proof.verify_strict(root, &target, len + 3));
        assert!(!proof.verify_strict(root, &target, 0));

        let proof = tree.prove_non_inclusion(&String::from("e")).unwrap();
        assert!(proof.verify(root, &String::from("e"), 2));
        assert!(!proof.verify_strict(root, &String::from("e"), 2));
    }

    #[test]
    fn strict_verification() {
        let tree = tree("bdfh");
        let other = self::tree("bcfh");
        let target = String::from("e");

        // built over a foreign tree, the neighbors only fool the weak check
        let proof = other.prove_non_inclusion(&target).unwrap();
        assert_eq!(*proof.bounds(), Bounds::Between(String::from("c"), String::from("f")));
        assert!(HashTree::<SimpleHasher>::verify_non_inclusion(tree.root(), &target, tree.len(), &proof));
        assert!(!proof.verify_strict(tree.root(), &target, tree.len()));
        assert!(proof.verify_strict(other.root(), &target, other.len()));

        // a single neighbor with a wrong ordering
        let proof = tree.prove_non_inclusion(&String::from("a")).unwrap();
        assert!(proof.verify(tree.root(), &String::from("c"), tree.len()));
        assert!(!proof.verify_strict(tree.root(), &String::from("c"), tree.len()));

        let cloned = proof.clone();
        assert_eq!(cloned.bounds(), proof.bounds());
        assert_eq!(cloned.witnesses(), proof.witnesses());
    }
}
