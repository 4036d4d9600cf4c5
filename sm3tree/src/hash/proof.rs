use std::fmt;

use tracing::trace;

use super::{level::depth, Error, HashTree, Hasher};

/// A single sibling hash along an inclusion path.
///
/// It can be either `Sibling::Left(_)` or `Sibling::Right(_)` depending on its position wrt. the node on the path.
#[derive(Debug)]
enum Sibling<'p, H: Hasher> {
    Left(&'p H::Hash),
    Right(&'p H::Hash),
}

impl<H: Hasher> Sibling<'_, H> {
    /// Compute the parent hash of this sibling and the given node hash.
    fn hash(&self, other: &H::Hash) -> H::Hash {
        match self {
            Self::Left(hash) => H::hash(hash, other),
            Self::Right(hash) => H::hash(other, hash),
        }
    }
}

// Don't use `#[derive(PartialEq)]` here as it would require `Hasher` to implement `PartialEq` as well.
impl<H: Hasher> PartialEq for Sibling<'_, H> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Left(hash), Self::Left(other)) => hash.eq(other),
            (Self::Right(hash), Self::Right(other)) => hash.eq(other),
            _ => false,
        }
    }
}

/// Siblings of the leaf at `index`, the parity of the position on each level telling on which side they are.
fn path<H: Hasher>(index: usize, hashes: &[H::Hash]) -> impl Iterator<Item = Sibling<'_, H>> {
    hashes.iter().scan(index, |position, hash| {
        let sibling = match *position % 2 {
            0 => Sibling::Right(hash),
            _ => Sibling::Left(hash),
        };
        *position /= 2;
        Some(sibling)
    })
}

/// An inclusion proof.
///
/// It is built with all sibling hashes required to compute the root hash for a given leaf hash value, from the
/// leaf level up to the level right below the root.
pub struct InclusionProof<H: Hasher> {
    index: usize,
    len: usize,
    hashes: Vec<H::Hash>,
}

impl<H: Hasher> HashTree<H> {
    /// Build the inclusion proof of the leaf at the given index.
    pub fn prove_inclusion(&self, index: usize) -> Result<InclusionProof<H>, Error> {
        if index >= self.len() {
            return Err(Error::LeafIndexOutOfRange { index, len: self.len() });
        }

        let mut position = index;
        let hashes = self
            .levels
            .iter()
            .take_while(|level| !level.is_root())
            .map(|level| {
                let sibling = level.sibling(position);
                position /= 2;
                self.nodes[sibling.0].hash().clone()
            })
            .collect();

        trace!(index, len = self.len(), "inclusion proof built");

        Ok(InclusionProof {
            index,
            len: self.len(),
            hashes,
        })
    }

    /// Check that `leaf` sits at `index` in a tree of `len` leaves with the given root hash, folding the sibling
    /// hashes of `proof` from the leaf upwards.
    ///
    /// Before any hashing, the proof is rejected when `index >= len` or when its length isn't the depth of a
    /// `len`-leaf tree. Honest proofs always pass these checks, but a bare fold over the sibling hashes would not
    /// look at `len` at all.
    pub fn verify_inclusion(root: &H::Hash, leaf: &H::Hash, index: usize, len: usize, proof: &[H::Hash]) -> bool {
        if index >= len || depth(len) != Some(proof.len()) {
            return false;
        }

        path::<H>(index, proof).fold(leaf.clone(), |hash, sibling| sibling.hash(&hash)) == *root
    }
}

impl<H: Hasher> InclusionProof<H> {
    pub fn leaf_index(&self) -> usize {
        self.index
    }

    pub fn leaf_count(&self) -> usize {
        self.len
    }

    /// Sibling hashes, from the leaf level upwards.
    pub fn hashes(&self) -> &[H::Hash] {
        &self.hashes
    }

    pub fn into_hashes(self) -> Vec<H::Hash> {
        self.hashes
    }

    /// Compute the root hash wrt. the given leaf hash value.
    pub fn compute(&self, leaf: H::Hash) -> H::Hash {
        path::<H>(self.index, &self.hashes).fold(leaf, |hash, sibling| sibling.hash(&hash))
    }

    /// Compute the root hash wrt. the given leaf hash value, comparing it to the expected root hash value.
    pub fn verify(&self, root: &H::Hash, leaf: &H::Hash) -> bool {
        HashTree::<H>::verify_inclusion(root, leaf, self.index, self.len, &self.hashes)
    }
}

// Don't derive those as it would require `Hasher` to implement them as well.
impl<H: Hasher> fmt::Debug for InclusionProof<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InclusionProof")
            .field("index", &self.index)
            .field("len", &self.len)
            .field("hashes", &self.hashes)
            .finish()
    }
}

impl<H: Hasher> Clone for InclusionProof<H> {
    fn clone(&self) -> Self {
        Self {
            index: self.index,
            len: self.len,
            hashes: self.hashes.clone(),
        }
    }
}

impl<H: Hasher> PartialEq for InclusionProof<H> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.len == other.len && self.hashes == other.hashes
    }
}
