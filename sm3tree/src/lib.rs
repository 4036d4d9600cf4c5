//! A crate providing the SM3 hash function along with hash tree features (aka. Merkle tree, inclusion and
//! non-inclusion proofs).
//!
//! The hash tree is generic over a [`Hasher`], [`Sm3`] being the native one. Enabling the `digest_compat` feature
//! makes [`Sm3`] a [`digest::Digest`](https://docs.rs/digest) and lets any other digest back a hash tree.
//!
//! # Pros of the current implementation
//! - Nodes are stored in a single arena and refer to each other by index: no smart pointers, no recursion when
//!   dropping a tree, however deep it is.
//! - A hash tree is immutable once built and can be freely shared between threads.
//! - The streaming hasher exposes its chaining value so that hashing can be resumed from it.
//!
//! # Known limitations of the current implementation
//! - The last node of an odd level is paired with itself rather than promoted, which makes root hashes differ from
//!   schemes such as RFC 6962.
//! - [`HashTree::verify_non_inclusion`] doesn't check that neighbors belong to the tree, see
//!   [`NonInclusionProof::verify_strict`].
//! - No constant-time guarantee whatsoever.

mod hash;
pub mod sm3;

pub use hash::{Bounds, Error, HashNode, HashTree, Hasher, InclusionProof, NodeId, NonInclusionProof, MAX_LEAVES};
pub use sm3::{Sm3, Sm3Output, DIGEST_LEN};

#[cfg(feature = "digest_compat")]
pub mod compat;

/// A hash tree over SM3 digests.
pub type Sm3Tree = HashTree<Sm3>;
