#![cfg_attr(not(feature = "std"), no_std)]
#![deny(missing_docs)]
//! A binary merkle tree that commits to an ordered list of byte strings with a
//! single sha256 root, and proves that a given leaf belongs to it.
//!
//! Unlike padding schemes, an unpaired node at the end of a level is carried
//! up unchanged, so trees over the same leaves built by duplicate-last-leaf
//! implementations have different roots.
//!
//! ```
//! use linked_merkle::MerkleTree;
//!
//! let tree: MerkleTree = MerkleTree::build([b"A", b"B", b"C"]);
//! let proof = tree.generate_proof(0).unwrap();
//! assert!(tree.verify_proof(0, &proof));
//!
//! // A verifier only needs the leaf data, the proof and the root.
//! let root = *tree.root();
//! assert!(proof.verify_data(&root, b"A"));
//! ```

#[cfg(not(feature = "std"))]
extern crate alloc;

mod maybestd {
    #[cfg(not(feature = "std"))]
    pub use alloc::vec;
    pub use core::{fmt, hash};
    #[cfg(feature = "std")]
    pub use std::vec;
}

/// Implements the parent-linked merkle tree, its proofs and errors.
pub mod linked_merkle;
/// The sha256 digest used throughout the tree.
pub mod sha2_hash;

pub use linked_merkle::{
    arena::{LeafWithNode, Node, NodeId},
    error::{ProofError, TreeError},
    proof::{verify_sibling_path, Proof, ProofStep, Side},
    tree::{MerkleHash, MerkleTree},
};
pub use sha2_hash::{hash_pair, Sha256Hasher, HASH_LEN};
