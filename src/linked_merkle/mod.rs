//! Implements a binary merkle tree with parent links, in which an odd node out at
//! any level is carried up to the next level instead of being paired with a copy
//! of itself.

/// Defines the node storage and handles used to link the tree together.
pub mod arena;
/// Defines errors that might arise when using the tree or checking proofs.
pub mod error;
/// Defines inclusion proofs on the tree.
pub mod proof;
/// Defines the merkle tree itself.
pub mod tree;
