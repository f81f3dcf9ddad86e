use crate::maybestd::fmt;

/// An error that occurred while operating on a built tree.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum TreeError {
    /// The requested leaf index is not a member of the tree's leaf list
    LeafOutOfRange {
        /// The index the caller asked for
        index: usize,
        /// The number of leaves in the tree
        len: usize,
    },
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeError::LeafOutOfRange { index, len } => {
                write!(f, "leaf {} is not a member of a tree with {} leaves", index, len)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for TreeError {}

/// An error that occurred while trying to check a claimed inclusion proof.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ProofError {
    /// The claimed proof does not verify against the provided root
    InvalidRoot,
}

impl fmt::Display for ProofError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProofError::InvalidRoot => f.write_str("proof does not lead to the expected root"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ProofError {}
