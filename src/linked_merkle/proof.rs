use super::{error::ProofError, tree::MerkleHash};
use crate::maybestd::vec::Vec;

/// Which side of its parent a proof sibling sits on.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Side {
    /// The sibling is the left child, so the path node is on the right
    Left,
    /// The sibling is the right child, so the path node is on the left
    Right,
}

/// A single level of an inclusion proof.
#[derive(Debug, PartialEq, Eq, Clone)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProofStep<H> {
    /// The position of the sibling relative to the path node.
    pub side: Side,
    /// The sibling's digest.
    pub hash: H,
}

/// An inclusion proof for a single leaf.
///
/// Steps are ordered from the leaf's level up to the level just below the
/// root. Levels where the path node was carried without a sibling contribute
/// no step, so a proof can be shorter than the tree is deep.
#[derive(Debug, PartialEq, Clone)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Proof<M: MerkleHash> {
    /// The siblings to be used to build the path to the root.
    pub steps: Vec<ProofStep<M::Output>>,
}

impl<M: MerkleHash> Default for Proof<M> {
    fn default() -> Self {
        Self {
            steps: Default::default(),
        }
    }
}

impl<M> Proof<M>
where
    M: MerkleHash + Default,
{
    /// Verify that `leaf_hash` is committed to by `root`, replaying every
    /// step on the side it was recorded on.
    pub fn verify(&self, root: &M::Output, leaf_hash: &M::Output) -> bool {
        self.verify_with_hasher(root, leaf_hash, &M::default())
    }

    /// Like [`Proof::verify`], but starts from the leaf's raw data.
    pub fn verify_data(&self, root: &M::Output, raw_leaf: &[u8]) -> bool {
        let hasher = M::default();
        self.verify_with_hasher(root, &hasher.hash_leaf(raw_leaf), &hasher)
    }

    /// Verify the proof, returning an error on mismatch
    pub fn check(&self, root: &M::Output, leaf_hash: &M::Output) -> Result<(), ProofError> {
        if self.verify(root, leaf_hash) {
            return Ok(());
        }
        Err(ProofError::InvalidRoot)
    }

    /// Verify the proof by always hashing the running digest on the left and
    /// the sibling on the right, ignoring the recorded sides.
    ///
    /// Only leaves whose every sibling is a right sibling verify this way.
    /// Provided for compatibility with plain digest-list proofs; see
    /// [`verify_sibling_path`].
    pub fn verify_left_biased(&self, root: &M::Output, leaf_hash: &M::Output) -> bool {
        let siblings = self.siblings();
        verify_sibling_path(&M::default(), root, leaf_hash, &siblings)
    }
}

impl<M> Proof<M>
where
    M: MerkleHash,
{
    /// Verify the proof with an explicit hasher instance
    pub fn verify_with_hasher(&self, root: &M::Output, leaf_hash: &M::Output, hasher: &M) -> bool {
        &self.compute_root(leaf_hash, hasher) == root
    }

    /// Replays the path from `leaf_hash` and returns the root it leads to.
    pub fn compute_root(&self, leaf_hash: &M::Output, hasher: &M) -> M::Output {
        self.steps
            .iter()
            .fold(leaf_hash.clone(), |running, step| match step.side {
                Side::Left => hasher.hash_nodes(&step.hash, &running),
                Side::Right => hasher.hash_nodes(&running, &step.hash),
            })
    }

    /// Returns the sibling digests without their sides, closest level first.
    pub fn siblings(&self) -> Vec<M::Output> {
        self.steps.iter().map(|step| step.hash.clone()).collect()
    }

    /// Returns the number of steps in the proof
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true for the proof of a single-leaf tree
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Verifies a plain list of sibling digests: `hash = hash_nodes(hash, sibling)`
/// for each sibling in order, then compares against `root`.
///
/// Needs nothing but the leaf hash, the siblings and the root.
pub fn verify_sibling_path<M: MerkleHash>(
    hasher: &M,
    root: &M::Output,
    leaf_hash: &M::Output,
    siblings: &[M::Output],
) -> bool {
    let computed = siblings
        .iter()
        .fold(leaf_hash.clone(), |running, sibling| {
            hasher.hash_nodes(&running, sibling)
        });
    &computed == root
}
