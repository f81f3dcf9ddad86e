use sha2::{Digest, Sha256};

use crate::linked_merkle::tree::MerkleHash;

/// The length of a digest in bytes
pub const HASH_LEN: usize = 32;

/// Hashes the concatenation `a ++ b`. Either input may be empty.
pub fn hash_pair(a: &[u8], b: &[u8]) -> [u8; HASH_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(a);
    hasher.update(b);
    hasher.finalize().into()
}

/// A plain sha256 hasher. Leaves hash as `sha256(data)` and inner nodes as
/// `sha256(left || right)`; there is no domain separation between the two.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sha256Hasher;

impl Sha256Hasher {
    /// Create a new instance of the hasher
    pub fn new() -> Self {
        Sha256Hasher
    }
}

impl MerkleHash for Sha256Hasher {
    type Output = [u8; HASH_LEN];

    // sha256 of the empty string
    const EMPTY_ROOT: Self::Output = [
        227, 176, 196, 66, 152, 252, 28, 20, 154, 251, 244, 200, 153, 111, 185, 36, 39, 174, 65,
        228, 100, 155, 147, 76, 164, 149, 153, 27, 120, 82, 184, 85,
    ];

    fn hash_leaf(&self, data: &[u8]) -> Self::Output {
        hash_pair(data, &[])
    }

    fn hash_nodes(&self, left: &Self::Output, right: &Self::Output) -> Self::Output {
        hash_pair(left, right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_root_is_hash_of_nothing() {
        assert_eq!(hash_pair(&[], &[]), Sha256Hasher::EMPTY_ROOT);
        assert_eq!(
            hex::encode(Sha256Hasher::EMPTY_ROOT),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn pair_hash_is_concatenation() {
        assert_eq!(hash_pair(b"ab", b"c"), hash_pair(b"a", b"bc"));
        assert_eq!(hash_pair(b"abc", &[]), hash_pair(&[], b"abc"));
        assert_eq!(
            hex::encode(hash_pair(b"abc", &[])),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn pair_hash_is_ordered() {
        let a = Sha256Hasher.hash_leaf(b"A");
        let b = Sha256Hasher.hash_leaf(b"B");
        assert_ne!(Sha256Hasher.hash_nodes(&a, &b), Sha256Hasher.hash_nodes(&b, &a));
    }
}
