use super::arena::{LeafWithNode, Node, NodeArena, NodeId};
use super::error::TreeError;
use super::proof::{Proof, ProofStep, Side};
use crate::maybestd::{fmt::Debug, hash::Hash, vec::Vec};
use bytes::Bytes;

/// A trait for hashing data into a merkle tree
pub trait MerkleHash {
    /// The output of this hasher.
    #[cfg(all(not(feature = "serde"), not(feature = "borsh")))]
    type Output: Debug + PartialEq + Eq + Clone + Default + Hash + AsRef<[u8]>;

    /// The output of this hasher.
    #[cfg(all(feature = "serde", not(feature = "borsh")))]
    type Output: Debug
        + PartialEq
        + Eq
        + Clone
        + Default
        + Hash
        + AsRef<[u8]>
        + serde::Serialize
        + serde::de::DeserializeOwned;

    /// The output of this hasher.
    #[cfg(all(not(feature = "serde"), feature = "borsh"))]
    type Output: Debug
        + PartialEq
        + Eq
        + Clone
        + Default
        + Hash
        + AsRef<[u8]>
        + borsh::BorshSerialize
        + borsh::BorshDeserialize;

    /// The output of this hasher.
    #[cfg(all(feature = "serde", feature = "borsh"))]
    type Output: Debug
        + PartialEq
        + Eq
        + Clone
        + Default
        + Hash
        + AsRef<[u8]>
        + serde::Serialize
        + serde::de::DeserializeOwned
        + borsh::BorshSerialize
        + borsh::BorshDeserialize;

    /// The root of the tree built from no leaves: the hash of two empty inputs.
    const EMPTY_ROOT: Self::Output;

    /// Hashes raw data as a leaf of the tree.
    fn hash_leaf(&self, data: &[u8]) -> Self::Output;
    /// Hashes two digests into one, left before right.
    fn hash_nodes(&self, l: &Self::Output, r: &Self::Output) -> Self::Output;
}

/// A binary merkle tree whose nodes keep a link to their parent.
///
/// Levels are reduced pairwise from the leaves up. When a level has an odd
/// number of nodes the last one is carried up untouched, neither rehashed nor
/// paired with a copy of itself, and only gets a parent once it is paired at
/// some higher level (or becomes the root).
///
/// Example: the tree over leaves `[A, B, C]`
/// ```ascii
///          root
///        /      \
///       AB       C
///      /  \
///     A    B
/// ```
pub struct MerkleTree<M: MerkleHash = crate::Sha256Hasher> {
    nodes: NodeArena<M::Output>,
    leaves: Vec<LeafWithNode>,
    root: NodeId,
    hasher: M,
}

impl<M: MerkleHash> Debug for MerkleTree<M> {
    fn fmt(&self, f: &mut crate::maybestd::fmt::Formatter<'_>) -> crate::maybestd::fmt::Result {
        f.debug_struct("MerkleTree")
            .field("root", self.root())
            .field("leaves", &self.leaves.len())
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

impl<M> MerkleTree<M>
where
    M: MerkleHash + Default,
{
    /// Builds a tree over `items` with a default hasher
    pub fn build<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        Self::build_with_hasher(items, Default::default())
    }
}

impl<M, T> FromIterator<T> for MerkleTree<M>
where
    M: MerkleHash + Default,
    T: AsRef<[u8]>,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::build(iter)
    }
}

impl<M> MerkleTree<M>
where
    M: MerkleHash,
{
    /// Builds a tree over `items` with the given hasher.
    ///
    /// An empty input yields a tree with no leaves whose root is
    /// [`MerkleHash::EMPTY_ROOT`].
    pub fn build_with_hasher<I, T>(items: I, hasher: M) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let items = items.into_iter();
        // n leaves need 2n - 1 nodes; the empty tree still needs its root
        let mut nodes = NodeArena::with_capacity(
            items.size_hint().0.saturating_mul(2).saturating_sub(1).max(1),
        );
        let mut leaves = Vec::with_capacity(items.size_hint().0);
        for item in items {
            let data = Bytes::copy_from_slice(item.as_ref());
            let node = nodes.alloc(hasher.hash_leaf(&data));
            leaves.push(LeafWithNode::new(data, node));
        }

        if leaves.is_empty() {
            let root = nodes.alloc(M::EMPTY_ROOT);
            log::debug!("built empty merkle tree");
            return Self {
                nodes,
                leaves,
                root,
                hasher,
            };
        }

        let mut level: Vec<NodeId> = leaves.iter().map(LeafWithNode::node).collect();
        let mut height = 0usize;
        while level.len() > 1 {
            let mut next = Vec::with_capacity((level.len() + 1) / 2);
            for pair in level.chunks(2) {
                match *pair {
                    [left, right] => {
                        let hash = hasher
                            .hash_nodes(nodes.node(left).hash(), nodes.node(right).hash());
                        next.push(nodes.alloc_parent(hash, left, right));
                    }
                    // The odd node out moves up as-is
                    [carried] => next.push(carried),
                    _ => unreachable!("chunks(2) yields one or two nodes"),
                }
            }
            log::trace!(
                "reduced level {} from {} to {} nodes",
                height,
                level.len(),
                next.len()
            );
            level = next;
            height += 1;
        }

        let root = level[0];
        log::debug!(
            "built merkle tree over {} leaves with {} levels above the leaves",
            leaves.len(),
            height
        );
        Self {
            nodes,
            leaves,
            root,
            hasher,
        }
    }

    /// Returns the root digest of the tree.
    pub fn root(&self) -> &M::Output {
        self.nodes.node(self.root).hash()
    }

    /// Returns the handle of the root node
    pub fn root_node(&self) -> NodeId {
        self.root
    }

    /// Returns the node behind `id`, if it belongs to this tree
    pub fn node(&self, id: NodeId) -> Option<&Node<M::Output>> {
        self.nodes.get(id)
    }

    /// Returns all leaves in the tree, in input order
    pub fn leaves(&self) -> &[LeafWithNode] {
        &self.leaves[..]
    }

    /// Returns the digest of the leaf at `index`
    pub fn leaf_hash(&self, index: usize) -> Result<&M::Output, TreeError> {
        let leaf = self.leaf(index)?;
        Ok(self.nodes.node(leaf.node()).hash())
    }

    /// Returns the number of leaves
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// Returns true if the tree was built from no items
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Returns the hasher used by this tree
    pub fn hasher(&self) -> &M {
        &self.hasher
    }

    fn leaf(&self, index: usize) -> Result<&LeafWithNode, TreeError> {
        self.leaves.get(index).ok_or(TreeError::LeafOutOfRange {
            index,
            len: self.leaves.len(),
        })
    }

    /// Creates an inclusion proof for the leaf at `index`.
    ///
    /// The proof holds one step per level at which the leaf's ancestor has a
    /// sibling, closest level first. For the tree over `[A, B, C, D]`:
    /// ```ascii
    ///          root
    ///        /      \
    ///       E        F
    ///      / \      /  \
    ///     A   B    C    D
    /// ```
    /// the proof for `B` is `[(Left, A), (Right, F)]`.
    pub fn generate_proof(&self, index: usize) -> Result<Proof<M>, TreeError> {
        let mut current = self.leaf(index)?.node();
        let mut steps = Vec::new();
        while current != self.root {
            let Some(parent) = self.nodes.node(current).parent() else {
                break;
            };
            if let Some(sibling) = self.nodes.sibling(current) {
                let side = if self.nodes.node(parent).left() == Some(sibling) {
                    Side::Left
                } else {
                    Side::Right
                };
                steps.push(ProofStep {
                    side,
                    hash: self.nodes.node(sibling).hash().clone(),
                });
            }
            current = parent;
        }
        Ok(Proof { steps })
    }

    /// Checks `proof` for the leaf at `index` against this tree's root.
    ///
    /// A leaf that is not a member of the tree never verifies.
    pub fn verify_proof(&self, index: usize, proof: &Proof<M>) -> bool {
        match self.leaf_hash(index) {
            Ok(leaf_hash) => proof.verify_with_hasher(self.root(), leaf_hash, &self.hasher),
            Err(_) => false,
        }
    }

    /// Fetches the leaf at the given index, along with a proof of inclusion.
    pub fn get_index_with_proof(&self, index: usize) -> Result<(Vec<u8>, Proof<M>), TreeError> {
        let data = self.leaf(index)?.data().to_vec();
        Ok((data, self.generate_proof(index)?))
    }

    /// Replaces the data of the leaf at `index` and rehashes every ancestor
    /// up to and including the root.
    ///
    /// Each ancestor is recomputed from its own children in their real order,
    /// so afterwards the tree is identical to one built from scratch over the
    /// updated data and positioned proofs ([`Proof::verify`]) keep verifying.
    pub fn update_leaf(&mut self, index: usize, new_data: &[u8]) -> Result<(), TreeError> {
        self.rehash_path(index, new_data, PathOrder::ChildOrder)
    }

    /// Replaces the data of the leaf at `index` and rehashes every ancestor as
    /// `hash_nodes(path_node, sibling)`, always keeping the node on the path on
    /// the left whatever side it sits on.
    ///
    /// This is the update counterpart of [`Proof::verify_left_biased`]: after
    /// it, fresh proofs verify under the left-biased rule. For a leaf with any
    /// left sibling on its path the resulting root no longer matches a fresh
    /// build.
    pub fn update_leaf_left_biased(
        &mut self,
        index: usize,
        new_data: &[u8],
    ) -> Result<(), TreeError> {
        self.rehash_path(index, new_data, PathOrder::PathLeft)
    }

    fn rehash_path(
        &mut self,
        index: usize,
        new_data: &[u8],
        order: PathOrder,
    ) -> Result<(), TreeError> {
        let len = self.leaves.len();
        let leaf = self
            .leaves
            .get_mut(index)
            .ok_or(TreeError::LeafOutOfRange { index, len })?;
        let data = Bytes::copy_from_slice(new_data);
        let mut current = leaf.node();
        leaf.set_data(data);
        self.nodes.set_hash(current, self.hasher.hash_leaf(new_data));

        let mut rehashed = 0usize;
        while current != self.root {
            let Some(parent) = self.nodes.node(current).parent() else {
                break;
            };
            let current_hash = self.nodes.node(current).hash();
            let hash = match self.nodes.sibling(current) {
                Some(sibling) => {
                    let sibling_hash = self.nodes.node(sibling).hash();
                    let sibling_on_left = self.nodes.node(parent).left() == Some(sibling);
                    match order {
                        PathOrder::ChildOrder if sibling_on_left => {
                            self.hasher.hash_nodes(sibling_hash, current_hash)
                        }
                        _ => self.hasher.hash_nodes(current_hash, sibling_hash),
                    }
                }
                // A parent that records no second child re-adopts the path
                // node as if it were raw leaf data.
                None => self.hasher.hash_leaf(current_hash.as_ref()),
            };
            self.nodes.set_hash(parent, hash);
            current = parent;
            rehashed += 1;
        }
        log::debug!(
            "updated leaf {} and rehashed {} ancestors ({:?})",
            index,
            rehashed,
            order
        );
        Ok(())
    }
}

/// How an update combines the path node with its sibling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PathOrder {
    /// Left child before right child, as at build time
    ChildOrder,
    /// Path node first, sibling second
    PathLeft,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sha2_hash::{hash_pair, Sha256Hasher};
    use crate::maybestd::vec;

    fn h(data: &[u8]) -> [u8; 32] {
        hash_pair(data, &[])
    }

    fn tree_with_n_leaves(n: usize) -> MerkleTree<Sha256Hasher> {
        MerkleTree::build((0..n).map(|i| (i as u64).to_be_bytes()))
    }

    #[test]
    fn four_leaf_root() {
        let tree: MerkleTree = MerkleTree::build([b"A", b"B", b"C", b"D"]);
        assert_eq!(tree.len(), 4);
        let ab = hash_pair(&h(b"A"), &h(b"B"));
        let cd = hash_pair(&h(b"C"), &h(b"D"));
        assert_eq!(tree.root(), &hash_pair(&ab, &cd));
    }

    #[test]
    fn odd_node_is_carried() {
        let tree: MerkleTree = MerkleTree::build([b"A", b"B", b"C"]);
        let ab = hash_pair(&h(b"A"), &h(b"B"));
        assert_eq!(tree.root(), &hash_pair(&ab, &h(b"C")));

        // C is linked straight under the root
        let c = tree.leaves()[2].node();
        assert_eq!(tree.node(c).unwrap().parent(), Some(tree.root_node()));
        // Three leaves, one pair, one root
        assert_eq!(tree.nodes.len(), 5);
    }

    #[test]
    fn carried_across_several_levels() {
        // Level sizes 5 -> 3 -> 2 -> 1; the fifth leaf is carried twice.
        let tree: MerkleTree = MerkleTree::build([b"A", b"B", b"C", b"D", b"E"]);
        let ab = hash_pair(&h(b"A"), &h(b"B"));
        let cd = hash_pair(&h(b"C"), &h(b"D"));
        let abcd = hash_pair(&ab, &cd);
        assert_eq!(tree.root(), &hash_pair(&abcd, &h(b"E")));

        let proof = tree.generate_proof(4).unwrap();
        assert_eq!(proof.len(), 1);
        assert_eq!(proof.steps[0].side, Side::Left);
        assert_eq!(proof.steps[0].hash, abcd);
    }

    #[test]
    fn six_leaves_carry_an_inner_node() {
        // Level sizes 6 -> 3 -> 2 -> 1; the EF node is carried, not a leaf.
        let tree: MerkleTree = MerkleTree::build([b"A", b"B", b"C", b"D", b"E", b"F"]);
        let ab = hash_pair(&h(b"A"), &h(b"B"));
        let cd = hash_pair(&h(b"C"), &h(b"D"));
        let ef = hash_pair(&h(b"E"), &h(b"F"));
        assert_eq!(tree.root(), &hash_pair(&hash_pair(&ab, &cd), &ef));

        let proof = tree.generate_proof(5).unwrap();
        assert_eq!(
            proof.steps,
            vec![
                ProofStep {
                    side: Side::Left,
                    hash: h(b"E")
                },
                ProofStep {
                    side: Side::Left,
                    hash: hash_pair(&ab, &cd)
                },
            ]
        );
        assert!(tree.verify_proof(5, &proof));
    }

    #[test]
    fn single_leaf_tree() {
        let tree: MerkleTree = MerkleTree::build([b"A"]);
        assert_eq!(tree.root(), &h(b"A"));
        let proof = tree.generate_proof(0).unwrap();
        assert!(proof.is_empty());
        assert!(tree.verify_proof(0, &proof));
        assert!(proof.verify_left_biased(tree.root(), &h(b"A")));
    }

    #[test]
    fn empty_tree() {
        let tree: MerkleTree = MerkleTree::build(Vec::<Vec<u8>>::new());
        assert!(tree.is_empty());
        assert_eq!(tree.root(), &hash_pair(&[], &[]));
        assert_eq!(tree.root(), &Sha256Hasher::EMPTY_ROOT);
        assert_eq!(
            tree.generate_proof(0),
            Err(TreeError::LeafOutOfRange { index: 0, len: 0 })
        );
    }

    #[test]
    fn proof_for_first_leaf() {
        let tree: MerkleTree = MerkleTree::build([b"A", b"B", b"C", b"D"]);
        let proof = tree.generate_proof(0).unwrap();
        let cd = hash_pair(&h(b"C"), &h(b"D"));
        assert_eq!(proof.siblings(), vec![h(b"B"), cd]);
        assert!(proof.steps.iter().all(|step| step.side == Side::Right));
        assert!(tree.verify_proof(0, &proof));
    }

    #[test]
    fn right_child_path_needs_sides() {
        let tree: MerkleTree = MerkleTree::build([b"A", b"B", b"C", b"D"]);
        let leaf_b = *tree.leaf_hash(1).unwrap();
        let proof = tree.generate_proof(1).unwrap();

        assert!(proof.verify(tree.root(), &leaf_b));
        assert!(!proof.verify_left_biased(tree.root(), &leaf_b));

        let leaf_a = *tree.leaf_hash(0).unwrap();
        let proof = tree.generate_proof(0).unwrap();
        assert!(proof.verify(tree.root(), &leaf_a));
        assert!(proof.verify_left_biased(tree.root(), &leaf_a));
    }

    #[test]
    fn every_leaf_round_trips() {
        for n in 1..40 {
            let tree = tree_with_n_leaves(n);
            for i in 0..n {
                let proof = tree.generate_proof(i).unwrap();
                assert!(tree.verify_proof(i, &proof), "leaf {} of {}", i, n);
            }
        }
    }

    #[test]
    fn proof_for_other_leaf_fails() {
        let tree = tree_with_n_leaves(7);
        let proof = tree.generate_proof(2).unwrap();
        for i in (0..7).filter(|i| *i != 2) {
            assert!(!tree.verify_proof(i, &proof));
        }
        assert!(!tree.verify_proof(7, &proof));
    }

    #[test]
    fn out_of_range_leaf() {
        let mut tree = tree_with_n_leaves(3);
        let err = TreeError::LeafOutOfRange { index: 3, len: 3 };
        assert_eq!(tree.generate_proof(3), Err(err));
        assert_eq!(tree.update_leaf(3, b"x"), Err(err));
        assert_eq!(tree.leaf_hash(3), Err(err));
    }

    #[test]
    fn update_matches_fresh_build() {
        for n in 1..20 {
            for i in 0..n {
                let mut tree = tree_with_n_leaves(n);
                let before = *tree.root();
                tree.update_leaf(i, b"updated").unwrap();
                assert_ne!(tree.root(), &before);

                let rebuilt: MerkleTree = MerkleTree::build((0..n).map(|j| {
                    if j == i {
                        b"updated".to_vec()
                    } else {
                        (j as u64).to_be_bytes().to_vec()
                    }
                }));
                assert_eq!(tree.root(), rebuilt.root(), "leaf {} of {}", i, n);

                let proof = tree.generate_proof(i).unwrap();
                assert!(tree.verify_proof(i, &proof));
                assert_eq!(tree.leaves()[i].data(), b"updated");
            }
        }
    }

    #[test]
    fn update_with_same_data_keeps_root() {
        let mut tree: MerkleTree = MerkleTree::build([b"A", b"B", b"C"]);
        let before = *tree.root();
        tree.update_leaf(1, b"B").unwrap();
        assert_eq!(tree.root(), &before);
    }

    #[test]
    fn get_index_with_proof_returns_data() {
        let tree: MerkleTree = MerkleTree::build([b"A", b"B", b"C"]);
        let (data, proof) = tree.get_index_with_proof(1).unwrap();
        assert_eq!(data, b"B".to_vec());
        assert!(proof.verify_data(tree.root(), &data));
    }

    #[test]
    fn collects_from_iterator() {
        let tree: MerkleTree = [b"A", b"B"].into_iter().collect();
        assert_eq!(tree.root(), &hash_pair(&h(b"A"), &h(b"B")));
    }

    #[test]
    fn known_leaf_hash() {
        let tree: MerkleTree = MerkleTree::build([b"A", b"B", b"C"]);
        let a = Sha256Hasher.hash_leaf(b"A");
        assert_eq!(
            hex::encode(a),
            "559aead08264d5795d3909718cdd05abd49572e84fe55590eef31a88a08fdffd"
        );
        assert_eq!(tree.leaf_hash(0).unwrap(), &a);
    }

    #[test]
    fn known_roots() {
        let tree: MerkleTree = MerkleTree::build([b"A", b"B", b"C"]);
        assert_eq!(
            hex::encode(tree.root()),
            "dbe11e36aa89a963103de7f8ad09c1100c06ccd5c5ad424ca741efb0689dc427"
        );

        let tree: MerkleTree = MerkleTree::build((1..17u8).map(|i| [i]));
        assert_eq!(
            hex::encode(tree.root()),
            "4dde80c148f14924299e9c6a85adb937b27c854f28eba32606d0b8b36f14595d"
        );
    }

    #[test]
    fn left_biased_update_keeps_path_node_on_the_left() {
        let mut tree: MerkleTree = MerkleTree::build([b"A", b"B", b"C", b"D"]);
        tree.update_leaf_left_biased(1, b"E").unwrap();

        let cd = hash_pair(&h(b"C"), &h(b"D"));
        let expected = hash_pair(&hash_pair(&h(b"E"), &h(b"A")), &cd);
        assert_eq!(tree.root(), &expected);
        assert_eq!(tree.leaves()[1].data(), b"E");

        let leaf = *tree.leaf_hash(1).unwrap();
        let proof = tree.generate_proof(1).unwrap();
        assert!(proof.verify_left_biased(tree.root(), &leaf));
        assert!(!proof.verify(tree.root(), &leaf));
    }

    #[test]
    fn update_orders_agree_on_left_paths() {
        let mut ordered: MerkleTree = MerkleTree::build([b"A", b"B", b"C", b"D"]);
        let mut left_biased: MerkleTree = MerkleTree::build([b"A", b"B", b"C", b"D"]);
        ordered.update_leaf(0, b"E").unwrap();
        left_biased.update_leaf_left_biased(0, b"E").unwrap();
        assert_eq!(ordered.root(), left_biased.root());

        let mut ordered: MerkleTree = MerkleTree::build([b"A", b"B", b"C", b"D"]);
        let mut left_biased: MerkleTree = MerkleTree::build([b"A", b"B", b"C", b"D"]);
        ordered.update_leaf(3, b"E").unwrap();
        left_biased.update_leaf_left_biased(3, b"E").unwrap();
        assert_ne!(ordered.root(), left_biased.root());
        assert_eq!(
            left_biased.update_leaf_left_biased(4, b"E"),
            Err(TreeError::LeafOutOfRange { index: 4, len: 4 })
        );
    }

    #[test]
    fn parent_without_second_child_readopts_path_node() {
        // Hand-linked: a root holding a single child, which `build` never makes
        let hasher = Sha256Hasher;
        let mut nodes = NodeArena::default();
        let leaf = nodes.alloc(hasher.hash_leaf(b"A"));
        let root = nodes.alloc_single_parent(hasher.hash_leaf(&h(b"A")), leaf);
        let mut tree = MerkleTree {
            nodes,
            leaves: vec![LeafWithNode::new(Bytes::from_static(b"A"), leaf)],
            root,
            hasher,
        };

        assert!(tree.generate_proof(0).unwrap().is_empty());
        tree.update_leaf(0, b"X").unwrap();
        assert_eq!(tree.root(), &hash_pair(&h(b"X"), &[]));
        tree.update_leaf_left_biased(0, b"Y").unwrap();
        assert_eq!(tree.root(), &hash_pair(&h(b"Y"), &[]));
        assert_eq!(tree.leaf_hash(0).unwrap(), &h(b"Y"));
    }
}
