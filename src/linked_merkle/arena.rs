use crate::maybestd::vec::Vec;
use bytes::Bytes;

/// A handle to a node stored in a [`NodeArena`].
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Returns the position of the node inside its arena
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A vertex of the tree. Children are the owning edges of the structure;
/// `parent` is a back-reference kept consistent with them at build time.
#[derive(Debug, PartialEq, Clone)]
pub struct Node<H> {
    pub(crate) hash: H,
    pub(crate) parent: Option<NodeId>,
    pub(crate) left: Option<NodeId>,
    pub(crate) right: Option<NodeId>,
}

impl<H> Node<H> {
    fn new(hash: H) -> Self {
        Self {
            hash,
            parent: None,
            left: None,
            right: None,
        }
    }

    /// The digest currently stored at this node
    pub fn hash(&self) -> &H {
        &self.hash
    }

    /// The node one level up, if any
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// The left child, if this is an internal node
    pub fn left(&self) -> Option<NodeId> {
        self.left
    }

    /// The right child, if this is an internal node
    pub fn right(&self) -> Option<NodeId> {
        self.right
    }

    /// Returns true if the node has no children
    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

/// Flat storage for every node of a tree. Handles are only meaningful for the
/// arena that produced them.
#[derive(Debug, Clone)]
pub struct NodeArena<H> {
    nodes: Vec<Node<H>>,
}

impl<H> Default for NodeArena<H> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

impl<H> NodeArena<H> {
    /// Creates an arena with room for `capacity` nodes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
        }
    }

    /// Stores a parentless, childless node
    pub fn alloc(&mut self, hash: H) -> NodeId {
        self.nodes.push(Node::new(hash));
        NodeId(self.nodes.len() - 1)
    }

    /// Stores a new internal node over `left` and `right`, and points both
    /// children back at it.
    pub fn alloc_parent(&mut self, hash: H, left: NodeId, right: NodeId) -> NodeId {
        let mut node = Node::new(hash);
        node.left = Some(left);
        node.right = Some(right);
        self.nodes.push(node);
        let id = NodeId(self.nodes.len() - 1);
        self.nodes[left.0].parent = Some(id);
        self.nodes[right.0].parent = Some(id);
        id
    }

    /// Stores a node with `child` as its only (left) child
    #[cfg(test)]
    pub(crate) fn alloc_single_parent(&mut self, hash: H, child: NodeId) -> NodeId {
        let mut node = Node::new(hash);
        node.left = Some(child);
        self.nodes.push(node);
        let id = NodeId(self.nodes.len() - 1);
        self.nodes[child.0].parent = Some(id);
        id
    }

    /// Returns the node behind `id`, if it belongs to this arena
    pub fn get(&self, id: NodeId) -> Option<&Node<H>> {
        self.nodes.get(id.0)
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node<H> {
        &self.nodes[id.0]
    }

    pub(crate) fn set_hash(&mut self, id: NodeId, hash: H) {
        self.nodes[id.0].hash = hash;
    }

    /// Returns the other child of `id`'s parent. `None` for the root, or for a
    /// node whose parent does not record a second child, or a handle that
    /// does not belong to this arena.
    pub fn sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.get(self.get(id)?.parent?)?;
        if parent.right == Some(id) {
            parent.left
        } else {
            parent.right
        }
    }

    /// The number of nodes stored
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if no nodes have been stored
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// A leaf's raw data together with the node holding its digest.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafWithNode {
    data: Bytes,
    node: NodeId,
}

impl LeafWithNode {
    pub(crate) fn new(data: Bytes, node: NodeId) -> Self {
        Self { data, node }
    }

    /// Returns the raw data of the leaf
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the handle of the leaf's node
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub(crate) fn set_data(&mut self, data: Bytes) {
        self.data = data;
    }
}
