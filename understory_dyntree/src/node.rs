// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree nodes and the dense node arena.
//!
//! Nodes live in one `Vec` and link to each other by index. Freeing a node moves the last node
//! into the freed slot, so a [`NodeIdx`] is only meaningful until the next structural change;
//! resolve elements by id (see [`DynamicTree::leaf_of`](crate::DynamicTree::leaf_of)) instead
//! of holding on to indices.

use crate::bucket::BucketIdx;

/// Index of a node in the arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIdx(u32);

impl NodeIdx {
    pub(crate) const fn new(i: u32) -> Self {
        Self(i)
    }

    #[allow(
        clippy::cast_possible_truncation,
        reason = "Node indices are 32-bit; arenas never approach u32::MAX nodes."
    )]
    pub(crate) const fn from_usize(i: usize) -> Self {
        Self::new(i as u32)
    }

    /// Position of the node in the arena.
    pub const fn get(self) -> usize {
        self.0 as usize
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum NodeKind {
    /// Leaf owning one bucket of element ids.
    Leaf(BucketIdx),
    /// Internal node with exactly two children.
    Internal { left: NodeIdx, right: NodeIdx },
    /// Unlinked node about to be freed; relocation skips its links.
    Detached,
}

/// A node of the tree: a bounding volume, a parent link, and either two children or a bucket.
#[derive(Clone, Debug)]
pub struct Node<V> {
    pub(crate) bound: V,
    pub(crate) parent: Option<NodeIdx>,
    pub(crate) kind: NodeKind,
}

impl<V> Node<V> {
    pub(crate) fn leaf(bound: V, parent: Option<NodeIdx>, bucket: BucketIdx) -> Self {
        Self {
            bound,
            parent,
            kind: NodeKind::Leaf(bucket),
        }
    }

    /// Bounding volume as last computed. Internal bounds may be stale after inserts.
    pub fn bound(&self) -> &V {
        &self.bound
    }

    /// Parent node, `None` for the root.
    pub fn parent(&self) -> Option<NodeIdx> {
        self.parent
    }

    /// Whether the node is a leaf.
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    /// Left and right children of an internal node.
    pub fn children(&self) -> Option<(NodeIdx, NodeIdx)> {
        match self.kind {
            NodeKind::Internal { left, right } => Some((left, right)),
            _ => None,
        }
    }

    pub(crate) fn bucket(&self) -> Option<BucketIdx> {
        match self.kind {
            NodeKind::Leaf(b) => Some(b),
            _ => None,
        }
    }

    /// The child of an internal node that is not `child`.
    pub(crate) fn other_child(&self, child: NodeIdx) -> Option<NodeIdx> {
        match self.kind {
            NodeKind::Internal { left, right } if left == child => Some(right),
            NodeKind::Internal { left, right } if right == child => Some(left),
            _ => None,
        }
    }

    /// Point the child link that references `from` at `to`.
    pub(crate) fn replace_child(&mut self, from: NodeIdx, to: NodeIdx) {
        if let NodeKind::Internal { left, right } = &mut self.kind {
            if *left == from {
                *left = to;
            } else if *right == from {
                *right = to;
            }
        }
    }
}

/// Dense node storage with swap-compaction on free.
#[derive(Clone, Debug)]
pub(crate) struct NodeArena<V> {
    nodes: Vec<Node<V>>,
}

impl<V> NodeArena<V> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn push(&mut self, node: Node<V>) -> NodeIdx {
        let idx = NodeIdx::from_usize(self.nodes.len());
        self.nodes.push(node);
        idx
    }

    pub(crate) fn get(&self, idx: NodeIdx) -> Option<&Node<V>> {
        self.nodes.get(idx.get())
    }

    /// Remove the node at `idx` by moving the last node into its slot.
    ///
    /// Returns the previous index of the moved node, or `None` when `idx` was the last slot.
    /// The caller fixes up every link that referenced the moved node.
    pub(crate) fn swap_remove(&mut self, idx: NodeIdx) -> Option<NodeIdx> {
        let last = self.nodes.len().checked_sub(1)?;
        self.nodes.swap_remove(idx.get());
        (idx.get() != last).then(|| NodeIdx::from_usize(last))
    }

    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
    }

    pub(crate) fn release(&mut self) {
        self.nodes = Vec::new();
    }
}

impl<V> core::ops::Index<NodeIdx> for NodeArena<V> {
    type Output = Node<V>;

    #[inline]
    fn index(&self, idx: NodeIdx) -> &Node<V> {
        &self.nodes[idx.get()]
    }
}

impl<V> core::ops::IndexMut<NodeIdx> for NodeArena<V> {
    #[inline]
    fn index_mut(&mut self, idx: NodeIdx) -> &mut Node<V> {
        &mut self.nodes[idx.get()]
    }
}
