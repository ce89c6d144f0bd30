// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The dynamic tree: storage, construction, and inspection.
//!
//! Mutation lives in submodules: `insert` (descent and split), `remove` (merge and elevate),
//! `refresh` (bound maintenance), `optimize` (randomized restructuring) and `validate`.

use core::fmt::{self, Debug};

use hashbrown::HashMap;
use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::bucket::{BucketIdx, BucketPool};
use crate::config::TreeConfig;
use crate::leaves::LeafSet;
use crate::node::{Node, NodeArena, NodeIdx, NodeKind};
use crate::types::{Element, ElementId};
use crate::volume::BoundingVolume;

mod insert;
mod optimize;
mod refresh;
mod remove;
mod validate;

pub use optimize::{DEFAULT_GRANDCHILD_ITERATIONS, DEFAULT_LEAF_SWAPS};
pub use validate::InvariantViolation;

/// Self-balancing binary tree over movable elements.
///
/// The volume type selects the flavor: [`Aabb`](crate::Aabb) gives an R*-style tree,
/// [`Ball`](crate::Ball) a Ball*-style tree. Each leaf holds up to `max_children` element ids;
/// every internal node has exactly two children.
///
/// Bounds are maintained lazily:
/// - [`insert`](Self::insert) grows the destination leaf only; ancestors stay stale.
/// - [`update`](Self::update) grows the owning leaf and walks up until a bound stops changing.
/// - [`update_all`](Self::update_all), [`optimize`](Self::optimize) and [`refit`](Self::refit)
///   leave every internal bound equal to the union of its children.
///
/// Queries prune on the stored bounds, so they can miss elements inserted since the last
/// refresh when those elements lie outside a stale ancestor.
pub struct DynamicTree<V: BoundingVolume, E: Element<V>> {
    pub(crate) nodes: NodeArena<V>,
    pub(crate) buckets: BucketPool,
    pub(crate) leaves: LeafSet,
    pub(crate) elements: HashMap<ElementId, E>,
    pub(crate) leaf_of: HashMap<ElementId, NodeIdx>,
    pub(crate) root: Option<NodeIdx>,
    pub(crate) max_children: usize,
    pub(crate) rng: SmallRng,
    /// Set when some internal bound may differ from the union of its children.
    pub(crate) bounds_stale: bool,
    pub(crate) created: bool,
}

impl<V: BoundingVolume, E: Element<V>> Debug for DynamicTree<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicTree")
            .field("count", &self.elements.len())
            .field("nodes", &self.nodes.len())
            .field("leaves", &self.leaves.len())
            .field("max_children", &self.max_children)
            .field("root", &self.root)
            .field("bounds_stale", &self.bounds_stale)
            .field("created", &self.created)
            .finish_non_exhaustive()
    }
}

impl<V: BoundingVolume, E: Element<V>> Default for DynamicTree<V, E> {
    fn default() -> Self {
        Self::with_config(TreeConfig::default())
    }
}

impl<V: BoundingVolume, E: Element<V>> DynamicTree<V, E> {
    /// Create a tree reserving room for `initial_capacity` elements.
    ///
    /// Out-of-range parameters are logged and clamped; see [`TreeConfig::sanitized`].
    pub fn new(initial_capacity: usize, max_children: usize) -> Self {
        Self::with_config(TreeConfig::new(initial_capacity, max_children))
    }

    /// Create a tree from a full config.
    pub fn with_config(config: TreeConfig) -> Self {
        let config = config.sanitized();
        let cap = config.initial_capacity;
        // Roughly two nodes per leaf, leaves about half full.
        let leaf_estimate = (cap / (config.max_children / 2).max(1)).max(1);
        Self {
            nodes: NodeArena::with_capacity(leaf_estimate * 2),
            buckets: BucketPool::with_capacity(leaf_estimate),
            leaves: LeafSet::with_capacity(leaf_estimate),
            elements: HashMap::with_capacity(cap),
            leaf_of: HashMap::with_capacity(cap),
            root: None,
            max_children: config.max_children,
            rng: SmallRng::seed_from_u64(config.seed),
            bounds_stale: false,
            created: true,
        }
    }

    /// Whether the tree is usable, i.e. [`dispose`](Self::dispose) has not been called.
    pub fn is_created(&self) -> bool {
        self.created
    }

    /// Number of stored elements.
    pub fn count(&self) -> usize {
        self.elements.len()
    }

    /// Whether the tree stores no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Most elements a leaf holds before splitting.
    pub fn max_children(&self) -> usize {
        self.max_children
    }

    /// Root node, `None` before the first insert and after [`clear`](Self::clear).
    pub fn root(&self) -> Option<NodeIdx> {
        self.root
    }

    /// Node at `idx`. Indices are invalidated by any structural change.
    pub fn node(&self, idx: NodeIdx) -> Option<&Node<V>> {
        self.nodes.get(idx)
    }

    /// Number of allocated nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// Element ids held by a leaf; empty for internal or unknown nodes.
    pub fn leaf_members(&self, idx: NodeIdx) -> &[ElementId] {
        match self.nodes.get(idx).and_then(Node::bucket) {
            Some(b) => self.buckets.get(b),
            None => &[],
        }
    }

    /// Leaf currently holding the element.
    pub fn leaf_of(&self, id: ElementId) -> Option<NodeIdx> {
        self.leaf_of.get(&id).copied()
    }

    /// Stored copy of an element.
    pub fn get(&self, id: ElementId) -> Option<&E> {
        self.elements.get(&id)
    }

    /// Whether an element with this id is stored.
    pub fn contains_id(&self, id: ElementId) -> bool {
        self.elements.contains_key(&id)
    }

    /// Iterate stored elements in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &E> + '_ {
        self.elements.values()
    }

    /// Number of levels; 0 for an empty tree, 1 for a lone root leaf.
    pub fn depth(&self) -> usize {
        let Some(root) = self.root else {
            return 0;
        };
        let mut deepest = 0;
        let mut stack = vec![(root, 1_usize)];
        while let Some((idx, level)) = stack.pop() {
            deepest = deepest.max(level);
            if let Some((l, r)) = self.nodes[idx].children() {
                stack.push((l, level + 1));
                stack.push((r, level + 1));
            }
        }
        deepest
    }

    /// Remove every element, keeping allocations and the optimizer's random stream.
    pub fn clear(&mut self) {
        if !self.ensure_created("clear") {
            return;
        }
        self.nodes.clear();
        self.buckets.clear();
        self.leaves.clear();
        self.elements.clear();
        self.leaf_of.clear();
        self.root = None;
        self.bounds_stale = false;
    }

    /// Release all storage. Every later mutation is ignored and queries return nothing.
    pub fn dispose(&mut self) {
        if !self.created {
            return;
        }
        self.nodes.release();
        self.buckets.release();
        self.leaves.release();
        self.elements = HashMap::new();
        self.leaf_of = HashMap::new();
        self.root = None;
        self.bounds_stale = false;
        self.created = false;
    }

    pub(crate) fn ensure_created(&self, op: &str) -> bool {
        if !self.created {
            log::warn!("{op} called on a disposed tree; ignored");
        }
        self.created
    }

    pub(crate) fn volume_of(&self, id: ElementId) -> Option<V> {
        self.elements.get(&id).map(Element::volume)
    }

    /// Volumes of a bucket's members in bucket order.
    pub(crate) fn member_volumes(&self, bucket: BucketIdx) -> Vec<V> {
        self.buckets
            .get(bucket)
            .iter()
            .filter_map(|&id| self.volume_of(id))
            .collect()
    }

    /// `(id, volume)` pairs of a bucket's members in bucket order.
    pub(crate) fn member_entries(&self, bucket: BucketIdx) -> Vec<(ElementId, V)> {
        self.buckets
            .get(bucket)
            .iter()
            .filter_map(|&id| self.volume_of(id).map(|v| (id, v)))
            .collect()
    }

    /// Union of an internal node's children, `None` for leaves.
    pub(crate) fn children_union(&self, idx: NodeIdx) -> Option<V> {
        let (l, r) = self.nodes[idx].children()?;
        Some(self.nodes[l].bound.union(&self.nodes[r].bound))
    }

    /// Free two detached nodes, remapping `tracked` if compaction moves it.
    pub(crate) fn free_detached(&mut self, doomed: [NodeIdx; 2], tracked: &mut NodeIdx) {
        let [a, b] = doomed;
        let (hi, lo) = if a > b { (a, b) } else { (b, a) };
        // Highest first, so compaction never moves the other doomed node.
        for idx in [hi, lo] {
            if let Some(from) = self.free_node(idx) {
                if *tracked == from {
                    *tracked = idx;
                }
            }
        }
    }

    /// Free one node and repair every link to the node compaction moved into its slot.
    ///
    /// Returns the moved node's previous index.
    fn free_node(&mut self, idx: NodeIdx) -> Option<NodeIdx> {
        let from = self.nodes.swap_remove(idx)?;
        let moved = &self.nodes[idx];
        let (parent, kind) = (moved.parent, moved.kind);
        if kind == NodeKind::Detached {
            return Some(from);
        }
        match parent {
            Some(p) => self.nodes[p].replace_child(from, idx),
            None => {
                if self.root == Some(from) {
                    self.root = Some(idx);
                }
            }
        }
        match kind {
            NodeKind::Internal { left, right } => {
                self.nodes[left].parent = Some(idx);
                self.nodes[right].parent = Some(idx);
            }
            NodeKind::Leaf(bucket) => {
                self.leaves.relocate(from, idx);
                for &id in self.buckets.get(bucket) {
                    self.leaf_of.insert(id, idx);
                }
            }
            NodeKind::Detached => {}
        }
        Some(from)
    }

    /// Internal nodes ordered so that children come before their parents.
    pub(crate) fn internal_post_order(&self) -> Vec<NodeIdx> {
        let Some(root) = self.root else {
            return Vec::new();
        };
        let mut order = Vec::with_capacity(self.nodes.len() / 2);
        let mut stack = vec![root];
        while let Some(idx) = stack.pop() {
            if let Some((l, r)) = self.nodes[idx].children() {
                order.push(idx);
                stack.push(l);
                stack.push(r);
            }
        }
        order.reverse();
        order
    }
}
