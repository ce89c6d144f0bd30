// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Removal with sibling merge and elevation.

use super::DynamicTree;
use crate::bucket::BucketIdx;
use crate::node::{NodeIdx, NodeKind};
use crate::types::{Element, ElementId};
use crate::volume::BoundingVolume;

impl<V: BoundingVolume, E: Element<V>> DynamicTree<V, E> {
    /// Remove the element with this id and return it. Unknown ids are ignored.
    ///
    /// After the id leaves its bucket the leaf is collapsed when possible:
    /// - a leaf sibling with room for both memberships is merged into the parent, which becomes
    ///   a leaf;
    /// - an empty leaf with an internal sibling is dropped and the sibling takes the parent's
    ///   place, removing one level;
    /// - otherwise the leaf just shrinks.
    pub fn remove(&mut self, id: ElementId) -> Option<E> {
        if !self.ensure_created("remove") {
            return None;
        }
        let leaf = self.leaf_of.remove(&id)?;
        let element = self.elements.remove(&id);
        if let Some(bucket) = self.nodes[leaf].bucket() {
            self.buckets.remove_id(bucket, id);
            self.collapse(leaf, bucket);
        }
        element
    }

    fn collapse(&mut self, leaf: NodeIdx, bucket: BucketIdx) {
        let Some(parent) = self.nodes[leaf].parent else {
            return;
        };
        let Some(sibling) = self.nodes[parent].other_child(leaf) else {
            return;
        };
        let len = self.buckets.get(bucket).len();
        match self.nodes[sibling].bucket() {
            Some(sibling_bucket)
                if len + self.buckets.get(sibling_bucket).len() <= self.max_children =>
            {
                self.merge(parent, [leaf, sibling], bucket, sibling_bucket);
            }
            None if len == 0 => self.elevate(parent, leaf, sibling, bucket),
            _ => {}
        }
    }

    /// Turn `parent` into a leaf holding the members of both of its leaf children.
    fn merge(
        &mut self,
        parent: NodeIdx,
        children: [NodeIdx; 2],
        keep: BucketIdx,
        absorb: BucketIdx,
    ) {
        let [leaf, sibling] = children;
        let moved: Vec<ElementId> = self.buckets.get(absorb).to_vec();
        self.buckets.get_mut(keep).extend(moved.iter().copied());
        self.buckets.free(absorb);

        let bound = self.nodes[leaf].bound.union(&self.nodes[sibling].bound);
        let node = &mut self.nodes[parent];
        if node.bound != bound && node.parent.is_some() {
            self.bounds_stale = true;
        }
        node.bound = bound;
        node.kind = NodeKind::Leaf(keep);
        self.nodes[leaf].kind = NodeKind::Detached;
        self.nodes[sibling].kind = NodeKind::Detached;

        self.leaves.remove(leaf);
        self.leaves.remove(sibling);
        self.leaves.insert(parent);
        for &id in self.buckets.get(keep) {
            self.leaf_of.insert(id, parent);
        }

        let mut merged = parent;
        self.free_detached(children, &mut merged);
        log::trace!(
            "merged {leaf:?} and {sibling:?} into leaf {merged:?} ({} members)",
            self.buckets.get(keep).len()
        );
    }

    /// Replace `parent` with the internal `sibling` of an emptied `leaf`.
    fn elevate(&mut self, parent: NodeIdx, leaf: NodeIdx, sibling: NodeIdx, bucket: BucketIdx) {
        let Some((a, b)) = self.nodes[sibling].children() else {
            return;
        };
        let bound = self.nodes[sibling].bound;
        let node = &mut self.nodes[parent];
        if node.bound != bound && node.parent.is_some() {
            self.bounds_stale = true;
        }
        node.bound = bound;
        node.kind = NodeKind::Internal { left: a, right: b };
        self.nodes[a].parent = Some(parent);
        self.nodes[b].parent = Some(parent);
        self.nodes[leaf].kind = NodeKind::Detached;
        self.nodes[sibling].kind = NodeKind::Detached;

        self.buckets.free(bucket);
        self.leaves.remove(leaf);

        let mut elevated = parent;
        self.free_detached([leaf, sibling], &mut elevated);
        log::trace!("elevated {sibling:?} into {elevated:?} after {leaf:?} emptied");
    }
}
