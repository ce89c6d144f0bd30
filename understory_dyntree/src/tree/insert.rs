// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Descent and leaf split.

use super::DynamicTree;
use crate::bucket::BucketIdx;
use crate::node::{Node, NodeIdx, NodeKind};
use crate::types::{Element, ElementId, Vector};
use crate::volume::BoundingVolume;

impl<V: BoundingVolume, E: Element<V>> DynamicTree<V, E> {
    /// Insert an element.
    ///
    /// Descends toward the child whose center is nearest the element's center and appends it to
    /// the leaf found there, splitting the leaf when full. Only the destination leaf's bound is
    /// grown; ancestors are refreshed by [`update`](Self::update), [`update_all`](Self::update_all),
    /// [`optimize`](Self::optimize) or [`refit`](Self::refit).
    ///
    /// Inserting an id that is already stored updates that element instead.
    pub fn insert(&mut self, element: E) {
        if !self.ensure_created("insert") {
            return;
        }
        let id = element.id();
        if self.elements.contains_key(&id) {
            log::warn!("insert of already stored element {id}; updating it instead");
            self.update(element);
            return;
        }
        let volume = element.volume();
        self.elements.insert(id, element);

        let Some(root) = self.root else {
            let bucket = self.buckets.alloc();
            self.buckets.get_mut(bucket).push(id);
            let leaf = self.nodes.push(Node::leaf(volume, None, bucket));
            self.leaves.insert(leaf);
            self.leaf_of.insert(id, leaf);
            self.root = Some(leaf);
            return;
        };

        let leaf = self.descend(root, volume.center());
        let Some(bucket) = self.nodes[leaf].bucket() else {
            return;
        };
        let len = self.buckets.get(bucket).len();
        if len < self.max_children {
            self.buckets.get_mut(bucket).push(id);
            self.leaf_of.insert(id, leaf);
            let grown = if len == 0 {
                volume
            } else {
                let members = self.member_volumes(bucket);
                self.nodes[leaf].bound.grow(&volume, &members)
            };
            if grown != self.nodes[leaf].bound && self.nodes[leaf].parent.is_some() {
                self.bounds_stale = true;
            }
            self.nodes[leaf].bound = grown;
        } else {
            self.split(leaf, bucket, id);
        }
    }

    /// Walk from `at` to a leaf, always taking the child whose center is nearer `center`.
    pub(crate) fn descend(&self, mut at: NodeIdx, center: V::Point) -> NodeIdx {
        while let Some((l, r)) = self.nodes[at].children() {
            let dl = self.nodes[l].bound.center().distance_squared(center);
            let dr = self.nodes[r].bound.center().distance_squared(center);
            at = if dl <= dr { l } else { r };
        }
        at
    }

    /// Split a full leaf that must also take `id`. The leaf becomes the internal parent of two
    /// new leaves.
    fn split(&mut self, leaf: NodeIdx, bucket: BucketIdx, id: ElementId) {
        let mut entries = self.member_entries(bucket);
        if let Some(v) = self.volume_of(id) {
            entries.push((id, v));
        }
        let n = entries.len();
        let max = self.max_children;
        let mut at = V::partition(&mut entries);
        if at == 0 || at >= n || at > max || n - at > max {
            at = n / 2;
        }
        let (first, second) = entries.split_at(at);

        let left_bucket = bucket;
        let right_bucket = self.buckets.alloc();
        let left_ids = self.buckets.get_mut(left_bucket);
        left_ids.clear();
        left_ids.extend(first.iter().map(|e| e.0));
        self.buckets
            .get_mut(right_bucket)
            .extend(second.iter().map(|e| e.0));

        let fallback = self.nodes[leaf].bound;
        let left_bound = enclose_entries(first).unwrap_or(fallback);
        let right_bound = enclose_entries(second).unwrap_or(fallback);
        let left = self.nodes.push(Node::leaf(left_bound, Some(leaf), left_bucket));
        let right = self
            .nodes
            .push(Node::leaf(right_bound, Some(leaf), right_bucket));

        let node = &mut self.nodes[leaf];
        node.kind = NodeKind::Internal { left, right };
        node.bound = left_bound.union(&right_bound);
        if node.parent.is_some() {
            self.bounds_stale = true;
        }

        self.leaves.remove(leaf);
        self.leaves.insert(left);
        self.leaves.insert(right);
        for &(m, _) in first {
            self.leaf_of.insert(m, left);
        }
        for &(m, _) in second {
            self.leaf_of.insert(m, right);
        }
        log::trace!(
            "split leaf {leaf:?} into {left:?} ({} members) and {right:?} ({} members)",
            first.len(),
            second.len()
        );
    }
}

pub(crate) fn enclose_entries<V: BoundingVolume>(entries: &[(ElementId, V)]) -> Option<V> {
    let volumes: Vec<V> = entries.iter().map(|e| e.1).collect();
    V::enclose(&volumes)
}

#[cfg(test)]
mod tests {
    use super::super::tests::{Boxes, Discs, random_discs, random_squares, square};
    use crate::types::Item;
    use crate::volume::{Aabb2, BoundingVolume};
    use kurbo::Vec2;

    #[test]
    fn first_insert_creates_root_leaf() {
        let mut tree = Boxes::new(8, 4);
        tree.insert(square(7, 2.0, 3.0));
        let root = tree.root().expect("root after insert");
        assert_eq!(tree.leaf_members(root), &[7]);
        assert_eq!(
            tree.node(root).map(|n| *n.bound()),
            Some(square(7, 2.0, 3.0).volume)
        );
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn overflow_splits_into_two_leaves() {
        let mut tree = Boxes::new(8, 4);
        for x in 0..4 {
            tree.insert(square(x, f64::from(x), 0.0));
        }
        assert_eq!(tree.leaf_count(), 1);
        tree.insert(square(4, 4.0, 0.0));
        assert_eq!(tree.leaf_count(), 2);
        assert_eq!(tree.node_count(), 3);
        let root = tree.root().expect("root");
        let (l, r) = tree
            .node(root)
            .and_then(|n| n.children())
            .expect("root became internal");
        let total = tree.leaf_members(l).len() + tree.leaf_members(r).len();
        assert_eq!(total, 5);
        assert!(tree.leaf_members(l).len() <= 4 && tree.leaf_members(r).len() <= 4);
        assert_eq!(tree.validate(), Ok(()), "a split at the root leaves nothing stale");
    }

    #[test]
    fn duplicate_insert_updates() {
        let mut tree = Boxes::new(8, 4);
        tree.insert(square(1, 0.0, 0.0));
        tree.insert(square(1, 10.0, 10.0));
        assert_eq!(tree.count(), 1);
        assert_eq!(
            tree.get(1).map(|e| e.volume.min),
            Some(Vec2::new(10.0, 10.0))
        );
        let leaf = tree.leaf_of(1).expect("leaf");
        let bound = *tree.node(leaf).expect("node").bound();
        assert!(bound.contains(&square(1, 10.0, 10.0).volume));
    }

    #[test]
    fn leaves_stay_within_capacity() {
        let mut tree = Boxes::new(512, 6);
        for item in random_squares(500, 4) {
            tree.insert(item);
        }
        let mut total = 0;
        let leaves: Vec<_> = tree.leaves.iter().collect();
        for leaf in leaves {
            let n = tree.leaf_members(leaf).len();
            assert!((1..=6).contains(&n), "leaf holds {n}");
            total += n;
        }
        assert_eq!(total, 500);
        tree.refit();
        assert_eq!(tree.validate(), Ok(()));
    }

    #[test]
    fn ball_tree_inserts_cover_members() {
        let mut tree = Discs::new(256, 8);
        let items = random_discs(300, 11);
        for item in &items {
            tree.insert(*item);
        }
        for item in &items {
            let leaf = tree.leaf_of(item.id).expect("leaf");
            let bound = tree.node(leaf).expect("node").bound();
            assert!(bound.contains(&item.volume), "leaf bound must cover {}", item.id);
        }
    }

    #[test]
    fn descend_prefers_nearer_child() {
        let mut tree = Boxes::new(16, 2);
        tree.insert(square(0, 0.0, 0.0));
        tree.insert(square(1, 100.0, 0.0));
        tree.insert(square(2, 1.0, 0.0));
        // The far square ends up alone; a new square near it lands in the same leaf.
        let far_leaf = tree.leaf_of(1).expect("leaf");
        tree.insert(Item::new(
            3,
            Aabb2::new(Vec2::new(99.0, 0.0), Vec2::new(99.5, 0.5)),
        ));
        assert_eq!(tree.leaf_of(3), Some(far_leaf));
    }
}
