// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bound maintenance: single and batched updates, full refit.

use hashbrown::HashSet;

use super::DynamicTree;
use crate::node::NodeIdx;
use crate::types::Element;
use crate::volume::BoundingVolume;

impl<V: BoundingVolume, E: Element<V>> DynamicTree<V, E> {
    /// Store a moved element and grow its leaf to cover the new volume.
    ///
    /// When the leaf bound changes, ancestors are recombined upward until one comes out
    /// unchanged. Unknown ids are ignored.
    pub fn update(&mut self, element: E) {
        if !self.ensure_created("update") {
            return;
        }
        let id = element.id();
        let Some(&leaf) = self.leaf_of.get(&id) else {
            return;
        };
        let volume = element.volume();
        self.elements.insert(id, element);
        if self.grow_leaf(leaf, &volume) {
            self.propagate_from(leaf);
        }
    }

    /// Store a batch of moved elements, then refresh each touched leaf's ancestors once.
    ///
    /// Afterwards every internal bound is the union of its children, including bounds left
    /// stale by earlier inserts and removals. Unknown ids are ignored.
    pub fn update_all(&mut self, batch: &[E]) {
        if !self.ensure_created("update_all") {
            return;
        }
        let mut touched: HashSet<NodeIdx> = HashSet::new();
        for element in batch {
            let id = element.id();
            let Some(&leaf) = self.leaf_of.get(&id) else {
                continue;
            };
            let volume = element.volume();
            self.elements.insert(id, element.clone());
            self.grow_leaf(leaf, &volume);
            touched.insert(leaf);
        }
        for &leaf in &touched {
            self.propagate_from(leaf);
        }
        if self.bounds_stale {
            self.refit_internal();
        }
    }

    /// Recompute every bound from scratch.
    ///
    /// Leaves are enclosed exactly around their members (so they may shrink), then internal
    /// nodes are recombined bottom-up.
    pub fn refit(&mut self) {
        if !self.ensure_created("refit") {
            return;
        }
        let leaves: Vec<NodeIdx> = self.leaves.iter().collect();
        for leaf in leaves {
            self.refresh_leaf(leaf);
        }
        self.refit_internal();
    }

    /// Grow a leaf to cover `volume`. Returns whether the bound changed.
    fn grow_leaf(&mut self, leaf: NodeIdx, volume: &V) -> bool {
        let node = &mut self.nodes[leaf];
        let grown = node.bound.union(volume);
        let changed = grown != node.bound;
        node.bound = grown;
        changed
    }

    /// Set a leaf's bound to the exact enclosure of its members. Empty leaves keep their bound.
    pub(crate) fn refresh_leaf(&mut self, leaf: NodeIdx) {
        let Some(bucket) = self.nodes[leaf].bucket() else {
            return;
        };
        if let Some(bound) = V::enclose(&self.member_volumes(bucket)) {
            self.nodes[leaf].bound = bound;
        }
    }

    /// Recombine ancestors of `at` until one comes out unchanged.
    pub(crate) fn propagate_from(&mut self, mut at: NodeIdx) {
        while let Some(parent) = self.nodes[at].parent {
            let Some(bound) = self.children_union(parent) else {
                break;
            };
            if bound == self.nodes[parent].bound {
                break;
            }
            self.nodes[parent].bound = bound;
            at = parent;
        }
    }

    /// Recombine every internal node bottom-up.
    pub(crate) fn refit_internal(&mut self) {
        for idx in self.internal_post_order() {
            if let Some(bound) = self.children_union(idx) {
                self.nodes[idx].bound = bound;
            }
        }
        self.bounds_stale = false;
    }
}

#[cfg(test)]
mod tests {
    use super::super::InvariantViolation;
    use super::super::tests::{Boxes, Discs, random_discs, random_squares, square};
    use crate::types::{Element, Item};
    use crate::volume::{Aabb2, BoundingVolume, Disc};
    use kurbo::Vec2;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    fn scene_a() -> Boxes {
        let mut tree = Boxes::new(16, 4);
        for x in 0..5 {
            tree.insert(square(x, f64::from(x), 0.0));
        }
        tree
    }

    #[test]
    fn insert_leaves_ancestors_stale_until_refresh() {
        let mut tree = scene_a();
        assert_eq!(tree.validate(), Ok(()));
        tree.insert(square(5, 10.0, 0.0));
        let root = tree.root().expect("root");
        assert_eq!(tree.validate(), Err(InvariantViolation::StaleBound(root)));
        let root_bound = *tree.node(root).expect("root node").bound();
        assert!(
            !root_bound.contains(&square(5, 10.0, 0.0).volume),
            "root bound does not see the new element yet"
        );
        tree.update_all(&[]);
        assert_eq!(tree.validate(), Ok(()));
        let root_bound = *tree.node(root).expect("root node").bound();
        assert!(root_bound.contains(&square(5, 10.0, 0.0).volume));
    }

    #[test]
    fn single_update_propagates_to_the_root() {
        let mut tree = scene_a();
        let moved = square(2, 40.0, 40.0);
        tree.update(moved);
        let root = tree.root().expect("root");
        let root_bound = *tree.node(root).expect("root node").bound();
        assert!(root_bound.contains(&moved.volume));
        assert_eq!(tree.validate(), Ok(()));
    }

    #[test]
    fn stored_element_moved_in_place() {
        let mut tree = scene_a();
        let mut e = *tree.get(4).expect("stored");
        e.set_volume(square(4, -30.0, 12.0).volume);
        tree.update(e);
        assert_eq!(tree.get(4).map(Element::volume), Some(e.volume));
        assert_eq!(tree.validate(), Ok(()));
    }

    #[test]
    fn update_of_degenerate_box_still_propagates() {
        let mut tree = scene_a();
        let point = Item::new(3, Aabb2::from_point(Vec2::new(-20.0, 0.5)));
        tree.update(point);
        let root = tree.root().expect("root");
        assert!(
            tree.node(root)
                .expect("root node")
                .bound()
                .contains(&point.volume)
        );
    }

    #[test]
    fn unknown_updates_are_ignored() {
        let mut tree = scene_a();
        tree.update(square(77, 5.0, 5.0));
        tree.update_all(&[square(78, 5.0, 5.0)]);
        assert_eq!(tree.count(), 5);
        assert!(!tree.contains_id(77) && !tree.contains_id(78));
    }

    #[test]
    fn update_all_restores_union_invariant_after_motion() {
        let mut tree = Discs::new(512, 8);
        let mut items = random_discs(400, 5);
        for item in &items {
            tree.insert(*item);
        }
        let mut rng = SmallRng::seed_from_u64(6);
        for _ in 0..5 {
            for item in &mut items {
                let step = Vec2::new(rng.random_range(-15.0..15.0), rng.random_range(-15.0..15.0));
                item.volume = Disc::from_radius_sq(item.volume.center + step, item.volume.radius_sq);
            }
            tree.update_all(&items);
            assert_eq!(tree.validate(), Ok(()));
            for item in &items {
                assert_eq!(tree.get(item.id), Some(item));
            }
        }
    }

    #[test]
    fn refit_shrinks_leaves_to_members() {
        let mut tree = Boxes::new(256, 6);
        let mut items = random_squares(200, 2);
        for item in &items {
            tree.insert(*item);
        }
        // Collapse everything towards the origin; update only grows bounds.
        for item in &mut items {
            item.volume = Aabb2::new(item.volume.min * 0.01, item.volume.max * 0.01);
        }
        tree.update_all(&items);
        let root = tree.root().expect("root");
        let grown = tree.node(root).expect("root node").bound().measure();
        tree.refit();
        let tight = tree.node(root).expect("root node").bound().measure();
        assert!(tight < grown);
        assert_eq!(tree.validate(), Ok(()));
        let leaves: Vec<_> = tree.leaves.iter().collect();
        for leaf in leaves {
            let members = tree.leaf_members(leaf);
            let vols: Vec<Aabb2> = members
                .iter()
                .map(|id| tree.get(*id).expect("member").volume)
                .collect();
            assert_eq!(
                Some(*tree.node(leaf).expect("leaf").bound()),
                Aabb2::enclose(&vols)
            );
        }
    }
}
