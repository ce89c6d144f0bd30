// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Randomized restructuring: leaf swap and the grandchild trick.
//!
//! Both heuristics draw from the tree's own [`SmallRng`](rand::rngs::SmallRng), which persists
//! across calls so repeated passes keep making progress instead of revisiting the same picks.

use rand::Rng;

use super::DynamicTree;
use super::insert::enclose_entries;
use crate::bucket::BucketIdx;
use crate::node::{NodeIdx, NodeKind};
use crate::types::{Element, ElementId};
use crate::volume::BoundingVolume;

/// Default number of leaf swaps per [`DynamicTree::optimize`] call.
pub const DEFAULT_LEAF_SWAPS: usize = 32;

/// Default number of grandchild-trick attempts per [`DynamicTree::optimize`] call.
pub const DEFAULT_GRANDCHILD_ITERATIONS: usize = 16;

type Members<V> = Vec<(ElementId, V)>;

impl<V: BoundingVolume, E: Element<V>> DynamicTree<V, E> {
    /// Run `leaf_swaps` leaf-swap attempts followed by `grandchild_iterations` grandchild-trick
    /// attempts.
    ///
    /// Element count and ids never change. Afterwards every internal bound is the union of its
    /// children.
    pub fn optimize(&mut self, leaf_swaps: usize, grandchild_iterations: usize) {
        if !self.ensure_created("optimize") {
            return;
        }
        if self.bounds_stale {
            self.refit_internal();
        }
        let swapped = (0..leaf_swaps).filter(|_| self.leaf_swap()).count();
        let rotated = (0..grandchild_iterations)
            .filter(|_| self.grandchild_trick())
            .count();
        log::debug!(
            "optimize: {swapped}/{leaf_swaps} leaf swaps and {rotated}/{grandchild_iterations} \
             rotations improved the tree"
        );
    }

    /// Pick two random leaves, refresh them and, when they overlap, trade members to tighten
    /// both. Returns whether membership changed.
    fn leaf_swap(&mut self) -> bool {
        let Some((a, b)) = self.leaves.sample_pair(&mut self.rng) else {
            return false;
        };
        let (Some(bucket_a), Some(bucket_b)) = (self.nodes[a].bucket(), self.nodes[b].bucket())
        else {
            return false;
        };
        let mut ma = self.member_entries(bucket_a);
        let mut mb = self.member_entries(bucket_b);
        let (Some(bound_a), Some(bound_b)) = (enclose_entries(&ma), enclose_entries(&mb)) else {
            return false;
        };
        self.nodes[a].bound = bound_a;
        self.nodes[b].bound = bound_b;

        let changed = bound_a.overlaps(&bound_b) && exchange(&mut ma, &mut mb, self.max_children);
        if changed {
            self.write_members(a, bucket_a, &ma);
            self.write_members(b, bucket_b, &mb);
        }
        self.propagate_from(a);
        self.propagate_from(b);
        changed
    }

    fn write_members(&mut self, leaf: NodeIdx, bucket: BucketIdx, members: &[(ElementId, V)]) {
        let ids = self.buckets.get_mut(bucket);
        ids.clear();
        ids.extend(members.iter().map(|m| m.0));
        for &(id, _) in members {
            self.leaf_of.insert(id, leaf);
        }
        if let Some(bound) = enclose_entries(members) {
            self.nodes[leaf].bound = bound;
        }
    }

    /// Try [`rotate_around`](Self::rotate_around) at a random node.
    fn grandchild_trick(&mut self) -> bool {
        let n = self.nodes.len();
        if n < 5 {
            return false;
        }
        let node = NodeIdx::from_usize(self.rng.random_range(0..n));
        self.rotate_around(node)
    }

    /// Re-pair `node` or its sibling with their parent's sibling when that lowers the combined
    /// measure.
    ///
    /// With node `n`, sibling `s`, parent `p`, aunt `a` and grandparent `g`:
    /// - internal aunt with children `al`, `ar`: try trading `s` for `al` or for `ar`;
    /// - leaf aunt: try trading `n` for `a`, lifting `n` beside `p`.
    ///
    /// Returns whether the tree changed.
    fn rotate_around(&mut self, node: NodeIdx) -> bool {
        let Some(parent) = self.nodes[node].parent else {
            return false;
        };
        let Some(grand) = self.nodes[parent].parent else {
            return false;
        };
        let (Some(sibling), Some(aunt)) = (
            self.nodes[parent].other_child(node),
            self.nodes[grand].other_child(parent),
        ) else {
            return false;
        };
        let nb = self.nodes[node].bound;
        let sb = self.nodes[sibling].bound;

        match self.nodes[aunt].kind {
            NodeKind::Internal { left, right } => {
                let lb = self.nodes[left].bound;
                let rb = self.nodes[right].bound;
                let current = nb.union(&sb).measure() + lb.union(&rb).measure();
                let with_left = nb.union(&lb).measure() + sb.union(&rb).measure();
                let with_right = nb.union(&rb).measure() + lb.union(&sb).measure();
                let pick = if with_left < current && with_left <= with_right {
                    left
                } else if with_right < current {
                    right
                } else {
                    return false;
                };
                self.exchange_nodes(sibling, pick);
                self.recombine(&[parent, aunt, grand]);
            }
            NodeKind::Leaf(_) => {
                let ab = self.nodes[aunt].bound;
                if ab.union(&sb).measure() >= nb.union(&sb).measure() {
                    return false;
                }
                self.exchange_nodes(node, aunt);
                self.recombine(&[parent, grand]);
            }
            NodeKind::Detached => return false,
        }
        self.propagate_from(grand);
        log::trace!("grandchild trick re-paired around {grand:?}");
        true
    }

    /// Swap two nodes that hang under different parents.
    fn exchange_nodes(&mut self, x: NodeIdx, y: NodeIdx) {
        let (Some(px), Some(py)) = (self.nodes[x].parent, self.nodes[y].parent) else {
            return;
        };
        self.nodes[px].replace_child(x, y);
        self.nodes[py].replace_child(y, x);
        self.nodes[x].parent = Some(py);
        self.nodes[y].parent = Some(px);
    }

    /// Recombine the listed internal nodes in order.
    fn recombine(&mut self, nodes: &[NodeIdx]) {
        for &idx in nodes {
            if let Some(bound) = self.children_union(idx) {
                self.nodes[idx].bound = bound;
            }
        }
    }
}

/// Largest member spread from the center of the set's enclosure.
fn set_cost<V: BoundingVolume>(members: &[(ElementId, V)]) -> f64 {
    let Some(bound) = enclose_entries(members) else {
        return 0.0;
    };
    let center = bound.center();
    members
        .iter()
        .map(|m| m.1.spread_from(center))
        .fold(0.0, f64::max)
}

fn center_of<V: BoundingVolume>(members: &[(ElementId, V)]) -> Option<V::Point> {
    enclose_entries(members).map(|b| b.center())
}

/// Order members by descending spread from the set's center.
fn sort_by_spread<V: BoundingVolume>(members: &mut [(ElementId, V)]) {
    if let Some(c) = center_of(members) {
        members.sort_by(|x, y| y.1.spread_from(c).total_cmp(&x.1.spread_from(c)));
    }
}

/// Move the entry at `at` toward its place in a descending-spread order.
fn bubble<V: BoundingVolume>(members: &mut [(ElementId, V)], mut at: usize) {
    let Some(c) = center_of(members) else {
        return;
    };
    let spread = |m: &(ElementId, V)| m.1.spread_from(c);
    while at + 1 < members.len() && spread(&members[at]) < spread(&members[at + 1]) {
        members.swap(at, at + 1);
        at += 1;
    }
    while at > 0 && spread(&members[at]) > spread(&members[at - 1]) {
        members.swap(at, at - 1);
        at -= 1;
    }
}

/// Trade members between two overlapping leaves. Returns whether anything moved.
///
/// First the looser leaf hands the tighter one the member nearest to it while that strictly
/// lowers the summed cost. Then the two worst members are swapped while that strictly lowers
/// the summed cost.
fn exchange<V: BoundingVolume>(a: &mut Members<V>, b: &mut Members<V>, max: usize) -> bool {
    let mut changed = false;
    let mut cost = set_cost(a) + set_cost(b);

    let (tight, loose) = if set_cost(a) <= set_cost(b) {
        (&mut *a, &mut *b)
    } else {
        (&mut *b, &mut *a)
    };
    while tight.len() < max && loose.len() > 1 {
        let Some(target) = center_of(tight) else {
            break;
        };
        let Some(pick) = (0..loose.len()).min_by(|&i, &j| {
            loose[i]
                .1
                .distance_squared_to_point(target)
                .total_cmp(&loose[j].1.distance_squared_to_point(target))
        }) else {
            break;
        };
        let entry = loose.swap_remove(pick);
        tight.push(entry);
        let next = set_cost(tight) + set_cost(loose);
        if next < cost {
            cost = next;
            changed = true;
        } else {
            if let Some(back) = tight.pop() {
                loose.push(back);
                let last = loose.len() - 1;
                loose.swap(pick, last);
            }
            break;
        }
    }

    sort_by_spread(a);
    sort_by_spread(b);
    for _ in 0..a.len() + b.len() {
        if a.is_empty() || b.is_empty() {
            break;
        }
        core::mem::swap(&mut a[0], &mut b[0]);
        let next = set_cost(a) + set_cost(b);
        if next < cost {
            cost = next;
            changed = true;
            bubble(a, 0);
            bubble(b, 0);
        } else {
            core::mem::swap(&mut a[0], &mut b[0]);
            break;
        }
    }
    changed
}
