// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Best-first k-nearest-neighbor search.

use core::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::node::{NodeIdx, NodeKind};
use crate::tree::DynamicTree;
use crate::types::{Element, ElementId};
use crate::volume::BoundingVolume;

/// An element returned by [`DynamicTree::nearest`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Neighbor {
    /// Element id.
    pub id: ElementId,
    /// Squared distance from the query point to the element's volume; zero inside it.
    pub distance_squared: f64,
}

#[derive(Copy, Clone, Debug)]
enum Target {
    Node(NodeIdx),
    Element(ElementId),
}

#[derive(Copy, Clone, Debug)]
struct Candidate {
    distance_squared: f64,
    target: Target,
}

impl Candidate {
    fn rank(&self) -> u8 {
        match self.target {
            Target::Element(_) => 0,
            Target::Node(_) => 1,
        }
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    /// Reversed so the max-heap pops the closest candidate; elements win ties against nodes.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .distance_squared
            .total_cmp(&self.distance_squared)
            .then_with(|| other.rank().cmp(&self.rank()))
    }
}

impl<V: BoundingVolume, E: Element<V>> DynamicTree<V, E> {
    /// Up to `k` elements closest to `point`, nearest first.
    ///
    /// Distance is measured to each element's volume, so every element containing `point`
    /// is at distance zero.
    pub fn nearest(&self, point: V::Point, k: usize) -> Vec<Neighbor> {
        let mut out = Vec::with_capacity(k.min(self.count()));
        let Some(root) = self.root else {
            return out;
        };
        if k == 0 {
            return out;
        }
        let mut heap = BinaryHeap::new();
        heap.push(Candidate {
            distance_squared: self.nodes[root].bound.distance_squared_to_point(point),
            target: Target::Node(root),
        });
        while let Some(Candidate {
            distance_squared,
            target,
        }) = heap.pop()
        {
            match target {
                Target::Element(id) => {
                    out.push(Neighbor {
                        id,
                        distance_squared,
                    });
                    if out.len() == k {
                        break;
                    }
                }
                Target::Node(idx) => match self.nodes[idx].kind {
                    NodeKind::Internal { left, right } => {
                        for child in [left, right] {
                            heap.push(Candidate {
                                distance_squared: self.nodes[child]
                                    .bound
                                    .distance_squared_to_point(point),
                                target: Target::Node(child),
                            });
                        }
                    }
                    NodeKind::Leaf(bucket) => {
                        for &id in self.buckets.get(bucket) {
                            if let Some(volume) = self.volume_of(id) {
                                heap.push(Candidate {
                                    distance_squared: volume.distance_squared_to_point(point),
                                    target: Target::Element(id),
                                });
                            }
                        }
                    }
                    NodeKind::Detached => {}
                },
            }
        }
        out
    }
}
