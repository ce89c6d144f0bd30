// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Structural and bound invariant checks.

use thiserror::Error;

use super::DynamicTree;
use crate::node::{NodeIdx, NodeKind};
use crate::types::{Element, ElementId};
use crate::volume::BoundingVolume;

/// First invariant [`DynamicTree::validate`] found broken.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// The tree was disposed.
    #[error("tree has been disposed")]
    Disposed,
    /// The tree has no root but stores elements, or has nodes but no root.
    #[error("root is missing while {0} nodes are allocated")]
    MissingRoot(usize),
    /// The root has a parent link.
    #[error("root {0:?} has a parent")]
    RootHasParent(NodeIdx),
    /// A child does not link back to the node that references it.
    #[error("{child:?} does not point back to its parent {parent:?}")]
    BrokenParentLink {
        /// Node holding the child link.
        parent: NodeIdx,
        /// Child whose parent link is wrong.
        child: NodeIdx,
    },
    /// A node reachable from the root was detached.
    #[error("{0:?} is detached but still linked")]
    DetachedInTree(NodeIdx),
    /// A node is reachable along more than one path.
    #[error("{0:?} is reachable along more than one path")]
    SharedNode(NodeIdx),
    /// An allocated node cannot be reached from the root.
    #[error("{0} allocated nodes are unreachable from the root")]
    Unreachable(usize),
    /// An internal bound is not the union of its children.
    #[error("bound of {0:?} is not the union of its children")]
    StaleBound(NodeIdx),
    /// A leaf bound does not contain one of its members.
    #[error("leaf {leaf:?} does not contain element {id}")]
    MemberOutside {
        /// Leaf holding the element.
        leaf: NodeIdx,
        /// Element outside the leaf bound.
        id: ElementId,
    },
    /// A leaf holds more than `max_children` elements.
    #[error("leaf {leaf:?} holds {len} elements, more than {max}")]
    Overfull {
        /// Offending leaf.
        leaf: NodeIdx,
        /// Its member count.
        len: usize,
        /// Configured capacity.
        max: usize,
    },
    /// A leaf other than the root is empty.
    #[error("non-root leaf {0:?} is empty")]
    EmptyLeaf(NodeIdx),
    /// The leaf set disagrees with the tree about a node.
    #[error("leaf set disagrees with the tree about {0:?}")]
    LeafSetMismatch(NodeIdx),
    /// The id-to-leaf map disagrees with the buckets about an element.
    #[error("element {0} is not mapped to the leaf that holds it")]
    LeafOfMismatch(ElementId),
    /// A bucket lists an id that has no stored element.
    #[error("element {0} is indexed but not stored")]
    MissingElement(ElementId),
    /// Stored, indexed and mapped element counts differ.
    #[error("{stored} elements stored, {indexed} indexed in leaves, {mapped} mapped")]
    CountMismatch {
        /// Elements in the store.
        stored: usize,
        /// Ids found in leaf buckets.
        indexed: usize,
        /// Entries in the id-to-leaf map.
        mapped: usize,
    },
    /// Live buckets do not match the number of leaves.
    #[error("{live} live buckets for {leaves} leaves")]
    BucketLeak {
        /// Buckets not on the free stack.
        live: usize,
        /// Leaves in the tree.
        leaves: usize,
    },
}

impl<V: BoundingVolume, E: Element<V>> DynamicTree<V, E> {
    /// Check every structural invariant and the bound invariants.
    ///
    /// Internal bounds are compared for exact equality with the union of their children, so
    /// this only passes right after [`update_all`](Self::update_all),
    /// [`optimize`](Self::optimize) or [`refit`](Self::refit) when inserts or removals happened
    /// since the last refresh.
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        if !self.created {
            return Err(InvariantViolation::Disposed);
        }
        let Some(root) = self.root else {
            if !self.nodes.is_empty() || !self.elements.is_empty() {
                return Err(InvariantViolation::MissingRoot(self.nodes.len()));
            }
            return Ok(());
        };
        if self.nodes[root].parent.is_some() {
            return Err(InvariantViolation::RootHasParent(root));
        }

        let mut seen = vec![false; self.nodes.len()];
        let mut reached = 0_usize;
        let mut leaf_total = 0_usize;
        let mut indexed = 0_usize;
        let mut stack = vec![root];
        while let Some(idx) = stack.pop() {
            if seen[idx.get()] {
                return Err(InvariantViolation::SharedNode(idx));
            }
            seen[idx.get()] = true;
            reached += 1;
            let node = &self.nodes[idx];
            match node.kind {
                NodeKind::Detached => return Err(InvariantViolation::DetachedInTree(idx)),
                NodeKind::Internal { left, right } => {
                    for child in [left, right] {
                        if self.nodes.get(child).and_then(|c| c.parent) != Some(idx) {
                            return Err(InvariantViolation::BrokenParentLink { parent: idx, child });
                        }
                    }
                    if self.leaves.contains(idx) {
                        return Err(InvariantViolation::LeafSetMismatch(idx));
                    }
                    if self.children_union(idx) != Some(node.bound) {
                        return Err(InvariantViolation::StaleBound(idx));
                    }
                    stack.push(right);
                    stack.push(left);
                }
                NodeKind::Leaf(bucket) => {
                    leaf_total += 1;
                    if !self.leaves.contains(idx) {
                        return Err(InvariantViolation::LeafSetMismatch(idx));
                    }
                    let members = self.buckets.get(bucket);
                    if members.len() > self.max_children {
                        return Err(InvariantViolation::Overfull {
                            leaf: idx,
                            len: members.len(),
                            max: self.max_children,
                        });
                    }
                    if members.is_empty() && idx != root {
                        return Err(InvariantViolation::EmptyLeaf(idx));
                    }
                    for &id in members {
                        indexed += 1;
                        if self.leaf_of.get(&id) != Some(&idx) {
                            return Err(InvariantViolation::LeafOfMismatch(id));
                        }
                        let Some(volume) = self.volume_of(id) else {
                            return Err(InvariantViolation::MissingElement(id));
                        };
                        if !node.bound.contains(&volume) {
                            return Err(InvariantViolation::MemberOutside { leaf: idx, id });
                        }
                    }
                }
            }
        }

        if reached != self.nodes.len() {
            return Err(InvariantViolation::Unreachable(self.nodes.len() - reached));
        }
        if leaf_total != self.leaves.len() {
            let stray = self
                .leaves
                .iter()
                .find(|l| !seen.get(l.get()).copied().unwrap_or(false));
            if let Some(stray) = stray {
                return Err(InvariantViolation::LeafSetMismatch(stray));
            }
        }
        if indexed != self.elements.len() || self.leaf_of.len() != self.elements.len() {
            return Err(InvariantViolation::CountMismatch {
                stored: self.elements.len(),
                indexed,
                mapped: self.leaf_of.len(),
            });
        }
        if self.buckets.live() != leaf_total {
            return Err(InvariantViolation::BucketLeak {
                live: self.buckets.live(),
                leaves: leaf_total,
            });
        }
        Ok(())
    }
}
