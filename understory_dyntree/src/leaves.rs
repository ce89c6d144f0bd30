// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Set of leaf nodes with O(1) insert, remove, relocate, and uniform sampling.

use hashbrown::HashMap;
use rand::Rng;

use crate::node::NodeIdx;

#[derive(Clone, Debug, Default)]
pub(crate) struct LeafSet {
    list: Vec<NodeIdx>,
    position: HashMap<NodeIdx, usize>,
}

impl LeafSet {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            list: Vec::with_capacity(capacity),
            position: HashMap::with_capacity(capacity),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.list.len()
    }

    pub(crate) fn contains(&self, leaf: NodeIdx) -> bool {
        self.position.contains_key(&leaf)
    }

    pub(crate) fn insert(&mut self, leaf: NodeIdx) {
        if self.position.contains_key(&leaf) {
            return;
        }
        self.position.insert(leaf, self.list.len());
        self.list.push(leaf);
    }

    pub(crate) fn remove(&mut self, leaf: NodeIdx) {
        let Some(pos) = self.position.remove(&leaf) else {
            return;
        };
        self.list.swap_remove(pos);
        if let Some(&moved) = self.list.get(pos) {
            self.position.insert(moved, pos);
        }
    }

    /// Record that the leaf at `from` now lives at `to`.
    pub(crate) fn relocate(&mut self, from: NodeIdx, to: NodeIdx) {
        if let Some(pos) = self.position.remove(&from) {
            self.list[pos] = to;
            self.position.insert(to, pos);
        }
    }

    /// Two distinct leaves chosen uniformly at random, or `None` with fewer than two leaves.
    pub(crate) fn sample_pair<R: Rng>(&self, rng: &mut R) -> Option<(NodeIdx, NodeIdx)> {
        let n = self.list.len();
        if n < 2 {
            return None;
        }
        let a = rng.random_range(0..n);
        let mut b = rng.random_range(0..n - 1);
        if b >= a {
            b += 1;
        }
        Some((self.list[a], self.list[b]))
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = NodeIdx> + '_ {
        self.list.iter().copied()
    }

    pub(crate) fn clear(&mut self) {
        self.list.clear();
        self.position.clear();
    }

    pub(crate) fn release(&mut self) {
        self.list = Vec::new();
        self.position = HashMap::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn remove_and_relocate_keep_positions() {
        let mut set = LeafSet::default();
        for i in 0..4 {
            set.insert(NodeIdx::new(i));
        }
        set.remove(NodeIdx::new(0));
        assert_eq!(set.len(), 3);
        assert!(!set.contains(NodeIdx::new(0)));
        set.relocate(NodeIdx::new(3), NodeIdx::new(0));
        assert!(set.contains(NodeIdx::new(0)));
        assert!(!set.contains(NodeIdx::new(3)));
        set.remove(NodeIdx::new(0));
        let mut rest: Vec<_> = set.iter().map(NodeIdx::get).collect();
        rest.sort_unstable();
        assert_eq!(rest, [1, 2]);
    }

    #[test]
    fn sampled_pairs_are_distinct() {
        let mut set = LeafSet::default();
        let mut rng = SmallRng::seed_from_u64(3);
        set.insert(NodeIdx::new(5));
        assert!(set.sample_pair(&mut rng).is_none());
        set.insert(NodeIdx::new(6));
        set.insert(NodeIdx::new(7));
        for _ in 0..100 {
            let (a, b) = set.sample_pair(&mut rng).expect("three leaves");
            assert_ne!(a, b);
            assert!(set.contains(a) && set.contains(b));
        }
    }
}
