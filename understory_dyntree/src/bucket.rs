// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pool of fixed-capacity inline id lists, one per leaf.

use arrayvec::ArrayVec;

use crate::types::ElementId;

/// Hard ceiling on the number of elements a leaf can hold.
pub const BUCKET_CAPACITY: usize = 30;

pub(crate) type Bucket = ArrayVec<ElementId, BUCKET_CAPACITY>;

/// Index of a bucket in the pool.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct BucketIdx(u32);

impl BucketIdx {
    pub(crate) const fn new(i: u32) -> Self {
        Self(i)
    }

    pub(crate) const fn get(self) -> usize {
        self.0 as usize
    }
}

/// Buckets stored densely, recycled through a free-index stack.
#[derive(Clone, Debug, Default)]
pub(crate) struct BucketPool {
    buckets: Vec<Bucket>,
    free: Vec<BucketIdx>,
}

impl BucketPool {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            buckets: Vec::with_capacity(capacity),
            free: Vec::new(),
        }
    }

    /// Hand out an empty bucket, reusing a freed slot when one exists.
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Bucket indices are 32-bit; pools never approach u32::MAX buckets."
    )]
    pub(crate) fn alloc(&mut self) -> BucketIdx {
        if let Some(idx) = self.free.pop() {
            return idx;
        }
        let idx = BucketIdx::new(self.buckets.len() as u32);
        self.buckets.push(Bucket::new());
        idx
    }

    pub(crate) fn free(&mut self, idx: BucketIdx) {
        self.buckets[idx.get()].clear();
        self.free.push(idx);
    }

    pub(crate) fn get(&self, idx: BucketIdx) -> &[ElementId] {
        &self.buckets[idx.get()]
    }

    pub(crate) fn get_mut(&mut self, idx: BucketIdx) -> &mut Bucket {
        &mut self.buckets[idx.get()]
    }

    /// Swap-remove `id` from the bucket. Returns whether it was present.
    pub(crate) fn remove_id(&mut self, idx: BucketIdx, id: ElementId) -> bool {
        let bucket = &mut self.buckets[idx.get()];
        match bucket.iter().position(|&m| m == id) {
            Some(pos) => {
                bucket.swap_remove(pos);
                true
            }
            None => false,
        }
    }

    /// Number of buckets currently owned by leaves.
    pub(crate) fn live(&self) -> usize {
        self.buckets.len() - self.free.len()
    }

    pub(crate) fn clear(&mut self) {
        self.buckets.clear();
        self.free.clear();
    }

    pub(crate) fn release(&mut self) {
        self.buckets = Vec::new();
        self.free = Vec::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freed_buckets_are_recycled_empty() {
        let mut pool = BucketPool::with_capacity(2);
        let a = pool.alloc();
        let b = pool.alloc();
        pool.get_mut(a).push(7);
        pool.get_mut(a).push(9);
        pool.free(a);
        assert_eq!(pool.live(), 1);
        let c = pool.alloc();
        assert_eq!(c, a, "freed slot is reused first");
        assert!(pool.get(c).is_empty());
        assert_ne!(c, b);
    }

    #[test]
    fn remove_id_swaps_last_in() {
        let mut pool = BucketPool::default();
        let a = pool.alloc();
        for id in [1, 2, 3, 4] {
            pool.get_mut(a).push(id);
        }
        assert!(pool.remove_id(a, 2));
        assert_eq!(pool.get(a), &[1, 4, 3]);
        assert!(!pool.remove_id(a, 42));
    }
}
