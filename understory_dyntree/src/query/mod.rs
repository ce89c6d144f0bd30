// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pruning region queries, batched queries, raycasts, and nearest-neighbor search.
//!
//! Every region query runs the same traversal: a child whose bound lies inside the region is
//! appended wholesale, a child that merely overlaps is descended into, anything else is
//! skipped. Leaf members are tested one by one with the predicate picked by [`QueryMode`].
//!
//! Queries trust the stored bounds. Elements inserted since the last
//! [`update_all`](crate::DynamicTree::update_all), [`optimize`](crate::DynamicTree::optimize)
//! or [`refit`](crate::DynamicTree::refit) can be missed when they lie outside a stale ancestor.

use hashbrown::HashSet;
use kurbo::Affine;
use rayon::prelude::*;

use crate::node::{NodeIdx, NodeKind};
use crate::tree::DynamicTree;
use crate::types::{Element, ElementId};
use crate::volume::BoundingVolume;

mod nearest;
mod polygon;
mod ray;
mod region;

pub use nearest::Neighbor;
pub use polygon::{Polygon, PolygonRegion};
pub use region::{QueryMode, RadiusRegion, Region};

impl<V: BoundingVolume, E: Element<V>> DynamicTree<V, E> {
    /// Ids of elements matching `region` under `mode`, in traversal order.
    pub fn query<R: Region<V> + ?Sized>(&self, region: &R, mode: QueryMode) -> Vec<ElementId> {
        let mut out = Vec::new();
        self.query_into(region, mode, &mut out);
        out
    }

    /// Append ids of elements matching `region` under `mode` to `out`.
    pub fn query_into<R: Region<V> + ?Sized>(
        &self,
        region: &R,
        mode: QueryMode,
        out: &mut Vec<ElementId>,
    ) {
        let Some(root) = self.root else {
            return;
        };
        let mut stack = vec![root];
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            if region.contains_volume(&node.bound) {
                self.append_subtree(idx, out);
                continue;
            }
            if !region.overlaps_volume(&node.bound) {
                continue;
            }
            match node.kind {
                NodeKind::Internal { left, right } => {
                    stack.push(right);
                    stack.push(left);
                }
                NodeKind::Leaf(bucket) => {
                    out.extend(self.buckets.get(bucket).iter().copied().filter(|&id| {
                        self.volume_of(id).is_some_and(|v| region.matches(&v, mode))
                    }));
                }
                NodeKind::Detached => {}
            }
        }
    }

    /// Append every element under `idx` without testing.
    fn append_subtree(&self, idx: NodeIdx, out: &mut Vec<ElementId>) {
        let mut stack = vec![idx];
        while let Some(idx) = stack.pop() {
            match self.nodes[idx].kind {
                NodeKind::Internal { left, right } => {
                    stack.push(right);
                    stack.push(left);
                }
                NodeKind::Leaf(bucket) => out.extend_from_slice(self.buckets.get(bucket)),
                NodeKind::Detached => {}
            }
        }
    }

    /// Elements matching a volume of the tree's own kind (a box for box trees, a ball for
    /// ball trees).
    pub fn query_region(&self, volume: &V, mode: QueryMode) -> Vec<ElementId>
    where
        V: Region<V>,
    {
        self.query(volume, mode)
    }

    /// Elements matching the circle or sphere around `center`.
    pub fn query_radius(&self, center: V::Point, radius: f64, mode: QueryMode) -> Vec<ElementId>
    where
        RadiusRegion<V::Point>: Region<V>,
    {
        self.query(&RadiusRegion::new(center, radius), mode)
    }

    /// Elements matching `polygon` placed in the world by `transform` (2D trees only).
    pub fn query_polygon(
        &self,
        polygon: &Polygon,
        transform: Affine,
        mode: QueryMode,
    ) -> Vec<ElementId>
    where
        PolygonRegion: Region<V>,
    {
        self.query(&polygon.region(transform), mode)
    }

    /// Union of the matches of every region, one traversal per region on the rayon pool.
    pub fn query_many<R: Region<V>>(&self, regions: &[R], mode: QueryMode) -> HashSet<ElementId>
    where
        E: Sync,
    {
        par_union(regions, |region, hits| self.query_into(region, mode, hits))
    }

    /// Batched [`query_radius`](Self::query_radius).
    ///
    /// `centers` and `radii` pair up by index; on a length mismatch the extra entries are
    /// ignored and a warning is logged.
    pub fn query_radii(
        &self,
        centers: &[V::Point],
        radii: &[f64],
        mode: QueryMode,
    ) -> HashSet<ElementId>
    where
        E: Sync,
        RadiusRegion<V::Point>: Region<V>,
    {
        let regions = radius_regions(centers, radii);
        self.query_many(&regions, mode)
    }

    /// Batched [`query_region`](Self::query_region).
    pub fn query_regions(&self, volumes: &[V], mode: QueryMode) -> HashSet<ElementId>
    where
        E: Sync,
        V: Region<V>,
    {
        self.query_many(volumes, mode)
    }
}

/// Run `visit` for every region on the rayon pool and union the ids it reports.
pub(crate) fn par_union<R, F>(regions: &[R], visit: F) -> HashSet<ElementId>
where
    R: Sync,
    F: Fn(&R, &mut Vec<ElementId>) + Sync,
{
    regions
        .par_iter()
        .fold(HashSet::new, |mut acc, region| {
            let mut hits = Vec::new();
            visit(region, &mut hits);
            acc.extend(hits);
            acc
        })
        .reduce(HashSet::new, |a, b| {
            let (mut big, small) = if a.len() < b.len() { (b, a) } else { (a, b) };
            big.extend(small);
            big
        })
}

/// Pair `centers` with `radii` by index, warning about and dropping unpaired entries.
pub(crate) fn radius_regions<P: Copy>(centers: &[P], radii: &[f64]) -> Vec<RadiusRegion<P>> {
    if centers.len() != radii.len() {
        log::warn!(
            "got {} centers and {} radii; using the first {}",
            centers.len(),
            radii.len(),
            centers.len().min(radii.len())
        );
    }
    centers
        .iter()
        .zip(radii)
        .map(|(&c, &r)| RadiusRegion::new(c, r))
        .collect()
}
