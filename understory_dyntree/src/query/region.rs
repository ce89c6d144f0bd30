// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Query regions and their predicates against bounding volumes.

use crate::types::Vector;
use crate::volume::{Aabb, Ball, BoundingVolume};

/// Which predicate a region query applies to element volumes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum QueryMode {
    /// The element's volume lies entirely inside the region.
    Contained,
    /// The element's volume shares at least one point with the region.
    #[default]
    Overlapping,
}

/// A shape that can be tested against bounding volumes of type `V`.
///
/// The traversal appends a whole subtree once [`contains_volume`](Region::contains_volume)
/// holds for its bound and skips it once [`overlaps_volume`](Region::overlaps_volume) fails, so
/// both predicates must be conservative in that direction.
pub trait Region<V>: Sync {
    /// Whether `volume` lies entirely inside the region.
    fn contains_volume(&self, volume: &V) -> bool;

    /// Whether `volume` shares at least one point with the region.
    fn overlaps_volume(&self, volume: &V) -> bool;

    /// Apply the predicate selected by `mode`.
    #[inline]
    fn matches(&self, volume: &V, mode: QueryMode) -> bool {
        match mode {
            QueryMode::Contained => self.contains_volume(volume),
            QueryMode::Overlapping => self.overlaps_volume(volume),
        }
    }
}

impl<P: Vector> Region<Self> for Aabb<P> {
    #[inline]
    fn contains_volume(&self, volume: &Self) -> bool {
        BoundingVolume::contains(self, volume)
    }

    #[inline]
    fn overlaps_volume(&self, volume: &Self) -> bool {
        BoundingVolume::overlaps(self, volume)
    }
}

impl<P: Vector> Region<Self> for Ball<P> {
    #[inline]
    fn contains_volume(&self, volume: &Self) -> bool {
        BoundingVolume::contains(self, volume)
    }

    #[inline]
    fn overlaps_volume(&self, volume: &Self) -> bool {
        BoundingVolume::overlaps(self, volume)
    }
}

/// Circle (2D) or sphere (3D) query region.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RadiusRegion<P> {
    /// Center.
    pub center: P,
    /// Radius.
    pub radius: f64,
}

impl<P> RadiusRegion<P> {
    /// Create a radius region.
    pub const fn new(center: P, radius: f64) -> Self {
        Self { center, radius }
    }
}

impl<P: Vector> RadiusRegion<P> {
    #[inline]
    fn as_ball(&self) -> Ball<P> {
        Ball::new(self.center, self.radius)
    }
}

impl<P: Vector> Region<Aabb<P>> for RadiusRegion<P> {
    fn contains_volume(&self, volume: &Aabb<P>) -> bool {
        volume.farthest_corner_distance_squared(self.center) <= self.radius * self.radius
    }

    fn overlaps_volume(&self, volume: &Aabb<P>) -> bool {
        volume.distance_squared_to_point(self.center) <= self.radius * self.radius
    }
}

impl<P: Vector> Region<Ball<P>> for RadiusRegion<P> {
    fn contains_volume(&self, volume: &Ball<P>) -> bool {
        BoundingVolume::contains(&self.as_ball(), volume)
    }

    fn overlaps_volume(&self, volume: &Ball<P>) -> bool {
        BoundingVolume::overlaps(&self.as_ball(), volume)
    }
}
