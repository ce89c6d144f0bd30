// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Element contract, vector abstraction, and ray primitives.

use core::cmp::Ordering;
use core::fmt::Debug;
use core::ops::{Add, Mul, Sub};

use glam::DVec3;
use kurbo::Vec2;

use crate::volume::BoundingVolume;

/// Caller-assigned element identifier.
///
/// Ids must be unique among live elements; an id may be reused after its element was removed.
pub type ElementId = u32;

/// Contract for values stored in a tree.
///
/// The tree keeps one copy of each element, keyed by [`Element::id`]. Two elements are the
/// same element exactly when their ids match, regardless of their volumes.
pub trait Element<V: BoundingVolume>: Clone {
    /// Stable identifier of this element.
    fn id(&self) -> ElementId;

    /// Current bounding volume.
    fn volume(&self) -> V;

    /// Replace the bounding volume.
    fn set_volume(&mut self, volume: V);
}

/// Minimal element: an id and a bounding volume.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Item<V> {
    /// Identifier.
    pub id: ElementId,
    /// Bounding volume.
    pub volume: V,
}

impl<V> Item<V> {
    /// Create an item.
    pub const fn new(id: ElementId, volume: V) -> Self {
        Self { id, volume }
    }
}

impl<V: BoundingVolume> Element<V> for Item<V> {
    #[inline]
    fn id(&self) -> ElementId {
        self.id
    }

    #[inline]
    fn volume(&self) -> V {
        self.volume
    }

    #[inline]
    fn set_volume(&mut self, volume: V) {
        self.volume = volume;
    }
}

/// Fixed-dimension `f64` vector used as the point type of bounding volumes.
///
/// Implemented for [`kurbo::Vec2`] (2D) and [`glam::DVec3`] (3D).
pub trait Vector:
    Copy
    + Debug
    + PartialEq
    + Send
    + Sync
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<f64, Output = Self>
    + 'static
{
    /// Number of axes.
    const DIM: usize;

    /// The zero vector.
    fn zero() -> Self;

    /// Build a vector from a per-axis function.
    fn from_axes<F: FnMut(usize) -> f64>(f: F) -> Self;

    /// Component along `axis` (`0..DIM`).
    fn axis(self, axis: usize) -> f64;

    /// Dot product.
    fn dot(self, other: Self) -> f64;

    /// Squared length.
    #[inline]
    fn length_squared(self) -> f64 {
        self.dot(self)
    }

    /// Squared distance between two points.
    #[inline]
    fn distance_squared(self, other: Self) -> f64 {
        (self - other).length_squared()
    }

    /// Component-wise minimum.
    #[inline]
    fn min_by_axis(self, other: Self) -> Self {
        Self::from_axes(|i| self.axis(i).min(other.axis(i)))
    }

    /// Component-wise maximum.
    #[inline]
    fn max_by_axis(self, other: Self) -> Self {
        Self::from_axes(|i| self.axis(i).max(other.axis(i)))
    }
}

impl Vector for Vec2 {
    const DIM: usize = 2;

    #[inline]
    fn zero() -> Self {
        Self::ZERO
    }

    #[inline]
    fn from_axes<F: FnMut(usize) -> f64>(mut f: F) -> Self {
        let x = f(0);
        let y = f(1);
        Self::new(x, y)
    }

    #[inline]
    fn axis(self, axis: usize) -> f64 {
        if axis == 0 { self.x } else { self.y }
    }

    #[inline]
    fn dot(self, other: Self) -> f64 {
        Self::dot(self, other)
    }
}

impl Vector for DVec3 {
    const DIM: usize = 3;

    #[inline]
    fn zero() -> Self {
        Self::ZERO
    }

    #[inline]
    fn from_axes<F: FnMut(usize) -> f64>(mut f: F) -> Self {
        let x = f(0);
        let y = f(1);
        let z = f(2);
        Self::new(x, y, z)
    }

    #[inline]
    fn axis(self, axis: usize) -> f64 {
        self[axis]
    }

    #[inline]
    fn dot(self, other: Self) -> f64 {
        Self::dot(self, other)
    }
}

/// Half-line with a unit direction.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ray<P> {
    /// Start point.
    pub origin: P,
    /// Unit direction.
    pub direction: P,
}

impl<P: Vector> Ray<P> {
    /// Create a ray. The direction is normalized; a zero direction is kept as is and hits nothing.
    pub fn new(origin: P, direction: P) -> Self {
        let len_sq = direction.length_squared();
        let direction = if len_sq > 0.0 {
            direction * (1.0 / len_sq.sqrt())
        } else {
            direction
        };
        Self { origin, direction }
    }

    /// Point at distance `t` along the ray.
    #[inline]
    pub fn at(&self, t: f64) -> P {
        self.origin + self.direction * t
    }

    pub(crate) fn is_degenerate(&self) -> bool {
        self.direction.length_squared() == 0.0
    }
}

/// One intersection point between a ray and an element's bounding volume.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RayHit<P> {
    /// Element that was hit.
    pub id: ElementId,
    /// Intersection point.
    pub point: P,
    /// Distance from the ray origin.
    pub distance: f64,
}

impl<P> RayHit<P> {
    /// Default hit ordering: ascending distance from the ray origin.
    pub fn by_distance(a: &Self, b: &Self) -> Ordering {
        a.distance.total_cmp(&b.distance)
    }
}
