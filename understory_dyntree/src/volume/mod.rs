// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bounding-volume algebras shared by the tree.
//!
//! - `aabb`: axis-aligned boxes; combine is the exact union, measure is area (2D) or volume (3D),
//!   splits use Guttman's quadratic heuristic.
//! - `ball`: center + squared radius; combine is the minimal ball enclosing two balls, measure is
//!   the squared radius, splits bisect along the principal axis of the member centers.
//!
//! The tree is written once against [`BoundingVolume`]; picking a volume type picks the tree
//! flavor (R*-style for boxes, Ball*-style for balls).

use core::fmt::Debug;

use crate::types::{ElementId, Vector};

pub mod aabb;
pub mod ball;

pub use aabb::{Aabb, Aabb2, Aabb3};
pub use ball::{Ball, Disc, Sphere};

/// Algebra a volume type must provide to parameterize a [`DynamicTree`](crate::DynamicTree).
pub trait BoundingVolume: Copy + Debug + PartialEq + Send + Sync + 'static {
    /// Point/vector type of the space the volume lives in.
    type Point: Vector;

    /// Geometric center.
    fn center(&self) -> Self::Point;

    /// Combine two volumes into one enclosing both.
    ///
    /// Boxes return the exact union; balls return the minimal ball enclosing both.
    fn union(&self, other: &Self) -> Self;

    /// Whether `other` lies entirely inside `self`.
    fn contains(&self, other: &Self) -> bool;

    /// Whether the two volumes share at least one point.
    fn overlaps(&self, other: &Self) -> bool;

    /// Size measure minimized by the split and optimizer heuristics.
    fn measure(&self) -> f64;

    /// Whether the point lies inside the volume.
    fn contains_point(&self, point: Self::Point) -> bool;

    /// Squared distance from the point to the nearest point of the volume (zero inside).
    fn distance_squared_to_point(&self, point: Self::Point) -> f64;

    /// Volume enclosing every input, or `None` for an empty slice.
    fn enclose(volumes: &[Self]) -> Option<Self>;

    /// Grow a leaf bound that previously covered `members` minus `added`.
    ///
    /// `members` includes `added` as its last entry.
    fn grow(&self, added: &Self, members: &[Self]) -> Self;

    /// How far this volume reaches from `center`, squared.
    ///
    /// The leaf-swap optimizer treats the largest spread among a leaf's members as the leaf's cost.
    fn spread_from(&self, center: Self::Point) -> f64;

    /// Reorder `entries` into two groups and return the length of the first one.
    ///
    /// Called with `max_children + 1` entries when a leaf overflows. Both groups are non-empty
    /// whenever `entries.len() >= 2`.
    fn partition(entries: &mut [(ElementId, Self)]) -> usize;

    /// Parametric interval `(t_enter, t_exit)` where the line `origin + t * direction` is inside.
    ///
    /// The interval may start at a negative `t` when the origin is inside the volume.
    fn ray_interval(&self, origin: Self::Point, direction: Self::Point) -> Option<(f64, f64)>;
}
