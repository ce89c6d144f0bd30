// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Balls (discs in 2D, spheres in 3D) stored as center and squared radius.

use glam::DVec3;
use kurbo::Vec2;

use super::BoundingVolume;
use crate::types::{ElementId, Vector};

/// Relative slack applied to ball comparisons so that a ball produced by
/// [`union`](BoundingVolume::union) or [`enclose`](BoundingVolume::enclose) still reports
/// containing its inputs after rounding.
const SLACK: f64 = 1e-9;

/// Power-iteration rounds used to find the principal axis when splitting.
const PRINCIPAL_AXIS_ROUNDS: usize = 8;

/// Ball bounding volume.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ball<P> {
    /// Center.
    pub center: P,
    /// Squared radius.
    pub radius_sq: f64,
}

/// 2D ball.
pub type Disc = Ball<Vec2>;

/// 3D ball.
pub type Sphere = Ball<DVec3>;

impl<P> Ball<P> {
    /// Create a ball from its center and radius.
    pub const fn new(center: P, radius: f64) -> Self {
        Self {
            center,
            radius_sq: radius * radius,
        }
    }

    /// Create a ball from its center and squared radius.
    pub const fn from_radius_sq(center: P, radius_sq: f64) -> Self {
        Self { center, radius_sq }
    }

    /// Radius.
    #[inline]
    pub fn radius(&self) -> f64 {
        self.radius_sq.max(0.0).sqrt()
    }
}

#[inline]
fn within(lhs: f64, rhs: f64) -> bool {
    lhs <= rhs + SLACK * rhs.abs().max(1.0)
}

impl<P: Vector> Ball<P> {
    #[inline]
    fn center_distance(&self, other: &Self) -> f64 {
        self.center.distance_squared(other.center).sqrt()
    }

    /// Direction of largest spread of the entry centers around `mean`.
    fn principal_axis(entries: &[(ElementId, Self)], mean: P) -> P {
        let unit_x = P::from_axes(|i| if i == 0 { 1.0 } else { 0.0 });
        let mut axis = entries
            .iter()
            .map(|(_, b)| b.center - mean)
            .max_by(|a, b| a.length_squared().total_cmp(&b.length_squared()))
            .unwrap_or(unit_x);
        if axis.length_squared() == 0.0 {
            return unit_x;
        }
        for _ in 0..PRINCIPAL_AXIS_ROUNDS {
            let next = entries.iter().fold(P::zero(), |acc, (_, b)| {
                let d = b.center - mean;
                acc + d * d.dot(axis)
            });
            let len_sq = next.length_squared();
            if len_sq == 0.0 {
                break;
            }
            axis = next * (1.0 / len_sq.sqrt());
        }
        axis
    }
}

impl<P: Vector> BoundingVolume for Ball<P> {
    type Point = P;

    #[inline]
    fn center(&self) -> P {
        self.center
    }

    /// Minimal ball enclosing both balls.
    fn union(&self, other: &Self) -> Self {
        let ra = self.radius();
        let rb = other.radius();
        let d = self.center_distance(other);
        if d + rb <= ra {
            return *self;
        }
        if d + ra <= rb {
            return *other;
        }
        let r = 0.5 * (d + ra + rb);
        let center = self.center + (other.center - self.center) * ((r - ra) / d);
        Self {
            center,
            radius_sq: r * r,
        }
    }

    fn contains(&self, other: &Self) -> bool {
        within(self.center_distance(other) + other.radius(), self.radius())
    }

    fn overlaps(&self, other: &Self) -> bool {
        within(self.center_distance(other), self.radius() + other.radius())
    }

    #[inline]
    fn measure(&self) -> f64 {
        self.radius_sq
    }

    fn contains_point(&self, point: P) -> bool {
        within(self.center.distance_squared(point), self.radius_sq)
    }

    fn distance_squared_to_point(&self, point: P) -> f64 {
        let d = (self.center.distance_squared(point).sqrt() - self.radius()).max(0.0);
        d * d
    }

    /// Ball around the mean of the centers, wide enough to reach every input.
    fn enclose(volumes: &[Self]) -> Option<Self> {
        if volumes.is_empty() {
            return None;
        }
        #[allow(
            clippy::cast_precision_loss,
            reason = "Leaf member counts are tiny; the conversion is exact."
        )]
        let inv = 1.0 / volumes.len() as f64;
        let mean = volumes
            .iter()
            .fold(P::zero(), |acc, v| acc + v.center * inv);
        let r = volumes
            .iter()
            .map(|v| v.center.distance_squared(mean).sqrt() + v.radius())
            .fold(0.0_f64, f64::max);
        Some(Self {
            center: mean,
            radius_sq: r * r,
        })
    }

    /// Running-average center, radius reaching the farthest member.
    fn grow(&self, added: &Self, members: &[Self]) -> Self {
        if members.len() <= 1 {
            return *added;
        }
        #[allow(
            clippy::cast_precision_loss,
            reason = "Leaf member counts are tiny; the conversion is exact."
        )]
        let n = members.len() as f64;
        let center = self.center * ((n - 1.0) / n) + added.center * (1.0 / n);
        let r = members
            .iter()
            .map(|v| v.center.distance_squared(center).sqrt() + v.radius())
            .fold(0.0_f64, f64::max);
        Self {
            center,
            radius_sq: r * r,
        }
    }

    #[inline]
    fn spread_from(&self, center: P) -> f64 {
        let r = self.center.distance_squared(center).sqrt() + self.radius();
        r * r
    }

    /// Project centers onto the principal axis through their mean and bisect by count.
    fn partition(entries: &mut [(ElementId, Self)]) -> usize {
        let n = entries.len();
        if n < 2 {
            return n;
        }
        #[allow(
            clippy::cast_precision_loss,
            reason = "Leaf member counts are tiny; the conversion is exact."
        )]
        let inv = 1.0 / n as f64;
        let mean = entries
            .iter()
            .fold(P::zero(), |acc, (_, b)| acc + b.center * inv);
        let axis = Self::principal_axis(entries, mean);
        entries.sort_by(|(_, a), (_, b)| {
            (a.center - mean)
                .dot(axis)
                .total_cmp(&(b.center - mean).dot(axis))
        });
        n / 2
    }

    fn ray_interval(&self, origin: P, direction: P) -> Option<(f64, f64)> {
        let a = direction.length_squared();
        if a == 0.0 {
            return None;
        }
        let m = origin - self.center;
        let b = m.dot(direction);
        let c = m.length_squared() - self.radius_sq;
        let disc = b * b - a * c;
        if disc < 0.0 {
            return None;
        }
        let s = disc.sqrt();
        Some(((-b - s) / a, (-b + s) / a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_of_disjoint_discs_is_minimal() {
        let a = Disc::new(Vec2::new(0.0, 0.0), 1.0);
        let b = Disc::new(Vec2::new(10.0, 0.0), 2.0);
        let u = a.union(&b);
        assert!((u.radius() - 6.5).abs() < 1e-12);
        assert!((u.center.x - 5.5).abs() < 1e-12);
        assert!(u.contains(&a) && u.contains(&b));
    }

    #[test]
    fn union_with_nested_ball_returns_outer() {
        let outer = Sphere::new(DVec3::ZERO, 5.0);
        let inner = Sphere::new(DVec3::new(1.0, 1.0, 0.0), 1.0);
        assert_eq!(outer.union(&inner), outer);
        assert_eq!(inner.union(&outer), outer);
    }

    #[test]
    fn enclose_reaches_every_member() {
        let balls = [
            Sphere::new(DVec3::new(0.0, 0.0, 0.0), 1.0),
            Sphere::new(DVec3::new(4.0, 0.0, 0.0), 0.5),
            Sphere::new(DVec3::new(0.0, 3.0, 1.0), 2.0),
        ];
        let e = Sphere::enclose(&balls).expect("non-empty input");
        assert!(balls.iter().all(|b| e.contains(b)));
        assert!(Sphere::enclose(&[]).is_none());
    }

    #[test]
    fn grow_keeps_members_covered() {
        let members = [
            Disc::new(Vec2::new(0.0, 0.0), 1.0),
            Disc::new(Vec2::new(2.0, 0.0), 1.0),
            Disc::new(Vec2::new(9.0, 3.0), 0.25),
        ];
        let bound = Disc::enclose(&members[..2]).expect("two members");
        let grown = bound.grow(&members[2], &members);
        assert!(members.iter().all(|m| grown.contains(m)));
    }

    #[test]
    fn principal_split_bisects_along_the_line() {
        let mut entries: Vec<(ElementId, Disc)> = (0..9)
            .map(|i| {
                let t = f64::from(i);
                (i, Disc::new(Vec2::new(t, 2.0 * t), 0.1))
            })
            .collect();
        entries.reverse();
        let split = Disc::partition(&mut entries);
        assert_eq!(split, 4);
        let first: Vec<ElementId> = entries[..split].iter().map(|e| e.0).collect();
        let low: Vec<ElementId> = (0..4).collect();
        let high: Vec<ElementId> = (5..9).rev().collect();
        assert!(
            first.iter().all(|id| low.contains(id)) || first.iter().all(|id| high.contains(id)),
            "first half must be one end of the line: {first:?}"
        );
    }

    #[test]
    fn ray_through_sphere() {
        let s = Sphere::new(DVec3::new(5.0, 0.0, 0.0), 1.0);
        let (t0, t1) = s
            .ray_interval(DVec3::ZERO, DVec3::X)
            .expect("ray crosses the sphere");
        assert!((t0 - 4.0).abs() < 1e-12 && (t1 - 6.0).abs() < 1e-12);
        assert!(s.ray_interval(DVec3::ZERO, DVec3::Y).is_none());
    }
}
