// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Axis-aligned bounding boxes in 2D and 3D.

use glam::DVec3;
use kurbo::Vec2;

use super::BoundingVolume;
use crate::types::{ElementId, Vector};

/// Axis-aligned bounding box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb<P> {
    /// Minimum corner.
    pub min: P,
    /// Maximum corner.
    pub max: P,
}

/// 2D box.
pub type Aabb2 = Aabb<Vec2>;

/// 3D box.
pub type Aabb3 = Aabb<DVec3>;

impl<P> Aabb<P> {
    /// Create a box from its corners.
    pub const fn new(min: P, max: P) -> Self {
        Self { min, max }
    }
}

impl<P: Vector> Aabb<P> {
    /// Create a box from its center and half extents.
    pub fn from_center_half_extents(center: P, half_extents: P) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Zero-size box at a point.
    pub fn from_point(point: P) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    /// Size along each axis, clamped at zero.
    pub fn extents(&self) -> P {
        P::from_axes(|i| (self.max.axis(i) - self.min.axis(i)).max(0.0))
    }

    /// Parametric interval of the segment `origin + t * delta`, `t` unbounded, inside the box.
    pub(crate) fn slab_interval(&self, origin: P, delta: P) -> Option<(f64, f64)> {
        let mut t0 = f64::NEG_INFINITY;
        let mut t1 = f64::INFINITY;
        for i in 0..P::DIM {
            let o = origin.axis(i);
            let d = delta.axis(i);
            let lo = self.min.axis(i);
            let hi = self.max.axis(i);
            if d == 0.0 {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let (mut a, mut b) = ((lo - o) * inv, (hi - o) * inv);
            if a > b {
                core::mem::swap(&mut a, &mut b);
            }
            t0 = t0.max(a);
            t1 = t1.min(b);
            if t0 > t1 {
                return None;
            }
        }
        Some((t0, t1))
    }

    /// Squared distance from `point` to the farthest corner.
    pub fn farthest_corner_distance_squared(&self, point: P) -> f64 {
        (0..P::DIM)
            .map(|i| {
                let lo = self.min.axis(i) - point.axis(i);
                let hi = self.max.axis(i) - point.axis(i);
                (lo * lo).max(hi * hi)
            })
            .sum()
    }
}

impl<P: Vector> BoundingVolume for Aabb<P> {
    type Point = P;

    #[inline]
    fn center(&self) -> P {
        (self.min + self.max) * 0.5
    }

    #[inline]
    fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min_by_axis(other.min),
            max: self.max.max_by_axis(other.max),
        }
    }

    fn contains(&self, other: &Self) -> bool {
        (0..P::DIM).all(|i| {
            self.min.axis(i) <= other.min.axis(i) && other.max.axis(i) <= self.max.axis(i)
        })
    }

    fn overlaps(&self, other: &Self) -> bool {
        (0..P::DIM).all(|i| {
            self.min.axis(i) <= other.max.axis(i) && other.min.axis(i) <= self.max.axis(i)
        })
    }

    fn measure(&self) -> f64 {
        let e = self.extents();
        (0..P::DIM).map(|i| e.axis(i)).product()
    }

    fn contains_point(&self, point: P) -> bool {
        (0..P::DIM).all(|i| self.min.axis(i) <= point.axis(i) && point.axis(i) <= self.max.axis(i))
    }

    fn distance_squared_to_point(&self, point: P) -> f64 {
        (0..P::DIM)
            .map(|i| {
                let p = point.axis(i);
                let d = (self.min.axis(i) - p).max(p - self.max.axis(i)).max(0.0);
                d * d
            })
            .sum()
    }

    fn enclose(volumes: &[Self]) -> Option<Self> {
        let (first, rest) = volumes.split_first()?;
        Some(rest.iter().fold(*first, |acc, v| acc.union(v)))
    }

    #[inline]
    fn grow(&self, added: &Self, _members: &[Self]) -> Self {
        self.union(added)
    }

    #[inline]
    fn spread_from(&self, center: P) -> f64 {
        self.farthest_corner_distance_squared(center)
    }

    /// Guttman's quadratic split.
    ///
    /// Seeds are the pair wasting the most measure when combined. Remaining entries are then
    /// assigned one at a time, always taking the entry with the largest difference in growth
    /// between the two groups and giving it to the group that grows less (ties: smaller group
    /// measure, then fewer entries). A group short of the minimum fill takes all leftovers.
    fn partition(entries: &mut [(ElementId, Self)]) -> usize {
        let n = entries.len();
        if n < 2 {
            return n;
        }
        let min_fill = (n * 2 / 5).max(1);

        let (mut seed_a, mut seed_b) = (0, 1);
        let mut worst = f64::NEG_INFINITY;
        for i in 0..n {
            for j in (i + 1)..n {
                let a = &entries[i].1;
                let b = &entries[j].1;
                let waste = a.union(b).measure() - a.measure() - b.measure();
                if waste > worst {
                    worst = waste;
                    seed_a = i;
                    seed_b = j;
                }
            }
        }

        // `None` = unassigned, `Some(false)` = first group, `Some(true)` = second group.
        let mut group: Vec<Option<bool>> = vec![None; n];
        group[seed_a] = Some(false);
        group[seed_b] = Some(true);
        let mut bound_a = entries[seed_a].1;
        let mut bound_b = entries[seed_b].1;
        let (mut count_a, mut count_b) = (1_usize, 1_usize);
        let mut remaining = n - 2;

        while remaining > 0 {
            if count_a + remaining <= min_fill || count_b + remaining <= min_fill {
                let to_b = count_b + remaining <= min_fill;
                for g in group.iter_mut().filter(|g| g.is_none()) {
                    *g = Some(to_b);
                }
                break;
            }

            let mut pick = 0;
            let mut pick_growth = (0.0, 0.0);
            let mut best_diff = f64::NEG_INFINITY;
            for (i, entry) in entries.iter().enumerate() {
                if group[i].is_some() {
                    continue;
                }
                let grow_a = bound_a.union(&entry.1).measure() - bound_a.measure();
                let grow_b = bound_b.union(&entry.1).measure() - bound_b.measure();
                let diff = (grow_a - grow_b).abs();
                if diff > best_diff {
                    best_diff = diff;
                    pick = i;
                    pick_growth = (grow_a, grow_b);
                }
            }

            let (grow_a, grow_b) = pick_growth;
            let to_b = if grow_a != grow_b {
                grow_b < grow_a
            } else if bound_a.measure() != bound_b.measure() {
                bound_b.measure() < bound_a.measure()
            } else {
                count_b < count_a
            };
            group[pick] = Some(to_b);
            if to_b {
                bound_b = bound_b.union(&entries[pick].1);
                count_b += 1;
            } else {
                bound_a = bound_a.union(&entries[pick].1);
                count_a += 1;
            }
            remaining -= 1;
        }

        let mut first: Vec<(ElementId, Self)> = Vec::with_capacity(n);
        let mut second: Vec<(ElementId, Self)> = Vec::with_capacity(n);
        for (entry, g) in entries.iter().zip(&group) {
            if *g == Some(true) {
                second.push(*entry);
            } else {
                first.push(*entry);
            }
        }
        let split = first.len();
        entries[..split].copy_from_slice(&first);
        entries[split..].copy_from_slice(&second);
        split
    }

    #[inline]
    fn ray_interval(&self, origin: P, direction: P) -> Option<(f64, f64)> {
        self.slab_interval(origin, direction)
    }
}
