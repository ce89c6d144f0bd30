// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! 2D polygon query regions.

use kurbo::{Affine, Point, Vec2};

use super::region::Region;
use crate::volume::{Aabb2, BoundingVolume, Disc};

/// Simple polygon in local coordinates. Winding does not matter; inside is even-odd.
#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    vertices: Vec<Point>,
}

impl Polygon {
    /// Create a polygon from its vertices; the last vertex connects back to the first.
    pub fn new(vertices: impl IntoIterator<Item = Point>) -> Self {
        Self {
            vertices: vertices.into_iter().collect(),
        }
    }

    /// Vertices in local coordinates.
    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    /// Place the polygon in the world with `transform` and precompute its edges.
    pub fn region(&self, transform: Affine) -> PolygonRegion {
        PolygonRegion::new(self.vertices.iter().map(|&p| transform * p))
    }
}

/// A placed polygon with precomputed edge offsets and bounds.
///
/// Fewer than three vertices make an empty region that matches nothing.
#[derive(Clone, Debug, PartialEq)]
pub struct PolygonRegion {
    starts: Vec<Vec2>,
    /// `end - start` of each edge.
    offsets: Vec<Vec2>,
    bounds: Option<Aabb2>,
}

impl PolygonRegion {
    fn new(points: impl Iterator<Item = Point>) -> Self {
        let starts: Vec<Vec2> = points.map(Point::to_vec2).collect();
        if starts.len() < 3 {
            log::warn!("polygon with {} vertices matches nothing", starts.len());
            return Self {
                starts: Vec::new(),
                offsets: Vec::new(),
                bounds: None,
            };
        }
        let offsets = starts
            .iter()
            .zip(starts.iter().cycle().skip(1))
            .map(|(&a, &b)| b - a)
            .collect();
        let bounds = starts
            .iter()
            .map(|&p| Aabb2::from_point(p))
            .reduce(|acc, b| acc.union(&b));
        Self {
            starts,
            offsets,
            bounds,
        }
    }

    fn edges(&self) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
        self.starts.iter().copied().zip(self.offsets.iter().copied())
    }

    /// Even-odd point-in-polygon test.
    pub fn contains_point(&self, p: Vec2) -> bool {
        let mut inside = false;
        for (a, d) in self.edges() {
            let b = a + d;
            if (a.y > p.y) != (b.y > p.y) {
                let x = a.x + (p.y - a.y) / d.y * d.x;
                if p.x < x {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Squared distance from `p` to the nearest edge.
    fn edge_distance_squared(&self, p: Vec2) -> f64 {
        self.edges()
            .map(|(a, d)| {
                let len_sq = d.hypot2();
                let t = if len_sq > 0.0 {
                    ((p - a).dot(d) / len_sq).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                (a + d * t - p).hypot2()
            })
            .fold(f64::INFINITY, f64::min)
    }

    /// Parameter range of an edge inside `b`, if any.
    fn clip(b: &Aabb2, a: Vec2, d: Vec2) -> Option<(f64, f64)> {
        let (t0, t1) = b.slab_interval(a, d)?;
        let (s0, s1) = (t0.max(0.0), t1.min(1.0));
        (s0 <= s1).then_some((s0, s1))
    }
}

fn corners(b: &Aabb2) -> [Vec2; 4] {
    [
        b.min,
        Vec2::new(b.max.x, b.min.y),
        b.max,
        Vec2::new(b.min.x, b.max.y),
    ]
}

fn strictly_inside(b: &Aabb2, p: Vec2) -> bool {
    b.min.x < p.x && p.x < b.max.x && b.min.y < p.y && p.y < b.max.y
}

impl Region<Aabb2> for PolygonRegion {
    /// All corners inside and no edge running through the box interior.
    fn contains_volume(&self, volume: &Aabb2) -> bool {
        let Some(bounds) = self.bounds else {
            return false;
        };
        if !bounds.contains(volume) {
            return false;
        }
        if !corners(volume).iter().all(|&c| self.contains_point(c)) {
            return false;
        }
        !self.edges().any(|(a, d)| {
            Self::clip(volume, a, d).is_some_and(|(s0, s1)| {
                s0 < s1 && strictly_inside(volume, a + d * (0.5 * (s0 + s1)))
            })
        })
    }

    fn overlaps_volume(&self, volume: &Aabb2) -> bool {
        let Some(bounds) = self.bounds else {
            return false;
        };
        if !bounds.overlaps(volume) {
            return false;
        }
        corners(volume).iter().any(|&c| self.contains_point(c))
            || self.edges().any(|(a, d)| Self::clip(volume, a, d).is_some())
    }
}

impl Region<Disc> for PolygonRegion {
    fn contains_volume(&self, volume: &Disc) -> bool {
        self.bounds.is_some()
            && self.contains_point(volume.center)
            && self.edge_distance_squared(volume.center) >= volume.radius_sq
    }

    fn overlaps_volume(&self, volume: &Disc) -> bool {
        self.bounds.is_some()
            && (self.contains_point(volume.center)
                || self.edge_distance_squared(volume.center) <= volume.radius_sq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f64, y: f64, size: f64) -> Aabb2 {
        Aabb2::new(Vec2::new(x, y), Vec2::new(x + size, y + size))
    }

    /// L-shaped polygon covering [0,4]x[0,2] and [0,2]x[2,4].
    fn ell() -> PolygonRegion {
        Polygon::new([
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 2.0),
            Point::new(2.0, 2.0),
            Point::new(2.0, 4.0),
            Point::new(0.0, 4.0),
        ])
        .region(Affine::IDENTITY)
    }

    #[test]
    fn point_in_concave_polygon() {
        let p = ell();
        assert!(p.contains_point(Vec2::new(1.0, 1.0)));
        assert!(p.contains_point(Vec2::new(3.0, 1.0)));
        assert!(p.contains_point(Vec2::new(1.0, 3.0)));
        assert!(!p.contains_point(Vec2::new(3.0, 3.0)), "notch");
    }

    #[test]
    fn boxes_against_concave_polygon() {
        let p = ell();
        assert!(p.contains_volume(&square(0.5, 0.5, 1.0)));
        let across = Aabb2::new(Vec2::new(1.0, 1.0), Vec2::new(3.5, 3.5));
        assert!(!p.contains_volume(&across));
        assert!(p.overlaps_volume(&across));
        assert!(!p.overlaps_volume(&square(2.5, 2.5, 1.0)));
        assert!(p.overlaps_volume(&square(-1.0, -1.0, 10.0)), "box around the polygon");
    }

    #[test]
    fn notch_edge_through_box_breaks_containment() {
        // C shape: notch over (2,4)x(1,3).
        let c = Polygon::new([
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 1.0),
            Point::new(2.0, 1.0),
            Point::new(2.0, 3.0),
            Point::new(4.0, 3.0),
            Point::new(4.0, 4.0),
            Point::new(0.0, 4.0),
        ])
        .region(Affine::IDENTITY);
        // Every corner is inside, yet the notch cuts through the box.
        let b = Aabb2::new(Vec2::new(1.0, 0.5), Vec2::new(3.0, 3.5));
        assert!(corners(&b).iter().all(|&q| c.contains_point(q)));
        assert!(!c.contains_volume(&b));
        assert!(c.overlaps_volume(&b));
    }

    #[test]
    fn discs_against_polygon() {
        let p = ell();
        assert!(p.contains_volume(&Disc::new(Vec2::new(1.0, 1.0), 0.5)));
        assert!(!p.contains_volume(&Disc::new(Vec2::new(1.0, 1.0), 1.5)));
        assert!(p.overlaps_volume(&Disc::new(Vec2::new(3.0, 3.0), 1.2)));
        assert!(!p.overlaps_volume(&Disc::new(Vec2::new(3.5, 3.5), 1.0)));
    }

    #[test]
    fn transform_moves_the_region() {
        let unit = Polygon::new([
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ]);
        let placed = unit.region(Affine::translate((10.0, 0.0)) * Affine::scale(2.0));
        assert!(placed.contains_point(Vec2::new(11.5, 1.5)));
        assert!(!placed.contains_point(Vec2::new(0.5, 0.5)));
    }

    #[test]
    fn degenerate_polygon_is_empty() {
        let p = Polygon::new([Point::new(0.0, 0.0), Point::new(5.0, 5.0)]).region(Affine::IDENTITY);
        assert!(!p.overlaps_volume(&square(0.0, 0.0, 5.0)));
        assert!(!p.overlaps_volume(&Disc::new(Vec2::ZERO, 10.0)));
    }
}
