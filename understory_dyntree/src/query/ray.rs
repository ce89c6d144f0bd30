// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ray intersection against element volumes.

use core::cmp::Ordering;

use crate::node::NodeKind;
use crate::tree::DynamicTree;
use crate::types::{Element, Ray, RayHit};
use crate::volume::BoundingVolume;

impl<V: BoundingVolume, E: Element<V>> DynamicTree<V, E> {
    /// Intersection points of `ray` with element volumes within `max_distance` of its origin,
    /// nearest first.
    ///
    /// Each volume yields its entry and exit point. A ray starting inside a volume only
    /// reports the exit, and an entry and exit closer than `epsilon` collapse into one hit.
    pub fn raycast(
        &self,
        ray: &Ray<V::Point>,
        max_distance: f64,
        epsilon: f64,
    ) -> Vec<RayHit<V::Point>> {
        self.raycast_by(ray, max_distance, epsilon, RayHit::by_distance)
    }

    /// [`raycast`](Self::raycast) with a custom hit ordering.
    pub fn raycast_by<F>(
        &self,
        ray: &Ray<V::Point>,
        max_distance: f64,
        epsilon: f64,
        compare: F,
    ) -> Vec<RayHit<V::Point>>
    where
        F: FnMut(&RayHit<V::Point>, &RayHit<V::Point>) -> Ordering,
    {
        let mut hits = Vec::new();
        let Some(root) = self.root else {
            return hits;
        };
        if ray.is_degenerate() || max_distance.is_nan() || max_distance < 0.0 {
            return hits;
        }
        let within = |(t0, t1): (f64, f64)| t1 >= 0.0 && t0 <= max_distance;

        let mut stack = vec![root];
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            if !node
                .bound
                .ray_interval(ray.origin, ray.direction)
                .is_some_and(within)
            {
                continue;
            }
            match node.kind {
                NodeKind::Internal { left, right } => {
                    stack.push(right);
                    stack.push(left);
                }
                NodeKind::Leaf(bucket) => {
                    for &id in self.buckets.get(bucket) {
                        let Some(volume) = self.volume_of(id) else {
                            continue;
                        };
                        let Some((t0, t1)) = volume.ray_interval(ray.origin, ray.direction)
                        else {
                            continue;
                        };
                        let mut hit = |t: f64| {
                            hits.push(RayHit {
                                id,
                                point: ray.at(t),
                                distance: t,
                            });
                        };
                        let entry = (0.0..=max_distance).contains(&t0);
                        if entry {
                            hit(t0);
                        }
                        if (0.0..=max_distance).contains(&t1) && (!entry || t1 - t0 > epsilon) {
                            hit(t1);
                        }
                    }
                }
                NodeKind::Detached => {}
            }
        }
        hits.sort_by(compare);
        hits
    }
}

#[cfg(test)]
mod tests {
    use crate::tree::DynamicTree;
    use crate::tree::tests::{Boxes, Discs, square};
    use crate::types::{Item, Ray, RayHit};
    use crate::volume::{Disc, Sphere};
    use glam::DVec3;
    use kurbo::Vec2;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn hits_along_a_row_come_back_sorted() {
        let mut tree = Boxes::new(32, 4);
        for x in (0..10).rev() {
            tree.insert(square(x, f64::from(x) * 3.0, 0.0));
        }
        tree.refit();
        let ray = Ray::new(Vec2::new(-1.0, 0.5), Vec2::new(1.0, 0.0));
        let hits = tree.raycast(&ray, 100.0, 1e-6);
        assert_eq!(hits.len(), 20, "entry and exit for every box");
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
        assert_eq!(hits[0].id, 0);
        assert!(close(hits[0].distance, 1.0));
        assert!(close(hits[1].distance, 2.0));
        assert!(close(hits[0].point.x, 0.0) && close(hits[0].point.y, 0.5));
    }

    #[test]
    fn max_distance_cuts_the_segment() {
        let mut tree = Boxes::new(32, 4);
        for x in 0..10 {
            tree.insert(square(x, f64::from(x) * 3.0, 0.0));
        }
        tree.refit();
        let ray = Ray::new(Vec2::new(-1.0, 0.5), Vec2::new(2.0, 0.0));
        let hits = tree.raycast(&ray, 5.5, 1e-6);
        // Box 0 at [1, 2], box 1 at [4, 5], box 2 entry at 7 is out of reach.
        let ids: Vec<u32> = hits.iter().map(|h| h.id).collect();
        assert_eq!(ids, [0, 0, 1, 1]);
    }

    #[test]
    fn origin_inside_reports_only_the_exit() {
        let mut tree = Discs::new(8, 4);
        tree.insert(Item::new(7, Disc::new(Vec2::ZERO, 2.0)));
        let hits = tree.raycast(&Ray::new(Vec2::ZERO, Vec2::new(0.0, 1.0)), 10.0, 1e-6);
        assert_eq!(hits.len(), 1);
        assert!(close(hits[0].distance, 2.0));
    }

    #[test]
    fn tangent_hit_collapses() {
        let mut tree: DynamicTree<Sphere, Item<Sphere>> = DynamicTree::new(8, 4);
        tree.insert(Item::new(1, Sphere::new(DVec3::new(5.0, 1.0, 0.0), 1.0)));
        let ray = Ray::new(DVec3::ZERO, DVec3::X);
        let hits = tree.raycast(&ray, 10.0, 1e-3);
        assert_eq!(hits.len(), 1);
        assert!((hits[0].distance - 5.0).abs() < 1e-3);
    }

    #[test]
    fn misses_and_degenerate_rays_are_empty() {
        let mut tree = Boxes::new(8, 4);
        tree.insert(square(0, 0.0, 0.0));
        let away = Ray::new(Vec2::new(-1.0, 0.5), Vec2::new(-1.0, 0.0));
        assert!(tree.raycast(&away, 100.0, 1e-6).is_empty());
        let zero = Ray::new(Vec2::new(-1.0, 0.5), Vec2::ZERO);
        assert!(tree.raycast(&zero, 100.0, 1e-6).is_empty());
        let toward = Ray::new(Vec2::new(-1.0, 0.5), Vec2::new(1.0, 0.0));
        assert!(tree.raycast(&toward, -1.0, 1e-6).is_empty());
        assert!(tree.raycast(&toward, f64::NAN, 1e-6).is_empty());
    }

    #[test]
    fn custom_order_reverses_hits() {
        let mut tree = Boxes::new(32, 4);
        for x in 0..6 {
            tree.insert(square(x, f64::from(x) * 3.0, 0.0));
        }
        tree.refit();
        let ray = Ray::new(Vec2::new(-1.0, 0.5), Vec2::new(1.0, 0.0));
        let hits = tree.raycast_by(&ray, 100.0, 1e-6, |a, b| RayHit::by_distance(b, a));
        assert_eq!(hits.first().map(|h| h.id), Some(5));
        assert_eq!(hits.last().map(|h| h.id), Some(0));
    }
}
