// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dynamic tree basics.
//!
//! Insert boxes, refresh bounds, and run region, radius, polygon, ray, and nearest queries.
//!
//! Run:
//! - `cargo run -p understory_examples --example dyntree_basics`

use kurbo::{Affine, Point, Vec2};
use understory_dyntree::{Aabb2, Item, Polygon, QueryMode, RStarTree2D, Ray};

fn main() {
    // A 10x10 grid of unit boxes, two units apart.
    let mut tree: RStarTree2D = RStarTree2D::new(128, 8);
    for y in 0..10_u32 {
        for x in 0..10_u32 {
            let min = Vec2::new(f64::from(x) * 2.0, f64::from(y) * 2.0);
            tree.insert(Item::new(y * 10 + x, Aabb2::new(min, min + Vec2::new(1.0, 1.0))));
        }
    }
    // Inserts only grow leaves; refresh before querying.
    tree.update_all(&[]);
    println!(
        "{} elements in {} leaves, depth {}",
        tree.count(),
        tree.leaf_count(),
        tree.depth()
    );

    let view = Aabb2::new(Vec2::new(-0.5, -0.5), Vec2::new(5.5, 3.5));
    let mut inside = tree.query_region(&view, QueryMode::Contained);
    inside.sort_unstable();
    let mut touching = tree.query_region(&view, QueryMode::Overlapping);
    touching.sort_unstable();
    println!("contained in view: {inside:?}");
    println!("overlapping view: {touching:?}");

    let mut near = tree.query_radius(Vec2::new(9.5, 9.5), 2.5, QueryMode::Overlapping);
    near.sort_unstable();
    println!("within 2.5 of (9.5, 9.5): {near:?}");

    let triangle = Polygon::new([
        Point::new(0.0, 0.0),
        Point::new(6.0, 0.0),
        Point::new(0.0, 6.0),
    ]);
    let placed = Affine::translate((4.0, 4.0));
    let mut under = tree.query_polygon(&triangle, placed, QueryMode::Contained);
    under.sort_unstable();
    println!("inside the moved triangle: {under:?}");

    let ray = Ray::new(Vec2::new(-1.0, 0.5), Vec2::new(1.0, 0.0));
    for hit in tree.raycast(&ray, 7.0, 1e-9) {
        println!("ray hit {} at {:.1}", hit.id, hit.distance);
    }

    for n in tree.nearest(Vec2::new(7.2, 7.7), 3) {
        println!("neighbor {} at squared distance {:.2}", n.id, n.distance_squared);
    }

    if let Some(leaf) = tree.leaf_of(55) {
        println!("element 55 lives in {leaf:?} with {:?}", tree.leaf_members(leaf));
    }
    match tree.validate() {
        Ok(()) => println!("invariants hold"),
        Err(e) => println!("invariant broken: {e}"),
    }
}
