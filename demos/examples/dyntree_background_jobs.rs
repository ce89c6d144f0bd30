// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Background jobs.
//!
//! Chain a refresh, an optimizer pass, and batched queries on the rayon pool with
//! [`SharedTree`](understory_dyntree::SharedTree).
//!
//! Run:
//! - `cargo run -p understory_examples --example dyntree_background_jobs`

use glam::DVec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use understory_dyntree::{BallStarTree3D, Item, QueryMode, Ray, SharedTree, Sphere};

fn main() {
    let mut rng = SmallRng::seed_from_u64(3);
    let mut spheres: Vec<Item<Sphere>> = (0..5_000)
        .map(|id| {
            let c = DVec3::new(
                rng.random_range(-500.0..500.0),
                rng.random_range(-500.0..500.0),
                rng.random_range(-500.0..500.0),
            );
            Item::new(id, Sphere::new(c, rng.random_range(0.5..4.0)))
        })
        .collect();

    let mut tree: BallStarTree3D = BallStarTree3D::new(spheres.len(), 16);
    for s in &spheres {
        tree.insert(*s);
    }
    let shared = SharedTree::new(tree);

    for s in &mut spheres {
        s.volume.center += DVec3::new(0.0, 0.0, 10.0);
    }
    let refresh = shared.schedule_update_all(spheres, None);
    let optimize = shared.schedule_optimize(64, 32, Some(&refresh.dependency()));
    let ready = optimize.dependency();

    let centers = vec![DVec3::ZERO, DVec3::splat(200.0), DVec3::splat(-200.0)];
    let radii = vec![100.0, 100.0, 100.0];
    let nearby = shared.schedule_query_radii(centers, radii, QueryMode::Overlapping, Some(&ready));
    let ray = Ray::new(DVec3::new(-600.0, 0.0, 0.0), DVec3::X);
    let hits = shared.schedule_raycast(ray, 1_200.0, 1e-9, Some(&ready));

    match nearby.complete() {
        Ok(ids) => println!("{} spheres near the probes", ids.len()),
        Err(e) => println!("radius job failed: {e}"),
    }
    match hits.complete() {
        Ok(hits) => {
            for hit in hits.iter().take(5) {
                println!("ray hit {} at {:.2}", hit.id, hit.distance);
            }
        }
        Err(e) => println!("raycast job failed: {e}"),
    }
    println!(
        "refresh done: {}, optimize done: {}",
        refresh.is_completed(),
        optimize.is_completed()
    );
    println!("tree valid: {:?}", shared.read().validate());
}
