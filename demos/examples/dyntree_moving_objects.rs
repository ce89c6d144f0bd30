// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Moving objects.
//!
//! Simulate discs drifting around a square world. Each frame refreshes the tree in one batch,
//! tightens it with a short optimizer pass every few frames, and counts close pairs.
//!
//! Run:
//! - `cargo run -p understory_examples --example dyntree_moving_objects`

use kurbo::Vec2;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use understory_dyntree::{BallStarTree2D, Disc, Item, QueryMode, TreeConfig};

const WORLD: f64 = 1_000.0;
const COUNT: u32 = 2_000;
const FRAMES: usize = 30;

fn main() {
    let mut rng = SmallRng::seed_from_u64(7);
    let mut discs: Vec<Item<Disc>> = (0..COUNT)
        .map(|id| {
            let c = Vec2::new(rng.random_range(0.0..WORLD), rng.random_range(0.0..WORLD));
            Item::new(id, Disc::new(c, rng.random_range(1.0..6.0)))
        })
        .collect();
    let velocities: Vec<Vec2> = (0..COUNT)
        .map(|_| Vec2::new(rng.random_range(-3.0..3.0), rng.random_range(-3.0..3.0)))
        .collect();

    let config = TreeConfig::new(COUNT as usize, 12).with_seed(42);
    let mut tree: BallStarTree2D = BallStarTree2D::with_config(config);
    for d in &discs {
        tree.insert(*d);
    }

    for frame in 0..FRAMES {
        for (d, v) in discs.iter_mut().zip(&velocities) {
            let mut c = d.volume.center + *v;
            c.x = c.x.rem_euclid(WORLD);
            c.y = c.y.rem_euclid(WORLD);
            d.volume.center = c;
        }
        tree.update_all(&discs);
        if frame % 5 == 4 {
            tree.optimize(64, 32);
        }

        let mut contacts = 0_usize;
        for d in &discs {
            let reach = d.volume.radius() + 6.0;
            contacts += tree
                .query_radius(d.volume.center, reach, QueryMode::Overlapping)
                .into_iter()
                .filter(|&other| other > d.id)
                .count();
        }
        println!(
            "frame {frame:2}: {contacts} candidate pairs, {} leaves, depth {}",
            tree.leaf_count(),
            tree.depth()
        );
    }

    let probes: Vec<Vec2> = (0..16)
        .map(|i| Vec2::new(f64::from(i % 4) * 250.0 + 125.0, f64::from(i / 4) * 250.0 + 125.0))
        .collect();
    let hits = tree.query_radii(&probes, &[40.0; 16], QueryMode::Contained);
    println!("{} discs fully inside the probe circles", hits.len());
}
