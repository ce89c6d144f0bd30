// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use glam::DVec3;
use kurbo::Vec2;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use understory_dyntree::{
    Aabb2, BallStarTree2D, BallStarTree3D, Disc, Item, QueryMode, RStarTree2D, Ray, Sphere,
};

const WORLD: f64 = 10_000.0;

fn gen_boxes(n: u32, seed: u64) -> Vec<Item<Aabb2>> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..n)
        .map(|id| {
            let x = rng.random_range(0.0..WORLD);
            let y = rng.random_range(0.0..WORLD);
            let w = rng.random_range(1.0..40.0);
            let h = rng.random_range(1.0..40.0);
            Item::new(id, Aabb2::new(Vec2::new(x, y), Vec2::new(x + w, y + h)))
        })
        .collect()
}

fn gen_discs(n: u32, seed: u64) -> Vec<Item<Disc>> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..n)
        .map(|id| {
            let c = Vec2::new(rng.random_range(0.0..WORLD), rng.random_range(0.0..WORLD));
            Item::new(id, Disc::new(c, rng.random_range(1.0..20.0)))
        })
        .collect()
}

fn gen_spheres(n: u32, seed: u64) -> Vec<Item<Sphere>> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..n)
        .map(|id| {
            let c = DVec3::new(
                rng.random_range(0.0..1000.0),
                rng.random_range(0.0..1000.0),
                rng.random_range(0.0..1000.0),
            );
            Item::new(id, Sphere::new(c, rng.random_range(0.5..8.0)))
        })
        .collect()
}

fn build_boxes(items: &[Item<Aabb2>]) -> RStarTree2D {
    let mut tree: RStarTree2D = RStarTree2D::new(items.len(), 16);
    for item in items {
        tree.insert(*item);
    }
    tree.update_all(&[]);
    tree
}

fn build_discs(items: &[Item<Disc>]) -> BallStarTree2D {
    let mut tree: BallStarTree2D = BallStarTree2D::new(items.len(), 16);
    for item in items {
        tree.insert(*item);
    }
    tree.update_all(&[]);
    tree
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    for &n in &[1_000_u32, 10_000] {
        let boxes = gen_boxes(n, 1);
        let discs = gen_discs(n, 2);
        let spheres = gen_spheres(n, 3);
        group.throughput(Throughput::Elements(u64::from(n)));

        group.bench_function(format!("rstar2d_insert_n{n}"), |b| {
            b.iter(|| black_box(build_boxes(&boxes)));
        });
        group.bench_function(format!("ball2d_insert_n{n}"), |b| {
            b.iter(|| black_box(build_discs(&discs)));
        });
        group.bench_function(format!("ball3d_insert_n{n}"), |b| {
            b.iter(|| {
                let mut tree: BallStarTree3D = BallStarTree3D::new(spheres.len(), 16);
                for s in &spheres {
                    tree.insert(*s);
                }
                black_box(tree)
            });
        });
    }
    group.finish();
}

fn bench_motion(c: &mut Criterion) {
    let mut group = c.benchmark_group("motion");
    for &n in &[1_000_u32, 10_000] {
        let boxes = gen_boxes(n, 4);
        let mut rng = SmallRng::seed_from_u64(5);
        let moved: Vec<Item<Aabb2>> = boxes
            .iter()
            .map(|item| {
                let d = Vec2::new(rng.random_range(-5.0..5.0), rng.random_range(-5.0..5.0));
                Item::new(item.id, Aabb2::new(item.volume.min + d, item.volume.max + d))
            })
            .collect();
        group.throughput(Throughput::Elements(u64::from(n)));

        group.bench_function(format!("update_all_n{n}"), |b| {
            b.iter_batched(
                || build_boxes(&boxes),
                |mut tree| {
                    tree.update_all(&moved);
                    black_box(tree)
                },
                BatchSize::LargeInput,
            );
        });
        group.bench_function(format!("update_each_n{n}"), |b| {
            b.iter_batched(
                || build_boxes(&boxes),
                |mut tree| {
                    for item in &moved {
                        tree.update(*item);
                    }
                    black_box(tree)
                },
                BatchSize::LargeInput,
            );
        });
        group.bench_function(format!("optimize_n{n}"), |b| {
            b.iter_batched(
                || build_boxes(&moved),
                |mut tree| {
                    tree.optimize(64, 32);
                    black_box(tree)
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("queries");
    let boxes = build_boxes(&gen_boxes(10_000, 6));
    let discs = build_discs(&gen_discs(10_000, 7));
    let view = Aabb2::new(Vec2::new(2_000.0, 2_000.0), Vec2::new(3_000.0, 3_000.0));
    let centers: Vec<Vec2> = (0..64)
        .map(|i| Vec2::new(f64::from(i % 8) * 1_200.0, f64::from(i / 8) * 1_200.0))
        .collect();
    let radii = vec![300.0; centers.len()];

    for mode in [QueryMode::Contained, QueryMode::Overlapping] {
        group.bench_function(format!("region_{mode:?}"), |b| {
            b.iter(|| black_box(boxes.query_region(&view, mode).len()));
        });
        group.bench_function(format!("radius_{mode:?}"), |b| {
            b.iter(|| black_box(discs.query_radius(Vec2::new(5_000.0, 5_000.0), 500.0, mode).len()));
        });
        group.bench_function(format!("radii_batched_{mode:?}"), |b| {
            b.iter(|| black_box(discs.query_radii(&centers, &radii, mode).len()));
        });
    }
    let ray = Ray::new(Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.7));
    group.bench_function("raycast", |b| {
        b.iter(|| black_box(boxes.raycast(&ray, WORLD * 2.0, 1e-9).len()));
    });
    group.bench_function("nearest_16", |b| {
        b.iter(|| black_box(discs.nearest(Vec2::new(4_321.0, 1_234.0), 16).len()));
    });
    group.finish();
}

criterion_group!(benches, bench_build, bench_motion, bench_queries);
criterion_main!(benches);
