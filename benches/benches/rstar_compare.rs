// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![cfg(feature = "compare_rstar")]

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use kurbo::Vec2;
use rstar::primitives::Rectangle;
use rstar::{AABB, RTree};
use understory_dyntree::{Aabb2, Item, QueryMode, RStarTree2D};

fn gen_grid_boxes(n: u32, cell: f64) -> Vec<Item<Aabb2>> {
    let mut out = Vec::new();
    for y in 0..n {
        for x in 0..n {
            let min = Vec2::new(f64::from(x) * cell, f64::from(y) * cell);
            out.push(Item::new(y * n + x, Aabb2::new(min, min + Vec2::new(cell, cell))));
        }
    }
    out
}

fn to_rstar_rects(items: &[Item<Aabb2>]) -> Vec<Rectangle<[f64; 2]>> {
    items
        .iter()
        .map(|i| {
            let (min, max) = (i.volume.min, i.volume.max);
            Rectangle::from_corners([min.x, min.y], [max.x, max.y])
        })
        .collect()
}

fn bench_rstar_compare(c: &mut Criterion) {
    let mut group = c.benchmark_group("rstar_compare");
    for &n in &[64_u32, 128] {
        let items = gen_grid_boxes(n, 10.0);
        let query = Aabb2::new(Vec2::new(100.0, 100.0), Vec2::new(500.0, 500.0));
        group.throughput(Throughput::Elements(u64::from(n * n)));

        group.bench_function(format!("dyntree_build_query_n{n}"), |b| {
            b.iter(|| {
                let mut tree: RStarTree2D = RStarTree2D::new(items.len(), 16);
                for item in &items {
                    tree.insert(*item);
                }
                tree.update_all(&[]);
                black_box(tree.query_region(&query, QueryMode::Overlapping).len())
            });
        });

        group.bench_function(format!("rstar_build_query_n{n}"), |b| {
            b.iter_batched(
                || to_rstar_rects(&items),
                |rects| {
                    let mut tree = RTree::new();
                    for r in rects {
                        tree.insert(r);
                    }
                    let aabb = AABB::from_corners([100.0, 100.0], [500.0, 500.0]);
                    black_box(tree.locate_in_envelope_intersecting(&aabb).count())
                },
                BatchSize::SmallInput,
            );
        });

        let mut tree: RStarTree2D = RStarTree2D::new(items.len(), 16);
        for item in &items {
            tree.insert(*item);
        }
        tree.optimize(64, 32);
        let rtree = RTree::bulk_load(to_rstar_rects(&items));
        group.bench_function(format!("dyntree_query_n{n}"), |b| {
            b.iter(|| black_box(tree.query_region(&query, QueryMode::Overlapping).len()));
        });
        group.bench_function(format!("rstar_query_n{n}"), |b| {
            let aabb = AABB::from_corners([100.0, 100.0], [500.0, 500.0]);
            b.iter(|| black_box(rtree.locate_in_envelope_intersecting(&aabb).count()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_rstar_compare);
criterion_main!(benches);
