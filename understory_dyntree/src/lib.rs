// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Dyntree: self-balancing binary trees for moving objects.
//!
//! Understory Dyntree indexes thousands of movable, identifiable boxes or balls and answers
//! containment, overlap, ray, and nearest-neighbor queries between simulation steps.
//!
//! - Insert, remove, and update elements by id; leaves split and merge on their own.
//! - Refresh ancestor bounds in one batched pass after moving many elements with
//!   [`DynamicTree::update_all`].
//! - Tighten the tree with a seeded, randomized [`DynamicTree::optimize`] pass.
//! - Query by box, ball, circle, sphere, or 2D polygon, strictly contained or overlapping, one
//!   region at a time or batched across the rayon pool.
//!
//! One tree implementation serves every flavor. The bounding-volume type picks it:
//! [`Aabb`] gives an R*-style tree and [`Ball`] a Ball*-style tree, in 2D
//! ([`kurbo::Vec2`]) or 3D ([`glam::DVec3`]).
//!
//! # Example
//!
//! ```rust
//! use kurbo::Vec2;
//! use understory_dyntree::{Aabb2, Item, QueryMode, RStarTree2D};
//!
//! let mut tree: RStarTree2D = RStarTree2D::new(64, 8);
//! for i in 0..20_u32 {
//!     let x = f64::from(i) * 2.0;
//!     tree.insert(Item::new(i, Aabb2::new(Vec2::new(x, 0.0), Vec2::new(x + 1.0, 1.0))));
//! }
//! // Inserts leave ancestor bounds stale until the next refresh.
//! tree.update_all(&[]);
//!
//! let view = Aabb2::new(Vec2::new(-1.0, -1.0), Vec2::new(6.5, 2.0));
//! let mut hits = tree.query_region(&view, QueryMode::Contained);
//! hits.sort_unstable();
//! assert_eq!(hits, [0, 1, 2]);
//! ```
//!
//! ## Bound freshness
//!
//! [`DynamicTree::insert`] only grows the leaf it lands in. Ancestor bounds catch up on the next
//! [`DynamicTree::update_all`], [`DynamicTree::optimize`], or [`DynamicTree::refit`], and queries
//! issued before that can miss recently inserted elements. [`DynamicTree::update`] walks up from
//! the moved element's leaf until a bound stops changing.
//!
//! ## Background jobs
//!
//! The [`jobs`] module runs bulk refreshes, optimizer passes and batched queries on the rayon
//! pool through [`SharedTree`], with completion handles that can be chained. Because of that
//! runtime the crate needs `std`; the `std` and `libm` features only select Kurbo's float math.
//!
//! ### Float semantics
//!
//! Coordinates are `f64` and assumed finite. Ordering of hits and neighbors uses
//! [`f64::total_cmp`].

mod bucket;
mod config;
pub mod jobs;
mod leaves;
mod node;
mod query;
mod tree;
mod types;
pub mod volume;

pub use bucket::BUCKET_CAPACITY;
pub use config::{ConfigError, DEFAULT_MAX_CHILDREN, MIN_MAX_CHILDREN, TreeConfig};
pub use jobs::{Dependency, JobError, JobHandle, SharedTree};
pub use node::{Node, NodeIdx};
pub use query::{Neighbor, Polygon, PolygonRegion, QueryMode, RadiusRegion, Region};
pub use tree::{
    DEFAULT_GRANDCHILD_ITERATIONS, DEFAULT_LEAF_SWAPS, DynamicTree, InvariantViolation,
};
pub use types::{Element, ElementId, Item, Ray, RayHit, Vector};
pub use volume::{Aabb, Aabb2, Aabb3, Ball, BoundingVolume, Disc, Sphere};

/// 2D R*-style tree over boxes.
pub type RStarTree2D<E = Item<Aabb2>> = DynamicTree<Aabb2, E>;
/// 3D R*-style tree over boxes.
pub type RStarTree3D<E = Item<Aabb3>> = DynamicTree<Aabb3, E>;
/// 2D Ball*-style tree over discs.
pub type BallStarTree2D<E = Item<Disc>> = DynamicTree<Disc, E>;
/// 3D Ball*-style tree over spheres.
pub type BallStarTree3D<E = Item<Sphere>> = DynamicTree<Sphere, E>;
