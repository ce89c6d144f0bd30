// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Background jobs on the rayon pool, with completion handles and dependencies.
//!
//! A job can wait on a [`Dependency`] of an earlier job. Waiting never parks a pool thread: a
//! dependent job is only handed to rayon once its dependency has finished.
//!
//! [`SharedTree`] runs the tree's bulk operations as jobs. It guards the tree with a
//! read-write lock, so queries run side by side while a refresh or an optimizer pass has the
//! tree to itself. No lock is held across a rayon join: batched queries lock once per region,
//! which keeps an unchained writer on the same pool from deadlocking against them. Chain jobs
//! through dependencies when their order matters.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crossbeam_channel::Receiver;
use hashbrown::HashSet;
use parking_lot::{Condvar, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

use crate::query::{QueryMode, RadiusRegion, Region, par_union, radius_regions};
use crate::tree::DynamicTree;
use crate::types::{Element, ElementId, Ray, RayHit};
use crate::volume::BoundingVolume;

/// A job finished without producing a value.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum JobError {
    /// The job panicked.
    #[error("job panicked before producing a result")]
    Panicked,
}

type Continuation = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct State {
    done: bool,
    waiters: Vec<Continuation>,
}

#[derive(Default)]
struct Completion {
    state: Mutex<State>,
    finished: Condvar,
}

/// Cloneable token that flips once when its job finishes, whether it succeeded or panicked.
#[derive(Clone, Default)]
pub struct Dependency {
    inner: Arc<Completion>,
}

impl core::fmt::Debug for Dependency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Dependency")
            .field("done", &self.is_completed())
            .finish_non_exhaustive()
    }
}

impl Dependency {
    /// Whether the job has finished.
    pub fn is_completed(&self) -> bool {
        self.inner.state.lock().done
    }

    /// Block the calling thread until the job has finished.
    ///
    /// Do not call this from inside a job; chain the job through a dependency instead.
    pub fn wait(&self) {
        let mut state = self.inner.state.lock();
        while !state.done {
            self.inner.finished.wait(&mut state);
        }
    }

    /// Run `f` once the job has finished, immediately if it already has.
    fn then(&self, f: Continuation) {
        let mut state = self.inner.state.lock();
        if state.done {
            drop(state);
            f();
        } else {
            state.waiters.push(f);
        }
    }

    fn finish(&self) {
        let waiters = {
            let mut state = self.inner.state.lock();
            state.done = true;
            core::mem::take(&mut state.waiters)
        };
        self.inner.finished.notify_all();
        for waiter in waiters {
            waiter();
        }
    }
}

/// Handle to a job's result.
#[derive(Debug)]
pub struct JobHandle<T> {
    result: Receiver<T>,
    done: Dependency,
}

impl<T> JobHandle<T> {
    /// Block until the job finishes and take its result.
    pub fn complete(self) -> Result<T, JobError> {
        self.result.recv().map_err(|_| JobError::Panicked)
    }

    /// Whether the job has finished.
    pub fn is_completed(&self) -> bool {
        self.done.is_completed()
    }

    /// Token other jobs can wait on.
    pub fn dependency(&self) -> Dependency {
        self.done.clone()
    }
}

/// Run `work` on the rayon pool once `after` (if any) has finished.
pub fn spawn<T, F>(after: Option<&Dependency>, work: F) -> JobHandle<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (sender, result) = crossbeam_channel::bounded(1);
    let done = Dependency::default();
    let finished = done.clone();
    let start = move || {
        rayon::spawn(move || {
            match catch_unwind(AssertUnwindSafe(work)) {
                Ok(value) => {
                    // The handle may have been dropped.
                    let _ = sender.send(value);
                }
                Err(_) => {
                    log::warn!("background job panicked");
                    drop(sender);
                }
            }
            finished.finish();
        });
    };
    match after {
        Some(dependency) => dependency.then(Box::new(start)),
        None => start(),
    }
    JobHandle { result, done }
}

/// A [`DynamicTree`] shared between the caller and background jobs.
pub struct SharedTree<V: BoundingVolume, E: Element<V>> {
    tree: Arc<RwLock<DynamicTree<V, E>>>,
}

impl<V: BoundingVolume, E: Element<V>> Clone for SharedTree<V, E> {
    fn clone(&self) -> Self {
        Self {
            tree: Arc::clone(&self.tree),
        }
    }
}

impl<V: BoundingVolume, E: Element<V>> core::fmt::Debug for SharedTree<V, E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SharedTree").finish_non_exhaustive()
    }
}

impl<V, E> From<DynamicTree<V, E>> for SharedTree<V, E>
where
    V: BoundingVolume,
    E: Element<V> + Send + Sync + 'static,
{
    fn from(tree: DynamicTree<V, E>) -> Self {
        Self::new(tree)
    }
}

impl<V, E> SharedTree<V, E>
where
    V: BoundingVolume,
    E: Element<V> + Send + Sync + 'static,
{
    /// Share `tree`.
    pub fn new(tree: DynamicTree<V, E>) -> Self {
        Self {
            tree: Arc::new(RwLock::new(tree)),
        }
    }

    /// Lock the tree for reading, waiting for running writers.
    pub fn read(&self) -> RwLockReadGuard<'_, DynamicTree<V, E>> {
        self.tree.read()
    }

    /// Lock the tree for writing, waiting for running jobs.
    pub fn write(&self) -> RwLockWriteGuard<'_, DynamicTree<V, E>> {
        self.tree.write()
    }

    /// Run [`DynamicTree::update_all`] as a job.
    pub fn schedule_update_all(&self, batch: Vec<E>, after: Option<&Dependency>) -> JobHandle<()> {
        let tree = Arc::clone(&self.tree);
        spawn(after, move || {
            tree.write().update_all(&batch);
        })
    }

    /// Run [`DynamicTree::optimize`] as a single job.
    pub fn schedule_optimize(
        &self,
        leaf_swaps: usize,
        grandchild_iterations: usize,
        after: Option<&Dependency>,
    ) -> JobHandle<()> {
        let tree = Arc::clone(&self.tree);
        spawn(after, move || {
            tree.write().optimize(leaf_swaps, grandchild_iterations);
        })
    }

    /// Run [`DynamicTree::query_radii`] as a job.
    ///
    /// Each region's traversal takes its own read lock, so a writer scheduled without a
    /// dependency may land between two traversals of the batch.
    pub fn schedule_query_radii(
        &self,
        centers: Vec<V::Point>,
        radii: Vec<f64>,
        mode: QueryMode,
        after: Option<&Dependency>,
    ) -> JobHandle<HashSet<ElementId>>
    where
        RadiusRegion<V::Point>: Region<V>,
    {
        let tree = Arc::clone(&self.tree);
        spawn(after, move || {
            let regions = radius_regions(&centers, &radii);
            par_union(&regions, |region, hits| {
                tree.read().query_into(region, mode, hits);
            })
        })
    }

    /// Run [`DynamicTree::query_regions`] as a job, locking per traversal like
    /// [`schedule_query_radii`](Self::schedule_query_radii).
    pub fn schedule_query_regions(
        &self,
        volumes: Vec<V>,
        mode: QueryMode,
        after: Option<&Dependency>,
    ) -> JobHandle<HashSet<ElementId>>
    where
        V: Region<V>,
    {
        let tree = Arc::clone(&self.tree);
        spawn(after, move || {
            par_union(&volumes, |volume, hits| {
                tree.read().query_into(volume, mode, hits);
            })
        })
    }

    /// Run [`DynamicTree::raycast`] as a job.
    pub fn schedule_raycast(
        &self,
        ray: Ray<V::Point>,
        max_distance: f64,
        epsilon: f64,
        after: Option<&Dependency>,
    ) -> JobHandle<Vec<RayHit<V::Point>>> {
        let tree = Arc::clone(&self.tree);
        spawn(after, move || {
            let tree = tree.read();
            tree.raycast(&ray, max_distance, epsilon)
        })
    }
}
