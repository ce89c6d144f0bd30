// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree construction parameters.

use thiserror::Error;

use crate::bucket::BUCKET_CAPACITY;

/// Default leaf capacity.
pub const DEFAULT_MAX_CHILDREN: usize = 16;

/// Smallest usable leaf capacity: a split must leave something on both sides.
pub const MIN_MAX_CHILDREN: usize = 2;

/// Construction parameters for a [`DynamicTree`](crate::DynamicTree).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TreeConfig {
    /// Number of elements to reserve storage for.
    pub initial_capacity: usize,
    /// Most elements a leaf holds before it splits.
    pub max_children: usize,
    /// Seed of the optimizer's random stream.
    pub seed: u64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 64,
            max_children: DEFAULT_MAX_CHILDREN,
            seed: 0x5eed_1e55_ba11_7ee5,
        }
    }
}

/// A construction parameter that was out of range.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `max_children` was below [`MIN_MAX_CHILDREN`].
    #[error("max_children {0} is below the minimum of {min}", min = MIN_MAX_CHILDREN)]
    MaxChildrenTooSmall(usize),
    /// `max_children` exceeded the inline bucket capacity.
    #[error("max_children {0} exceeds the bucket capacity of {cap}", cap = BUCKET_CAPACITY)]
    MaxChildrenTooLarge(usize),
    /// `initial_capacity` was zero.
    #[error("initial_capacity must be non-zero")]
    ZeroCapacity,
}

impl TreeConfig {
    /// Config with the given capacity and leaf size, default seed.
    pub fn new(initial_capacity: usize, max_children: usize) -> Self {
        Self {
            initial_capacity,
            max_children,
            ..Self::default()
        }
    }

    /// Replace the optimizer seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check every parameter, reporting the first one out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_children < MIN_MAX_CHILDREN {
            return Err(ConfigError::MaxChildrenTooSmall(self.max_children));
        }
        if self.max_children > BUCKET_CAPACITY {
            return Err(ConfigError::MaxChildrenTooLarge(self.max_children));
        }
        if self.initial_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(())
    }

    /// Clamp every parameter into range, logging each correction.
    ///
    /// Construction never fails; a bad config degrades to the nearest usable one.
    pub fn sanitized(mut self) -> Self {
        while let Err(err) = self.validate() {
            log::warn!("invalid tree config: {err}; clamping");
            match err {
                ConfigError::MaxChildrenTooSmall(_) => self.max_children = MIN_MAX_CHILDREN,
                ConfigError::MaxChildrenTooLarge(_) => self.max_children = BUCKET_CAPACITY,
                ConfigError::ZeroCapacity => self.initial_capacity = 1,
            }
        }
        self
    }
}
