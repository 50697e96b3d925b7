// SPDX-License-Identifier: AGPL-3.0-or-later
// ConeTree - Pattern-Tree Adjacency Search
// Copyright (C) 2026 Sushanth Reddy Vanagala (https://github.com/sushanthpy)

//! # Engine Configuration
//!
//! One [`AdjacencyConfig`] drives both tree construction (node shape, leaf
//! size, selective-bit order) and traversal (thread budget, concurrency
//! strategy). The strategy is fixed when the traverser is created, never per
//! call.
//!
//! The required zero-bit count is deliberately *not* part of the config: it
//! comes from the rank computation of the enclosing algorithm and is injected
//! per iteration step as an [`AdjacencyThreshold`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConeTreeError, Result};

/// Default number of top recursion levels pre-expanded into the job queue.
pub const DEFAULT_MAX_LEVEL_DEPTH: usize = 6;

/// Default random pair samples per bit for the selective-bit order.
pub const DEFAULT_SAMPLES_PER_BIT: usize = 1024;

/// Default soft cap factor of the barrier pool queue (jobs per thread).
pub const DEFAULT_QUEUE_FACTOR: usize = 64;

/// Minimum number of zero bits an adjacent pair must share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjacencyThreshold {
    required_zero_bits: usize,
}

impl AdjacencyThreshold {
    pub fn new(required_zero_bits: usize) -> Self {
        Self { required_zero_bits }
    }

    #[inline]
    pub fn required_zero_bits(&self) -> usize {
        self.required_zero_bits
    }

    /// Does a shared zero set of `count` bits still allow adjacency?
    #[inline]
    pub fn is_met_by(&self, count: usize) -> bool {
        count >= self.required_zero_bits
    }
}

/// How a job-queue worker gives its permit back once the queue is drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReleasePolicy {
    /// Release as soon as the queue is observed empty.
    Immediate,
    /// Hold the permit until at least half of the worker cohort is done.
    WaitHalfDone,
    /// Hold the permit for at most this long while the cohort finishes.
    Timeout(Duration),
}

/// Concurrency strategy of a traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConcurrencyStrategy {
    /// Single-threaded recursion.
    Sequential,
    /// Fork a thread per binary branch whenever a permit is free.
    IncrementalFork,
    /// Pre-expand the top levels into a job queue drained by a thread cohort.
    JobQueue {
        max_level_depth: usize,
        release: ReleasePolicy,
    },
    /// Persistent worker pool sharing a bounded queue and a breakable barrier.
    BarrierPool { queue_factor: usize },
}

impl ConcurrencyStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            ConcurrencyStrategy::Sequential => "sequential",
            ConcurrencyStrategy::IncrementalFork => "incremental_fork",
            ConcurrencyStrategy::JobQueue { .. } => "job_queue",
            ConcurrencyStrategy::BarrierPool { .. } => "barrier_pool",
        }
    }
}

/// Shape of the internal tree nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeShape {
    /// Two children per internal node, one selective bit per level.
    Binary,
    /// Up to `2^bits_to_use` children per node; the budget halves per level.
    Wide { bits_to_use: usize },
}

/// Selective-bit order heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BitOrderStrategy {
    /// Identity order `0, 1, 2, ...`.
    Natural,
    /// Balance-sorted order from random ray-pair sampling.
    Sampled { samples_per_bit: usize, seed: u64 },
}

/// Configuration of tree construction and traversal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjacencyConfig {
    /// Thread budget, including the invoking thread.
    pub thread_count: usize,
    pub strategy: ConcurrencyStrategy,
    /// Rays per leaf before a range is split.
    pub max_leaf_size: usize,
    pub node_shape: NodeShape,
    pub bit_order: BitOrderStrategy,
    /// Magnitude at or below which a coordinate counts as zero.
    pub zero_tolerance: f64,
}

impl Default for AdjacencyConfig {
    fn default() -> Self {
        Self {
            thread_count: num_cpus::get().max(1),
            strategy: ConcurrencyStrategy::JobQueue {
                max_level_depth: DEFAULT_MAX_LEVEL_DEPTH,
                release: ReleasePolicy::Immediate,
            },
            max_leaf_size: 1,
            node_shape: NodeShape::Binary,
            bit_order: BitOrderStrategy::Sampled {
                samples_per_bit: DEFAULT_SAMPLES_PER_BIT,
                seed: 0x5eed_c0de,
            },
            zero_tolerance: 1e-10,
        }
    }
}

impl AdjacencyConfig {
    /// Single-threaded configuration.
    pub fn sequential() -> Self {
        Self {
            thread_count: 1,
            strategy: ConcurrencyStrategy::Sequential,
            ..Self::default()
        }
    }

    pub fn incremental_fork(thread_count: usize) -> Self {
        Self {
            thread_count,
            strategy: ConcurrencyStrategy::IncrementalFork,
            ..Self::default()
        }
    }

    pub fn job_queue(thread_count: usize, max_level_depth: usize, release: ReleasePolicy) -> Self {
        Self {
            thread_count,
            strategy: ConcurrencyStrategy::JobQueue {
                max_level_depth,
                release,
            },
            ..Self::default()
        }
    }

    pub fn barrier_pool(thread_count: usize) -> Self {
        Self {
            thread_count,
            strategy: ConcurrencyStrategy::BarrierPool {
                queue_factor: DEFAULT_QUEUE_FACTOR,
            },
            ..Self::default()
        }
    }

    pub fn with_node_shape(mut self, node_shape: NodeShape) -> Self {
        self.node_shape = node_shape;
        self
    }

    pub fn with_bit_order(mut self, bit_order: BitOrderStrategy) -> Self {
        self.bit_order = bit_order;
        self
    }

    pub fn with_max_leaf_size(mut self, max_leaf_size: usize) -> Self {
        self.max_leaf_size = max_leaf_size;
        self
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.thread_count == 0 {
            return Err(ConeTreeError::InvalidConfig(
                "thread_count must be at least 1".into(),
            ));
        }
        if self.max_leaf_size == 0 {
            return Err(ConeTreeError::InvalidConfig(
                "max_leaf_size must be at least 1".into(),
            ));
        }
        if let NodeShape::Wide { bits_to_use } = self.node_shape {
            if bits_to_use == 0 || bits_to_use > 16 {
                return Err(ConeTreeError::InvalidConfig(format!(
                    "wide nodes need 1..=16 bits per level, got {}",
                    bits_to_use
                )));
            }
        }
        if let BitOrderStrategy::Sampled { samples_per_bit, .. } = self.bit_order {
            if samples_per_bit == 0 {
                return Err(ConeTreeError::InvalidConfig(
                    "samples_per_bit must be at least 1".into(),
                ));
            }
        }
        if let ConcurrencyStrategy::BarrierPool { queue_factor } = self.strategy {
            if queue_factor == 0 {
                return Err(ConeTreeError::InvalidConfig(
                    "queue_factor must be at least 1".into(),
                ));
            }
        }
        if !(self.zero_tolerance >= 0.0) {
            return Err(ConeTreeError::InvalidConfig(format!(
                "zero_tolerance must be non-negative, got {}",
                self.zero_tolerance
            )));
        }
        Ok(())
    }
}
