// SPDX-License-Identifier: AGPL-3.0-or-later
// ConeTree - Pattern-Tree Adjacency Search
// Copyright (C) 2026 Sushanth Reddy Vanagala (https://github.com/sushanthpy)

//! Shared types, ray generators and latency recording for conetree-bench.

pub mod report;
pub mod workloads;

use hdrhistogram::Histogram;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::time::{Duration, Instant};

use conetree_core::{AdjacencyConfig, BitSet, ConeTreeError, RayStores, VecColumnStore};

// ────────────────────────────────────────────────────────────────────────────────
// Error type
// ────────────────────────────────────────────────────────────────────────────────

pub type BenchResult<T> = std::result::Result<T, BenchError>;

#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Search error: {0}")]
    Search(#[from] ConeTreeError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Config error: {0}")]
    Config(String),
}

// ────────────────────────────────────────────────────────────────────────────────
// Ray generator (deterministic via ChaCha8Rng)
// ────────────────────────────────────────────────────────────────────────────────

/// How zero patterns are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum PatternModel {
    /// Every bit independently set with probability `density`.
    Uniform { density: f64 },
    /// Rays perturb one of `prototypes` random patterns by flipping each bit
    /// with probability `noise`; closer to the facet structure of real cones.
    Clustered { prototypes: usize, density: f64, noise: f64 },
    /// Dense coordinates; an entry falls within the zero tolerance with
    /// probability `density`, and patterns are derived from the values.
    Coordinates { density: f64 },
}

pub struct DataGen {
    rng: ChaCha8Rng,
    zero_tolerance: f64,
}

impl DataGen {
    pub const POSITIVE_FIRST_ID: u64 = 0;
    pub const NEGATIVE_FIRST_ID: u64 = 1 << 32;
    pub const ZERO_FIRST_ID: u64 = 2 << 32;

    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            zero_tolerance: AdjacencyConfig::default().zero_tolerance,
        }
    }

    /// Tolerance used to derive patterns from [`PatternModel::Coordinates`].
    pub fn with_zero_tolerance(mut self, zero_tolerance: f64) -> Self {
        self.zero_tolerance = zero_tolerance;
        self
    }

    /// `width` coordinates, each near zero with probability `density`.
    pub fn coordinates(&mut self, width: usize, density: f64) -> Vec<f64> {
        // NaN tolerances collapse to exact zeros.
        let tol = self.zero_tolerance.max(0.0);
        (0..width)
            .map(|_| {
                if self.rng.gen_bool(density) {
                    self.rng.gen_range(-tol..=tol)
                } else {
                    let magnitude = self.rng.gen_range(0.5..2.0);
                    if self.rng.gen_bool(0.5) {
                        magnitude
                    } else {
                        -magnitude
                    }
                }
            })
            .collect()
    }

    /// Uniform random pattern of `width` bits.
    pub fn uniform_pattern(&mut self, width: usize, density: f64) -> BitSet {
        let rng = &mut self.rng;
        BitSet::from_iter(width, (0..width).filter(|_| rng.gen_bool(density)))
    }

    /// `count` patterns drawn from `model`.
    pub fn patterns(&mut self, model: PatternModel, width: usize, count: usize) -> Vec<BitSet> {
        match model {
            PatternModel::Uniform { density } => {
                (0..count).map(|_| self.uniform_pattern(width, density)).collect()
            }
            PatternModel::Clustered {
                prototypes,
                density,
                noise,
            } => {
                let protos: Vec<BitSet> = (0..prototypes.max(1))
                    .map(|_| self.uniform_pattern(width, density))
                    .collect();
                (0..count)
                    .map(|_| {
                        let proto = &protos[self.rng.gen_range(0..protos.len())];
                        let rng = &mut self.rng;
                        BitSet::from_iter(
                            width,
                            (0..width).filter(|&bit| proto.contains(bit) != rng.gen_bool(noise)),
                        )
                    })
                    .collect()
            }
            PatternModel::Coordinates { .. } => self
                .store(model, 0, width, count)
                .columns()
                .iter()
                .map(|c| c.zero_pattern().clone())
                .collect(),
        }
    }

    /// One store of `count` rays drawn from `model`, ids from `first_id`.
    pub fn store(
        &mut self,
        model: PatternModel,
        first_id: u64,
        width: usize,
        count: usize,
    ) -> VecColumnStore {
        match model {
            PatternModel::Coordinates { density } => {
                let rows: Vec<Vec<f64>> =
                    (0..count).map(|_| self.coordinates(width, density)).collect();
                VecColumnStore::from_values(first_id, rows, self.zero_tolerance)
            }
            _ => VecColumnStore::from_patterns(first_id, self.patterns(model, width, count)),
        }
    }

    /// Positive, negative and zero stores of one synthetic iteration step.
    pub fn ray_stores(
        &mut self,
        model: PatternModel,
        width: usize,
        positive: usize,
        negative: usize,
        zero: usize,
    ) -> RayStores<VecColumnStore> {
        RayStores::new(
            self.store(model, Self::POSITIVE_FIRST_ID, width, positive),
            self.store(model, Self::NEGATIVE_FIRST_ID, width, negative),
            self.store(model, Self::ZERO_FIRST_ID, width, zero),
        )
    }
}

// ────────────────────────────────────────────────────────────────────────────────
// Latency recorder (HDR histogram)
// ────────────────────────────────────────────────────────────────────────────────

pub struct LatencyRecorder {
    hist: Histogram<u64>,
    total: Duration,
    runs: u64,
}

impl LatencyRecorder {
    pub fn new() -> BenchResult<Self> {
        let hist = Histogram::<u64>::new_with_bounds(1, 600_000_000_000, 3)
            .map_err(|e| BenchError::Config(format!("histogram bounds: {}", e)))?;
        Ok(Self {
            hist,
            total: Duration::ZERO,
            runs: 0,
        })
    }

    #[inline(always)]
    pub fn start(&self) -> Instant {
        Instant::now()
    }

    #[inline(always)]
    pub fn record(&mut self, start: Instant) {
        self.record_elapsed(start.elapsed());
    }

    pub fn record_elapsed(&mut self, elapsed: Duration) {
        let _ = self.hist.record((elapsed.as_nanos() as u64).max(1));
        self.total += elapsed;
        self.runs += 1;
    }

    pub fn runs(&self) -> u64 {
        self.runs
    }

    pub fn total_secs(&self) -> f64 {
        self.total.as_secs_f64()
    }

    /// Percentile in milliseconds.
    pub fn percentile_ms(&self, p: f64) -> f64 {
        self.hist.value_at_percentile(p) as f64 / 1_000_000.0
    }

    pub fn mean_ms(&self) -> f64 {
        self.hist.mean() / 1_000_000.0
    }
}

// ────────────────────────────────────────────────────────────────────────────────
// Benchmark output types
// ────────────────────────────────────────────────────────────────────────────────

/// Timing and counters of one strategy over repeated traversals.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyResult {
    pub label: String,
    pub strategy: String,
    pub threads: usize,
    pub runs: u64,
    pub total_secs: f64,
    pub p50_ms: f64,
    pub p99_ms: f64,
    pub mean_ms: f64,
    pub pairs: u64,
    pub leaf_pairs: u64,
    pub prune_ratio: f64,
    pub threads_spawned: u64,
    pub jobs_queued: u64,
    pub barrier_breaks: u64,
}

impl StrategyResult {
    pub fn from_recorder(
        label: &str,
        report: &conetree_search::TraversalReport,
        rec: &LatencyRecorder,
    ) -> Self {
        let stats = &report.stats;
        Self {
            label: label.to_string(),
            strategy: report.strategy.to_string(),
            threads: report.thread_count,
            runs: rec.runs(),
            total_secs: rec.total_secs(),
            p50_ms: rec.percentile_ms(50.0),
            p99_ms: rec.percentile_ms(99.0),
            mean_ms: rec.mean_ms(),
            pairs: stats.pairs_emitted,
            leaf_pairs: stats.leaf_pairs,
            prune_ratio: stats.prune_ratio(),
            threads_spawned: stats.threads_spawned,
            jobs_queued: stats.jobs_queued,
            barrier_breaks: stats.barrier_breaks,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchSuite {
    pub system_info: SystemInfo,
    pub workload: workloads::WorkloadConfig,
    pub results: Vec<StrategyResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    pub os: String,
    pub arch: String,
    pub cpus: usize,
}

impl SystemInfo {
    pub fn collect() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            cpus: std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(1),
        }
    }
}
