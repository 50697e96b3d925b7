// SPDX-License-Identifier: AGPL-3.0-or-later
// ConeTree - Pattern-Tree Adjacency Search
// Copyright (C) 2026 Sushanth Reddy Vanagala (https://github.com/sushanthpy)

//! Strategy workloads: build the trees once, traverse them repeatedly.

use serde::Serialize;

use conetree_core::{
    AdjacencyConfig, AdjacencyThreshold, NodeShape, RayStores, ReleasePolicy, VecColumnStore,
};
use conetree_search::{PairSink, Root, Traverser};

use crate::{BenchError, BenchResult, DataGen, LatencyRecorder, PatternModel, StrategyResult};

/// Shape of the synthetic iteration step.
#[derive(Debug, Clone, Serialize)]
pub struct WorkloadConfig {
    pub width: usize,
    pub positive: usize,
    pub negative: usize,
    pub zero: usize,
    pub model: PatternModel,
    pub required_zero_bits: usize,
    pub repeats: usize,
    pub seed: u64,
}

impl WorkloadConfig {
    /// Rays of the step; coordinate models derive patterns with `zero_tolerance`.
    pub fn generate(&self, zero_tolerance: f64) -> RayStores<VecColumnStore> {
        DataGen::new(self.seed)
            .with_zero_tolerance(zero_tolerance)
            .ray_stores(
                self.model,
                self.width,
                self.positive,
                self.negative,
                self.zero,
            )
    }
}

/// One named configuration to compare.
#[derive(Debug, Clone)]
pub struct StrategyCase {
    pub label: String,
    pub config: AdjacencyConfig,
}

impl StrategyCase {
    pub fn new(label: impl Into<String>, config: AdjacencyConfig) -> Self {
        Self {
            label: label.into(),
            config,
        }
    }
}

/// The standard comparison matrix for `threads` threads.
pub fn strategy_matrix(threads: usize, max_level_depth: usize) -> Vec<StrategyCase> {
    vec![
        StrategyCase::new("sequential", AdjacencyConfig::sequential()),
        StrategyCase::new("fork", AdjacencyConfig::incremental_fork(threads)),
        StrategyCase::new(
            "jobq-immediate",
            AdjacencyConfig::job_queue(threads, max_level_depth, ReleasePolicy::Immediate),
        ),
        StrategyCase::new(
            "jobq-half",
            AdjacencyConfig::job_queue(threads, max_level_depth, ReleasePolicy::WaitHalfDone),
        ),
        StrategyCase::new("pool", AdjacencyConfig::barrier_pool(threads)),
        StrategyCase::new(
            "pool-wide3",
            AdjacencyConfig::barrier_pool(threads).with_node_shape(NodeShape::Wide { bits_to_use: 3 }),
        ),
    ]
}

/// Build once for `case`, then traverse `cfg.repeats` times.
pub fn run_case(cfg: &WorkloadConfig, case: &StrategyCase) -> BenchResult<StrategyResult> {
    if cfg.repeats == 0 {
        return Err(BenchError::Config("repeats must be at least 1".into()));
    }
    let mut stores = cfg.generate(case.config.zero_tolerance);
    let root = Root::build(
        &case.config,
        AdjacencyThreshold::new(cfg.required_zero_bits),
        &mut stores,
    )?;
    let traverser = Traverser::new(case.config.clone())?;

    let mut rec = LatencyRecorder::new()?;
    let mut last = None;
    let mut expected_pairs = None;
    for _ in 0..cfg.repeats {
        let sink = PairSink::new();
        let start = rec.start();
        let report = traverser.traverse(&root, &stores, &sink)?;
        rec.record(start);

        let found = sink.len();
        if *expected_pairs.get_or_insert(found) != found {
            return Err(BenchError::Config(format!(
                "{}: pair count changed between runs",
                case.label
            )));
        }
        last = Some(report);
    }

    let report = last.ok_or_else(|| BenchError::Config("no traversal ran".into()))?;
    tracing::debug!(
        case = %case.label,
        pairs = report.pairs_emitted(),
        p50_ms = rec.percentile_ms(50.0),
        "Strategy case finished"
    );
    Ok(StrategyResult::from_recorder(&case.label, &report, &rec))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> WorkloadConfig {
        WorkloadConfig {
            width: 20,
            positive: 60,
            negative: 60,
            zero: 4,
            model: PatternModel::Uniform { density: 0.5 },
            required_zero_bits: 6,
            repeats: 2,
            seed: 17,
        }
    }

    #[test]
    fn test_matrix_agrees_on_pair_count() {
        let cfg = small();
        let results: Vec<StrategyResult> = strategy_matrix(3, 4)
            .iter()
            .map(|case| run_case(&cfg, case).unwrap())
            .collect();
        let pairs = results[0].pairs;
        assert!(results.iter().all(|r| r.pairs == pairs));
        assert!(results.iter().all(|r| r.runs == 2));
    }

    #[test]
    fn test_coordinate_model_runs_every_strategy() {
        let mut cfg = small();
        cfg.model = PatternModel::Coordinates { density: 0.5 };
        cfg.repeats = 1;
        let results: Vec<StrategyResult> = strategy_matrix(2, 3)
            .iter()
            .map(|case| run_case(&cfg, case).unwrap())
            .collect();
        assert!(results.iter().all(|r| r.pairs == results[0].pairs));
    }

    #[test]
    fn test_zero_repeats_rejected() {
        let mut cfg = small();
        cfg.repeats = 0;
        let case = StrategyCase::new("sequential", AdjacencyConfig::sequential());
        assert!(matches!(run_case(&cfg, &case), Err(BenchError::Config(_))));
    }
}
