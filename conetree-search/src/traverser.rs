// SPDX-License-Identifier: AGPL-3.0-or-later
// ConeTree - Pattern-Tree Adjacency Search
// Copyright (C) 2026 Sushanth Reddy Vanagala (https://github.com/sushanthpy)

//! # Traverser
//!
//! Entry point of one adjacency search:
//!
//! 1. fresh [`ConcurrencyToken`] sized to the thread budget;
//! 2. take the invoking thread's own permit;
//! 3. run the configured scheduler from the positive root against the
//!    negative root inside a thread scope;
//! 4. give the permit back and wait for every spawned child;
//! 5. check that every successful enter was matched by a leave.
//!
//! Pairs land in the caller's [`PairSink`]; the returned
//! [`TraversalReport`] carries the counters.

use std::thread;
use std::time::Instant;

use conetree_core::{AdjacencyConfig, ColumnStore, ConeTreeError, RayStores, Result};

use crate::concurrency::{scheduler_for, ConcurrencyToken, Scheduler};
use crate::leaf::AdjacencyTest;
use crate::root::Root;
use crate::search::{AdjacencySearch, Walk};
use crate::sink::PairSink;
use crate::stats::TraversalReport;

/// Runs adjacency searches with one configuration.
#[derive(Debug, Clone)]
pub struct Traverser {
    config: AdjacencyConfig,
}

impl Traverser {
    pub fn new(config: AdjacencyConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AdjacencyConfig {
        &self.config
    }

    /// Combinatorial search: emit every adjacent (positive, negative) pair.
    pub fn traverse<S: ColumnStore>(
        &self,
        root: &Root,
        stores: &RayStores<S>,
        sink: &PairSink,
    ) -> Result<TraversalReport> {
        self.traverse_with(root, stores, sink, AdjacencyTest::Combinatorial)
    }

    /// Search with an explicit leaf test, e.g. a rank delegate.
    pub fn traverse_with<'t, S: ColumnStore>(
        &self,
        root: &'t Root,
        stores: &'t RayStores<S>,
        sink: &PairSink,
        test: AdjacencyTest<'_>,
    ) -> Result<TraversalReport> {
        let started = Instant::now();
        let token = ConcurrencyToken::new(self.config.thread_count);
        let scheduler: Box<dyn Scheduler<'t> + 't> = scheduler_for(&self.config);
        let positive = root.positive_tree();
        let negative = root.negative_tree();

        if positive.is_empty() || negative.is_empty() {
            tracing::debug!(
                positive = positive.ray_count(),
                negative = negative.ray_count(),
                "Empty side, nothing to search"
            );
        } else {
            token.acquire_initial()?;
            let search = AdjacencySearch::new(
                root,
                stores.view(),
                sink,
                &token,
                scheduler.as_ref(),
                test,
            );
            thread::scope(|scope| {
                let walk = Walk::new(&search, scope);
                let searched = scheduler.schedule(walk, positive, negative);
                let released = token.release(1);
                let joined = token.join_all();
                searched.and(released).and(joined)
            })?;
        }

        let stats = token.stats().snapshot();
        if stats.entered() != stats.leaves {
            return Err(ConeTreeError::InvariantViolation(format!(
                "{} successful enters but {} leaves",
                stats.entered(),
                stats.leaves
            )));
        }

        let report = TraversalReport {
            strategy: scheduler.name(),
            thread_count: self.config.thread_count,
            positive_rays: positive.ray_count(),
            negative_rays: negative.ray_count(),
            elapsed: started.elapsed(),
            stats,
        };
        tracing::info!(
            strategy = report.strategy,
            test = test.name(),
            threads = report.thread_count,
            required_zero_bits = root.threshold().required_zero_bits(),
            positive = report.positive_rays,
            negative = report.negative_rays,
            pairs = stats.pairs_emitted,
            pruned = stats.pruned,
            spawned = stats.threads_spawned,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Adjacency traversal complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::sink::AdjacentPair;
    use crate::testing::{self, RayGen};
    use conetree_core::{
        AdjacencyThreshold, BitOrderStrategy, BitSet, Column, NodeShape, ReleasePolicy,
        VecColumnStore,
    };

    fn store(first_id: u64, patterns: &[&str]) -> VecColumnStore {
        VecColumnStore::from_patterns(
            first_id,
            patterns.iter().map(|p| BitSet::from_bit_str(p).unwrap()),
        )
    }

    fn all_strategies(threads: usize) -> Vec<AdjacencyConfig> {
        vec![
            AdjacencyConfig::sequential(),
            AdjacencyConfig::incremental_fork(threads),
            AdjacencyConfig::job_queue(threads, 0, ReleasePolicy::Immediate),
            AdjacencyConfig::job_queue(threads, 3, ReleasePolicy::WaitHalfDone),
            AdjacencyConfig::job_queue(
                threads,
                6,
                ReleasePolicy::Timeout(std::time::Duration::from_millis(5)),
            ),
            AdjacencyConfig::barrier_pool(threads),
        ]
    }

    /// Build and traverse; pairs come back as column ids.
    fn run(
        config: &AdjacencyConfig,
        mut stores: RayStores<VecColumnStore>,
        required: usize,
    ) -> (BTreeSet<(u64, u64)>, TraversalReport) {
        let root = Root::build(config, AdjacencyThreshold::new(required), &mut stores).unwrap();
        let sink = PairSink::new();
        let report = Traverser::new(config.clone())
            .unwrap()
            .traverse(&root, &stores, &sink)
            .unwrap();
        let ids = testing::pair_ids(&stores, &sink.into_pairs());
        (ids, report)
    }

    #[test]
    fn test_three_ray_scenario() {
        // +a = 1010, +b = 1000, -c = 1000, one shared zero required.
        // (+a, -c): I = 1000, |Z(+a)| - |I| = 1 → adjacent.
        // (+b, -c): I = 1000, both excesses 0 → pending; Z(+a) ⊋ I → filtered.
        let stores = RayStores::new(
            store(0, &["1010", "1000"]),
            store(10, &["1000"]),
            VecColumnStore::new(),
        );
        for config in all_strategies(4) {
            let (pairs, report) = run(&config, stores.clone(), 1);
            assert_eq!(pairs, BTreeSet::from([(0, 10)]), "strategy {}", report.strategy);
            assert_eq!(report.stats.immediate_adjacent, 1);
            assert_eq!(report.stats.filtered_out, 1);
        }
    }

    #[test]
    fn test_zero_ray_equal_to_intersection_keeps_pair() {
        // +0 = 11100, -10 = 10011: I = 10000, both excesses 2 → pending.
        // The zero ray 10000 equals I, which is not a strict superset.
        let stores = RayStores::new(
            store(0, &["11100"]),
            store(10, &["10011"]),
            store(20, &["10000"]),
        );
        for config in all_strategies(3) {
            let (pairs, report) = run(&config, stores.clone(), 1);
            assert_eq!(pairs, BTreeSet::from([(0, 10)]), "strategy {}", report.strategy);
            assert_eq!(report.stats.pending_candidates, 1);
            assert_eq!(report.stats.filtered_out, 0);
        }

        // A zero ray strictly above I removes the pair.
        let stores = RayStores::new(
            store(0, &["11100"]),
            store(10, &["10011"]),
            store(20, &["10001"]),
        );
        let (pairs, report) = run(&AdjacencyConfig::sequential(), stores, 1);
        assert!(pairs.is_empty());
        assert_eq!(report.stats.filtered_out, 1);
    }

    #[test]
    fn test_empty_side_spawns_nothing() {
        let stores = RayStores::new(
            store(0, &["1010", "0110", "0011"]),
            VecColumnStore::new(),
            store(20, &["1111"]),
        );
        for config in all_strategies(4) {
            let (pairs, report) = run(&config, stores.clone(), 1);
            assert!(pairs.is_empty());
            assert_eq!(report.stats.threads_spawned, 0);
            assert_eq!(report.stats.enter_calls, 0);
            assert_eq!(report.negative_rays, 0);
        }
    }

    #[test]
    fn test_matches_brute_force_oracle() {
        let mut gen = RayGen::new(7);
        for round in 0..8 {
            let width = 10 + round;
            let stores = gen.stores(width, 40, 35, 6, 0.45);
            let required = width / 3;
            let expected = testing::oracle_adjacent_ids(&stores, required);

            for config in all_strategies(4) {
                let (pairs, report) = run(&config, stores.clone(), required);
                assert_eq!(
                    pairs, expected,
                    "round {} strategy {}",
                    round, report.strategy
                );
            }
        }
    }

    #[test]
    fn test_tree_shapes_do_not_change_result() {
        let mut gen = RayGen::new(11);
        let stores = gen.stores(14, 60, 50, 8, 0.5);
        let expected = testing::oracle_adjacent_ids(&stores, 4);

        let shapes = [
            AdjacencyConfig::barrier_pool(3).with_node_shape(NodeShape::Wide { bits_to_use: 3 }),
            AdjacencyConfig::incremental_fork(3).with_max_leaf_size(5),
            AdjacencyConfig::job_queue(3, 2, ReleasePolicy::Immediate)
                .with_node_shape(NodeShape::Wide { bits_to_use: 2 })
                .with_max_leaf_size(3),
            AdjacencyConfig::sequential().with_bit_order(BitOrderStrategy::Natural),
        ];
        for config in shapes {
            let (pairs, _) = run(&config, stores.clone(), 4);
            assert_eq!(pairs, expected, "config {:?}", config);
        }
    }

    #[test]
    fn test_sequential_is_idempotent() {
        let mut gen = RayGen::new(3);
        let stores = gen.stores(16, 80, 80, 10, 0.5);
        let config = AdjacencyConfig::sequential();

        let (first, first_report) = run(&config, stores.clone(), 5);
        let (second, second_report) = run(&config, stores, 5);
        assert_eq!(first, second);
        assert_eq!(first_report.stats, second_report.stats);
    }

    #[test]
    fn test_enter_leave_balance_and_no_duplicates() {
        let mut gen = RayGen::new(19);
        let stores = gen.stores(18, 120, 100, 10, 0.5);
        for config in all_strategies(6) {
            let mut stores = stores.clone();
            let root = Root::build(&config, AdjacencyThreshold::new(5), &mut stores).unwrap();
            let sink = PairSink::new();
            let report = Traverser::new(config.clone())
                .unwrap()
                .traverse(&root, &stores, &sink)
                .unwrap();

            assert_eq!(report.stats.entered(), report.stats.leaves);
            let pairs = sink.into_pairs();
            let unique: BTreeSet<AdjacentPair> = pairs.iter().copied().collect();
            assert_eq!(unique.len(), pairs.len(), "strategy {}", report.strategy);
            assert_eq!(report.pairs_emitted(), pairs.len() as u64);
        }
    }

    #[test]
    fn test_thousand_rays_level_depth_does_not_matter() {
        let mut gen = RayGen::new(1000);
        let stores = gen.stores(24, 500, 500, 0, 0.55);
        let required = 8;

        let (shallow, shallow_report) = run(
            &AdjacencyConfig::job_queue(4, 0, ReleasePolicy::Immediate),
            stores.clone(),
            required,
        );
        let (deep, deep_report) = run(
            &AdjacencyConfig::job_queue(4, 6, ReleasePolicy::Immediate),
            stores.clone(),
            required,
        );
        let (sequential, _) = run(&AdjacencyConfig::sequential(), stores, required);

        assert_eq!(shallow, sequential);
        assert_eq!(deep, sequential);
        assert_eq!(shallow_report.stats.jobs_queued, 1);
        assert!(deep_report.stats.jobs_queued > 1);
    }

    #[test]
    fn test_every_reported_pair_meets_threshold() {
        let mut gen = RayGen::new(23);
        let stores = gen.stores(20, 70, 70, 5, 0.5);
        let required = 7;
        let (pairs, _) = run(&AdjacencyConfig::barrier_pool(4), stores.clone(), required);
        for (p, n) in pairs {
            let zp = testing::pattern_of(&stores.positive, p);
            let zn = testing::pattern_of(&stores.negative, n);
            assert!(zp.and_count(zn) >= required);
        }
    }

    struct EvenIdsOnly;

    impl crate::leaf::RankAdjacency for EvenIdsOnly {
        fn is_adjacent(&self, positive: &Column, negative: &Column, _: &BitSet) -> Result<bool> {
            Ok((positive.id() + negative.id()) % 2 == 0)
        }
    }

    struct Failing;

    impl crate::leaf::RankAdjacency for Failing {
        fn is_adjacent(&self, _: &Column, _: &Column, _: &BitSet) -> Result<bool> {
            Err(ConeTreeError::Store("rank matrix unavailable".into()))
        }
    }

    #[test]
    fn test_rank_delegate_decides_threshold_passing_pairs() {
        let mut gen = RayGen::new(5);
        let mut stores = gen.stores(12, 30, 30, 0, 0.5);
        let required = 3;
        let config = AdjacencyConfig::incremental_fork(4);
        let root = Root::build(&config, AdjacencyThreshold::new(required), &mut stores).unwrap();
        let sink = PairSink::new();
        let report = Traverser::new(config)
            .unwrap()
            .traverse_with(&root, &stores, &sink, AdjacencyTest::Rank(&EvenIdsOnly))
            .unwrap();

        let expected: BTreeSet<(u64, u64)> = testing::threshold_pairs_ids(&stores, required)
            .into_iter()
            .filter(|(p, n)| (p + n) % 2 == 0)
            .collect();
        assert_eq!(testing::pair_ids(&stores, &sink.into_pairs()), expected);
        assert_eq!(report.stats.immediate_adjacent, 0);
        assert_eq!(report.stats.pending_candidates, 0);
    }

    #[test]
    fn test_delegate_error_fails_every_strategy() {
        let mut gen = RayGen::new(29);
        let stores = gen.stores(12, 40, 40, 0, 0.5);
        for config in all_strategies(4) {
            let mut stores = stores.clone();
            let root = Root::build(&config, AdjacencyThreshold::new(1), &mut stores).unwrap();
            let sink = PairSink::new();
            let result = Traverser::new(config.clone())
                .unwrap()
                .traverse_with(&root, &stores, &sink, AdjacencyTest::Rank(&Failing));
            assert!(
                matches!(result, Err(ConeTreeError::Store(_))),
                "strategy {:?}",
                config.strategy
            );
        }
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = AdjacencyConfig::sequential();
        config.thread_count = 0;
        assert!(matches!(
            Traverser::new(config),
            Err(ConeTreeError::InvalidConfig(_))
        ));
    }
}
