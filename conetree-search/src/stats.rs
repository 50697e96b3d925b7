// SPDX-License-Identifier: AGPL-3.0-or-later
// ConeTree - Pattern-Tree Adjacency Search
// Copyright (C) 2026 Sushanth Reddy Vanagala (https://github.com/sushanthpy)

//! Per-traversal counters and the report built from them.
//!
//! Counters live in the traversal's token, never in statics, so traversals
//! run back to back (or in parallel tests) never see each other's numbers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

/// Live counters of one traversal.
#[derive(Debug, Default)]
pub struct TraversalStats {
    /// `enter_if_candidates` calls.
    pub enter_calls: AtomicU64,
    /// Calls that returned false (subtree pair skipped).
    pub pruned: AtomicU64,
    /// `leave` calls.
    pub leaves: AtomicU64,
    /// Ray pairs reaching the leaf test.
    pub leaf_pairs: AtomicU64,
    /// Pairs accepted by the single-coordinate excess rule.
    pub immediate_adjacent: AtomicU64,
    /// Pairs deferred to the minimality filter.
    pub pending_candidates: AtomicU64,
    /// Pending pairs removed by the filter.
    pub filtered_out: AtomicU64,
    /// Pairs refused by the rank delegate.
    pub rank_rejected: AtomicU64,
    /// Pairs written to the sink.
    pub pairs_emitted: AtomicU64,
    /// Child threads spawned through the token.
    pub threads_spawned: AtomicU64,
    /// Jobs placed on a job queue.
    pub jobs_queued: AtomicU64,
    /// Jobs run from a job queue.
    pub jobs_run: AtomicU64,
    /// Barrier generations broken by new work.
    pub barrier_breaks: AtomicU64,
}

impl TraversalStats {
    #[inline]
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    /// Consistent-enough copy of the counters. Exact once all threads joined.
    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            enter_calls: load(&self.enter_calls),
            pruned: load(&self.pruned),
            leaves: load(&self.leaves),
            leaf_pairs: load(&self.leaf_pairs),
            immediate_adjacent: load(&self.immediate_adjacent),
            pending_candidates: load(&self.pending_candidates),
            filtered_out: load(&self.filtered_out),
            rank_rejected: load(&self.rank_rejected),
            pairs_emitted: load(&self.pairs_emitted),
            threads_spawned: load(&self.threads_spawned),
            jobs_queued: load(&self.jobs_queued),
            jobs_run: load(&self.jobs_run),
            barrier_breaks: load(&self.barrier_breaks),
        }
    }
}

/// Plain copy of [`TraversalStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub enter_calls: u64,
    pub pruned: u64,
    pub leaves: u64,
    pub leaf_pairs: u64,
    pub immediate_adjacent: u64,
    pub pending_candidates: u64,
    pub filtered_out: u64,
    pub rank_rejected: u64,
    pub pairs_emitted: u64,
    pub threads_spawned: u64,
    pub jobs_queued: u64,
    pub jobs_run: u64,
    pub barrier_breaks: u64,
}

impl StatsSnapshot {
    /// Successful enters, i.e. the number of `leave` calls owed.
    pub fn entered(&self) -> u64 {
        self.enter_calls - self.pruned
    }

    /// Fraction of pruning-gate checks that skipped a subtree pair.
    pub fn prune_ratio(&self) -> f64 {
        if self.enter_calls == 0 {
            return 0.0;
        }
        self.pruned as f64 / self.enter_calls as f64
    }
}

/// Outcome of one traversal.
#[derive(Debug, Clone, Serialize)]
pub struct TraversalReport {
    pub strategy: &'static str,
    pub thread_count: usize,
    pub positive_rays: usize,
    pub negative_rays: usize,
    pub elapsed: Duration,
    pub stats: StatsSnapshot,
}

impl TraversalReport {
    pub fn pairs_emitted(&self) -> u64 {
        self.stats.pairs_emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_and_ratios() {
        let stats = TraversalStats::default();
        TraversalStats::add(&stats.enter_calls, 10);
        TraversalStats::add(&stats.pruned, 4);
        TraversalStats::add(&stats.leaves, 6);
        TraversalStats::bump(&stats.pairs_emitted);

        let snap = stats.snapshot();
        assert_eq!(snap.entered(), 6);
        assert_eq!(snap.entered(), snap.leaves);
        assert!((snap.prune_ratio() - 0.4).abs() < 1e-9);
        assert_eq!(snap.pairs_emitted, 1);
    }

    #[test]
    fn test_report_serializes() {
        let report = TraversalReport {
            strategy: "sequential",
            thread_count: 1,
            positive_rays: 3,
            negative_rays: 2,
            elapsed: Duration::from_millis(3),
            stats: StatsSnapshot::default(),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["strategy"], "sequential");
        assert_eq!(json["stats"]["pairs_emitted"], 0);
    }
}
