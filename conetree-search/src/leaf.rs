// SPDX-License-Identifier: AGPL-3.0-or-later
// ConeTree - Pattern-Tree Adjacency Search
// Copyright (C) 2026 Sushanth Reddy Vanagala (https://github.com/sushanthpy)

//! # Leaf-to-Leaf Adjacency Test
//!
//! Reached when both nodes of an entered pair are terminal. Every ray pair
//! `(p, q)` of the two leaves is classified:
//!
//! | Check                                   | Outcome                     |
//! |-----------------------------------------|-----------------------------|
//! | `\|Z(p) ∩ Z(q)\| < required`            | rejected                    |
//! | `\|Z(p)\| - \|I\| == 1` or same for `q` | adjacent, emitted directly  |
//! | otherwise                               | pending, minimality filter  |
//!
//! The pending pairs of one comparison share a single filter pass over the
//! positive, negative and zero trees. In rank mode the last two rows are
//! replaced by a call to the [`RankAdjacency`] delegate.

use std::fmt;

use conetree_core::{BitSet, Column, Result};

use crate::candidates::AdjCandidates;
use crate::node::Node;
use crate::search::AdjacencySearch;
use crate::sink::AdjacentPair;
use crate::stats::TraversalStats;

/// Algebraic adjacency test supplied by the caller.
///
/// Called only for pairs that already meet the zero-count threshold.
/// Implementations run concurrently on traversal threads.
pub trait RankAdjacency: Send + Sync {
    fn is_adjacent(&self, positive: &Column, negative: &Column, intersection: &BitSet)
        -> Result<bool>;
}

/// How a threshold-passing ray pair is decided.
#[derive(Clone, Copy, Default)]
pub enum AdjacencyTest<'a> {
    /// Excess rule plus minimality filter over the three trees.
    #[default]
    Combinatorial,
    /// Delegate every threshold-passing pair.
    Rank(&'a dyn RankAdjacency),
}

impl fmt::Debug for AdjacencyTest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdjacencyTest::Combinatorial => f.write_str("Combinatorial"),
            AdjacencyTest::Rank(_) => f.write_str("Rank(..)"),
        }
    }
}

impl AdjacencyTest<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            AdjacencyTest::Combinatorial => "combinatorial",
            AdjacencyTest::Rank(_) => "rank",
        }
    }
}

/// Compare every ray of terminal node `a` with every ray of terminal node `b`.
pub(crate) fn compare_leaves(search: &AdjacencySearch<'_, '_>, a: &Node, b: &Node) -> Result<()> {
    let stores = search.stores();
    let mut positive = Vec::with_capacity(a.ray_range().len());
    a.collect_rays(stores.positive, &mut positive)?;
    let mut negative = Vec::with_capacity(b.ray_range().len());
    b.collect_rays(stores.negative, &mut negative)?;

    let mut batch = LeafBatch::new(search);
    for &(p, zp) in &positive {
        for &(n, zn) in &negative {
            batch.test_pair(p, zp, n, zn)?;
        }
    }
    batch.settle()
}

struct LeafBatch<'s, 'a, 't> {
    search: &'s AdjacencySearch<'a, 't>,
    stats: &'a TraversalStats,
    candidates: AdjCandidates,
    accepted: Vec<AdjacentPair>,
}

impl<'s, 'a, 't> LeafBatch<'s, 'a, 't> {
    fn new(search: &'s AdjacencySearch<'a, 't>) -> Self {
        Self {
            search,
            stats: search.token().stats(),
            candidates: AdjCandidates::new(),
            accepted: Vec::new(),
        }
    }

    fn test_pair(&mut self, p: usize, zp: &BitSet, n: usize, zn: &BitSet) -> Result<()> {
        TraversalStats::bump(&self.stats.leaf_pairs);
        let shared = zp.and_count(zn);
        if !self.search.root().is_required_zero_bit_count(shared) {
            return Ok(());
        }

        match self.search.test() {
            AdjacencyTest::Combinatorial => {
                let excess_positive = zp.count() - shared;
                let excess_negative = zn.count() - shared;
                if excess_positive == 1 || excess_negative == 1 {
                    TraversalStats::bump(&self.stats.immediate_adjacent);
                    self.accepted.push(AdjacentPair::new(p, n));
                } else {
                    TraversalStats::bump(&self.stats.pending_candidates);
                    self.candidates.push(p, n, zp.and(zn));
                }
            }
            AdjacencyTest::Rank(delegate) => {
                let stores = self.search.stores();
                let positive = stores.positive.column(p)?;
                let negative = stores.negative.column(n)?;
                if delegate.is_adjacent(positive, negative, &zp.and(zn))? {
                    self.accepted.push(AdjacentPair::new(p, n));
                } else {
                    TraversalStats::bump(&self.stats.rank_rejected);
                }
            }
        }
        Ok(())
    }

    /// Filter the pending pairs, then emit everything accepted in one batch.
    fn settle(mut self) -> Result<()> {
        if !self.candidates.is_empty() {
            self.search.root().filter_adjacent_pairs(
                self.search.token(),
                self.search.stores(),
                &mut self.candidates,
            )?;
            self.accepted.extend(
                self.candidates
                    .drain()
                    .map(|c| AdjacentPair::new(c.positive, c.negative)),
            );
        }
        if self.accepted.is_empty() {
            return Ok(());
        }
        TraversalStats::add(&self.stats.pairs_emitted, self.accepted.len() as u64);
        self.search.sink().extend(self.accepted);
        Ok(())
    }
}
