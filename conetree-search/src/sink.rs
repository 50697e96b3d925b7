// SPDX-License-Identifier: AGPL-3.0-or-later
// ConeTree - Pattern-Tree Adjacency Search
// Copyright (C) 2026 Sushanth Reddy Vanagala (https://github.com/sushanthpy)

//! Output collection of accepted pairs.

use std::collections::BTreeSet;

use parking_lot::Mutex;
use serde::Serialize;

/// Accepted (positive, negative) pair, as indices into the partitioned stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct AdjacentPair {
    pub positive: usize,
    pub negative: usize,
}

impl AdjacentPair {
    pub fn new(positive: usize, negative: usize) -> Self {
        Self { positive, negative }
    }
}

/// Thread-safe, append-only collection of adjacent pairs.
///
/// Producers on any thread call [`push`](Self::push) or
/// [`extend`](Self::extend); the search never reads it back. Order reflects
/// arrival and is meaningless across threads.
#[derive(Debug, Default)]
pub struct PairSink {
    pairs: Mutex<Vec<AdjacentPair>>,
}

impl PairSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, pair: AdjacentPair) {
        self.pairs.lock().push(pair);
    }

    /// Append a batch under one lock acquisition.
    pub fn extend(&self, pairs: impl IntoIterator<Item = AdjacentPair>) {
        self.pairs.lock().extend(pairs);
    }

    pub fn len(&self) -> usize {
        self.pairs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.lock().is_empty()
    }

    /// Take the collected pairs, in arrival order.
    pub fn into_pairs(self) -> Vec<AdjacentPair> {
        self.pairs.into_inner()
    }

    /// Copy of the collected pairs as an ordered set.
    pub fn to_set(&self) -> BTreeSet<AdjacentPair> {
        self.pairs.lock().iter().copied().collect()
    }
}
