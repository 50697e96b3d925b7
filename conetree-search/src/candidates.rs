// SPDX-License-Identifier: AGPL-3.0-or-later
// ConeTree - Pattern-Tree Adjacency Search
// Copyright (C) 2026 Sushanth Reddy Vanagala (https://github.com/sushanthpy)

//! # Candidate Buffer
//!
//! `AdjCandidates` batches the pending pairs of one leaf-to-leaf comparison
//! so the tree-wide minimality filter is walked once per comparison instead
//! of once per pair. Each candidate caches the intersection of its two zero
//! patterns; the buffer also folds the *cut pattern*, the AND of every
//! pending intersection, which lets the filter skip any subtree that cannot
//! contain it.
//!
//! A candidate ends in exactly one of three ways: promoted to an output pair,
//! discarded by the filter, or (in the rank mode) handed to the delegate.

use std::fmt;

use conetree_core::BitSet;

/// Provisional (positive, negative) pair with its cached intersection.
#[derive(Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Index of the positive ray in the positive store.
    pub positive: usize,
    /// Index of the negative ray in the negative store.
    pub negative: usize,
    /// `Z(positive) ∩ Z(negative)`.
    pub intersection: BitSet,
}

impl Candidate {
    /// Cardinality of the cached intersection.
    #[inline]
    pub fn cardinality(&self) -> usize {
        self.intersection.count()
    }
}

impl fmt::Debug for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Candidate(+{} -{} ∩={} |{}|)",
            self.positive,
            self.negative,
            self.intersection,
            self.cardinality()
        )
    }
}

/// Scratch buffer of pending candidates.
#[derive(Default)]
pub struct AdjCandidates {
    pending: Vec<Candidate>,
    cut_pattern: Option<BitSet>,
}

impl AdjCandidates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pending pair.
    pub fn push(&mut self, positive: usize, negative: usize, intersection: BitSet) {
        self.cut_pattern = Some(match self.cut_pattern.take() {
            Some(cut) => cut.and(&intersection),
            None => intersection.clone(),
        });
        self.pending.push(Candidate {
            positive,
            negative,
            intersection,
        });
    }

    /// AND of every intersection pushed since the last [`clear`](Self::clear).
    ///
    /// Removing candidates does not widen it back; it stays a valid (if
    /// looser) lower bound for the survivors.
    pub fn cut_pattern(&self) -> Option<&BitSet> {
        self.cut_pattern.as_ref()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> + '_ {
        self.pending.iter()
    }

    /// Keep only the candidates for which `keep` returns true; returns how
    /// many were removed.
    pub fn retain(&mut self, keep: impl FnMut(&Candidate) -> bool) -> usize {
        let before = self.pending.len();
        self.pending.retain(keep);
        before - self.pending.len()
    }

    /// Take every remaining candidate and reset the buffer.
    pub fn drain(&mut self) -> std::vec::Drain<'_, Candidate> {
        self.cut_pattern = None;
        self.pending.drain(..)
    }
}

impl fmt::Debug for AdjCandidates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdjCandidates")
            .field("pending", &self.pending.len())
            .field("cut_pattern", &self.cut_pattern)
            .finish()
    }
}
