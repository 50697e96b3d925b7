// SPDX-License-Identifier: AGPL-3.0-or-later
// ConeTree - Pattern-Tree Adjacency Search
// Copyright (C) 2026 Sushanth Reddy Vanagala (https://github.com/sushanthpy)

//! # Rays and Ray Stores
//!
//! A [`Column`] is one generator of the cone. The search only ever looks at
//! its zero pattern; the numeric payload rides along for the caller.
//!
//! A [`ColumnStore`] is ordered, randomly indexable and partitionable in
//! place. Tree construction partitions ranges of a store on selective bits,
//! so after the trees are built every node's ray range is a contiguous window
//! of its store. Stores are mutated only while building (single-threaded) and
//! are shared read-only during traversal, hence the `Send + Sync` bound.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::bitset::BitSet;
use crate::error::{ConeTreeError, Result};

/// Which side of the cutting hyperplane a ray lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Positive,
    Zero,
    Negative,
}

impl Side {
    pub fn name(&self) -> &'static str {
        match self {
            Side::Positive => "positive",
            Side::Zero => "zero",
            Side::Negative => "negative",
        }
    }
}

/// One ray of the cone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    id: u64,
    zero_pattern: BitSet,
    values: Vec<f64>,
}

impl Column {
    /// Create a ray from an explicit zero pattern and no payload.
    pub fn new(id: u64, zero_pattern: BitSet) -> Self {
        Self {
            id,
            zero_pattern,
            values: Vec::new(),
        }
    }

    /// Create a ray from its coordinates; `|v| <= zero_tolerance` counts as zero.
    pub fn from_values(id: u64, values: Vec<f64>, zero_tolerance: f64) -> Self {
        let zero_pattern = BitSet::from_iter(
            values.len(),
            values
                .iter()
                .enumerate()
                .filter(|(_, v)| v.abs() <= zero_tolerance)
                .map(|(i, _)| i),
        );
        Self {
            id,
            zero_pattern,
            values,
        }
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn zero_pattern(&self) -> &BitSet {
        &self.zero_pattern
    }

    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// Ordered, partitionable ray storage.
pub trait ColumnStore: Send + Sync {
    /// Number of rays in the store.
    fn column_count(&self) -> usize;

    /// Ray at `index`.
    fn column(&self, index: usize) -> Result<&Column>;

    /// Exchange the rays at `a` and `b`.
    fn swap(&mut self, a: usize, b: usize) -> Result<()>;

    /// Reorder `range` so every ray with `bit` clear precedes every ray with
    /// `bit` set, and return the index of the first ray with `bit` set.
    fn partition(&mut self, range: Range<usize>, bit: usize) -> Result<usize> {
        if range.start > range.end || range.end > self.column_count() {
            return Err(ConeTreeError::invalid_range(&range, self.column_count()));
        }
        let mut lo = range.start;
        let mut hi = range.end;
        while lo < hi {
            if self.column(lo)?.zero_pattern().contains(bit) {
                hi -= 1;
                self.swap(lo, hi)?;
            } else {
                lo += 1;
            }
        }
        Ok(lo)
    }

    /// Width of the zero patterns, or `None` for an empty store.
    fn pattern_width(&self) -> Result<Option<usize>> {
        if self.column_count() == 0 {
            return Ok(None);
        }
        Ok(Some(self.column(0)?.zero_pattern().capacity()))
    }
}

/// In-memory [`ColumnStore`].
#[derive(Debug, Clone, Default)]
pub struct VecColumnStore {
    columns: Vec<Column>,
}

impl VecColumnStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_columns(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    /// Build a store from zero patterns, numbering ids from `first_id`.
    pub fn from_patterns(first_id: u64, patterns: impl IntoIterator<Item = BitSet>) -> Self {
        let columns = patterns
            .into_iter()
            .enumerate()
            .map(|(i, p)| Column::new(first_id + i as u64, p))
            .collect();
        Self { columns }
    }

    /// Build a store from ray coordinates, numbering ids from `first_id`.
    /// Pass [`AdjacencyConfig::zero_tolerance`](crate::AdjacencyConfig) so
    /// patterns match the engine's notion of zero.
    pub fn from_values(
        first_id: u64,
        rows: impl IntoIterator<Item = Vec<f64>>,
        zero_tolerance: f64,
    ) -> Self {
        let columns = rows
            .into_iter()
            .enumerate()
            .map(|(i, values)| Column::from_values(first_id + i as u64, values, zero_tolerance))
            .collect();
        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }
}

impl ColumnStore for VecColumnStore {
    fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn column(&self, index: usize) -> Result<&Column> {
        self.columns
            .get(index)
            .ok_or_else(|| ConeTreeError::invalid_range(&(index..index + 1), self.columns.len()))
    }

    fn swap(&mut self, a: usize, b: usize) -> Result<()> {
        let len = self.columns.len();
        if a >= len || b >= len {
            return Err(ConeTreeError::invalid_range(&(a.min(b)..a.max(b) + 1), len));
        }
        self.columns.swap(a, b);
        Ok(())
    }
}

/// The three ray groups of one iteration step.
#[derive(Debug, Clone, Default)]
pub struct RayStores<S> {
    pub positive: S,
    pub negative: S,
    pub zero: S,
}

impl<S: ColumnStore> RayStores<S> {
    pub fn new(positive: S, negative: S, zero: S) -> Self {
        Self {
            positive,
            negative,
            zero,
        }
    }

    /// Shared view used while traversing.
    pub fn view(&self) -> StoreSet<'_> {
        StoreSet {
            positive: &self.positive,
            negative: &self.negative,
            zero: &self.zero,
        }
    }

    /// Common zero pattern width of all three stores.
    ///
    /// Every non-empty store must agree; if all are empty the width is 0.
    pub fn pattern_width(&self) -> Result<usize> {
        let mut width: Option<usize> = None;
        for store in [&self.positive, &self.negative, &self.zero] {
            if let Some(w) = store.pattern_width()? {
                match width {
                    Some(expected) if expected != w => {
                        return Err(ConeTreeError::DimensionMismatch { expected, got: w });
                    }
                    _ => width = Some(w),
                }
            }
        }
        Ok(width.unwrap_or(0))
    }
}

/// Borrowed, read-only view of the three stores.
#[derive(Clone, Copy)]
pub struct StoreSet<'a> {
    pub positive: &'a dyn ColumnStore,
    pub negative: &'a dyn ColumnStore,
    pub zero: &'a dyn ColumnStore,
}

impl<'a> StoreSet<'a> {
    pub fn side(&self, side: Side) -> &'a dyn ColumnStore {
        match side {
            Side::Positive => self.positive,
            Side::Negative => self.negative,
            Side::Zero => self.zero,
        }
    }
}
