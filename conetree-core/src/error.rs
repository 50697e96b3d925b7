// SPDX-License-Identifier: AGPL-3.0-or-later
// ConeTree - Pattern-Tree Adjacency Search
// Copyright (C) 2026 Sushanth Reddy Vanagala (https://github.com/sushanthpy)

//! Error taxonomy for tree construction and traversal.
//!
//! Nothing here is retried. Store failures abort tree construction, broken
//! permit accounting and invariant violations are programming errors, and a
//! failed or interrupted worker fails the whole traversal once the permits it
//! held are back in the token.

use std::ops::Range;

/// Errors from the adjacency engine.
#[derive(Debug, thiserror::Error)]
pub enum ConeTreeError {
    #[error("column store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid ray range {start}..{end} for a store of {len} columns")]
    InvalidRange { start: usize, end: usize, len: usize },

    #[error("zero pattern width mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("no permit available for the traversal itself (budget {budget})")]
    PermitUnavailable { budget: usize },

    #[error("released {released} permits with only {held} outstanding")]
    PermitOverRelease { released: usize, held: usize },

    #[error("failed to spawn worker thread '{label}': {source}")]
    Spawn {
        label: String,
        #[source]
        source: std::io::Error,
    },

    #[error("worker thread '{label}' panicked: {message}")]
    WorkerPanicked { label: String, message: String },

    #[error("interrupted while waiting: {0}")]
    Interrupted(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ConeTreeError {
    /// Build an [`ConeTreeError::InvalidRange`] for `range` over `len` columns.
    pub fn invalid_range(range: &Range<usize>, len: usize) -> Self {
        ConeTreeError::InvalidRange {
            start: range.start,
            end: range.end,
            len,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConeTreeError>;
