// SPDX-License-Identifier: AGPL-3.0-or-later
// ConeTree - Pattern-Tree Adjacency Search
// Copyright (C) 2026 Sushanth Reddy Vanagala (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! # ConeTree Core: Rays, Patterns and Configuration
//!
//! The vocabulary shared by the adjacency search and its callers:
//!
//! - [`bitset`]: fixed-width zero patterns with cached cardinality
//! - [`column`]: rays, the partitionable [`ColumnStore`] and the three
//!   per-step ray groups
//! - [`config`]: tree shape, bit order, thread budget and strategy
//! - [`error`]: the engine's error taxonomy
//!
//! Nothing here spawns threads or knows about trees; `conetree-search`
//! builds on these types.

pub mod bitset;
pub mod column;
pub mod config;
pub mod error;

pub use bitset::{BitSet, BitSetIter};
pub use column::{Column, ColumnStore, RayStores, Side, StoreSet, VecColumnStore};
pub use config::{
    AdjacencyConfig, AdjacencyThreshold, BitOrderStrategy, ConcurrencyStrategy, NodeShape,
    ReleasePolicy, DEFAULT_MAX_LEVEL_DEPTH, DEFAULT_QUEUE_FACTOR, DEFAULT_SAMPLES_PER_BIT,
};
pub use error::{ConeTreeError, Result};
