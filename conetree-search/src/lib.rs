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

//! # ConeTree Search
//!
//! Finds the adjacent (positive, negative) ray pairs of one double-description
//! iteration step without testing all `|P| × |N|` pairs.
//!
//! ## Pipeline
//!
//! ```text
//!  RayStores ──► SelectiveBitOrder ──► TreeBuilder ──► Root (P, N, Z trees)
//!                                                          │
//!              Traverser ◄── AdjacencyConfig               ▼
//!                  │           schedule(P root, N root) ─► descend
//!                  ▼                                       │  enter / prune
//!            TraversalReport                               ▼
//!                                       leaf test ─► filter ─► PairSink
//! ```
//!
//! ## Modules
//!
//! | Module        | Role                                                      |
//! |---------------|-----------------------------------------------------------|
//! | `node`        | tree elements with union patterns                         |
//! | `bit_order`   | selective-bit order from sampled split balance            |
//! | `builder`     | in-place partitioning tree construction                   |
//! | `root`        | enter / leave gate and the minimality filter              |
//! | `leaf`        | leaf-to-leaf combinatorial or rank test                   |
//! | `candidates`  | pending-pair buffer with cut pattern                      |
//! | `concurrency` | permit token, schedulers, breakable barrier               |
//! | `traverser`   | one traversal end to end                                  |
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut stores = RayStores::new(positive, negative, zero);
//! let config = AdjacencyConfig::default();
//! let root = Root::build(&config, AdjacencyThreshold::new(dim - 2), &mut stores)?;
//! let sink = PairSink::new();
//! let report = Traverser::new(config)?.traverse(&root, &stores, &sink)?;
//! ```

pub mod bit_order;
pub mod builder;
pub mod candidates;
pub mod concurrency;
pub mod leaf;
pub mod node;
pub mod root;
pub mod search;
pub mod sink;
pub mod stats;
pub mod traverser;

#[cfg(test)]
pub(crate) mod testing;

pub use bit_order::SelectiveBitOrder;
pub use builder::{BinaryNodeFactory, BuildContext, NodeFactory, TreeBuilder, WideNodeFactory};
pub use candidates::{AdjCandidates, Candidate};
pub use concurrency::{
    scheduler_for, BarrierPoolScheduler, ChildPairs, ConcurrencyToken, IncrementalFork,
    JobQueueScheduler, PermitGuard, Scheduler, SequentialScheduler,
};
pub use leaf::{AdjacencyTest, RankAdjacency};
pub use node::Node;
pub use root::{EnteredPair, Root};
pub use search::{AdjacencySearch, Walk};
pub use sink::{AdjacentPair, PairSink};
pub use stats::{StatsSnapshot, TraversalReport, TraversalStats};
pub use traverser::Traverser;

pub use conetree_core::{
    AdjacencyConfig, AdjacencyThreshold, BitSet, Column, ColumnStore, ConeTreeError, RayStores,
    Result, VecColumnStore,
};
