// SPDX-License-Identifier: AGPL-3.0-or-later
// ConeTree - Pattern-Tree Adjacency Search
// Copyright (C) 2026 Sushanth Reddy Vanagala (https://github.com/sushanthpy)

//! # Traversal Scheduling
//!
//! The recursive descent over (positive node, negative node) pairs is the
//! same for every strategy; what differs is who runs the child pairs of an
//! internal node. A [`Scheduler`] decides that at two points:
//!
//! | Hook        | Called with                 | Purpose                          |
//! |-------------|-----------------------------|----------------------------------|
//! | `schedule`  | the two tree roots, once    | set up workers, seed the work    |
//! | `branch`    | the child pairs of a node   | run inline, fork, or enqueue     |
//!
//! ## Strategies
//!
//! | Strategy          | Parallelism                                          |
//! |-------------------|------------------------------------------------------|
//! | `Sequential`      | none                                                 |
//! | `IncrementalFork` | fork the first child pair when a permit is free      |
//! | `JobQueue`        | breadth-first split into a FIFO drained by workers   |
//! | `BarrierPool`     | fixed workers on a bounded queue, barrier to finish  |
//!
//! All strategies take permits from the traversal's [`ConcurrencyToken`], so
//! no more than `thread_count` threads ever run the search at once.

mod barrier;
mod fork;
mod job_queue;
mod pool;
mod token;

pub use barrier::{BarrierWait, CyclicBarrier};
pub use fork::{IncrementalFork, SequentialScheduler};
pub use job_queue::JobQueueScheduler;
pub use pool::BarrierPoolScheduler;
pub use token::{ConcurrencyToken, PermitGuard};

pub(crate) use token::panic_message;

use conetree_core::{AdjacencyConfig, ConcurrencyStrategy, Result};

use crate::node::Node;
use crate::search::Walk;

/// A (positive, negative) node pair still to be searched.
pub type NodePair<'t> = (&'t Node, &'t Node);

/// Decides which thread runs each piece of the search over trees living
/// for `'t`.
pub trait Scheduler<'t>: Send + Sync {
    /// Short name for logs and reports.
    fn name(&self) -> &'static str;

    /// Search the full tree pair. The default runs it on the calling thread.
    fn schedule<'scope, 'env>(
        &'env self,
        walk: Walk<'scope, 'env, 't>,
        positive: &'t Node,
        negative: &'t Node,
    ) -> Result<()> {
        walk.descend(positive, negative)
    }

    /// Run the child pairs of an entered internal node pair.
    fn branch<'scope, 'env>(
        &'env self,
        walk: Walk<'scope, 'env, 't>,
        children: ChildPairs<'t>,
    ) -> Result<()>;
}

/// The child pairs of one entered node pair.
///
/// Both internal: the cross product of their children. One internal: its
/// children paired with the other (terminal) node.
#[derive(Debug)]
pub struct ChildPairs<'t> {
    pairs: Vec<NodePair<'t>>,
    binary: bool,
}

impl<'t> ChildPairs<'t> {
    pub fn of(a: &'t Node, b: &'t Node) -> Self {
        let pairs = match (a.is_internal(), b.is_internal()) {
            (true, true) => a
                .children()
                .iter()
                .flat_map(|ca| b.children().iter().map(move |cb| (ca, cb)))
                .collect(),
            (true, false) => a.children().iter().map(|ca| (ca, b)).collect(),
            (false, true) => b.children().iter().map(|cb| (a, cb)).collect(),
            (false, false) => Vec::new(),
        };
        Self {
            pairs,
            binary: a.is_binary() && b.is_binary(),
        }
    }

    /// Both parents were binary nodes: the only case that may fork.
    #[inline]
    pub fn is_binary_pair(&self) -> bool {
        self.binary
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Run every pair on the calling thread, in order.
    pub fn run_inline(self, walk: Walk<'_, '_, 't>) -> Result<()> {
        for (a, b) in self.pairs {
            walk.descend(a, b)?;
        }
        Ok(())
    }
}

impl<'t> IntoIterator for ChildPairs<'t> {
    type Item = NodePair<'t>;
    type IntoIter = std::vec::IntoIter<NodePair<'t>>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.into_iter()
    }
}

/// Scheduler for the configured strategy.
pub fn scheduler_for<'t>(config: &AdjacencyConfig) -> Box<dyn Scheduler<'t> + 't> {
    match config.strategy {
        ConcurrencyStrategy::Sequential => Box::new(SequentialScheduler),
        ConcurrencyStrategy::IncrementalFork => Box::new(IncrementalFork),
        ConcurrencyStrategy::JobQueue {
            max_level_depth,
            release,
        } => Box::new(JobQueueScheduler::new(max_level_depth, release)),
        ConcurrencyStrategy::BarrierPool { queue_factor } => {
            Box::new(BarrierPoolScheduler::new(config.thread_count, queue_factor))
        }
    }
}
