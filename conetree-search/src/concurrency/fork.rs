// SPDX-License-Identifier: AGPL-3.0-or-later
// ConeTree - Pattern-Tree Adjacency Search
// Copyright (C) 2026 Sushanth Reddy Vanagala (https://github.com/sushanthpy)

//! Sequential and incremental-fork scheduling.
//!
//! Incremental fork decides per binary×binary node pair: if a permit is free
//! the first child pair moves to a new thread holding that permit, and the
//! current thread continues with the rest. The permit goes back when the
//! forked subtree is done, so deep, unbalanced trees keep every permit busy
//! without any queue.

use conetree_core::Result;

use super::{ChildPairs, Scheduler};
use crate::search::Walk;

/// Everything on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialScheduler;

impl<'t> Scheduler<'t> for SequentialScheduler {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn branch<'scope, 'env>(
        &'env self,
        walk: Walk<'scope, 'env, 't>,
        children: ChildPairs<'t>,
    ) -> Result<()> {
        children.run_inline(walk)
    }
}

/// Fork at binary node pairs while permits last.
#[derive(Debug, Clone, Copy, Default)]
pub struct IncrementalFork;

impl IncrementalFork {
    /// Fork-or-inline step, shared with the job-queue workers.
    pub(crate) fn fork_or_inline<'scope, 'env, 't>(
        walk: Walk<'scope, 'env, 't>,
        children: ChildPairs<'t>,
    ) -> Result<()> {
        if !children.is_binary_pair() || children.len() < 2 {
            return children.run_inline(walk);
        }
        let token = walk.token();
        let Some(permit) = token.permit() else {
            return children.run_inline(walk);
        };

        let mut pairs = children.into_iter();
        if let Some((a, b)) = pairs.next() {
            let label = format!(
                "conetree-fork-{}",
                token.stats().threads_spawned.load(std::sync::atomic::Ordering::Relaxed)
            );
            // On spawn failure the closure, and with it the permit, is dropped.
            token.spawn_child(walk.scope(), label, move || {
                let _permit = permit;
                walk.descend(a, b)
            })?;
        }
        for (a, b) in pairs {
            walk.descend(a, b)?;
        }
        Ok(())
    }
}

impl<'t> Scheduler<'t> for IncrementalFork {
    fn name(&self) -> &'static str {
        "incremental_fork"
    }

    fn branch<'scope, 'env>(
        &'env self,
        walk: Walk<'scope, 'env, 't>,
        children: ChildPairs<'t>,
    ) -> Result<()> {
        Self::fork_or_inline(walk, children)
    }
}
