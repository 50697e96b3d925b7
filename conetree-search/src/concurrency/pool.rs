// SPDX-License-Identifier: AGPL-3.0-or-later
// ConeTree - Pattern-Tree Adjacency Search
// Copyright (C) 2026 Sushanth Reddy Vanagala (https://github.com/sushanthpy)

//! # Barrier-Pool Scheduling
//!
//! A fixed cohort (the invoking thread plus one worker per obtained permit)
//! shares a bounded queue of node pairs:
//!
//! ```text
//!             ┌──────── bounded queue (queue_factor × thread_count) ────────┐
//!  branch() ─►│ (P0,N1) (P1,N0) (P1,N1) ...                                 │─► participants
//!             └─────────────────────────────────────────────────────────────┘
//!      full? run the pair inline instead
//! ```
//!
//! A participant that finds the queue empty waits on the [`CyclicBarrier`].
//! Pushing a job while anyone waits breaks the current generation so the
//! waiters come back for it. A generation trips only when every participant
//! is waiting at once; nobody is then running a job, so nobody can push
//! one, and an empty queue at that point means the search is complete.
//!
//! After a failure every participant keeps draining the queue but skips the
//! jobs, so the barrier still trips and the workers exit.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use conetree_core::{ConeTreeError, Result};

use super::{
    panic_message, BarrierWait, ChildPairs, CyclicBarrier, NodePair, Scheduler,
};
use crate::node::Node;
use crate::search::Walk;
use crate::stats::TraversalStats;

/// Fixed worker cohort over a bounded job queue.
#[derive(Debug)]
pub struct BarrierPoolScheduler<'t> {
    thread_count: usize,
    sender: Sender<NodePair<'t>>,
    receiver: Receiver<NodePair<'t>>,
    barrier: OnceLock<CyclicBarrier>,
    aborted: AtomicBool,
}

impl<'t> BarrierPoolScheduler<'t> {
    pub fn new(thread_count: usize, queue_factor: usize) -> Self {
        let capacity = queue_factor.max(1) * thread_count.max(1);
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        Self {
            thread_count,
            sender,
            receiver,
            barrier: OnceLock::new(),
            aborted: AtomicBool::new(false),
        }
    }

    /// Queue capacity; a full queue makes producers run the pair inline.
    pub fn capacity(&self) -> usize {
        self.sender.capacity().unwrap_or(0)
    }

    /// Offer a pair to the pool. False if the queue is full.
    fn try_push(&self, walk: Walk<'_, '_, 't>, pair: NodePair<'t>) -> bool {
        match self.sender.try_send(pair) {
            Ok(()) => {
                let stats = walk.token().stats();
                TraversalStats::bump(&stats.jobs_queued);
                if let Some(barrier) = self.barrier.get() {
                    if barrier.break_barrier() {
                        TraversalStats::bump(&stats.barrier_breaks);
                    }
                }
                true
            }
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Run one job, turning a panic into an error so the barrier still sees
    /// this participant again.
    fn run_job(&self, walk: Walk<'_, '_, 't>, (a, b): NodePair<'t>) -> Result<()> {
        TraversalStats::bump(&walk.token().stats().jobs_run);
        match panic::catch_unwind(AssertUnwindSafe(|| walk.descend(a, b))) {
            Ok(result) => result,
            Err(payload) => Err(ConeTreeError::WorkerPanicked {
                label: std::thread::current()
                    .name()
                    .unwrap_or("conetree-pool")
                    .to_string(),
                message: panic_message(payload.as_ref()),
            }),
        }
    }

    /// Drain-and-wait loop shared by the workers and the invoking thread.
    fn participate(&self, walk: Walk<'_, '_, 't>, barrier: &CyclicBarrier) -> Result<()> {
        let mut outcome = Ok(());
        loop {
            match self.receiver.try_recv() {
                Ok(pair) => {
                    if self.aborted.load(Ordering::Acquire) {
                        continue;
                    }
                    if let Err(error) = self.run_job(walk, pair) {
                        self.aborted.store(true, Ordering::Release);
                        if outcome.is_ok() {
                            outcome = Err(error);
                        }
                    }
                }
                Err(_) => match barrier.wait() {
                    BarrierWait::Tripped { .. } if self.receiver.is_empty() => return outcome,
                    BarrierWait::Tripped { .. } | BarrierWait::Broken => {}
                },
            }
        }
    }
}

impl<'t> Scheduler<'t> for BarrierPoolScheduler<'t> {
    fn name(&self) -> &'static str {
        "barrier_pool"
    }

    fn schedule<'scope, 'env>(
        &'env self,
        walk: Walk<'scope, 'env, 't>,
        positive: &'t Node,
        negative: &'t Node,
    ) -> Result<()> {
        let token = walk.token();
        let workers = token.try_acquire(self.thread_count.saturating_sub(1));
        let barrier = self.barrier.get_or_init(|| CyclicBarrier::new(workers + 1));
        if barrier.parties() != workers + 1 {
            token.release(workers)?;
            return Err(ConeTreeError::InvariantViolation(
                "barrier pool scheduled twice".into(),
            ));
        }

        if !self.try_push(walk, (positive, negative)) {
            token.release(workers)?;
            return walk.descend(positive, negative);
        }
        tracing::debug!(workers, capacity = self.capacity(), "Barrier pool started");

        for worker in 0..workers {
            let permit = token.guard(1);
            let label = format!("conetree-pool-{}", worker);
            let spawned = token.spawn_child(walk.scope(), label, move || {
                let _permit = permit;
                self.participate(walk, barrier)
            });
            if let Err(error) = spawned {
                let unstarted = workers - worker;
                for _ in 0..unstarted {
                    barrier.leave();
                }
                self.aborted.store(true, Ordering::Release);
                token.release(unstarted - 1)?;
                // Drain with whoever did start so their barrier trips.
                let _ = self.participate(walk, barrier);
                return Err(error);
            }
        }

        self.participate(walk, barrier)
    }

    fn branch<'scope, 'env>(
        &'env self,
        walk: Walk<'scope, 'env, 't>,
        children: ChildPairs<'t>,
    ) -> Result<()> {
        if self.aborted.load(Ordering::Acquire) {
            return Ok(());
        }
        let mut pairs = children.into_iter();
        let Some((first_a, first_b)) = pairs.next() else {
            return Ok(());
        };
        for (a, b) in pairs {
            if !self.try_push(walk, (a, b)) {
                walk.descend(a, b)?;
            }
        }
        walk.descend(first_a, first_b)
    }
}
