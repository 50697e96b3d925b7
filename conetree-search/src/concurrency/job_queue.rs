// SPDX-License-Identifier: AGPL-3.0-or-later
// ConeTree - Pattern-Tree Adjacency Search
// Copyright (C) 2026 Sushanth Reddy Vanagala (https://github.com/sushanthpy)

//! # Job-Queue Scheduling
//!
//! ```text
//!   level 0          (P, N)                      enter / expand / leave
//!   level 1   (P0,N0) (P0,N1) (P1,N0) (P1,N1)    enter / expand / leave
//!   ...
//!   level d   ───────── FIFO of node pairs ─────────
//!                 │          │           │
//!              invoker    worker 1 … worker k        (k = permits obtained)
//! ```
//!
//! The invoking thread expands the tree pair breadth first for
//! `max_level_depth` levels, applying the pruning gate at every expanded
//! pair, and queues the frontier. An expanded pair leaves the gate as soon
//! as its children are queued, not after they have been searched.
//!
//! The invoking thread then takes whatever permits are free (at most
//! `thread_count - 1`), starts one worker per permit, and drains the queue
//! alongside them. Inside a job the recursion forks incrementally.
//!
//! When a worker finds the queue empty it finishes, then gives back its
//! permit according to the [`ReleasePolicy`]. The invoking thread returns
//! only after every worker has released.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Condvar, Mutex};

use conetree_core::{ConeTreeError, ReleasePolicy, Result};

use super::{panic_message, ChildPairs, IncrementalFork, NodePair, PermitGuard, Scheduler};
use crate::node::Node;
use crate::search::Walk;
use crate::stats::TraversalStats;

#[derive(Debug, Default)]
struct CohortState {
    workers: usize,
    finished: usize,
    released: usize,
}

/// Latch over the workers of one drain.
#[derive(Debug, Default)]
struct Cohort {
    state: Mutex<CohortState>,
    changed: Condvar,
}

impl Cohort {
    fn start(&self, workers: usize) {
        let mut state = self.state.lock();
        *state = CohortState {
            workers,
            ..CohortState::default()
        };
    }

    /// A worker that never started counts as finished and released.
    fn abandon(&self) {
        let mut state = self.state.lock();
        state.finished += 1;
        state.released += 1;
        self.changed.notify_all();
    }

    fn finish(&self) {
        let mut state = self.state.lock();
        state.finished += 1;
        self.changed.notify_all();
    }

    fn hold_until_release(&self, policy: ReleasePolicy) {
        let mut state = self.state.lock();
        match policy {
            ReleasePolicy::Immediate => {}
            ReleasePolicy::WaitHalfDone => {
                while state.finished * 2 < state.workers {
                    self.changed.wait(&mut state);
                }
            }
            ReleasePolicy::Timeout(limit) => {
                let deadline = Instant::now() + limit;
                while state.finished < state.workers {
                    if self.changed.wait_until(&mut state, deadline).timed_out() {
                        break;
                    }
                }
            }
        }
    }

    fn released(&self) {
        let mut state = self.state.lock();
        state.released += 1;
        self.changed.notify_all();
    }

    fn wait_all_released(&self) {
        let mut state = self.state.lock();
        while state.released < state.workers {
            self.changed.wait(&mut state);
        }
    }
}

/// Breadth-first split into a FIFO of node pairs drained by a worker cohort.
#[derive(Debug)]
pub struct JobQueueScheduler<'t> {
    max_level_depth: usize,
    release: ReleasePolicy,
    sender: Sender<NodePair<'t>>,
    receiver: Receiver<NodePair<'t>>,
    cohort: Cohort,
    aborted: AtomicBool,
}

impl<'t> JobQueueScheduler<'t> {
    pub fn new(max_level_depth: usize, release: ReleasePolicy) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            max_level_depth,
            release,
            sender,
            receiver,
            cohort: Cohort::default(),
            aborted: AtomicBool::new(false),
        }
    }

    /// Expand up to `max_level_depth` levels and queue the frontier.
    fn expand(
        &self,
        walk: Walk<'_, '_, 't>,
        positive: &'t Node,
        negative: &'t Node,
    ) -> Result<usize> {
        let root = walk.search().root();
        let token = walk.token();

        let mut frontier: Vec<NodePair<'t>> = vec![(positive, negative)];
        for _ in 0..self.max_level_depth {
            let mut next = Vec::with_capacity(frontier.len() * 4);
            let mut expanded = false;
            for (a, b) in frontier {
                if !a.is_internal() && !b.is_internal() {
                    next.push((a, b));
                    continue;
                }
                let Some(_entered) = root.enter(token, a, b) else {
                    continue;
                };
                next.extend(ChildPairs::of(a, b));
                expanded = true;
            }
            frontier = next;
            if !expanded {
                break;
            }
        }

        let queued = frontier.len();
        for pair in frontier {
            self.sender.send(pair).map_err(|_| {
                ConeTreeError::Interrupted("job queue disconnected while filling".into())
            })?;
        }
        TraversalStats::add(&token.stats().jobs_queued, queued as u64);
        Ok(queued)
    }

    fn drain(&self, walk: Walk<'_, '_, 't>) -> Result<()> {
        while !self.aborted.load(Ordering::Acquire) {
            let Ok((a, b)) = self.receiver.try_recv() else {
                break;
            };
            TraversalStats::bump(&walk.token().stats().jobs_run);
            if let Err(error) = walk.descend(a, b) {
                self.aborted.store(true, Ordering::Release);
                return Err(error);
            }
        }
        Ok(())
    }

    /// Body of one worker thread.
    fn work<'env>(
        &'env self,
        walk: Walk<'_, 'env, 't>,
        label: &str,
        permit: PermitGuard<'env>,
    ) -> Result<()> {
        // The cohort latch must hear from every worker, panicking or not.
        let drained = match panic::catch_unwind(AssertUnwindSafe(|| self.drain(walk))) {
            Ok(result) => result,
            Err(payload) => {
                self.aborted.store(true, Ordering::Release);
                Err(ConeTreeError::WorkerPanicked {
                    label: label.to_string(),
                    message: panic_message(payload.as_ref()),
                })
            }
        };
        self.cohort.finish();
        self.cohort.hold_until_release(self.release);
        drop(permit);
        self.cohort.released();
        drained
    }
}

impl<'t> Scheduler<'t> for JobQueueScheduler<'t> {
    fn name(&self) -> &'static str {
        "job_queue"
    }

    fn schedule<'scope, 'env>(
        &'env self,
        walk: Walk<'scope, 'env, 't>,
        positive: &'t Node,
        negative: &'t Node,
    ) -> Result<()> {
        let token = walk.token();
        let queued = self.expand(walk, positive, negative)?;

        // The invoking thread takes one job itself.
        let wanted = token
            .budget()
            .saturating_sub(1)
            .min(queued.saturating_sub(1));
        let workers = token.try_acquire(wanted);
        self.cohort.start(workers);
        tracing::debug!(jobs = queued, workers, release = ?self.release, "Job queue filled");

        for worker in 0..workers {
            let permit = token.guard(1);
            let label = format!("conetree-jobq-{}", worker);
            let thread_label = label.clone();
            let spawned = token.spawn_child(walk.scope(), label, move || {
                self.work(walk, &thread_label, permit)
            });
            if let Err(error) = spawned {
                // The failed worker's permit went back with its closure.
                let unstarted = workers - worker;
                for _ in 0..unstarted {
                    self.cohort.abandon();
                }
                self.aborted.store(true, Ordering::Release);
                token.release(unstarted - 1)?;
                self.cohort.wait_all_released();
                return Err(error);
            }
        }

        let drained = self.drain(walk);
        self.cohort.wait_all_released();
        drained
    }

    fn branch<'scope, 'env>(
        &'env self,
        walk: Walk<'scope, 'env, 't>,
        children: ChildPairs<'t>,
    ) -> Result<()> {
        IncrementalFork::fork_or_inline(walk, children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_cohort_half_done_releases_after_half() {
        let cohort = Arc::new(Cohort::default());
        cohort.start(4);

        cohort.finish();
        let waiter = {
            let cohort = cohort.clone();
            thread::spawn(move || {
                cohort.hold_until_release(ReleasePolicy::WaitHalfDone);
                cohort.released();
            })
        };
        thread::sleep(Duration::from_millis(10));
        assert_eq!(cohort.state.lock().released, 0);

        cohort.finish();
        waiter.join().unwrap();
        assert_eq!(cohort.state.lock().released, 1);
    }

    #[test]
    fn test_cohort_timeout_expires() {
        let cohort = Cohort::default();
        cohort.start(2);
        cohort.finish();

        let started = Instant::now();
        cohort.hold_until_release(ReleasePolicy::Timeout(Duration::from_millis(20)));
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_cohort_abandon_counts_as_released() {
        let cohort = Cohort::default();
        cohort.start(2);
        cohort.abandon();
        cohort.finish();
        cohort.released();
        cohort.wait_all_released();
        assert_eq!(cohort.state.lock().finished, 2);
    }
}
