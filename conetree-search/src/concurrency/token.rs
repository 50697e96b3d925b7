// SPDX-License-Identifier: AGPL-3.0-or-later
// ConeTree - Pattern-Tree Adjacency Search
// Copyright (C) 2026 Sushanth Reddy Vanagala (https://github.com/sushanthpy)

//! # Concurrency Token
//!
//! One token per traversal. It holds:
//!
//! - the **permit counter**: how many more threads may run, bounded by the
//!   configured thread budget (the traversal's own thread included);
//! - the **child registry**: how many spawned children are still running and
//!   the first failure any of them reported;
//! - the traversal's [`TraversalStats`].
//!
//! Children are scoped threads, so they can borrow the trees and stores. A
//! child's result (error or panic) is recorded in the registry rather than in
//! a join handle; [`ConcurrencyToken::join_all`] blocks until the registry is
//! empty and hands back the first failure.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, Scope};

use parking_lot::{Condvar, Mutex};

use conetree_core::{ConeTreeError, Result};

use crate::stats::TraversalStats;

#[derive(Debug, Default)]
struct ChildRegistry {
    active: usize,
    spawned: usize,
    failure: Option<ConeTreeError>,
}

/// Per-traversal permit budget, child registry and counters.
#[derive(Debug)]
pub struct ConcurrencyToken {
    budget: usize,
    available: AtomicUsize,
    registry: Mutex<ChildRegistry>,
    all_done: Condvar,
    stats: TraversalStats,
}

impl ConcurrencyToken {
    /// New token with `budget` permits, all of them free.
    pub fn new(budget: usize) -> Self {
        Self {
            budget,
            available: AtomicUsize::new(budget),
            registry: Mutex::new(ChildRegistry::default()),
            all_done: Condvar::new(),
            stats: TraversalStats::default(),
        }
    }

    #[inline]
    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Permits currently free.
    #[inline]
    pub fn available(&self) -> usize {
        self.available.load(Ordering::Acquire)
    }

    #[inline]
    pub fn stats(&self) -> &TraversalStats {
        &self.stats
    }

    /// Atomically take up to `n` free permits; returns how many were taken.
    pub fn try_acquire(&self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        let mut current = self.available.load(Ordering::Acquire);
        loop {
            let take = current.min(n);
            if take == 0 {
                return 0;
            }
            match self.available.compare_exchange_weak(
                current,
                current - take,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return take,
                Err(actual) => current = actual,
            }
        }
    }

    /// Take the traversal's own permit. Failing here means the budget was
    /// misconfigured or another traversal is sharing this token.
    pub fn acquire_initial(&self) -> Result<()> {
        if self.try_acquire(1) == 1 {
            Ok(())
        } else {
            Err(ConeTreeError::PermitUnavailable {
                budget: self.budget,
            })
        }
    }

    /// Return `n` permits. Returning more than are outstanding is an
    /// accounting bug and is refused.
    pub fn release(&self, n: usize) -> Result<()> {
        let mut current = self.available.load(Ordering::Acquire);
        loop {
            let held = self.budget - current;
            if n > held {
                return Err(ConeTreeError::PermitOverRelease { released: n, held });
            }
            match self.available.compare_exchange_weak(
                current,
                current + n,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(()),
                Err(actual) => current = actual,
            }
        }
    }

    /// Take one permit wrapped in a guard that gives it back on drop.
    pub fn permit(&self) -> Option<PermitGuard<'_>> {
        (self.try_acquire(1) == 1).then(|| PermitGuard {
            token: self,
            count: 1,
        })
    }

    /// Wrap `count` already-acquired permits in a guard.
    pub fn guard(&self, count: usize) -> PermitGuard<'_> {
        PermitGuard { token: self, count }
    }

    /// Spawn a named child thread inside `scope` running `work`.
    ///
    /// The child is registered before it starts; its error or panic is
    /// recorded for [`join_all`](Self::join_all). If the OS refuses the
    /// thread the registration is rolled back and the error returned.
    pub fn spawn_child<'scope, 'env, F>(
        &'env self,
        scope: &'scope Scope<'scope, 'env>,
        label: String,
        work: F,
    ) -> Result<()>
    where
        F: FnOnce() -> Result<()> + Send + 'scope,
    {
        {
            let mut registry = self.registry.lock();
            registry.active += 1;
            registry.spawned += 1;
        }
        TraversalStats::bump(&self.stats.threads_spawned);

        let thread_label = label.clone();
        let spawned = thread::Builder::new()
            .name(label.clone())
            .spawn_scoped(scope, move || {
                let outcome = match panic::catch_unwind(AssertUnwindSafe(work)) {
                    Ok(result) => result,
                    Err(payload) => Err(ConeTreeError::WorkerPanicked {
                        label: thread_label,
                        message: panic_message(payload.as_ref()),
                    }),
                };
                self.child_finished(outcome);
            });

        match spawned {
            Ok(_) => {
                tracing::trace!(label = %label, "Spawned child thread");
                Ok(())
            }
            Err(source) => {
                self.child_finished(Ok(()));
                Err(ConeTreeError::Spawn { label, source })
            }
        }
    }

    /// Record a failure that happened outside a spawned child.
    pub fn record_failure(&self, error: ConeTreeError) {
        let mut registry = self.registry.lock();
        if registry.failure.is_none() {
            registry.failure = Some(error);
        }
    }

    /// Number of children spawned over the token's lifetime.
    pub fn spawned_children(&self) -> usize {
        self.registry.lock().spawned
    }

    /// Block until every spawned child has finished; return the first failure.
    pub fn join_all(&self) -> Result<()> {
        let mut registry = self.registry.lock();
        while registry.active > 0 {
            self.all_done.wait(&mut registry);
        }
        match registry.failure.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn child_finished(&self, outcome: Result<()>) {
        let mut registry = self.registry.lock();
        registry.active -= 1;
        if let Err(error) = outcome {
            tracing::debug!(error = %error, "Child thread failed");
            if registry.failure.is_none() {
                registry.failure = Some(error);
            }
        }
        if registry.active == 0 {
            self.all_done.notify_all();
        }
    }
}

/// Permits that go back to their token when dropped.
#[must_use = "dropping the guard releases the permits immediately"]
#[derive(Debug)]
pub struct PermitGuard<'a> {
    token: &'a ConcurrencyToken,
    count: usize,
}

impl PermitGuard<'_> {
    pub fn count(&self) -> usize {
        self.count
    }

    /// Release now and surface accounting errors instead of logging them.
    pub fn release(mut self) -> Result<()> {
        let count = std::mem::take(&mut self.count);
        self.token.release(count)
    }
}

impl Drop for PermitGuard<'_> {
    fn drop(&mut self) {
        if self.count == 0 {
            return;
        }
        if let Err(error) = self.token.release(self.count) {
            tracing::error!(error = %error, "Permit accounting broken on guard drop");
            self.token.record_failure(error);
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
