// SPDX-License-Identifier: AGPL-3.0-or-later
// ConeTree - Pattern-Tree Adjacency Search
// Copyright (C) 2026 Sushanth Reddy Vanagala (https://github.com/sushanthpy)

//! # Breakable Cyclic Barrier
//!
//! `std::sync::Barrier` cannot be interrupted. The worker pool needs a
//! barrier whose current generation can be *broken* when new work arrives
//! while some participants are already waiting: the waiters wake with
//! [`BarrierWait::Broken`] and go back to polling the queue.
//!
//! ```text
//! generation g:  W1 waits, W2 waits, ...            W_n arrives → Tripped
//!                W1 waits, producer pushes → break → W1 Broken, g+1 starts
//! ```
//!
//! A generation trips only when all parties are inside `wait` at once. Since
//! a trip needs every party, a waiter of generation `g` can tell whether `g`
//! tripped by comparing against the last tripped generation.

use parking_lot::{Condvar, Mutex};

/// Outcome of [`CyclicBarrier::wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierWait {
    /// All parties arrived together. `leader` is the last one to arrive.
    Tripped { leader: bool },
    /// The generation was broken before every party arrived.
    Broken,
}

#[derive(Debug, Default)]
struct BarrierState {
    parties: usize,
    waiting: usize,
    generation: u64,
    last_tripped: Option<u64>,
}

/// Reusable, breakable barrier. Parties can deregister but never join late.
#[derive(Debug)]
pub struct CyclicBarrier {
    state: Mutex<BarrierState>,
    cvar: Condvar,
}

impl CyclicBarrier {
    pub fn new(parties: usize) -> Self {
        Self {
            state: Mutex::new(BarrierState {
                parties: parties.max(1),
                ..BarrierState::default()
            }),
            cvar: Condvar::new(),
        }
    }

    pub fn parties(&self) -> usize {
        self.state.lock().parties
    }

    /// Parties currently blocked in [`wait`](Self::wait).
    pub fn waiting(&self) -> usize {
        self.state.lock().waiting
    }

    /// Block until all parties arrive or the generation is broken.
    pub fn wait(&self) -> BarrierWait {
        let mut state = self.state.lock();
        let generation = state.generation;
        state.waiting += 1;

        if state.waiting == state.parties {
            self.trip(&mut state);
            return BarrierWait::Tripped { leader: true };
        }

        while state.generation == generation {
            self.cvar.wait(&mut state);
        }

        if state.last_tripped == Some(generation) {
            BarrierWait::Tripped { leader: false }
        } else {
            BarrierWait::Broken
        }
    }

    /// Break the current generation if anyone is waiting in it.
    ///
    /// Returns true if waiters were released.
    pub fn break_barrier(&self) -> bool {
        let mut state = self.state.lock();
        if state.waiting == 0 {
            return false;
        }
        state.waiting = 0;
        state.generation += 1;
        self.cvar.notify_all();
        true
    }

    /// Permanently remove one party, e.g. a worker that never started.
    ///
    /// If everyone still registered is already waiting, the generation trips.
    pub fn leave(&self) {
        let mut state = self.state.lock();
        if state.parties > 1 {
            state.parties -= 1;
        }
        if state.waiting > 0 && state.waiting == state.parties {
            self.trip(&mut state);
        }
    }

    fn trip(&self, state: &mut BarrierState) {
        state.waiting = 0;
        state.last_tripped = Some(state.generation);
        state.generation += 1;
        self.cvar.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_single_party_trips_immediately() {
        let barrier = CyclicBarrier::new(1);
        assert_eq!(barrier.wait(), BarrierWait::Tripped { leader: true });
        assert_eq!(barrier.wait(), BarrierWait::Tripped { leader: true });
    }

    #[test]
    fn test_all_parties_trip_together() {
        let barrier = Arc::new(CyclicBarrier::new(4));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let barrier = barrier.clone();
                thread::spawn(move || barrier.wait())
            })
            .collect();
        let outcomes: Vec<BarrierWait> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let leaders = outcomes
            .iter()
            .filter(|o| **o == BarrierWait::Tripped { leader: true })
            .count();
        assert_eq!(leaders, 1);
        assert!(outcomes.iter().all(|o| matches!(o, BarrierWait::Tripped { .. })));
    }

    #[test]
    fn test_break_releases_waiters() {
        let barrier = Arc::new(CyclicBarrier::new(3));
        let waiter = {
            let barrier = barrier.clone();
            thread::spawn(move || barrier.wait())
        };
        while barrier.waiting() == 0 {
            thread::sleep(Duration::from_millis(1));
        }

        assert!(barrier.break_barrier());
        assert_eq!(waiter.join().unwrap(), BarrierWait::Broken);
        assert_eq!(barrier.waiting(), 0);
        assert!(!barrier.break_barrier());
    }

    #[test]
    fn test_leave_trips_remaining_waiters() {
        let barrier = Arc::new(CyclicBarrier::new(2));
        let waiter = {
            let barrier = barrier.clone();
            thread::spawn(move || barrier.wait())
        };
        while barrier.waiting() == 0 {
            thread::sleep(Duration::from_millis(1));
        }

        barrier.leave();
        assert_eq!(barrier.parties(), 1);
        assert_eq!(waiter.join().unwrap(), BarrierWait::Tripped { leader: false });
    }

    #[test]
    fn test_reusable_after_break() {
        let barrier = Arc::new(CyclicBarrier::new(2));
        let first = {
            let barrier = barrier.clone();
            thread::spawn(move || barrier.wait())
        };
        while barrier.waiting() == 0 {
            thread::sleep(Duration::from_millis(1));
        }
        barrier.break_barrier();
        assert_eq!(first.join().unwrap(), BarrierWait::Broken);

        let second = {
            let barrier = barrier.clone();
            thread::spawn(move || barrier.wait())
        };
        let mine = barrier.wait();
        let theirs = second.join().unwrap();
        assert!(matches!(mine, BarrierWait::Tripped { .. }));
        assert!(matches!(theirs, BarrierWait::Tripped { .. }));
    }
}
