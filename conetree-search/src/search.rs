// SPDX-License-Identifier: AGPL-3.0-or-later
// ConeTree - Pattern-Tree Adjacency Search
// Copyright (C) 2026 Sushanth Reddy Vanagala (https://github.com/sushanthpy)

//! The recursive descent shared by every scheduler.
//!
//! [`AdjacencySearch`] bundles what one traversal reads: root, stores, sink,
//! token, scheduler and leaf test. [`Walk`] is the `Copy` handle threads pass
//! around; it adds the thread scope so schedulers can spawn children that
//! borrow the trees.

use std::thread::Scope;

use conetree_core::{Result, StoreSet};

use crate::concurrency::{ChildPairs, ConcurrencyToken, Scheduler};
use crate::leaf::{self, AdjacencyTest};
use crate::node::Node;
use crate::root::Root;
use crate::sink::PairSink;

/// Everything one traversal reads, shared by all of its threads.
pub struct AdjacencySearch<'a, 't> {
    root: &'t Root,
    stores: StoreSet<'t>,
    sink: &'a PairSink,
    token: &'a ConcurrencyToken,
    scheduler: &'a dyn Scheduler<'t>,
    test: AdjacencyTest<'a>,
}

impl<'a, 't> AdjacencySearch<'a, 't> {
    pub(crate) fn new(
        root: &'t Root,
        stores: StoreSet<'t>,
        sink: &'a PairSink,
        token: &'a ConcurrencyToken,
        scheduler: &'a dyn Scheduler<'t>,
        test: AdjacencyTest<'a>,
    ) -> Self {
        Self {
            root,
            stores,
            sink,
            token,
            scheduler,
            test,
        }
    }

    #[inline]
    pub fn root(&self) -> &'t Root {
        self.root
    }

    #[inline]
    pub fn stores(&self) -> StoreSet<'t> {
        self.stores
    }

    #[inline]
    pub fn sink(&self) -> &'a PairSink {
        self.sink
    }

    #[inline]
    pub fn token(&self) -> &'a ConcurrencyToken {
        self.token
    }

    #[inline]
    pub fn test(&self) -> AdjacencyTest<'a> {
        self.test
    }
}

/// Per-thread handle on a running traversal.
#[derive(Clone, Copy)]
pub struct Walk<'scope, 'env, 't> {
    search: &'env AdjacencySearch<'env, 't>,
    scope: &'scope Scope<'scope, 'env>,
}

impl<'scope, 'env, 't> Walk<'scope, 'env, 't> {
    pub(crate) fn new(
        search: &'env AdjacencySearch<'env, 't>,
        scope: &'scope Scope<'scope, 'env>,
    ) -> Self {
        Self { search, scope }
    }

    #[inline]
    pub fn search(self) -> &'env AdjacencySearch<'env, 't> {
        self.search
    }

    #[inline]
    pub fn token(self) -> &'env ConcurrencyToken {
        self.search.token
    }

    #[inline]
    pub fn scope(self) -> &'scope Scope<'scope, 'env> {
        self.scope
    }

    /// Search one (positive, negative) node pair.
    pub fn descend(self, a: &'t Node, b: &'t Node) -> Result<()> {
        let search = self.search;
        let Some(_entered) = search.root.enter(search.token, a, b) else {
            return Ok(());
        };
        if a.is_empty() || b.is_empty() {
            return Ok(());
        }
        if a.is_internal() || b.is_internal() {
            search.scheduler.branch(self, ChildPairs::of(a, b))
        } else {
            leaf::compare_leaves(search, a, b)
        }
    }
}
