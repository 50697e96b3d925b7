// SPDX-License-Identifier: AGPL-3.0-or-later
// ConeTree - Pattern-Tree Adjacency Search
// Copyright (C) 2026 Sushanth Reddy Vanagala (https://github.com/sushanthpy)

//! # Root and Traversal Contract
//!
//! The [`Root`] of one iteration step owns the positive, negative and zero
//! trees, the selective-bit order they were built with, and the injected
//! adjacency threshold. It implements the protocol every scheduler follows:
//!
//! ```text
//! if let Some(_entered) = root.enter(token, a, b) {   // pruning gate
//!     ... recurse into children / leaf test ...
//! }                                                    // leave() on drop
//! ```
//!
//! ## Pruning soundness
//!
//! `Z(r) ⊆ U(n)` for every ray `r` below node `n`, hence
//! `|Z(p) ∩ Z(q)| <= |U(a) ∩ U(b)|` for every `p` under `a` and `q` under
//! `b`. When the bound misses the threshold no pair below can be adjacent.
//!
//! ## Minimality filter
//!
//! A pending pair `(p, q)` with intersection `I` is not adjacent if some
//! third ray `r` (positive, negative or zero) has `I ⊆ Z(r)`. The filter
//! walks all three trees, skipping subtrees whose union misses the cut
//! pattern (AND of the pending intersections) or every candidate's `I`.

use conetree_core::{
    AdjacencyConfig, AdjacencyThreshold, BitSet, ColumnStore, RayStores, Result, Side, StoreSet,
};

use crate::bit_order::SelectiveBitOrder;
use crate::builder::TreeBuilder;
use crate::candidates::AdjCandidates;
use crate::concurrency::ConcurrencyToken;
use crate::node::Node;
use crate::stats::TraversalStats;

/// Trees and threshold of one iteration step.
#[derive(Debug)]
pub struct Root {
    positive: Node,
    negative: Node,
    zero: Node,
    bit_order: SelectiveBitOrder,
    threshold: AdjacencyThreshold,
}

impl Root {
    pub fn new(
        positive: Node,
        negative: Node,
        zero: Node,
        bit_order: SelectiveBitOrder,
        threshold: AdjacencyThreshold,
    ) -> Self {
        Self {
            positive,
            negative,
            zero,
            bit_order,
            threshold,
        }
    }

    /// Compute the bit order and build all three trees, partitioning the
    /// stores in place. Runs single-threaded before any traversal.
    pub fn build<S: ColumnStore>(
        config: &AdjacencyConfig,
        threshold: AdjacencyThreshold,
        stores: &mut RayStores<S>,
    ) -> Result<Self> {
        config.validate()?;
        let width = stores.pattern_width()?;
        let bit_order = {
            let sampled: [&dyn ColumnStore; 2] = [&stores.positive, &stores.negative];
            SelectiveBitOrder::for_strategy(config.bit_order, width, &sampled)?
        };

        let builder = TreeBuilder::from_config(config);
        let positive = builder.build_all(&mut stores.positive, &bit_order)?;
        let negative = builder.build_all(&mut stores.negative, &bit_order)?;
        let zero = builder.build_all(&mut stores.zero, &bit_order)?;

        tracing::debug!(
            width,
            positive = positive.ray_count(),
            negative = negative.ray_count(),
            zero = zero.ray_count(),
            required_zero_bits = threshold.required_zero_bits(),
            "Built adjacency root"
        );
        Ok(Self::new(positive, negative, zero, bit_order, threshold))
    }

    #[inline]
    pub fn positive_tree(&self) -> &Node {
        &self.positive
    }

    #[inline]
    pub fn negative_tree(&self) -> &Node {
        &self.negative
    }

    #[inline]
    pub fn zero_tree(&self) -> &Node {
        &self.zero
    }

    pub fn tree(&self, side: Side) -> &Node {
        match side {
            Side::Positive => &self.positive,
            Side::Negative => &self.negative,
            Side::Zero => &self.zero,
        }
    }

    pub fn bit_order(&self) -> &SelectiveBitOrder {
        &self.bit_order
    }

    pub fn threshold(&self) -> AdjacencyThreshold {
        self.threshold
    }

    /// Pruning gate: can any ray pair under `a` × `b` share enough zeros?
    ///
    /// A `true` answer obliges the caller to call [`leave`](Self::leave)
    /// once the pair is done; prefer [`enter`](Self::enter), which does so
    /// on drop.
    pub fn enter_if_candidates(&self, token: &ConcurrencyToken, a: &Node, b: &Node) -> bool {
        let stats = token.stats();
        TraversalStats::bump(&stats.enter_calls);
        let bound = a.union_pattern().and_count(b.union_pattern());
        if self.threshold.is_met_by(bound) {
            true
        } else {
            TraversalStats::bump(&stats.pruned);
            false
        }
    }

    /// Counterpart of a successful [`enter_if_candidates`](Self::enter_if_candidates).
    pub fn leave(&self, token: &ConcurrencyToken, a: &Node, b: &Node) {
        debug_assert!(
            self.threshold
                .is_met_by(a.union_pattern().and_count(b.union_pattern())),
            "leave() for a node pair that never entered"
        );
        TraversalStats::bump(&token.stats().leaves);
    }

    /// Scoped form of the gate: `Some(guard)` if the pair entered; the
    /// guard calls [`leave`](Self::leave) when dropped, on every path.
    pub fn enter<'a>(
        &'a self,
        token: &'a ConcurrencyToken,
        a: &'a Node,
        b: &'a Node,
    ) -> Option<EnteredPair<'a>> {
        // Built lazily: a guard dropped on the pruned path would leave.
        self.enter_if_candidates(token, a, b).then(|| EnteredPair {
            root: self,
            token,
            a,
            b,
        })
    }

    /// Does a shared zero set of `count` bits meet the injected threshold?
    #[inline]
    pub fn is_required_zero_bit_count(&self, count: usize) -> bool {
        self.threshold.is_met_by(count)
    }

    /// Remove every pending candidate whose intersection is a strict subset
    /// of the zero pattern of a ray other than its own two. A ray whose
    /// pattern equals the intersection does not filter.
    pub fn filter_adjacent_pairs(
        &self,
        token: &ConcurrencyToken,
        stores: StoreSet<'_>,
        candidates: &mut AdjCandidates,
    ) -> Result<()> {
        let Some(cut) = candidates.cut_pattern().cloned() else {
            return Ok(());
        };
        let before = candidates.len();
        for side in [Side::Positive, Side::Negative, Side::Zero] {
            if candidates.is_empty() {
                break;
            }
            filter_node(side, self.tree(side), stores.side(side), &cut, candidates)?;
        }
        TraversalStats::add(
            &token.stats().filtered_out,
            (before - candidates.len()) as u64,
        );
        Ok(())
    }
}

fn filter_node(
    side: Side,
    node: &Node,
    store: &dyn ColumnStore,
    cut: &BitSet,
    candidates: &mut AdjCandidates,
) -> Result<()> {
    let union = node.union_pattern();
    if candidates.is_empty() || !cut.is_subset_of(union) {
        return Ok(());
    }
    if !candidates.iter().any(|c| c.intersection.is_strict_subset_of(union)) {
        return Ok(());
    }

    if node.is_internal() {
        for child in node.children() {
            filter_node(side, child, store, cut, candidates)?;
        }
        return Ok(());
    }

    let mut rays = Vec::with_capacity(node.ray_range().len());
    node.collect_rays(store, &mut rays)?;
    for (index, pattern) in rays {
        candidates.retain(|c| {
            let own_ray = match side {
                Side::Positive => c.positive == index,
                Side::Negative => c.negative == index,
                Side::Zero => false,
            };
            own_ray || !c.intersection.is_strict_subset_of(pattern)
        });
    }
    Ok(())
}

/// A node pair that passed the pruning gate; leaves it on drop.
#[must_use = "dropping the guard leaves the node pair immediately"]
pub struct EnteredPair<'a> {
    root: &'a Root,
    token: &'a ConcurrencyToken,
    a: &'a Node,
    b: &'a Node,
}

impl Drop for EnteredPair<'_> {
    fn drop(&mut self) {
        self.root.leave(self.token, self.a, self.b);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conetree_core::VecColumnStore;

    fn bits(s: &str) -> BitSet {
        BitSet::from_bit_str(s).unwrap()
    }

    fn store(patterns: &[&str]) -> VecColumnStore {
        VecColumnStore::from_patterns(0, patterns.iter().map(|p| bits(p)))
    }

    fn built_root(
        pos: &[&str],
        neg: &[&str],
        zero: &[&str],
        required: usize,
    ) -> (Root, RayStores<VecColumnStore>) {
        let mut stores = RayStores::new(store(pos), store(neg), store(zero));
        let config = AdjacencyConfig::sequential()
            .with_bit_order(conetree_core::BitOrderStrategy::Natural);
        let root = Root::build(&config, AdjacencyThreshold::new(required), &mut stores).unwrap();
        (root, stores)
    }

    fn index_of(store: &VecColumnStore, id: u64) -> usize {
        store.columns().iter().position(|c| c.id() == id).unwrap()
    }

    #[test]
    fn test_enter_prunes_on_union_bound() {
        let (root, _stores) = built_root(&["1100", "1000"], &["0011", "0010"], &[], 1);
        let token = ConcurrencyToken::new(1);

        assert!(!root.enter_if_candidates(&token, root.positive_tree(), root.negative_tree()));
        let snap = token.stats().snapshot();
        assert_eq!(snap.enter_calls, 1);
        assert_eq!(snap.pruned, 1);
    }

    #[test]
    fn test_enter_on_pruned_pair_never_leaves() {
        let (root, _stores) = built_root(&["1100", "1000"], &["0011", "0010"], &[], 1);
        let token = ConcurrencyToken::new(1);

        let guard = root.enter(&token, root.positive_tree(), root.negative_tree());
        assert!(guard.is_none());
        drop(guard);

        let snap = token.stats().snapshot();
        assert_eq!(snap.pruned, 1);
        assert_eq!(snap.leaves, 0);
        assert_eq!(snap.entered(), snap.leaves);
    }

    #[test]
    fn test_enter_guard_leaves_on_drop() {
        let (root, _stores) = built_root(&["1100"], &["0110"], &[], 1);
        let token = ConcurrencyToken::new(1);
        {
            let guard = root.enter(&token, root.positive_tree(), root.negative_tree());
            assert!(guard.is_some());
            assert_eq!(token.stats().snapshot().leaves, 0);
        }
        let snap = token.stats().snapshot();
        assert_eq!(snap.leaves, 1);
        assert_eq!(snap.entered(), snap.leaves);
    }

    #[test]
    fn test_filter_removes_dominated_candidates() {
        // +0 = 1100, -0 = 1010: intersection 1000.
        // zero ray 1001 contains 1000, so the pair is not adjacent.
        let (root, stores) = built_root(&["1100"], &["1010"], &["1001"], 1);
        let token = ConcurrencyToken::new(1);

        let mut candidates = AdjCandidates::new();
        candidates.push(
            index_of(&stores.positive, 0),
            index_of(&stores.negative, 0),
            bits("1000"),
        );
        root.filter_adjacent_pairs(&token, stores.view(), &mut candidates)
            .unwrap();

        assert!(candidates.is_empty());
        assert_eq!(token.stats().snapshot().filtered_out, 1);
    }

    #[test]
    fn test_filter_keeps_candidate_when_pattern_equals_intersection() {
        // Zero ray 1000 equals the intersection: not a strict superset.
        let (root, stores) = built_root(&["1100"], &["1010"], &["1000"], 1);
        let token = ConcurrencyToken::new(1);

        let mut candidates = AdjCandidates::new();
        candidates.push(
            index_of(&stores.positive, 0),
            index_of(&stores.negative, 0),
            bits("1000"),
        );
        root.filter_adjacent_pairs(&token, stores.view(), &mut candidates)
            .unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(token.stats().snapshot().filtered_out, 0);
    }

    #[test]
    fn test_filter_ignores_the_pairs_own_rays() {
        let (root, stores) = built_root(&["1100", "0011"], &["1010"], &[], 1);
        let token = ConcurrencyToken::new(1);

        let mut candidates = AdjCandidates::new();
        candidates.push(
            index_of(&stores.positive, 0),
            index_of(&stores.negative, 0),
            bits("1000"),
        );
        root.filter_adjacent_pairs(&token, stores.view(), &mut candidates)
            .unwrap();

        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn test_build_rejects_mismatched_widths() {
        let mut stores = RayStores::new(store(&["101"]), store(&["1010"]), VecColumnStore::new());
        let result = Root::build(
            &AdjacencyConfig::sequential(),
            AdjacencyThreshold::new(1),
            &mut stores,
        );
        assert!(result.is_err());
    }
}
