// SPDX-License-Identifier: AGPL-3.0-or-later
// ConeTree - Pattern-Tree Adjacency Search
// Copyright (C) 2026 Sushanth Reddy Vanagala (https://github.com/sushanthpy)

//! Test support: seeded ray generation and a brute-force adjacency oracle.

use std::collections::BTreeSet;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use conetree_core::{BitSet, Column, ColumnStore, RayStores, VecColumnStore};

use crate::sink::AdjacentPair;

pub const POSITIVE_FIRST_ID: u64 = 0;
pub const NEGATIVE_FIRST_ID: u64 = 100_000;
pub const ZERO_FIRST_ID: u64 = 200_000;

/// Deterministic random zero patterns.
pub struct RayGen {
    rng: ChaCha8Rng,
}

impl RayGen {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Pattern of `width` bits, each set with probability `density`.
    pub fn pattern(&mut self, width: usize, density: f64) -> BitSet {
        let rng = &mut self.rng;
        BitSet::from_iter(width, (0..width).filter(|_| rng.gen_bool(density)))
    }

    pub fn store(&mut self, first_id: u64, count: usize, width: usize, density: f64) -> VecColumnStore {
        let patterns: Vec<BitSet> = (0..count).map(|_| self.pattern(width, density)).collect();
        VecColumnStore::from_patterns(first_id, patterns)
    }

    pub fn stores(
        &mut self,
        width: usize,
        positive: usize,
        negative: usize,
        zero: usize,
        density: f64,
    ) -> RayStores<VecColumnStore> {
        RayStores::new(
            self.store(POSITIVE_FIRST_ID, positive, width, density),
            self.store(NEGATIVE_FIRST_ID, negative, width, density),
            self.store(ZERO_FIRST_ID, zero, width, density),
        )
    }
}

/// Every (positive id, negative id) pair sharing at least `required` zeros.
pub fn threshold_pairs_ids(stores: &RayStores<VecColumnStore>, required: usize) -> BTreeSet<(u64, u64)> {
    let mut out = BTreeSet::new();
    for p in stores.positive.columns() {
        for n in stores.negative.columns() {
            if p.zero_pattern().and_count(n.zero_pattern()) >= required {
                out.insert((p.id(), n.id()));
            }
        }
    }
    out
}

/// Quadratic reference implementation of the combinatorial test.
pub fn oracle_adjacent_ids(stores: &RayStores<VecColumnStore>, required: usize) -> BTreeSet<(u64, u64)> {
    let contains = |rays: &[Column], skip: Option<u64>, intersection: &BitSet| {
        rays.iter()
            .filter(|r| Some(r.id()) != skip)
            .any(|r| intersection.is_strict_subset_of(r.zero_pattern()))
    };

    let mut out = BTreeSet::new();
    for p in stores.positive.columns() {
        for n in stores.negative.columns() {
            let intersection = p.zero_pattern().and(n.zero_pattern());
            let shared = intersection.count();
            if shared < required {
                continue;
            }
            let single_excess = p.zero_pattern().count() - shared == 1
                || n.zero_pattern().count() - shared == 1;
            let dominated = contains(stores.positive.columns(), Some(p.id()), &intersection)
                || contains(stores.negative.columns(), Some(n.id()), &intersection)
                || contains(stores.zero.columns(), None, &intersection);
            if single_excess || !dominated {
                out.insert((p.id(), n.id()));
            }
        }
    }
    out
}

/// Translate store indices into column ids.
pub fn pair_ids(stores: &RayStores<VecColumnStore>, pairs: &[AdjacentPair]) -> BTreeSet<(u64, u64)> {
    pairs
        .iter()
        .map(|pair| {
            (
                stores.positive.columns()[pair.positive].id(),
                stores.negative.columns()[pair.negative].id(),
            )
        })
        .collect()
}

pub fn pattern_of(store: &VecColumnStore, id: u64) -> &BitSet {
    let index = store
        .columns()
        .iter()
        .position(|c| c.id() == id)
        .unwrap_or_else(|| panic!("no column with id {}", id));
    store.columns()[index].zero_pattern()
}

/// Zero patterns of every ray below `node`.
pub fn rays_below<'a>(node: &'a crate::node::Node, store: &'a dyn ColumnStore) -> Vec<&'a BitSet> {
    node.ray_indices()
        .into_iter()
        .map(|i| store.column(i).map(Column::zero_pattern))
        .collect::<conetree_core::Result<Vec<_>>>()
        .expect("tree indices lie inside the store")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use crate::root::Root;
    use crate::sink::PairSink;
    use crate::traverser::Traverser;
    use conetree_core::{AdjacencyConfig, AdjacencyThreshold, ReleasePolicy};
    use proptest::prelude::*;

    fn all_nodes(node: &Node) -> Vec<&Node> {
        let mut out = vec![node];
        for child in node.children() {
            out.extend(all_nodes(child));
        }
        out
    }

    #[test]
    fn test_generator_is_deterministic() {
        let a = RayGen::new(42).stores(12, 5, 5, 2, 0.5);
        let b = RayGen::new(42).stores(12, 5, 5, 2, 0.5);
        assert_eq!(a.positive.columns(), b.positive.columns());
        assert_eq!(a.zero.columns(), b.zero.columns());
        assert_eq!(a.negative.columns()[0].id(), NEGATIVE_FIRST_ID);
    }

    #[test]
    fn test_oracle_on_three_ray_scenario() {
        let bits = |s: &str| BitSet::from_bit_str(s).unwrap();
        let stores = RayStores::new(
            VecColumnStore::from_patterns(0, [bits("1010"), bits("1000")]),
            VecColumnStore::from_patterns(10, [bits("1000")]),
            VecColumnStore::new(),
        );
        assert_eq!(oracle_adjacent_ids(&stores, 1), BTreeSet::from([(0, 10)]));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_search_matches_oracle(
            seed in any::<u64>(),
            width in 3usize..14,
            positive in 0usize..24,
            negative in 0usize..24,
            zero in 0usize..5,
            required in 0usize..6,
            threads in 1usize..5,
        ) {
            let mut stores = RayGen::new(seed).stores(width, positive, negative, zero, 0.5);
            let expected = oracle_adjacent_ids(&stores, required);

            let config = AdjacencyConfig::job_queue(threads, 2, ReleasePolicy::Immediate);
            let root = Root::build(&config, AdjacencyThreshold::new(required), &mut stores).unwrap();
            let sink = PairSink::new();
            Traverser::new(config).unwrap().traverse(&root, &stores, &sink).unwrap();

            prop_assert_eq!(pair_ids(&stores, &sink.into_pairs()), expected);
        }

        #[test]
        fn prop_pruned_node_pairs_hold_no_threshold_pair(
            seed in any::<u64>(),
            width in 4usize..12,
            required in 1usize..6,
        ) {
            let mut stores = RayGen::new(seed).stores(width, 14, 14, 0, 0.45);
            let root = Root::build(
                &AdjacencyConfig::sequential(),
                AdjacencyThreshold::new(required),
                &mut stores,
            )
            .unwrap();

            for a in all_nodes(root.positive_tree()) {
                for b in all_nodes(root.negative_tree()) {
                    if a.union_pattern().and_count(b.union_pattern()) >= required {
                        continue;
                    }
                    for zp in rays_below(a, &stores.positive) {
                        for zn in rays_below(b, &stores.negative) {
                            prop_assert!(zp.and_count(zn) < required);
                        }
                    }
                }
            }
        }
    }
}
