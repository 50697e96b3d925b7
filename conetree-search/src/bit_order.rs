// SPDX-License-Identifier: AGPL-3.0-or-later
// ConeTree - Pattern-Tree Adjacency Search
// Copyright (C) 2026 Sushanth Reddy Vanagala (https://github.com/sushanthpy)

//! # Selective-Bit Order
//!
//! The tree builder splits ray ranges on bits in a fixed order. A good order
//! puts first the bits that cut the ray population into two halves whose
//! members differ a lot, so the upper levels of the positive and negative
//! trees separate rays with very different zero sets and the pruning gate
//! fires early.
//!
//! ## Heuristic
//!
//! For each bit `b`, sample `samples_per_bit` random ray pairs and sum the
//! XOR-cardinality of the pairs that disagree on `b` (`split`) and of the
//! pairs that agree on `b` (`keep`). A bit with `split / keep ≈ 1.0` is
//! balanced: splitting on it moves as much pattern difference across the cut
//! as it leaves on either side. Bits are sorted by `|split/keep − 1|`.
//!
//! The order is computed once per generation and reused for every tree of
//! that generation so corresponding subtrees cover comparable coordinates.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use conetree_core::{BitOrderStrategy, BitSet, ColumnStore, Result};

/// Permutation of bit indices used by the tree builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectiveBitOrder {
    bits: Vec<usize>,
}

impl SelectiveBitOrder {
    /// Identity order over `width` bits.
    pub fn natural(width: usize) -> Self {
        Self {
            bits: (0..width).collect(),
        }
    }

    /// Use an explicit permutation.
    ///
    /// Returns `None` unless `bits` is a permutation of `0..bits.len()`.
    pub fn from_bits(bits: Vec<usize>) -> Option<Self> {
        let mut seen = vec![false; bits.len()];
        for &b in &bits {
            if b >= seen.len() || seen[b] {
                return None;
            }
            seen[b] = true;
        }
        Some(Self { bits })
    }

    /// Balance-sorted order sampled from the rays of `stores`.
    pub fn sampled(
        width: usize,
        stores: &[&dyn ColumnStore],
        samples_per_bit: usize,
        seed: u64,
    ) -> Result<Self> {
        let mut patterns: Vec<&BitSet> = Vec::new();
        for store in stores {
            for i in 0..store.column_count() {
                patterns.push(store.column(i)?.zero_pattern());
            }
        }
        if patterns.len() < 2 || width == 0 {
            return Ok(Self::natural(width));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut scored: Vec<(f64, usize)> = Vec::with_capacity(width);
        for bit in 0..width {
            let mut split = 0u64;
            let mut keep = 0u64;
            for _ in 0..samples_per_bit {
                let a = patterns[rng.gen_range(0..patterns.len())];
                let b = patterns[rng.gen_range(0..patterns.len())];
                let distance = a.xor_count(b) as u64;
                if a.contains(bit) != b.contains(bit) {
                    split += distance;
                } else {
                    keep += distance;
                }
            }
            scored.push((balance_distance(split, keep), bit));
        }
        scored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let order = Self {
            bits: scored.iter().map(|&(_, bit)| bit).collect(),
        };
        tracing::debug!(
            width,
            rays = patterns.len(),
            samples_per_bit,
            head = ?&order.bits[..order.bits.len().min(8)],
            "Computed selective bit order"
        );
        Ok(order)
    }

    /// Order according to `strategy`.
    pub fn for_strategy(
        strategy: BitOrderStrategy,
        width: usize,
        stores: &[&dyn ColumnStore],
    ) -> Result<Self> {
        match strategy {
            BitOrderStrategy::Natural => Ok(Self::natural(width)),
            BitOrderStrategy::Sampled {
                samples_per_bit,
                seed,
            } => Self::sampled(width, stores, samples_per_bit, seed),
        }
    }

    #[inline]
    pub fn bits(&self) -> &[usize] {
        &self.bits
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }
}

/// Distance of the split/keep ratio from a perfect 1.0.
///
/// A bit no sampled pair disagrees on cannot split anything and sorts last.
fn balance_distance(split: u64, keep: u64) -> f64 {
    match (split, keep) {
        (0, _) => f64::INFINITY,
        (_, 0) => f64::MAX,
        _ => (split as f64 / keep as f64 - 1.0).abs(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conetree_core::VecColumnStore;

    fn store(patterns: &[&str]) -> VecColumnStore {
        VecColumnStore::from_patterns(
            0,
            patterns.iter().map(|p| BitSet::from_bit_str(p).unwrap()),
        )
    }

    fn is_permutation(order: &SelectiveBitOrder, width: usize) -> bool {
        let mut bits = order.bits().to_vec();
        bits.sort_unstable();
        bits == (0..width).collect::<Vec<_>>()
    }

    #[test]
    fn test_natural_order() {
        assert_eq!(SelectiveBitOrder::natural(4).bits(), &[0, 1, 2, 3]);
        assert!(SelectiveBitOrder::natural(0).is_empty());
    }

    #[test]
    fn test_from_bits_validates_permutation() {
        assert!(SelectiveBitOrder::from_bits(vec![2, 0, 1]).is_some());
        assert!(SelectiveBitOrder::from_bits(vec![0, 0, 1]).is_none());
        assert!(SelectiveBitOrder::from_bits(vec![0, 3, 1]).is_none());
    }

    #[test]
    fn test_sampled_order_is_deterministic_permutation() {
        let pos = store(&["110010", "011001", "100110", "001011"]);
        let neg = store(&["010101", "101010", "111000"]);
        let stores: [&dyn ColumnStore; 2] = [&pos, &neg];

        let a = SelectiveBitOrder::sampled(6, &stores, 256, 7).unwrap();
        let b = SelectiveBitOrder::sampled(6, &stores, 256, 7).unwrap();
        assert_eq!(a, b);
        assert!(is_permutation(&a, 6));
    }

    #[test]
    fn test_constant_bits_sort_last() {
        // bit 0 is always set and bit 3 never: neither can split anything.
        let s = store(&["1100", "1010", "1110", "1000", "1010", "1100"]);
        let stores: [&dyn ColumnStore; 1] = [&s];
        let order = SelectiveBitOrder::sampled(4, &stores, 512, 1).unwrap();
        let tail: Vec<usize> = order.bits()[2..].to_vec();
        assert!(tail.contains(&0));
        assert!(tail.contains(&3));
    }

    #[test]
    fn test_too_few_rays_falls_back_to_natural() {
        let s = store(&["1010"]);
        let stores: [&dyn ColumnStore; 1] = [&s];
        let order = SelectiveBitOrder::sampled(4, &stores, 16, 0).unwrap();
        assert_eq!(order, SelectiveBitOrder::natural(4));
    }

    #[test]
    fn test_balance_distance() {
        assert_eq!(balance_distance(10, 10), 0.0);
        assert!(balance_distance(0, 10).is_infinite());
        assert!(balance_distance(5, 10) < balance_distance(30, 10));
    }
}
