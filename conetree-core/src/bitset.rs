// SPDX-License-Identifier: AGPL-3.0-or-later
// ConeTree - Pattern-Tree Adjacency Search
// Copyright (C) 2026 Sushanth Reddy Vanagala (https://github.com/sushanthpy)

//! # Fixed-Width Bit Patterns
//!
//! `BitSet` is the zero pattern of a ray: bit `i` is set iff coordinate `i`
//! of the ray is zero. Every decision the adjacency search makes reduces to a
//! handful of word-parallel queries on these patterns:
//!
//! | Query                | Used by                                  | Cost   |
//! |----------------------|------------------------------------------|--------|
//! | `and_count`          | pruning gate, leaf test                  | O(n/64)|
//! | `or`                 | node union patterns                      | O(n/64)|
//! | `is_subset_of`       | minimality filter                        | O(n/64)|
//! | `xor_count`          | selective-bit order sampling             | O(n/64)|
//! | `count`              | excess cardinalities                     | O(1)   |
//!
//! The cardinality is cached at construction so the leaf test never pays a
//! popcount for a pattern it already owns. Patterns are built once and then
//! only read; the binary operations return new sets.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense fixed-width bit pattern with cached cardinality.
///
/// Bit `i` lives at `words[i / 64] & (1 << (i % 64))`. Bits at or beyond
/// `capacity` are always clear.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BitSet {
    words: Vec<u64>,
    capacity: usize,
    count: usize,
}

impl BitSet {
    /// Create an all-false pattern of `capacity` bits.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            words: vec![0u64; capacity.div_ceil(64)],
            capacity,
            count: 0,
        }
    }

    /// Create a pattern from the positions of its set bits.
    pub fn from_iter(capacity: usize, iter: impl IntoIterator<Item = usize>) -> Self {
        let mut bs = Self::with_capacity(capacity);
        for bit in iter {
            bs.set(bit);
        }
        bs
    }

    /// Parse a pattern written as a string of `0`/`1`, bit 0 first.
    ///
    /// `"1010"` sets bits 0 and 2. Any other character is rejected.
    pub fn from_bit_str(bits: &str) -> Option<Self> {
        let mut bs = Self::with_capacity(bits.len());
        for (i, c) in bits.chars().enumerate() {
            match c {
                '1' => bs.set(i),
                '0' => {}
                _ => return None,
            }
        }
        Some(bs)
    }

    /// Width of the pattern in bits.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of set bits.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Are all bits clear?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Set bit `pos`. Only used while a pattern is being built.
    #[inline]
    pub fn set(&mut self, pos: usize) {
        debug_assert!(pos < self.capacity, "BitSet::set out of bounds: {} >= {}", pos, self.capacity);
        if let Some(word) = self.words.get_mut(pos / 64) {
            let mask = 1u64 << (pos % 64);
            if *word & mask == 0 {
                *word |= mask;
                self.count += 1;
            }
        }
    }

    /// Test bit `pos`.
    #[inline]
    pub fn contains(&self, pos: usize) -> bool {
        if pos >= self.capacity {
            return false;
        }
        self.words
            .get(pos / 64)
            .map_or(false, |w| w & (1u64 << (pos % 64)) != 0)
    }

    /// Intersection (AND) as a new pattern.
    pub fn and(&self, other: &BitSet) -> BitSet {
        let words: Vec<u64> = self
            .words
            .iter()
            .zip(other.words.iter().chain(std::iter::repeat(&0)))
            .map(|(a, b)| a & b)
            .collect();
        Self::from_words(words, self.capacity)
    }

    /// Union (OR) as a new pattern. The result is as wide as the wider input.
    pub fn or(&self, other: &BitSet) -> BitSet {
        let (wide, narrow) = if self.words.len() >= other.words.len() {
            (self, other)
        } else {
            (other, self)
        };
        let mut words = wide.words.clone();
        for (w, n) in words.iter_mut().zip(narrow.words.iter()) {
            *w |= n;
        }
        Self::from_words(words, self.capacity.max(other.capacity))
    }

    /// In-place union, used when folding the union pattern of a node.
    pub fn union_with(&mut self, other: &BitSet) {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
            self.capacity = other.capacity;
        }
        for (w, o) in self.words.iter_mut().zip(other.words.iter()) {
            *w |= o;
        }
        self.recount();
    }

    /// `|self ∩ other|` without materialising the intersection.
    #[inline]
    pub fn and_count(&self, other: &BitSet) -> usize {
        self.words
            .iter()
            .zip(other.words.iter())
            .map(|(a, b)| (a & b).count_ones() as usize)
            .sum()
    }

    /// `|self ⊕ other|`, the Hamming distance of the two patterns.
    pub fn xor_count(&self, other: &BitSet) -> usize {
        let shared = self.words.len().min(other.words.len());
        let head: usize = self.words[..shared]
            .iter()
            .zip(&other.words[..shared])
            .map(|(a, b)| (a ^ b).count_ones() as usize)
            .sum();
        let tail: usize = self.words[shared..]
            .iter()
            .chain(&other.words[shared..])
            .map(|w| w.count_ones() as usize)
            .sum();
        head + tail
    }

    /// Is every bit of `self` also set in `other`?
    pub fn is_subset_of(&self, other: &BitSet) -> bool {
        if self.count > other.count {
            return false;
        }
        self.words.iter().enumerate().all(|(i, w)| {
            let o = other.words.get(i).copied().unwrap_or(0);
            w & !o == 0
        })
    }

    /// `self ⊂ other` and `self != other`.
    pub fn is_strict_subset_of(&self, other: &BitSet) -> bool {
        self.count < other.count && self.is_subset_of(other)
    }

    /// Iterate over the positions of set bits.
    pub fn iter(&self) -> BitSetIter<'_> {
        BitSetIter {
            words: &self.words,
            word_idx: 0,
            current_word: self.words.first().copied().unwrap_or(0),
            base: 0,
        }
    }

    /// Raw word storage.
    #[inline]
    pub fn as_words(&self) -> &[u64] {
        &self.words
    }

    fn from_words(words: Vec<u64>, capacity: usize) -> Self {
        let mut bs = Self {
            words,
            capacity,
            count: 0,
        };
        bs.recount();
        bs
    }

    fn recount(&mut self) {
        self.count = self.words.iter().map(|w| w.count_ones() as usize).sum();
    }
}

impl fmt::Debug for BitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitSet({}, count={})", self, self.count)
    }
}

impl fmt::Display for BitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.capacity {
            f.write_str(if self.contains(i) { "1" } else { "0" })?;
        }
        Ok(())
    }
}

/// Iterator over set bit positions, using hardware `trailing_zeros`.
pub struct BitSetIter<'a> {
    words: &'a [u64],
    word_idx: usize,
    current_word: u64,
    base: usize,
}

impl Iterator for BitSetIter<'_> {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        loop {
            if self.current_word != 0 {
                let tz = self.current_word.trailing_zeros() as usize;
                self.current_word &= self.current_word - 1;
                return Some(self.base + tz);
            }

            self.word_idx += 1;
            if self.word_idx >= self.words.len() {
                return None;
            }

            self.current_word = self.words[self.word_idx];
            self.base = self.word_idx * 64;
        }
    }
}
