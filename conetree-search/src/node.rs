// SPDX-License-Identifier: AGPL-3.0-or-later
// ConeTree - Pattern-Tree Adjacency Search
// Copyright (C) 2026 Sushanth Reddy Vanagala (https://github.com/sushanthpy)

//! # Pattern Tree Nodes
//!
//! Every node carries a *union pattern*: the OR of the zero patterns of all
//! rays below it. For any ray `r` under node `n`, `Z(r) ⊆ U(n)`, so
//! `|U(a) ∩ U(b)|` bounds the shared zero set of every ray pair drawn from
//! two subtrees. That bound is what licenses whole-subtree skips.
//!
//! ```text
//!                  Inter U = 1110
//!                 /              \
//!        Inter U = 1100       Unaray 0110
//!        /          \
//!   Unaray 1000   Leaf [4..6) U = 0100
//! ```
//!
//! Nodes are built once per iteration step and are immutable afterwards; each
//! node exclusively owns its children.

use std::ops::Range;

use conetree_core::{BitSet, ColumnStore, Result};

/// Element of a pattern tree.
#[derive(Debug, Clone)]
pub enum Node {
    /// Binary internal node split on one selective bit.
    Inter {
        union: BitSet,
        children: Box<[Node; 2]>,
    },
    /// Wide internal node split on several selective bits at once.
    Wide { union: BitSet, children: Vec<Node> },
    /// Range of rays in the store.
    Leaf { union: BitSet, range: Range<usize> },
    /// Exactly one ray; its union is the ray's own zero pattern.
    Unaray { union: BitSet, index: usize },
    /// No rays; carries an all-false pattern.
    Empty { union: BitSet },
}

impl Node {
    /// The canonical empty node for patterns of `width` bits.
    pub fn empty(width: usize) -> Self {
        Node::Empty {
            union: BitSet::with_capacity(width),
        }
    }

    /// Binary internal node over two children.
    pub fn inter(child0: Node, child1: Node) -> Self {
        let union = child0.union_pattern().or(child1.union_pattern());
        Node::Inter {
            union,
            children: Box::new([child0, child1]),
        }
    }

    /// Wide internal node over any number of children.
    pub fn wide(children: Vec<Node>) -> Self {
        debug_assert!(children.len() >= 2, "wide node needs at least two children");
        let mut union = children[0].union_pattern().clone();
        for child in &children[1..] {
            union.union_with(child.union_pattern());
        }
        Node::Wide { union, children }
    }

    /// OR of the zero patterns of every ray below this node.
    #[inline]
    pub fn union_pattern(&self) -> &BitSet {
        match self {
            Node::Inter { union, .. }
            | Node::Wide { union, .. }
            | Node::Leaf { union, .. }
            | Node::Unaray { union, .. }
            | Node::Empty { union } => union,
        }
    }

    /// Child nodes; empty for terminal nodes.
    #[inline]
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Inter { children, .. } => &children[..],
            Node::Wide { children, .. } => children,
            _ => &[],
        }
    }

    #[inline]
    pub fn is_binary(&self) -> bool {
        matches!(self, Node::Inter { .. })
    }

    #[inline]
    pub fn is_internal(&self) -> bool {
        matches!(self, Node::Inter { .. } | Node::Wide { .. })
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, Node::Empty { .. })
    }

    /// Number of rays below this node.
    pub fn ray_count(&self) -> usize {
        match self {
            Node::Inter { .. } | Node::Wide { .. } => {
                self.children().iter().map(Node::ray_count).sum()
            }
            Node::Leaf { range, .. } => range.len(),
            Node::Unaray { .. } => 1,
            Node::Empty { .. } => 0,
        }
    }

    /// Store indices of the rays held directly by a terminal node.
    pub fn ray_range(&self) -> Range<usize> {
        match self {
            Node::Leaf { range, .. } => range.clone(),
            Node::Unaray { index, .. } => *index..*index + 1,
            _ => 0..0,
        }
    }

    /// Append `(store index, zero pattern)` for every ray of a terminal node.
    ///
    /// Unaray nodes answer from their own union pattern; leaves read the store.
    pub fn collect_rays<'a>(
        &'a self,
        store: &'a dyn ColumnStore,
        out: &mut Vec<(usize, &'a BitSet)>,
    ) -> Result<()> {
        match self {
            Node::Unaray { union, index } => out.push((*index, union)),
            Node::Leaf { range, .. } => {
                for i in range.clone() {
                    out.push((i, store.column(i)?.zero_pattern()));
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Store indices of every ray in the subtree, in tree order.
    pub fn ray_indices(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.ray_count());
        self.push_ray_indices(&mut out);
        out
    }

    fn push_ray_indices(&self, out: &mut Vec<usize>) {
        if self.is_internal() {
            for child in self.children() {
                child.push_ray_indices(out);
            }
        } else {
            out.extend(self.ray_range());
        }
    }

    /// Longest root-to-leaf path, counting the root as depth 1.
    pub fn depth(&self) -> usize {
        1 + self.children().iter().map(Node::depth).max().unwrap_or(0)
    }

    /// Total number of nodes in the subtree.
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(Node::node_count).sum::<usize>()
    }
}
