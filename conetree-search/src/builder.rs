// SPDX-License-Identifier: AGPL-3.0-or-later
// ConeTree - Pattern-Tree Adjacency Search
// Copyright (C) 2026 Sushanth Reddy Vanagala (https://github.com/sushanthpy)

//! # Tree Builder
//!
//! Recursively partitions a ray range of a [`ColumnStore`] in place, following
//! a [`SelectiveBitOrder`], and returns the pattern tree over it.
//!
//! ```text
//! build(range, first_bit):
//!   |range| == 0              → Empty
//!   |range| == 1              → Unaray
//!   |range| <= max_leaf_size  → Leaf
//!   otherwise                 → NodeFactory::split
//! ```
//!
//! Factories implement the node shape. Both shipped factories shorten paths:
//! a bit that leaves every ray on one side is skipped instead of producing a
//! single-child node. When no remaining bit separates a range, its rays have
//! identical zero patterns and become one leaf regardless of `max_leaf_size`.

use std::ops::Range;

use conetree_core::{AdjacencyConfig, BitSet, ColumnStore, NodeShape, Result};

use crate::bit_order::SelectiveBitOrder;
use crate::node::Node;

/// Node-shape policy used by the [`TreeBuilder`].
pub trait NodeFactory: Send + Sync {
    fn name(&self) -> &'static str;

    /// Build an internal node (or a leaf, if nothing splits) over `range`,
    /// whose size is above the leaf threshold. `level` is the depth of the
    /// node being built, the root being level 0.
    fn split(
        &self,
        ctx: &mut BuildContext<'_>,
        range: Range<usize>,
        first_bit: usize,
        level: usize,
    ) -> Result<Node>;
}

/// One selective bit per level, two children per node.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryNodeFactory;

impl NodeFactory for BinaryNodeFactory {
    fn name(&self) -> &'static str {
        "binary"
    }

    fn split(
        &self,
        ctx: &mut BuildContext<'_>,
        range: Range<usize>,
        first_bit: usize,
        level: usize,
    ) -> Result<Node> {
        let mut next = first_bit;
        while next < ctx.order.len() {
            let bit = ctx.order[next];
            next += 1;
            let split = ctx.store.partition(range.clone(), bit)?;
            if split == range.start || split == range.end {
                continue;
            }
            let child0 = ctx.build(range.start..split, next, level + 1)?;
            let child1 = ctx.build(split..range.end, next, level + 1)?;
            return Ok(Node::inter(child0, child1));
        }
        ctx.terminal(range)
    }
}

/// Up to `2^bits` children per node; the bit budget halves with each level.
#[derive(Debug, Clone, Copy)]
pub struct WideNodeFactory {
    bits_to_use: usize,
}

impl WideNodeFactory {
    pub fn new(bits_to_use: usize) -> Self {
        Self {
            bits_to_use: bits_to_use.max(1),
        }
    }

    /// Bits grouped on at `level`: half the parent's budget, at least one.
    pub fn bits_at(&self, level: usize) -> usize {
        let shift = level.min(usize::BITS as usize - 1);
        (self.bits_to_use >> shift).max(1)
    }
}

impl NodeFactory for WideNodeFactory {
    fn name(&self) -> &'static str {
        "wide"
    }

    fn split(
        &self,
        ctx: &mut BuildContext<'_>,
        range: Range<usize>,
        first_bit: usize,
        level: usize,
    ) -> Result<Node> {
        let budget = self.bits_at(level);
        let mut groups = vec![range.clone()];
        let mut used = 0;
        let mut next = first_bit;

        while used < budget && next < ctx.order.len() {
            let bit = ctx.order[next];
            next += 1;
            let mut refined = Vec::with_capacity(groups.len() * 2);
            let mut separated = false;
            for group in &groups {
                let split = ctx.store.partition(group.clone(), bit)?;
                if split > group.start && split < group.end {
                    separated = true;
                }
                if split > group.start {
                    refined.push(group.start..split);
                }
                if split < group.end {
                    refined.push(split..group.end);
                }
            }
            if separated {
                groups = refined;
                used += 1;
            }
        }

        if groups.len() < 2 {
            return ctx.terminal(range);
        }
        let children = groups
            .into_iter()
            .map(|g| ctx.build(g, next, level + 1))
            .collect::<Result<Vec<_>>>()?;
        Ok(Node::wide(children))
    }
}

/// Mutable state of one tree construction.
pub struct BuildContext<'a> {
    store: &'a mut dyn ColumnStore,
    order: &'a [usize],
    factory: &'a dyn NodeFactory,
    max_leaf_size: usize,
}

impl BuildContext<'_> {
    /// Build the subtree over `range`, splitting from `first_bit` onwards.
    pub fn build(&mut self, range: Range<usize>, first_bit: usize, level: usize) -> Result<Node> {
        debug_assert!(range.start <= range.end, "inverted ray range {:?}", range);
        debug_assert!(range.end <= self.store.column_count(), "ray range {:?} past store end", range);

        if range.len() <= self.max_leaf_size.max(1) {
            return self.terminal(range);
        }
        let factory = self.factory;
        factory.split(self, range, first_bit, level)
    }

    /// Terminal node holding every ray of `range` directly.
    pub fn terminal(&mut self, range: Range<usize>) -> Result<Node> {
        match range.len() {
            0 => Ok(Node::empty(self.order.len())),
            1 => Ok(Node::Unaray {
                union: self.store.column(range.start)?.zero_pattern().clone(),
                index: range.start,
            }),
            _ => {
                let mut union = BitSet::with_capacity(self.order.len());
                for i in range.clone() {
                    union.union_with(self.store.column(i)?.zero_pattern());
                }
                Ok(Node::Leaf { union, range })
            }
        }
    }
}

/// Builds pattern trees with a configurable node shape and leaf size.
pub struct TreeBuilder {
    factory: Box<dyn NodeFactory>,
    max_leaf_size: usize,
}

impl TreeBuilder {
    pub fn new(factory: Box<dyn NodeFactory>, max_leaf_size: usize) -> Self {
        Self {
            factory,
            max_leaf_size: max_leaf_size.max(1),
        }
    }

    /// Binary trees with single-ray leaves.
    pub fn binary() -> Self {
        Self::new(Box::new(BinaryNodeFactory), 1)
    }

    pub fn from_config(config: &AdjacencyConfig) -> Self {
        let factory: Box<dyn NodeFactory> = match config.node_shape {
            NodeShape::Binary => Box::new(BinaryNodeFactory),
            NodeShape::Wide { bits_to_use } => Box::new(WideNodeFactory::new(bits_to_use)),
        };
        Self::new(factory, config.max_leaf_size)
    }

    /// Build the tree over `range`, using bits of `order` from `first_bit` on.
    pub fn build(
        &self,
        store: &mut dyn ColumnStore,
        range: Range<usize>,
        order: &SelectiveBitOrder,
        first_bit: usize,
    ) -> Result<Node> {
        let mut ctx = BuildContext {
            store,
            order: order.bits(),
            factory: self.factory.as_ref(),
            max_leaf_size: self.max_leaf_size,
        };
        ctx.build(range, first_bit, 0)
    }

    /// Build the tree over every ray of `store`.
    pub fn build_all(&self, store: &mut dyn ColumnStore, order: &SelectiveBitOrder) -> Result<Node> {
        let len = store.column_count();
        let tree = self.build(store, 0..len, order, 0)?;
        tracing::debug!(
            shape = self.factory.name(),
            rays = len,
            depth = tree.depth(),
            nodes = tree.node_count(),
            "Built pattern tree"
        );
        Ok(tree)
    }
}
