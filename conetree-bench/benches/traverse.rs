// SPDX-License-Identifier: AGPL-3.0-or-later
// ConeTree - Pattern-Tree Adjacency Search
// Copyright (C) 2026 Sushanth Reddy Vanagala (https://github.com/sushanthpy)

//! Criterion microbenchmarks for tree construction and traversal strategies.
//!
//! Run with: `cargo bench --bench traverse`

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use conetree_bench::workloads::strategy_matrix;
use conetree_bench::{DataGen, PatternModel};
use conetree_core::{AdjacencyConfig, AdjacencyThreshold, BitOrderStrategy, NodeShape};
use conetree_search::{PairSink, Root, Traverser};

const WIDTH: usize = 40;
const REQUIRED: usize = 16;
const MODEL: PatternModel = PatternModel::Uniform { density: 0.6 };

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_build");

    let shapes = [
        ("binary", AdjacencyConfig::sequential()),
        (
            "wide3",
            AdjacencyConfig::sequential().with_node_shape(NodeShape::Wide { bits_to_use: 3 }),
        ),
        (
            "natural_order",
            AdjacencyConfig::sequential().with_bit_order(BitOrderStrategy::Natural),
        ),
    ];

    for rays in [500usize, 2_000] {
        for (name, config) in &shapes {
            group.bench_with_input(BenchmarkId::new(*name, rays), &rays, |b, &n| {
                let stores = DataGen::new(42).ray_stores(MODEL, WIDTH, n, n, n / 10);
                b.iter(|| {
                    let mut stores = stores.clone();
                    Root::build(config, AdjacencyThreshold::new(REQUIRED), &mut stores).unwrap()
                });
            });
        }
    }
    group.finish();
}

fn bench_traverse(c: &mut Criterion) {
    let mut group = c.benchmark_group("traverse");
    group.sample_size(20);
    let threads = num_cpus::get().clamp(2, 8);
    let rays = 1_500usize;

    for case in strategy_matrix(threads, 6) {
        group.bench_function(BenchmarkId::new(&case.label, rays), |b| {
            let mut stores = DataGen::new(7).ray_stores(MODEL, WIDTH, rays, rays, rays / 10);
            let root =
                Root::build(&case.config, AdjacencyThreshold::new(REQUIRED), &mut stores).unwrap();
            let traverser = Traverser::new(case.config.clone()).unwrap();

            b.iter(|| {
                let sink = PairSink::new();
                traverser.traverse(&root, &stores, &sink).unwrap();
                sink.len()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build, bench_traverse);
criterion_main!(benches);
