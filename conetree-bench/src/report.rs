// SPDX-License-Identifier: AGPL-3.0-or-later
// ConeTree - Pattern-Tree Adjacency Search
// Copyright (C) 2026 Sushanth Reddy Vanagala (https://github.com/sushanthpy)

//! Pretty-print strategy results with a comparison table, CSV and JSON export.

use crate::{BenchResult, BenchSuite, StrategyResult};
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};
use std::path::Path;

// ────────────────────────────────────────────────────────────────────────────────
// Terminal output
// ────────────────────────────────────────────────────────────────────────────────

/// Comparison table of every strategy on the same workload.
pub fn print_strategy_comparison(results: &[StrategyResult]) {
    if results.is_empty() {
        return;
    }

    println!("\n{}", "━━━ Adjacency search ━━━".bold().cyan());

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS);

    table.set_header(vec![
        "Strategy",
        "Threads",
        "Runs",
        "p50 (ms)",
        "p99 (ms)",
        "Mean (ms)",
        "Pairs",
        "Leaf pairs",
        "Pruned",
        "Spawned",
        "Jobs",
    ]);

    let best = best_result(results).map(|r| r.label.as_str());

    for r in results {
        let is_best = Some(r.label.as_str()) == best;
        let (name_cell, p50_cell) = if is_best {
            (
                Cell::new(format!("★ {}", r.label)).fg(Color::Green),
                Cell::new(format!("{:.3}", r.p50_ms)).fg(Color::Green),
            )
        } else {
            (
                Cell::new(&r.label),
                Cell::new(format!("{:.3}", r.p50_ms)),
            )
        };

        table.add_row(vec![
            name_cell,
            Cell::new(r.threads),
            Cell::new(r.runs),
            p50_cell,
            Cell::new(format!("{:.3}", r.p99_ms)),
            Cell::new(format!("{:.3}", r.mean_ms)),
            Cell::new(format_count(r.pairs)),
            Cell::new(format_count(r.leaf_pairs)),
            Cell::new(format!("{:.1}%", r.prune_ratio * 100.0)),
            Cell::new(r.threads_spawned),
            Cell::new(r.jobs_queued),
        ]);
    }

    println!("{table}");

    for r in results.iter().filter(|r| r.barrier_breaks > 0) {
        println!(
            "  {} {}",
            r.label.dimmed(),
            format!("barrier_breaks={}", r.barrier_breaks).dimmed()
        );
    }
}

/// Print the full benchmark suite report.
pub fn print_suite(suite: &BenchSuite) {
    println!(
        "\n{}",
        "╔══════════════════════════════════════════════════════════════╗"
            .bold()
            .blue()
    );
    println!(
        "{}",
        "║           ConeTree Strategy Benchmark Report                 ║"
            .bold()
            .blue()
    );
    println!(
        "{}",
        "╚══════════════════════════════════════════════════════════════╝"
            .bold()
            .blue()
    );

    println!(
        "  OS: {}  Arch: {}  CPUs: {}",
        suite.system_info.os, suite.system_info.arch, suite.system_info.cpus
    );
    let w = &suite.workload;
    println!(
        "  Rays: +{} -{} 0:{}  Width: {}  Required zeros: {}",
        w.positive, w.negative, w.zero, w.width, w.required_zero_bits
    );

    print_strategy_comparison(&suite.results);

    if let (Some(best), Some(baseline)) = (
        best_result(&suite.results),
        suite.results.iter().find(|r| r.strategy == "sequential"),
    ) {
        if best.p50_ms > 0.0 {
            println!(
                "\n  {} {} at {:.2}x over sequential",
                "Fastest:".bold().yellow(),
                best.label.bold(),
                baseline.p50_ms / best.p50_ms
            );
        }
    }
}

fn best_result(results: &[StrategyResult]) -> Option<&StrategyResult> {
    results
        .iter()
        .filter(|r| r.runs > 0)
        .min_by(|a, b| a.p50_ms.total_cmp(&b.p50_ms))
}

// ────────────────────────────────────────────────────────────────────────────────
// CSV export
// ────────────────────────────────────────────────────────────────────────────────

pub fn export_csv(suite: &BenchSuite, path: &Path) -> BenchResult<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "label",
        "strategy",
        "threads",
        "runs",
        "total_secs",
        "p50_ms",
        "p99_ms",
        "mean_ms",
        "pairs",
        "leaf_pairs",
        "prune_ratio",
        "threads_spawned",
        "jobs_queued",
        "barrier_breaks",
    ])?;

    for r in &suite.results {
        wtr.write_record([
            &r.label,
            &r.strategy,
            &r.threads.to_string(),
            &r.runs.to_string(),
            &format!("{:.6}", r.total_secs),
            &format!("{:.4}", r.p50_ms),
            &format!("{:.4}", r.p99_ms),
            &format!("{:.4}", r.mean_ms),
            &r.pairs.to_string(),
            &r.leaf_pairs.to_string(),
            &format!("{:.4}", r.prune_ratio),
            &r.threads_spawned.to_string(),
            &r.jobs_queued.to_string(),
            &r.barrier_breaks.to_string(),
        ])?;
    }

    wtr.flush()?;
    println!("  CSV exported to {}", path.display());
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────────
// JSON export
// ────────────────────────────────────────────────────────────────────────────────

pub fn export_json(suite: &BenchSuite, path: &Path) -> BenchResult<()> {
    let json = serde_json::to_string_pretty(suite)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    std::fs::write(path, json)?;
    println!("  JSON exported to {}", path.display());
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────────
// Formatting helpers
// ────────────────────────────────────────────────────────────────────────────────

fn format_count(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.2}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        format!("{}", n)
    }
}
