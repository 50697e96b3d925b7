// SPDX-License-Identifier: AGPL-3.0-or-later
// ConeTree - Pattern-Tree Adjacency Search
// Copyright (C) 2026 Sushanth Reddy Vanagala (https://github.com/sushanthpy)

//! ConeTree strategy benchmark runner
//!
//! Usage:
//!   conetree-bench                                  # default matrix, all strategies
//!   conetree-bench --threads 8 --positive 4000      # bigger step
//!   conetree-bench --clustered --export results     # clustered patterns, CSV + JSON
//!   conetree-bench --strategies sequential,pool     # selected strategies

use clap::Parser;
use colored::Colorize;
use conetree_bench::report;
use conetree_bench::workloads::{self, WorkloadConfig};
use conetree_bench::{BenchError, BenchResult, BenchSuite, PatternModel, SystemInfo};
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "conetree-bench", about = "ConeTree adjacency-search strategy benchmark")]
#[command(version)]
struct Cli {
    /// Thread budget for the concurrent strategies.
    #[arg(long, default_value_t = num_threads())]
    threads: usize,

    /// Positive rays.
    #[arg(long, default_value = "1500")]
    positive: usize,

    /// Negative rays.
    #[arg(long, default_value = "1500")]
    negative: usize,

    /// Zero rays.
    #[arg(long, default_value = "200")]
    zero: usize,

    /// Zero-pattern width (number of constraints).
    #[arg(long, default_value = "48")]
    width: usize,

    /// Probability that a pattern bit is set.
    #[arg(long, default_value = "0.6")]
    density: f64,

    /// Draw patterns around random prototypes instead of uniformly.
    #[arg(long)]
    clustered: bool,

    /// Draw numeric coordinates and derive patterns with the zero tolerance.
    #[arg(long, conflicts_with = "clustered")]
    coordinates: bool,

    /// Prototype count for --clustered.
    #[arg(long, default_value = "16")]
    prototypes: usize,

    /// Per-bit flip probability for --clustered.
    #[arg(long, default_value = "0.08")]
    noise: f64,

    /// Common zeros required of an adjacent pair.
    #[arg(long, default_value = "20")]
    required: usize,

    /// Traversals per strategy.
    #[arg(long, default_value = "5")]
    repeats: usize,

    /// Generator seed.
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Job-queue expansion depth.
    #[arg(long, default_value_t = conetree_core::DEFAULT_MAX_LEVEL_DEPTH)]
    max_level_depth: usize,

    /// Only run these strategy labels (comma-separated).
    #[arg(long, value_delimiter = ',')]
    strategies: Vec<String>,

    /// Export directory for CSV + JSON results.
    #[arg(long)]
    export: Option<String>,

    /// Enable debug logging.
    #[arg(long)]
    debug: bool,
}

fn num_threads() -> usize {
    num_cpus::get().max(1)
}

fn main() -> BenchResult<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let model = if cli.clustered {
        PatternModel::Clustered {
            prototypes: cli.prototypes,
            density: cli.density,
            noise: cli.noise,
        }
    } else if cli.coordinates {
        PatternModel::Coordinates {
            density: cli.density,
        }
    } else {
        PatternModel::Uniform {
            density: cli.density,
        }
    };
    if !(0.0..=1.0).contains(&cli.density) || !(0.0..=1.0).contains(&cli.noise) {
        return Err(BenchError::Config(
            "--density and --noise must lie in [0, 1]".into(),
        ));
    }

    let cfg = WorkloadConfig {
        width: cli.width,
        positive: cli.positive,
        negative: cli.negative,
        zero: cli.zero,
        model,
        required_zero_bits: cli.required,
        repeats: cli.repeats,
        seed: cli.seed,
    };

    println!(
        "\n{}",
        "╔══════════════════════════════════════════════════════╗"
            .bold()
            .blue()
    );
    println!(
        "{}",
        "║        ConeTree Strategy Benchmark Suite             ║"
            .bold()
            .blue()
    );
    println!(
        "{}",
        "╚══════════════════════════════════════════════════════╝"
            .bold()
            .blue()
    );
    println!(
        "  Rays: +{} -{} 0:{}  Width: {}  Threads: {}  Repeats: {}",
        cfg.positive, cfg.negative, cfg.zero, cfg.width, cli.threads, cfg.repeats
    );

    let wanted: Vec<String> = cli.strategies.iter().map(|s| s.to_lowercase()).collect();
    let cases: Vec<_> = workloads::strategy_matrix(cli.threads, cli.max_level_depth)
        .into_iter()
        .filter(|case| wanted.is_empty() || wanted.contains(&case.label))
        .collect();
    if cases.is_empty() {
        return Err(BenchError::Config(
            "No strategies to benchmark. Check --strategies.".into(),
        ));
    }

    let mut suite = BenchSuite {
        system_info: SystemInfo::collect(),
        workload: cfg.clone(),
        results: Vec::new(),
    };

    println!("\n{}", "▶ Strategies".bold().green());
    for case in &cases {
        use std::io::Write;
        print!("  {} ... ", case.label);
        let _ = std::io::stdout().flush();
        match workloads::run_case(&cfg, case) {
            Ok(r) => {
                println!("{:.3} ms p50, {} pairs", r.p50_ms, r.pairs);
                suite.results.push(r);
            }
            Err(e) => println!("{}", format!("ERR({})", e).red()),
        }
    }

    if let Some(first) = suite.results.first() {
        if suite.results.iter().any(|r| r.pairs != first.pairs) {
            return Err(BenchError::Config(
                "strategies disagree on the adjacent pair count".into(),
            ));
        }
    }

    report::print_suite(&suite);

    if let Some(ref dir) = cli.export {
        let export_dir = Path::new(dir);
        std::fs::create_dir_all(export_dir)?;
        report::export_csv(&suite, &export_dir.join("strategy_results.csv"))?;
        report::export_json(&suite, &export_dir.join("strategy_results.json"))?;
    }

    Ok(())
}
