//! Tessera tiling benchmarks and coverage validation
//!
//! Measures, for each configured tiling:
//! 1. Template count and enumeration throughput
//! 2. Nearest-template query time over random points
//! 3. Worst nearest-template mismatch versus the configured maximum
//! 4. Cubic versus A_n* template counts for the same space

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;
use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tessera_math::LatticeKind;
use tessera_tiling::{NearestBuffers, TilingConfig};

#[derive(Parser, Debug)]
#[command(name = "tessera-bench", about = "Benchmark and validate flat lattice tilings")]
struct Args {
    /// JSON tiling configuration; runs the built-in presets when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of random points for the nearest-template query
    #[arg(long, default_value_t = 1000)]
    random_points: usize,

    /// Seed for random point generation
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Print one JSON summary per tiling instead of the text report
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let args = Args::parse();
    if args.random_points == 0 {
        bail!("--random-points must be at least 1");
    }

    let configs = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let config = TilingConfig::from_json_str(&text)
                .with_context(|| format!("parsing {}", path.display()))?;
            vec![(path.display().to_string(), config)]
        }
        None => TilingConfig::presets()
            .into_iter()
            .map(|(name, config)| (name.to_string(), config))
            .collect(),
    };

    if !args.json {
        println!("=== Tessera Tiling Benchmarks ===\n");
    }
    for (name, config) in &configs {
        bench_tiling(name, config, &args)?;
    }

    if !args.json {
        println!("=== Lattice Comparison ===\n");
        for (name, config) in &configs {
            compare_lattices(name, config)?;
        }
        println!("=== All benchmarks complete ===");
    }
    Ok(())
}

// ─── Benchmarks ──────────────────────────────────

fn bench_tiling(name: &str, config: &TilingConfig, args: &Args) -> Result<()> {
    let mut tiling = config
        .build()
        .with_context(|| format!("building tiling '{}'", name))?;

    let start = Instant::now();
    let count = tiling.count_total_points()?;
    let enum_elapsed = start.elapsed();
    let per_point_ns = enum_elapsed.as_nanos() as f64 / count as f64;

    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut buffers = NearestBuffers::new();
    let start = Instant::now();
    tiling.nearest_to_random_points(&mut rng, args.random_points, &mut buffers)?;
    let nearest_elapsed = start.elapsed();
    tiling.restart()?;

    let worst = buffers.max_distance().unwrap_or(0.0);
    let mean = buffers.nearest_distances.iter().sum::<f64>() / buffers.len() as f64;
    let covered = worst <= config.max_mismatch * (1.0 + 1e-9);
    if !covered {
        tracing::warn!(tiling = name, worst, max_mismatch = config.max_mismatch, "mismatch exceeded");
    }

    if args.json {
        let summary = serde_json::json!({
            "tiling": name,
            "dimensions": tiling.dimensions(),
            "tiled_dimensions": tiling.tiled_dimensions(),
            "lattice": config.lattice,
            "templates": count,
            "enumeration_ms": enum_elapsed.as_secs_f64() * 1000.0,
            "nearest_ms": nearest_elapsed.as_secs_f64() * 1000.0,
            "random_points": args.random_points,
            "max_mismatch": config.max_mismatch,
            "worst_mismatch": worst,
            "mean_mismatch": mean,
            "covered": covered,
        });
        println!("{}", serde_json::to_string(&summary)?);
        return Ok(());
    }

    println!(
        "[{name}] {count} templates in {:.2}ms ({:.1}ns/template, {} of {} dims tiled)",
        enum_elapsed.as_secs_f64() * 1000.0,
        per_point_ns,
        tiling.tiled_dimensions(),
        tiling.dimensions(),
    );
    println!(
        "[{name}] nearest query: {} points in {:.2}ms",
        args.random_points,
        nearest_elapsed.as_secs_f64() * 1000.0,
    );
    println!(
        "[{name}] mismatch: worst {:.5}, mean {:.5}, max {:.5} -> {}",
        worst,
        mean,
        config.max_mismatch,
        if covered { "PASS" } else { "FAIL" },
    );
    print_increments(name, &tiling.increments()?);
    println!();
    Ok(())
}

fn print_increments(name: &str, increments: &DMatrix<f64>) {
    for (j, column) in increments.column_iter().enumerate() {
        let entries: Vec<String> = column.iter().map(|v| format!("{:+.4}", v)).collect();
        println!("[{name}] increment {j}: [{}]", entries.join(", "));
    }
}

fn compare_lattices(name: &str, config: &TilingConfig) -> Result<()> {
    let mut counts = Vec::new();
    for lattice in [LatticeKind::Cubic, LatticeKind::Anstar] {
        let mut variant = config.clone();
        variant.lattice = lattice;
        let mut tiling = variant
            .build()
            .with_context(|| format!("building '{}' with {:?}", name, lattice))?;
        counts.push((lattice, tiling.count_total_points()?));
    }

    let cubic = counts[0].1 as f64;
    for (lattice, count) in &counts {
        println!(
            "[{name}] {:?}: {count} templates ({:.2}x cubic)",
            lattice,
            *count as f64 / cubic,
        );
    }
    println!();
    Ok(())
}
