//! Standalone benchmark runner.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use hs_bench::{
    BenchmarkScenario, BenchmarkSuite, check_equivalence, default_benchmarks, run_suite,
};
use hs_sim::Optimizations;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hs-bench")]
#[command(about = "Benchmark suite for the hybrid simulator", long_about = None)]
struct Cli {
    /// Timed runs per scenario
    #[arg(short, long, default_value_t = 5)]
    runs: usize,
    /// Only run scenarios whose id contains this string
    #[arg(short, long)]
    filter: Option<String>,
    /// Divide every scenario's step count by this factor
    #[arg(long, default_value_t = 1)]
    scale_down: u64,
    /// Also run with every optimization switched off
    #[arg(long)]
    compare: bool,
    /// Check that optimizations leave trajectories unchanged, over this many steps
    #[arg(long)]
    verify: Option<u64>,
    /// Write the JSON report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let scenarios: Vec<BenchmarkScenario> = default_benchmarks()
        .into_iter()
        .filter(|s| cli.filter.as_deref().is_none_or(|f| s.id.contains(f)))
        .map(|s| s.scaled_down(cli.scale_down))
        .collect();
    tracing::info!(scenarios = scenarios.len(), runs = cli.runs, "starting benchmarks");

    let mut failed = false;
    if let Some(steps) = cli.verify {
        for scenario in &scenarios {
            let check = check_equivalence(scenario, steps)?;
            if check.matches() {
                tracing::info!(scenario = %scenario.id, digest = %check.optimized, "trajectories match");
            } else {
                failed = true;
                tracing::error!(
                    scenario = %scenario.id,
                    optimized = %check.optimized,
                    plain = %check.plain,
                    "optimizations changed the trajectory"
                );
            }
        }
    }

    let mut suites = vec![run_suite(&scenarios, cli.runs, Optimizations::default())];
    if cli.compare {
        suites.push(run_suite(&scenarios, cli.runs, Optimizations::none()));
    }
    for suite in &suites {
        summarize(suite);
        failed |= !suite.failures.is_empty();
    }

    let json = if suites.len() == 1 {
        serde_json::to_string_pretty(&suites[0])?
    } else {
        serde_json::to_string_pretty(&suites)?
    };
    match &cli.output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, json)?;
            tracing::info!(path = %path.display(), "report saved");
        }
        None => println!("{json}"),
    }

    if failed {
        return Err("some benchmarks failed".into());
    }
    Ok(())
}

fn summarize(suite: &BenchmarkSuite) {
    for result in &suite.results {
        let agg = &result.aggregate;
        tracing::info!(
            scenario = %result.scenario.id,
            optimized = result.optimizations != Optimizations::none(),
            median_s = agg.total_time_median_s,
            min_s = agg.total_time_min_s,
            max_s = agg.total_time_max_s,
            continuous_s = agg.continuous_time_median_s,
            discrete_s = agg.discrete_time_median_s,
            firings = agg.firings,
            "{}",
            result.scenario.name
        );
    }
    for failure in &suite.failures {
        tracing::error!(scenario = %failure.scenario_id, error = %failure.error, "benchmark failed");
    }
}
