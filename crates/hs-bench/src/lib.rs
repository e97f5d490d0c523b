//! Benchmark framework for the hybrid simulator.
//!
//! Each scenario builds a world of identical components, warms it up for one
//! step, then times a fixed number of steps. Scenarios run independently, so
//! a suite fans them out over rayon's pool; each world stays on one thread.

pub mod scenarios;

use std::ops::ControlFlow;

use hs_core::timing::Timer;
use hs_core::SimError;
use hs_model::ModelError;
use hs_sim::{Optimizations, World};
use hs_trace::{Channel, TraceError, Tracer};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

pub use scenarios::build_world;

pub type BenchResult<T> = Result<T, BenchError>;

#[derive(thiserror::Error, Debug)]
pub enum BenchError {
    #[error("Simulation error: {0}")]
    Sim(#[from] SimError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Trace error: {0}")]
    Trace(#[from] TraceError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// What a scenario populates its world with.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScenarioKind {
    /// Harmonic oscillators: the integrator alone.
    Continuous,
    /// Oscillators whose derivatives go through algebraic variables.
    Algebraic,
    /// Components with only algebraic flows, plus `non_alg` integrating ones.
    AlgState { non_alg: usize },
    /// Pairs whose derivatives read each other through links.
    LinkedFlows,
    /// A chain of input connections between a source and a sink.
    Connect,
    /// Periodic sleepers, each followed by a chain of syncing watchers.
    Discrete { watchers: usize },
    /// Periodic senders pushing into receiver queues.
    Queue,
    /// Components with no transitions, plus `non_inert` cycling ones.
    Inertness { non_inert: usize },
    /// Many never-firing guards over strict or non-strict variables.
    Strictness { strict: bool },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkScenario {
    pub id: String,
    pub name: String,
    pub kind: ScenarioKind,
    pub components: usize,
    pub steps: u64,
}

impl BenchmarkScenario {
    pub fn new(id: &str, name: &str, kind: ScenarioKind, components: usize, steps: u64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            components,
            steps,
        }
    }

    /// Same scenario with `steps` divided by `factor` (at least one step).
    pub fn scaled_down(&self, factor: u64) -> Self {
        Self {
            steps: (self.steps / factor.max(1)).max(1),
            ..self.clone()
        }
    }
}

/// One timed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetrics {
    pub total_time_s: f64,
    pub continuous_time_s: f64,
    pub discrete_time_s: f64,
    pub steps: u64,
    pub firings: usize,
    pub clock: f64,
}

/// Aggregated statistics for multiple runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregateMetrics {
    pub run_count: usize,
    pub total_time_median_s: f64,
    pub total_time_min_s: f64,
    pub total_time_max_s: f64,
    pub continuous_time_median_s: f64,
    pub discrete_time_median_s: f64,
    /// Firings per run. Identical for every run of a deterministic world.
    pub firings: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub scenario: BenchmarkScenario,
    pub optimizations: Optimizations,
    pub runs: Vec<RunMetrics>,
    pub aggregate: AggregateMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkFailure {
    pub scenario_id: String,
    pub error: String,
}

/// Collection of benchmark results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkSuite {
    pub timestamp: String,
    pub results: Vec<BenchmarkResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<BenchmarkFailure>,
}

/// Build, warm up and time one world.
pub fn run_once(scenario: &BenchmarkScenario, optimizations: Optimizations) -> BenchResult<RunMetrics> {
    let mut world = build_world(scenario, optimizations)?;
    world.run(1)?;
    let before = world.profile();

    let mut firings = 0;
    let mut count = |w: &World| {
        firings += w.last_firings().len();
        ControlFlow::Continue(())
    };
    let timer = Timer::start();
    let steps = world.run_with(scenario.steps, &mut count)?;
    let total_time_s = timer.elapsed_s();

    let after = world.profile();
    Ok(RunMetrics {
        total_time_s,
        continuous_time_s: after.continuous_s - before.continuous_s,
        discrete_time_s: after.discrete_s - before.discrete_s,
        steps,
        firings,
        clock: world.clock(),
    })
}

/// Run a single benchmark scenario `times` times.
pub fn run_scenario(
    scenario: &BenchmarkScenario,
    times: usize,
    optimizations: Optimizations,
) -> BenchResult<BenchmarkResult> {
    let runs = (0..times)
        .map(|_| run_once(scenario, optimizations))
        .collect::<BenchResult<Vec<_>>>()?;
    tracing::debug!(scenario = %scenario.id, runs = runs.len(), "scenario finished");
    Ok(BenchmarkResult {
        scenario: scenario.clone(),
        optimizations,
        aggregate: compute_aggregates(&runs),
        runs,
    })
}

/// Run every scenario in parallel. Failures are collected, not fatal.
pub fn run_suite(
    scenarios: &[BenchmarkScenario],
    times: usize,
    optimizations: Optimizations,
) -> BenchmarkSuite {
    let outcomes: Vec<_> = scenarios
        .par_iter()
        .map(|s| (s.id.clone(), run_scenario(s, times, optimizations)))
        .collect();

    let mut results = Vec::new();
    let mut failures = Vec::new();
    for (scenario_id, outcome) in outcomes {
        match outcome {
            Ok(result) => results.push(result),
            Err(err) => {
                tracing::warn!(scenario = %scenario_id, error = %err, "benchmark failed");
                failures.push(BenchmarkFailure {
                    scenario_id,
                    error: err.to_string(),
                });
            }
        }
    }
    BenchmarkSuite {
        timestamp: chrono::Utc::now().to_rfc3339(),
        results,
        failures,
    }
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    values.get(values.len() / 2).copied().unwrap_or(0.0)
}

pub fn compute_aggregates(runs: &[RunMetrics]) -> AggregateMetrics {
    if runs.is_empty() {
        return AggregateMetrics::default();
    }
    let mut total: Vec<_> = runs.iter().map(|r| r.total_time_s).collect();
    let mut continuous: Vec<_> = runs.iter().map(|r| r.continuous_time_s).collect();
    let mut discrete: Vec<_> = runs.iter().map(|r| r.discrete_time_s).collect();

    AggregateMetrics {
        run_count: runs.len(),
        total_time_median_s: median(&mut total),
        total_time_min_s: total[0],
        total_time_max_s: total[total.len() - 1],
        continuous_time_median_s: median(&mut continuous),
        discrete_time_median_s: median(&mut discrete),
        firings: runs[0].firings,
    }
}

/// Trace digests of one scenario with every optimization on and off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Equivalence {
    pub scenario_id: String,
    pub optimized: String,
    pub plain: String,
}

impl Equivalence {
    pub fn matches(&self) -> bool {
        self.optimized == self.plain
    }
}

/// Digest of every variable of every component over `steps` steps.
pub fn trace_digest(
    scenario: &BenchmarkScenario,
    optimizations: Optimizations,
    steps: u64,
) -> BenchResult<String> {
    let mut world = build_world(scenario, optimizations)?;
    let channels = world
        .components()
        .flat_map(|c| c.kind().vars().iter().map(move |v| Channel::new(c.id(), &v.name)))
        .collect();
    let mut tracer = Tracer::new(channels).with_firings(true);
    tracer.sample(&world)?;
    world.run_with(steps, &mut tracer)?;
    Ok(tracer.finish(&world)?.manifest.trace_id)
}

/// Check that the optimizations leave the trajectory unchanged.
pub fn check_equivalence(scenario: &BenchmarkScenario, steps: u64) -> BenchResult<Equivalence> {
    Ok(Equivalence {
        scenario_id: scenario.id.clone(),
        optimized: trace_digest(scenario, Optimizations::default(), steps)?,
        plain: trace_digest(scenario, Optimizations::none(), steps)?,
    })
}

/// The standard suite, sized so each scenario takes a comparable amount of
/// work.
pub fn default_benchmarks() -> Vec<BenchmarkScenario> {
    use ScenarioKind::*;
    vec![
        BenchmarkScenario::new("continuous", "Pure integrator", Continuous, 1_000, 1_000),
        BenchmarkScenario::new("algebraic", "Algebraic flows", Algebraic, 1_000, 1_000),
        BenchmarkScenario::new(
            "alg_state",
            "Algebraic-only components",
            AlgState { non_alg: 0 },
            1_000,
            1_000,
        ),
        BenchmarkScenario::new("linked_flows", "Linked flows", LinkedFlows, 500, 1_000),
        BenchmarkScenario::new("connect", "Input chain", Connect, 1_000, 1_000),
        BenchmarkScenario::new(
            "discrete",
            "Sleepers with watchers",
            Discrete { watchers: 10 },
            100,
            1_000,
        ),
        BenchmarkScenario::new("queue", "Queue senders", Queue, 1_000, 1_000),
        BenchmarkScenario::new(
            "inertness",
            "Inert components",
            Inertness { non_inert: 1 },
            1_000,
            1_000,
        ),
        BenchmarkScenario::new(
            "strictness_on",
            "Strict guards",
            Strictness { strict: true },
            1_000,
            100,
        ),
        BenchmarkScenario::new(
            "strictness_off",
            "Non-strict guards",
            Strictness { strict: false },
            1_000,
            100,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(total: f64, firings: usize) -> RunMetrics {
        RunMetrics {
            total_time_s: total,
            continuous_time_s: total / 2.0,
            discrete_time_s: total / 4.0,
            steps: 10,
            firings,
            clock: 1.0,
        }
    }

    #[test]
    fn default_benchmarks_are_defined() {
        let benchmarks = default_benchmarks();
        assert!(!benchmarks.is_empty());
        assert!(benchmarks.iter().all(|b| !b.id.is_empty()));
        let mut ids: Vec<_> = benchmarks.iter().map(|b| b.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), benchmarks.len());
    }

    #[test]
    fn aggregates_take_median_min_and_max() {
        let runs = vec![metrics(3.0, 7), metrics(1.0, 7), metrics(2.0, 7)];
        let agg = compute_aggregates(&runs);
        assert_eq!(agg.run_count, 3);
        assert_eq!(agg.total_time_median_s, 2.0);
        assert_eq!(agg.total_time_min_s, 1.0);
        assert_eq!(agg.total_time_max_s, 3.0);
        assert_eq!(agg.continuous_time_median_s, 1.0);
        assert_eq!(agg.firings, 7);
    }

    #[test]
    fn empty_runs_aggregate_to_zero() {
        let agg = compute_aggregates(&[]);
        assert_eq!(agg.run_count, 0);
        assert_eq!(agg.total_time_median_s, 0.0);
    }

    #[test]
    fn scaling_keeps_at_least_one_step() {
        let s = BenchmarkScenario::new("x", "x", ScenarioKind::Continuous, 1, 10);
        assert_eq!(s.scaled_down(4).steps, 2);
        assert_eq!(s.scaled_down(100).steps, 1);
        assert_eq!(s.scaled_down(0).steps, 10);
    }

    #[test]
    fn suite_serializes() {
        let suite = BenchmarkSuite {
            timestamp: "2026-01-01T00:00:00Z".to_string(),
            results: vec![],
            failures: vec![],
        };
        let json = serde_json::to_string(&suite).unwrap();
        assert!(!json.contains("failures"));
        let back: BenchmarkSuite = serde_json::from_str(&json).unwrap();
        assert_eq!(back.timestamp, suite.timestamp);
    }

    #[test]
    fn scenario_kind_is_tagged() {
        let json = serde_json::to_string(&ScenarioKind::Discrete { watchers: 3 }).unwrap();
        assert_eq!(json, r#"{"kind":"discrete","watchers":3}"#);
    }
}
