//! Lightweight performance timing utilities.
//!
//! The world accumulates time spent in the continuous and discrete phases
//! when profiling is switched on in its configuration; benchmarks read the
//! totals back out.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// A simple timer that measures elapsed time.
#[derive(Debug)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Create and start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Elapsed time in seconds.
    pub fn elapsed_s(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// Accumulating timer for tracking total time across multiple calls.
#[derive(Debug, Default)]
pub struct AccumulatingTimer {
    total_ns: AtomicU64,
    count: AtomicU64,
}

impl AccumulatingTimer {
    /// Create a new accumulating timer.
    pub const fn new() -> Self {
        Self {
            total_ns: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Record a timing measurement.
    pub fn record(&self, duration_s: f64) {
        let nanos = (duration_s * 1e9) as u64;
        self.total_ns.fetch_add(nanos, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the time elapsed on a running timer.
    pub fn record_since(&self, timer: &Timer) {
        self.record(timer.elapsed_s());
    }

    /// Get total time spent (in seconds).
    pub fn total_seconds(&self) -> f64 {
        self.total_ns.load(Ordering::Relaxed) as f64 / 1e9
    }

    /// Get number of calls.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Get average time per call (in seconds).
    pub fn average_seconds(&self) -> f64 {
        let count = self.count();
        if count > 0 {
            self.total_seconds() / count as f64
        } else {
            0.0
        }
    }

    /// Reset the timer.
    pub fn reset(&self) {
        self.total_ns.store(0, Ordering::Relaxed);
        self.count.store(0, Ordering::Relaxed);
    }
}

/// Per-phase accumulated timings of a stepping loop.
#[derive(Debug, Default)]
pub struct PhaseProfile {
    /// Time spent integrating continuous state.
    pub continuous: AccumulatingTimer,
    /// Time spent resolving discrete instants.
    pub discrete: AccumulatingTimer,
}

impl PhaseProfile {
    /// Snapshot the totals into a plain value.
    pub fn summary(&self) -> ProfileSummary {
        ProfileSummary {
            continuous_s: self.continuous.total_seconds(),
            continuous_calls: self.continuous.count(),
            discrete_s: self.discrete.total_seconds(),
            discrete_calls: self.discrete.count(),
        }
    }

    pub fn reset(&self) {
        self.continuous.reset();
        self.discrete.reset();
    }
}

/// Plain copy of a [`PhaseProfile`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProfileSummary {
    pub continuous_s: f64,
    pub continuous_calls: u64,
    pub discrete_s: f64,
    pub discrete_calls: u64,
}
