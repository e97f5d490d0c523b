//! Per-component variable storage for the stage-interleaved integrator.

use std::cell::Cell;

/// Cached algebraic value stamped with the evaluation round it belongs to.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Cached {
    pub round: u64,
    pub value: f64,
}

/// Stage values of a delayed signal, one row per step.
#[derive(Debug, Clone)]
pub(crate) struct DelayLine {
    rows: Vec<[f64; 4]>,
    head: usize,
}

impl DelayLine {
    pub fn new(steps: usize, fill: f64) -> Self {
        Self {
            rows: vec![[fill; 4]; steps.max(1)],
            head: 0,
        }
    }

    /// Stage values recorded `len()` steps ago.
    pub fn oldest(&self) -> &[f64; 4] {
        &self.rows[self.head]
    }

    /// Overwrite the oldest row with this step's samples. Returns the value
    /// the next step starts from.
    pub fn record(&mut self, samples: [f64; 4]) -> f64 {
        self.rows[self.head] = samples;
        self.head = (self.head + 1) % self.rows.len();
        self.rows[self.head][0]
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Variable values of one component.
///
/// `values` holds committed values (the step-start point while a step is
/// being integrated). `staged` is the evaluation point of the current RK
/// stage. `slopes` holds the per-stage samples of stepped flows.
/// `previous` is the snapshot lazy readers observe; only components some
/// lazy link currently reads carry one.
#[derive(Debug, Clone)]
pub(crate) struct VarStore {
    pub values: Vec<f64>,
    pub staged: Vec<f64>,
    pub slopes: Vec<[f64; 4]>,
    pub cache: Vec<Cell<Cached>>,
    pub busy: Vec<Cell<bool>>,
    pub previous: Option<Vec<f64>>,
    pub delays: Vec<Option<DelayLine>>,
}

impl VarStore {
    pub fn new(values: Vec<f64>) -> Self {
        let n = values.len();
        Self {
            staged: values.clone(),
            slopes: vec![[0.0; 4]; n],
            cache: values
                .iter()
                .map(|&value| Cell::new(Cached { round: 0, value }))
                .collect(),
            busy: (0..n).map(|_| Cell::new(false)).collect(),
            previous: None,
            delays: vec![None; n],
            values,
        }
    }

    /// Load the step-start point into the stage buffer.
    pub fn begin_step(&mut self) {
        self.staged.copy_from_slice(&self.values);
    }

    /// Cached value for `var` if it was computed in `round`.
    pub fn cached(&self, var: usize, round: u64) -> Option<f64> {
        let c = self.cache[var].get();
        (c.round == round && round != 0).then_some(c.value)
    }

    pub fn store(&self, var: usize, round: u64, value: f64) {
        self.cache[var].set(Cached { round, value });
    }
}
