//! Float comparisons for clock arithmetic.

use crate::{SimError, SimResult};

/// Absolute and relative slack for comparing accumulated clock values.
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: f64,
    pub rel: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: f64, b: f64, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    diff <= tol.abs || diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: f64, what: &'static str) -> SimResult<f64> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(SimError::NonFinite { what, value: v })
    }
}

/// Number of whole steps of `dt` needed to cover `duration`, at least one.
///
/// A ratio within tolerance of an integer counts as that integer, so
/// `0.3 / 0.1` is three steps rather than four.
pub fn whole_steps(duration: f64, dt: f64) -> SimResult<usize> {
    let duration = ensure_finite(duration, "duration")?;
    if duration < 0.0 {
        return Err(SimError::InvalidArg {
            what: "duration must be non-negative",
        });
    }
    let ratio = duration / dt;
    let nearest = ratio.round();
    let steps = if nearly_equal(ratio, nearest, Tolerances::default()) {
        nearest
    } else {
        ratio.ceil()
    };
    Ok((steps as usize).max(1))
}
