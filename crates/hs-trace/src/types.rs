//! Trace data types.

use hs_core::CompId;
use serde::{Deserialize, Serialize};

pub type TraceId = String;

/// A variable sampled on every recorded step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub comp: CompId,
    pub var: String,
}

impl Channel {
    pub fn new(comp: CompId, var: impl Into<String>) -> Self {
        Self {
            comp,
            var: var.into(),
        }
    }

    /// `"<comp>.<var>"`, used as a column label.
    pub fn label(&self) -> String {
        format!("{}.{}", self.comp, self.var)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceManifest {
    pub trace_id: TraceId,
    pub world: String,
    pub timestamp: String,
    pub time_step: f64,
    pub steps: u64,
    pub channels: Vec<Channel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiringRecord {
    pub comp: CompId,
    pub transition: String,
    pub from: String,
    pub to: String,
    pub pass: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    pub step: u64,
    pub clock: f64,
    /// One value per channel, in channel order.
    pub values: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub firings: Vec<FiringRecord>,
}

/// A finished recording.
#[derive(Debug, Clone)]
pub struct Trace {
    pub manifest: TraceManifest,
    pub records: Vec<TraceRecord>,
}

impl Trace {
    /// Samples of one channel over time.
    pub fn series(&self, channel: usize) -> Vec<(f64, f64)> {
        self.records
            .iter()
            .filter_map(|r| r.values.get(channel).map(|v| (r.clock, *v)))
            .collect()
    }

    pub fn firing_count(&self) -> usize {
        self.records.iter().map(|r| r.firings.len()).sum()
    }
}
