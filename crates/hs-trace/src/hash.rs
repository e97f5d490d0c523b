//! Content-based hashing for trace IDs.

use sha2::{Digest, Sha256};

use crate::types::{Channel, TraceRecord};

/// Fingerprint a recording. Identical runs produce identical IDs, so the
/// ID doubles as a determinism check.
pub fn compute_trace_id(time_step: f64, channels: &[Channel], records: &[TraceRecord]) -> String {
    let mut hasher = Sha256::new();

    hasher.update(time_step.to_le_bytes());

    let channels_json = serde_json::to_string(channels).unwrap_or_default();
    hasher.update(channels_json.as_bytes());

    for record in records {
        let line = serde_json::to_string(record).unwrap_or_default();
        hasher.update(line.as_bytes());
    }

    let result = hasher.finalize();
    format!("{:x}", result)
}
