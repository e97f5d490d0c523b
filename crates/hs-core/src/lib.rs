//! hs-core: stable foundation for the hybrid simulator.
//!
//! Contains:
//! - ids (stable compact component IDs)
//! - error (shared runtime error taxonomy)
//! - numeric (clock tolerances and step counting)
//! - timing (phase timers)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod timing;

// Re-exports: nice ergonomics for downstream crates
pub use error::{Origin, SimError, SimResult};
pub use ids::*;
pub use numeric::*;
