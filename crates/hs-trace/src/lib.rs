//! hs-trace: recording and fingerprinting simulation traces in memory.

pub mod hash;
pub mod tracer;
pub mod types;

pub use hash::compute_trace_id;
pub use tracer::Tracer;
pub use types::*;

pub type TraceResult<T> = Result<T, TraceError>;

#[derive(thiserror::Error, Debug)]
pub enum TraceError {
    #[error("Simulation error: {0}")]
    Sim(#[from] hs_core::SimError),
}
