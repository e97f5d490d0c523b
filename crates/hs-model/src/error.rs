//! Kind construction errors.

use hs_core::SimError;
use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

/// Errors detected while freezing a kind descriptor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Kind {kind}: duplicate {what} name `{name}`")]
    DuplicateName {
        kind: String,
        what: &'static str,
        name: String,
    },

    #[error("Kind {kind}: {what} index {index} does not exist")]
    InvalidRef {
        kind: String,
        what: &'static str,
        index: usize,
    },

    #[error("Kind {kind}: state `{state}` has two flows for `{var}`")]
    DuplicateFlow {
        kind: String,
        state: String,
        var: String,
    },

    #[error("Kind {kind}: `{var}` is declared {decl} and cannot carry a flow")]
    FlowTarget {
        kind: String,
        var: String,
        decl: &'static str,
    },

    #[error("Kind {kind}: transition `{transition}` cannot reset {reason} variable `{var}`")]
    ResetTarget {
        kind: String,
        transition: String,
        var: String,
        reason: &'static str,
    },

    #[error("Kind {kind}: transition `{transition}` resets `{var}` twice")]
    DuplicateReset {
        kind: String,
        transition: String,
        var: String,
    },

    #[error("Kind {kind}: transition `{transition}` leaves Exit")]
    LeavesExit { kind: String, transition: String },

    #[error("Kind {kind}: no start state declared")]
    NoStart { kind: String },
}

impl From<ModelError> for SimError {
    fn from(err: ModelError) -> Self {
        SimError::Model {
            what: err.to_string(),
        }
    }
}
