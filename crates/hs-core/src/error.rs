//! Runtime error taxonomy shared by the model and simulation crates.
//!
//! Every structural model error carries an [`Origin`] so that a failing run
//! names the component kind, id and discrete state it stopped in.

use core::fmt;

use thiserror::Error;

use crate::CompId;

pub type SimResult<T> = Result<T, SimError>;

/// Identity of the component an error was raised in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    /// Kind (component class) name.
    pub kind: String,
    /// Component id inside its world.
    pub id: CompId,
    /// Name of the active discrete state.
    pub state: String,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{} in {}", self.kind, self.id, self.state)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Algebraic cycle at {origin}: `{var}` depends on itself")]
    AlgebraicCycle { origin: Origin, var: String },

    #[error("Strict link cycle through {origin} (strict links: {links})")]
    StrictLinkCycle { origin: Origin, links: String },

    #[error("Exceeded zeno limit of {limit} at clock {clock} after {passes} passes ({} active)", .active.len())]
    Zeno {
        limit: u32,
        passes: u32,
        clock: f64,
        active: Vec<Origin>,
    },

    #[error("Unresolved {} link `{link}` at {origin}", link_mode(.strict))]
    UnresolvedLink {
        origin: Origin,
        link: String,
        strict: bool,
    },

    #[error("Unconnected input `{var}` at {origin}")]
    UnconnectedInput { origin: Origin, var: String },

    #[error("Input chain for `{var}` at {origin} exceeds depth limit {limit}")]
    InputDepth {
        origin: Origin,
        var: String,
        limit: usize,
    },

    #[error("Unknown {what} `{name}` in kind {kind}")]
    Unknown {
        what: &'static str,
        kind: String,
        name: String,
    },

    #[error("Type mismatch: expected {expected} value, evaluator returned {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Queue `{queue}` is empty at {origin}")]
    QueueEmpty { origin: Origin, queue: String },

    #[error("Cannot assign {what} variable `{var}` at {origin}")]
    Assignment {
        origin: Origin,
        var: String,
        what: &'static str,
    },

    #[error("No such component: {id}")]
    NoSuchComponent { id: CompId },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Model error: {what}")]
    Model { what: String },
}

fn link_mode(strict: &bool) -> &'static str {
    if *strict { "strict" } else { "lazy" }
}

impl SimError {
    /// Whether this error is a structural model error that terminates a run.
    ///
    /// Argument and lookup errors raised by callers outside a step are not.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            SimError::AlgebraicCycle { .. }
                | SimError::StrictLinkCycle { .. }
                | SimError::Zeno { .. }
                | SimError::UnresolvedLink { .. }
                | SimError::UnconnectedInput { .. }
                | SimError::InputDepth { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Origin {
        Origin {
            kind: "Ball".into(),
            id: CompId::from_index(3),
            state: "Falling".into(),
        }
    }

    #[test]
    fn origin_display_names_kind_id_and_state() {
        assert_eq!(origin().to_string(), "Ball#3 in Falling");
    }

    #[test]
    fn unresolved_link_reports_mode() {
        let err = SimError::UnresolvedLink {
            origin: origin(),
            link: "floor".into(),
            strict: true,
        };
        let msg = err.to_string();
        assert!(msg.contains("strict link `floor`"));
        assert!(msg.contains("Ball#3"));
        assert!(err.is_structural());
    }

    #[test]
    fn zeno_reports_limit_and_active_count() {
        let err = SimError::Zeno {
            limit: 10,
            passes: 11,
            clock: 0.5,
            active: vec![origin()],
        };
        let msg = err.to_string();
        assert!(msg.contains("zeno limit of 10"));
        assert!(msg.contains("1 active"));
    }

    #[test]
    fn argument_errors_are_not_structural() {
        assert!(!SimError::InvalidArg { what: "dt" }.is_structural());
    }
}
