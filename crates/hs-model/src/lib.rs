//! hs-model: static per-kind descriptors for hybrid components.
//!
//! Provides:
//! - Kind descriptors (variables, links, queues, events, states)
//! - Flow Sets and Transition Tables per discrete state
//! - Incremental kind builder with validation
//! - The expression evaluator and action boundaries used by the runtime
//!
//! # Example
//!
//! ```
//! use hs_model::{Expr, Flow, KindBuilder, Transition};
//!
//! let mut b = KindBuilder::new("Timer");
//! let t = b.continuous("t", 0.0);
//! let running = b.state("Running");
//! let done = b.state("Done");
//! b.start(running);
//! b.flow(running, Flow::diff(t, Expr::constant(1.0)));
//! b.transition(
//!     Transition::new("expire", running, done)
//!         .guard(Expr::pred(move |s| Ok(s.get(t)? >= 1.0))),
//! );
//! let kind = b.build().unwrap();
//!
//! assert_eq!(kind.name(), "Timer");
//! assert_eq!(kind.state(running).transitions().len(), 1);
//! ```

pub mod builder;
pub mod error;
pub mod expr;
pub mod flow;
pub mod ids;
pub mod init;
pub mod kind;
pub mod message;
pub mod transition;
pub(crate) mod validate;

// Re-exports for ergonomics
pub use builder::KindBuilder;
pub use error::{ModelError, ModelResult};
pub use expr::{Action, ActionContext, Evaluator, Expr, Scope, Value};
pub use flow::{Flow, FlowSet, Integration};
pub use ids::{EventId, LinkId, QueueId, StateId, VarId};
pub use init::Init;
pub use kind::{
    EventDef, KindDef, LinkDef, LinkMode, QueueDef, StateDef, VarDecl, VarDef, VarKind,
};
pub use message::{Batch, Message};
pub use transition::{Emit, Reset, SyncEvent, Transition, TransitionRole, Wait};
