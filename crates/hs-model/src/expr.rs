//! Evaluator boundary between component descriptors and the runtime.
//!
//! Flow formulas, guards, reset values and event values are opaque
//! [`Expr`]s. The runtime hands them a [`Scope`] that resolves variable and
//! link reads against whatever integration stage or discrete pass is in
//! progress. Actions get the richer [`ActionContext`].

use std::fmt;
use std::sync::Arc;

use hs_core::{CompId, SimError, SimResult};

use crate::ids::{LinkId, QueueId, StateId, VarId};
use crate::init::Init;
use crate::kind::KindDef;
use crate::message::{Batch, Message};

/// Result of evaluating an expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Real(f64),
    Bool(bool),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Real(_) => "real",
            Value::Bool(_) => "bool",
        }
    }

    pub fn as_real(self) -> SimResult<f64> {
        match self {
            Value::Real(v) => Ok(v),
            other => Err(SimError::TypeMismatch {
                expected: "real",
                found: other.type_name(),
            }),
        }
    }

    pub fn as_bool(self) -> SimResult<bool> {
        match self {
            Value::Bool(b) => Ok(b),
            other => Err(SimError::TypeMismatch {
                expected: "bool",
                found: other.type_name(),
            }),
        }
    }
}

/// Read-only view of the world from inside one component.
///
/// Reads of algebraic variables are evaluated on demand and cached for the
/// current evaluation round. Expressions must be pure functions of what
/// they read here.
pub trait Scope {
    /// The component this scope belongs to.
    fn component(&self) -> CompId;

    /// Read one of this component's variables.
    fn get(&self, var: VarId) -> SimResult<f64>;

    /// Read one of this component's variables by name.
    fn var(&self, name: &str) -> SimResult<f64>;

    /// Read a variable of the component a link points at.
    ///
    /// Strict links observe the target's current integration stage; lazy
    /// links observe its previously completed stage.
    fn linked(&self, link: LinkId, var: &str) -> SimResult<f64>;

    /// Current target of a link.
    fn link_target(&self, link: LinkId) -> Option<CompId>;

    /// Value of an event the linked component emitted in the current
    /// discrete pass, if it did.
    fn linked_event(&self, link: LinkId, event: &str) -> SimResult<Option<f64>>;

    /// Number of messages waiting in one of this component's queues.
    fn queue_len(&self, queue: QueueId) -> usize;

    /// Simulation time at the start of the current step.
    fn clock(&self) -> f64;

    fn time_step(&self) -> f64;
}

/// Something that can be evaluated against a [`Scope`].
pub trait Evaluator: Send + Sync {
    fn eval(&self, scope: &dyn Scope) -> SimResult<Value>;
}

impl<F> Evaluator for F
where
    F: Fn(&dyn Scope) -> SimResult<Value> + Send + Sync,
{
    fn eval(&self, scope: &dyn Scope) -> SimResult<Value> {
        self(scope)
    }
}

/// Shared handle to an evaluator.
#[derive(Clone)]
pub struct Expr(Arc<dyn Evaluator>);

impl Expr {
    pub fn new(evaluator: impl Evaluator + 'static) -> Self {
        Self(Arc::new(evaluator))
    }

    /// Real-valued expression from a closure.
    pub fn real<F>(f: F) -> Self
    where
        F: Fn(&dyn Scope) -> SimResult<f64> + Send + Sync + 'static,
    {
        Self::new(move |s: &dyn Scope| f(s).map(Value::Real))
    }

    /// Boolean expression from a closure.
    pub fn pred<F>(f: F) -> Self
    where
        F: Fn(&dyn Scope) -> SimResult<bool> + Send + Sync + 'static,
    {
        Self::new(move |s: &dyn Scope| f(s).map(Value::Bool))
    }

    pub fn constant(value: f64) -> Self {
        Self::new(move |_: &dyn Scope| Ok(Value::Real(value)))
    }

    /// Reads a single variable of the owning component.
    pub fn var(var: VarId) -> Self {
        Self::new(move |s: &dyn Scope| s.get(var).map(Value::Real))
    }

    pub fn eval(&self, scope: &dyn Scope) -> SimResult<Value> {
        self.0.eval(scope)
    }

    pub fn eval_real(&self, scope: &dyn Scope) -> SimResult<f64> {
        self.eval(scope)?.as_real()
    }

    pub fn eval_bool(&self, scope: &dyn Scope) -> SimResult<bool> {
        self.eval(scope)?.as_bool()
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Expr(..)")
    }
}

/// Mutable access granted to transition actions.
///
/// Actions run after all resets of their pass have been committed, one
/// component at a time in id order.
pub trait ActionContext: Scope {
    /// Assign a continuous or constant variable of this component.
    fn set(&mut self, var: VarId, value: f64) -> SimResult<()>;

    /// Take the whole head batch of a queue.
    fn pop(&mut self, queue: QueueId) -> SimResult<Batch>;

    /// Return unconsumed messages to the head of a queue.
    fn unpop(&mut self, queue: QueueId, batch: Batch);

    /// Push into one of this component's own queues.
    fn push(&mut self, queue: QueueId, message: Message);

    /// Push into a queue of the linked component.
    fn push_linked(&mut self, link: LinkId, queue: &str, message: Message) -> SimResult<()>;

    /// Re-point one of this component's links.
    fn set_link(&mut self, link: LinkId, target: Option<CompId>) -> SimResult<()>;

    /// Create a new component. It takes part from the next discrete pass.
    fn create(&mut self, kind: &Arc<KindDef>, init: Init) -> SimResult<CompId>;

    /// Connect an input variable of this component to a variable of another
    /// component, or disconnect it with `None`.
    fn connect(&mut self, input: VarId, source: Option<(CompId, &str)>) -> SimResult<()>;

    /// Send the firing transition to `state` instead of its declared
    /// destination.
    fn set_dest(&mut self, state: StateId) -> SimResult<()>;
}

type ActionFn = dyn Fn(&mut dyn ActionContext) -> SimResult<()> + Send + Sync;

/// Shared handle to a transition action.
#[derive(Clone)]
pub struct Action(Arc<ActionFn>);

impl Action {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut dyn ActionContext) -> SimResult<()> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn run(&self, ctx: &mut dyn ActionContext) -> SimResult<()> {
        (self.0)(ctx)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Action(..)")
    }
}
