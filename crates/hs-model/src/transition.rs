//! Transition Tables: the discrete behavior of one state.

use std::sync::Arc;

use crate::expr::{Action, ActionContext, Expr};
use crate::ids::{EventId, LinkId, QueueId, StateId, VarId};
use hs_core::SimResult;

/// Enabled only while the queue's head batch holds a matching message.
#[derive(Debug, Clone)]
pub struct Wait {
    pub queue: QueueId,
    /// `None` matches any message.
    pub tag: Option<String>,
}

/// Enabled only while the linked component's chosen transition emits the
/// named event in the same pass.
#[derive(Debug, Clone)]
pub struct SyncEvent {
    pub link: LinkId,
    pub event: String,
}

/// Assignment evaluated against pre-firing values and committed together
/// with all other resets of the pass.
#[derive(Debug, Clone)]
pub struct Reset {
    pub var: VarId,
    pub expr: Expr,
}

/// Event raised when the transition fires.
#[derive(Debug, Clone)]
pub struct Emit {
    pub event: EventId,
    /// Defaults to `1.0` when absent.
    pub value: Option<Expr>,
}

/// Coarse classification used by zeno diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionRole {
    /// Only a guard; nothing observable happens on firing except the state.
    GuardOnly,
    /// Emits events or waits on syncs.
    Event,
    /// Applies resets.
    Reset,
    /// Runs an action or consumes queues.
    General,
}

/// A guarded edge between two discrete states.
#[derive(Debug, Clone)]
pub struct Transition {
    name: Arc<str>,
    from: StateId,
    to: StateId,
    guard: Option<Expr>,
    waits: Vec<Wait>,
    syncs: Vec<SyncEvent>,
    resets: Vec<Reset>,
    action: Option<Action>,
    events: Vec<Emit>,
}

impl Transition {
    pub fn new(name: &str, from: StateId, to: StateId) -> Self {
        Self {
            name: Arc::from(name),
            from,
            to,
            guard: None,
            waits: Vec::new(),
            syncs: Vec::new(),
            resets: Vec::new(),
            action: None,
            events: Vec::new(),
        }
    }

    pub fn guard(mut self, guard: Expr) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn wait(mut self, queue: QueueId, tag: Option<&str>) -> Self {
        self.waits.push(Wait {
            queue,
            tag: tag.map(str::to_owned),
        });
        self
    }

    pub fn sync(mut self, link: LinkId, event: &str) -> Self {
        self.syncs.push(SyncEvent {
            link,
            event: event.to_owned(),
        });
        self
    }

    pub fn reset(mut self, var: VarId, expr: Expr) -> Self {
        self.resets.push(Reset { var, expr });
        self
    }

    pub fn action<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut dyn ActionContext) -> SimResult<()> + Send + Sync + 'static,
    {
        self.action = Some(Action::new(f));
        self
    }

    pub fn emit(mut self, event: EventId) -> Self {
        self.events.push(Emit { event, value: None });
        self
    }

    pub fn emit_value(mut self, event: EventId, value: Expr) -> Self {
        self.events.push(Emit {
            event,
            value: Some(value),
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared name handle, cheap to clone into firing records.
    pub fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    pub fn from(&self) -> StateId {
        self.from
    }

    pub fn to(&self) -> StateId {
        self.to
    }

    pub fn guard_expr(&self) -> Option<&Expr> {
        self.guard.as_ref()
    }

    pub fn waits(&self) -> &[Wait] {
        &self.waits
    }

    pub fn syncs(&self) -> &[SyncEvent] {
        &self.syncs
    }

    pub fn resets(&self) -> &[Reset] {
        &self.resets
    }

    pub fn action_fn(&self) -> Option<&Action> {
        self.action.as_ref()
    }

    pub fn events(&self) -> &[Emit] {
        &self.events
    }

    pub fn emits(&self, event: EventId) -> bool {
        self.events.iter().any(|e| e.event == event)
    }

    pub fn role(&self) -> TransitionRole {
        if self.action.is_some() || !self.waits.is_empty() {
            TransitionRole::General
        } else if !self.resets.is_empty() {
            TransitionRole::Reset
        } else if !self.events.is_empty() || !self.syncs.is_empty() {
            TransitionRole::Event
        } else {
            TransitionRole::GuardOnly
        }
    }
}
