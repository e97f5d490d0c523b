//! Frozen per-kind descriptors.
//!
//! A [`KindDef`] is shared by every instance of a component kind through an
//! `Arc`. It never changes after [`KindBuilder::build`](crate::KindBuilder::build).

use std::collections::HashMap;

use crate::flow::{Flow, FlowSet};
use crate::ids::{EventId, LinkId, QueueId, StateId, VarId};
use crate::transition::Transition;

/// How a variable is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarDecl {
    /// Stored state. Integrated, algebraic or held depending on the active
    /// state's flows.
    Continuous,
    /// Changes only through resets and actions.
    Constant,
    /// Reads through to a variable of another component.
    Input,
}

/// Effective behavior of a variable in one state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    /// Advanced by the integrator: a differential, delay or derivative flow.
    Continuous,
    /// Defined by an algebraic flow.
    Algebraic,
    /// Held at its last value.
    Constant,
    Input,
}

#[derive(Debug, Clone)]
pub struct VarDef {
    pub name: String,
    pub decl: VarDecl,
    /// Strict variables cannot be changed by resets or actions.
    pub strict: bool,
    /// Initial value, or fallback for an unconnected input.
    pub default: Option<f64>,
}

/// Ordering contract of a link during integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMode {
    /// Reader is integrated after the target and sees its current stage.
    Strict,
    /// Reader sees the target's previously completed stage.
    Lazy,
}

#[derive(Debug, Clone)]
pub struct LinkDef {
    pub name: String,
    pub mode: LinkMode,
}

#[derive(Debug, Clone)]
pub struct QueueDef {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct EventDef {
    pub name: String,
}

/// One discrete state with its Flow Set and Transition Table.
#[derive(Debug, Clone)]
pub struct StateDef {
    pub(crate) name: String,
    pub(crate) flows: FlowSet,
    pub(crate) transitions: Vec<Transition>,
}

impl StateDef {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn flows(&self) -> &FlowSet {
        &self.flows
    }

    /// Outgoing transitions in declaration order (earlier wins).
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }
}

/// Immutable description of a component kind.
#[derive(Debug, Clone)]
pub struct KindDef {
    pub(crate) name: String,
    pub(crate) vars: Vec<VarDef>,
    pub(crate) links: Vec<LinkDef>,
    pub(crate) queues: Vec<QueueDef>,
    pub(crate) events: Vec<EventDef>,
    pub(crate) states: Vec<StateDef>,
    pub(crate) start: StateId,
    pub(crate) var_index: HashMap<String, VarId>,
    pub(crate) link_index: HashMap<String, LinkId>,
    pub(crate) queue_index: HashMap<String, QueueId>,
    pub(crate) event_index: HashMap<String, EventId>,
    pub(crate) state_index: HashMap<String, StateId>,
}

impl KindDef {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start(&self) -> StateId {
        self.start
    }

    pub fn vars(&self) -> &[VarDef] {
        &self.vars
    }

    pub fn links(&self) -> &[LinkDef] {
        &self.links
    }

    pub fn queues(&self) -> &[QueueDef] {
        &self.queues
    }

    pub fn events(&self) -> &[EventDef] {
        &self.events
    }

    /// All states, `Exit` first.
    pub fn states(&self) -> &[StateDef] {
        &self.states
    }

    pub fn var(&self, id: VarId) -> Option<&VarDef> {
        self.vars.get(id.index())
    }

    pub fn link(&self, id: LinkId) -> Option<&LinkDef> {
        self.links.get(id.index())
    }

    pub fn queue(&self, id: QueueId) -> Option<&QueueDef> {
        self.queues.get(id.index())
    }

    pub fn event(&self, id: EventId) -> Option<&EventDef> {
        self.events.get(id.index())
    }

    /// Descriptor of a state. Ids come from this kind, so an out-of-range id
    /// falls back to `Exit`.
    pub fn state(&self, id: StateId) -> &StateDef {
        self.states.get(id.index()).unwrap_or(&self.states[0])
    }

    pub fn var_id(&self, name: &str) -> Option<VarId> {
        self.var_index.get(name).copied()
    }

    pub fn link_id(&self, name: &str) -> Option<LinkId> {
        self.link_index.get(name).copied()
    }

    pub fn queue_id(&self, name: &str) -> Option<QueueId> {
        self.queue_index.get(name).copied()
    }

    pub fn event_id(&self, name: &str) -> Option<EventId> {
        self.event_index.get(name).copied()
    }

    pub fn state_id(&self, name: &str) -> Option<StateId> {
        self.state_index.get(name).copied()
    }

    /// Effective kind of a variable while `state` is active.
    pub fn var_kind(&self, state: StateId, var: VarId) -> VarKind {
        match self.vars.get(var.index()).map(|v| v.decl) {
            Some(VarDecl::Input) => VarKind::Input,
            Some(VarDecl::Constant) | None => VarKind::Constant,
            Some(VarDecl::Continuous) => match self.state(state).flows.flow_for(var) {
                Some(Flow::Algebraic { .. }) => VarKind::Algebraic,
                Some(_) => VarKind::Continuous,
                None => VarKind::Constant,
            },
        }
    }
}
