//! Incremental kind builder.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ModelResult;
use crate::flow::{Flow, FlowSet};
use crate::ids::{EventId, LinkId, QueueId, StateId, VarId};
use crate::kind::{EventDef, KindDef, LinkDef, LinkMode, QueueDef, StateDef, VarDecl, VarDef};
use crate::transition::Transition;
use crate::validate;

/// Builder for a component kind.
///
/// Declare variables, links, queues, events and states, attach flows and
/// transitions, then call `build()` to validate and freeze the descriptor.
/// The `Exit` state is always present as [`StateId::EXIT`].
#[derive(Debug)]
pub struct KindBuilder {
    name: String,
    vars: Vec<VarDef>,
    links: Vec<LinkDef>,
    queues: Vec<QueueDef>,
    events: Vec<EventDef>,
    states: Vec<String>,
    flows: Vec<Vec<Flow>>,
    transitions: Vec<Transition>,
    start: Option<StateId>,
}

impl KindBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vars: Vec::new(),
            links: Vec::new(),
            queues: Vec::new(),
            events: Vec::new(),
            states: vec!["Exit".to_owned()],
            flows: vec![Vec::new()],
            transitions: Vec::new(),
            start: None,
        }
    }

    fn push_var(&mut self, name: &str, decl: VarDecl, strict: bool, default: Option<f64>) -> VarId {
        let id = VarId::from_index(self.vars.len());
        self.vars.push(VarDef {
            name: name.to_owned(),
            decl,
            strict,
            default,
        });
        id
    }

    /// Declare a continuous variable with an initial value.
    pub fn continuous(&mut self, name: &str, initial: f64) -> VarId {
        self.push_var(name, VarDecl::Continuous, false, Some(initial))
    }

    /// Declare a continuous variable that resets and actions may not touch.
    pub fn strict_continuous(&mut self, name: &str, initial: f64) -> VarId {
        self.push_var(name, VarDecl::Continuous, true, Some(initial))
    }

    pub fn constant(&mut self, name: &str, value: f64) -> VarId {
        self.push_var(name, VarDecl::Constant, false, Some(value))
    }

    /// Declare an input variable, optionally with a fallback used while it
    /// is unconnected.
    pub fn input(&mut self, name: &str, default: Option<f64>) -> VarId {
        self.push_var(name, VarDecl::Input, false, default)
    }

    pub fn link(&mut self, name: &str, mode: LinkMode) -> LinkId {
        let id = LinkId::from_index(self.links.len());
        self.links.push(LinkDef {
            name: name.to_owned(),
            mode,
        });
        id
    }

    pub fn strict_link(&mut self, name: &str) -> LinkId {
        self.link(name, LinkMode::Strict)
    }

    pub fn lazy_link(&mut self, name: &str) -> LinkId {
        self.link(name, LinkMode::Lazy)
    }

    pub fn queue(&mut self, name: &str) -> QueueId {
        let id = QueueId::from_index(self.queues.len());
        self.queues.push(QueueDef {
            name: name.to_owned(),
        });
        id
    }

    pub fn event(&mut self, name: &str) -> EventId {
        let id = EventId::from_index(self.events.len());
        self.events.push(EventDef {
            name: name.to_owned(),
        });
        id
    }

    /// Declare a discrete state. The first declared state is the default
    /// start state.
    pub fn state(&mut self, name: &str) -> StateId {
        let id = StateId::from_index(self.states.len());
        self.states.push(name.to_owned());
        self.flows.push(Vec::new());
        if self.start.is_none() {
            self.start = Some(id);
        }
        id
    }

    pub fn start(&mut self, state: StateId) -> &mut Self {
        self.start = Some(state);
        self
    }

    /// Attach a flow to a state.
    pub fn flow(&mut self, state: StateId, flow: Flow) -> &mut Self {
        if let Some(flows) = self.flows.get_mut(state.index()) {
            flows.push(flow);
        } else {
            // Reported by validation.
            self.flows.resize_with(state.index() + 1, Vec::new);
            self.flows[state.index()].push(flow);
        }
        self
    }

    /// Attach the same flow to several states.
    pub fn flow_in(&mut self, states: &[StateId], flow: Flow) -> &mut Self {
        for &s in states {
            self.flow(s, flow.clone());
        }
        self
    }

    /// Append a transition to its source state's table.
    pub fn transition(&mut self, transition: Transition) -> &mut Self {
        self.transitions.push(transition);
        self
    }

    /// Validate and freeze the descriptor.
    pub fn build(self) -> ModelResult<Arc<KindDef>> {
        validate::validate_kind(
            &self.name,
            &self.vars,
            &self.links,
            &self.queues,
            &self.events,
            &self.states,
            &self.flows,
            &self.transitions,
            self.start,
        )?;

        let var_count = self.vars.len();
        let mut states: Vec<StateDef> = self
            .states
            .iter()
            .zip(self.flows)
            .map(|(name, flows)| StateDef {
                name: name.clone(),
                flows: FlowSet::new(var_count, flows),
                transitions: Vec::new(),
            })
            .collect();
        for t in self.transitions {
            states[t.from().index()].transitions.push(t);
        }

        let var_index = index_by(&self.vars, |v| &v.name, VarId::from_index);
        let link_index = index_by(&self.links, |l| &l.name, LinkId::from_index);
        let queue_index = index_by(&self.queues, |q| &q.name, QueueId::from_index);
        let event_index = index_by(&self.events, |e| &e.name, EventId::from_index);
        let state_index = index_by(&states, |s| &s.name, StateId::from_index);

        Ok(Arc::new(KindDef {
            name: self.name,
            vars: self.vars,
            links: self.links,
            queues: self.queues,
            events: self.events,
            states,
            start: self.start.unwrap_or(StateId::EXIT),
            var_index,
            link_index,
            queue_index,
            event_index,
            state_index,
        }))
    }
}

fn index_by<T, I>(
    items: &[T],
    name: impl Fn(&T) -> &String,
    id: impl Fn(usize) -> I,
) -> HashMap<String, I> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| (name(item).clone(), id(i)))
        .collect()
}
