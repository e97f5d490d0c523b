//! Component instances.

use std::sync::Arc;

use hs_core::{CompId, Origin};
use hs_model::{KindDef, LinkId, QueueId, StateId, VarDecl, VarId};

use crate::queue::Queue;
use crate::store::VarStore;

/// A live instance of a kind inside a world.
#[derive(Debug)]
pub struct Component {
    pub(crate) id: CompId,
    pub(crate) kind: Arc<KindDef>,
    pub(crate) name: Option<String>,
    pub(crate) state: StateId,
    pub(crate) store: VarStore,
    pub(crate) links: Vec<Option<CompId>>,
    /// Source of each input variable, indexed by variable.
    pub(crate) inputs: Vec<Option<(CompId, VarId)>>,
    pub(crate) queues: Vec<Queue>,
    /// Event values published in the current discrete pass.
    pub(crate) events: Vec<Option<f64>>,
    pub(crate) inert: bool,
    pub(crate) frozen: bool,
}

impl Component {
    pub(crate) fn new(id: CompId, kind: Arc<KindDef>) -> Self {
        let values = kind
            .vars()
            .iter()
            .map(|v| match v.decl {
                VarDecl::Input => f64::NAN,
                _ => v.default.unwrap_or(0.0),
            })
            .collect();
        Self {
            id,
            name: None,
            state: kind.start(),
            store: VarStore::new(values),
            links: vec![None; kind.links().len()],
            inputs: vec![None; kind.vars().len()],
            queues: vec![Queue::new(); kind.queues().len()],
            events: vec![None; kind.events().len()],
            inert: false,
            frozen: false,
            kind,
        }
    }

    pub fn id(&self) -> CompId {
        self.id
    }

    pub fn kind(&self) -> &Arc<KindDef> {
        &self.kind
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn state(&self) -> StateId {
        self.state
    }

    pub fn state_name(&self) -> &str {
        self.kind.state(self.state).name()
    }

    pub fn is_exited(&self) -> bool {
        self.state.is_exit()
    }

    /// Stored value of a variable. Algebraic and input variables are only
    /// meaningful through `World::value`.
    pub fn stored(&self, var: VarId) -> Option<f64> {
        self.store.values.get(var.index()).copied()
    }

    pub fn link(&self, link: LinkId) -> Option<CompId> {
        self.links.get(link.index()).copied().flatten()
    }

    pub fn queue(&self, queue: QueueId) -> Option<&Queue> {
        self.queues.get(queue.index())
    }

    /// Whether the component is currently skipped by transition scans.
    pub fn is_inert(&self) -> bool {
        self.inert
    }

    pub(crate) fn origin(&self) -> Origin {
        Origin {
            kind: self.kind.name().to_owned(),
            id: self.id,
            state: self.state_name().to_owned(),
        }
    }

    pub(crate) fn var_name(&self, var: VarId) -> String {
        self.kind
            .var(var)
            .map(|v| v.name.clone())
            .unwrap_or_else(|| format!("{var:?}"))
    }

    pub(crate) fn link_name(&self, link: LinkId) -> String {
        self.kind
            .link(link)
            .map(|l| l.name.clone())
            .unwrap_or_else(|| format!("{link:?}"))
    }

    /// Every component this one reads from, through links or inputs.
    pub(crate) fn dependencies(&self) -> impl Iterator<Item = CompId> + '_ {
        self.links
            .iter()
            .flatten()
            .copied()
            .chain(self.inputs.iter().flatten().map(|(src, _)| *src))
    }
}
