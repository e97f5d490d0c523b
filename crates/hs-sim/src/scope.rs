//! Variable resolution for flows, guards, resets and actions.

use std::sync::Arc;

use hs_core::{CompId, SimError, SimResult};
use hs_model::{
    ActionContext, Batch, Expr, Flow, Init, KindDef, LinkId, LinkMode, Message, QueueId, Scope,
    StateId, VarDecl, VarId, VarKind,
};

use crate::component::Component;
use crate::world::World;

/// Which values a read observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum View {
    /// Committed values, between integration steps.
    Discrete,
    /// Evaluation point of RK stage `s`.
    Stage(usize),
    /// What lazy links read: the target's last snapshot, or its settled
    /// values when it has none. Never evaluates anything.
    Previous,
}

/// Last value of `var` without evaluating anything: the stored value, or
/// the most recently computed one for an algebraic variable.
fn settled(comp: &Component, var: VarId) -> f64 {
    let i = var.index();
    match comp.kind.state(comp.state).flows().flow_for(var) {
        Some(flow) if flow.is_algebraic() => comp.store.cache[i].get().value,
        _ => comp.store.values[i],
    }
}

/// Read-only scope for one component.
pub(crate) struct WorldScope<'w> {
    world: &'w World,
    comp: &'w Component,
    view: View,
}

impl<'w> WorldScope<'w> {
    pub fn new(world: &'w World, comp: &'w Component, view: View) -> Self {
        Self { world, comp, view }
    }

    fn read(&self, comp: &'w Component, var: VarId, view: View, depth: usize) -> SimResult<f64> {
        let i = var.index();
        let def = comp.kind.var(var).ok_or_else(|| SimError::Unknown {
            what: "variable",
            kind: comp.kind.name().to_owned(),
            name: format!("{var:?}"),
        })?;

        if view == View::Previous && def.decl != VarDecl::Input {
            return Ok(match &comp.store.previous {
                Some(snapshot) => snapshot[i],
                None => settled(comp, var),
            });
        }

        match def.decl {
            VarDecl::Constant => Ok(comp.store.values[i]),
            VarDecl::Input => self.read_input(comp, var, view, depth),
            VarDecl::Continuous => match comp.kind.state(comp.state).flows().flow_for(var) {
                Some(Flow::Algebraic { expr, .. }) => self.algebraic(comp, var, expr, view),
                Some(_) if matches!(view, View::Stage(_)) => Ok(comp.store.staged[i]),
                _ => Ok(comp.store.values[i]),
            },
        }
    }

    fn read_input(
        &self,
        comp: &'w Component,
        var: VarId,
        view: View,
        depth: usize,
    ) -> SimResult<f64> {
        let limit = self.world.config.input_depth_limit;
        if depth >= limit {
            return Err(SimError::InputDepth {
                origin: comp.origin(),
                var: comp.var_name(var),
                limit,
            });
        }
        match comp.inputs[var.index()] {
            Some((src, src_var)) => {
                let source = self.world.comp(src)?;
                self.read(source, src_var, view, depth + 1)
            }
            None => comp
                .kind
                .var(var)
                .and_then(|d| d.default)
                .ok_or_else(|| SimError::UnconnectedInput {
                    origin: comp.origin(),
                    var: comp.var_name(var),
                }),
        }
    }

    fn algebraic(
        &self,
        comp: &'w Component,
        var: VarId,
        expr: &Expr,
        view: View,
    ) -> SimResult<f64> {
        let i = var.index();
        let round = match view {
            View::Stage(_) if comp.frozen => self.world.step_round,
            _ => self.world.round,
        };
        if let Some(value) = comp.store.cached(i, round) {
            return Ok(value);
        }
        if comp.store.busy[i].get() {
            return Err(SimError::AlgebraicCycle {
                origin: comp.origin(),
                var: comp.var_name(var),
            });
        }

        comp.store.busy[i].set(true);
        let result = expr.eval_real(&WorldScope::new(self.world, comp, view));
        comp.store.busy[i].set(false);

        let value = result?;
        comp.store.store(i, round, value);
        Ok(value)
    }

    fn unknown(&self, what: &'static str, kind: &KindDef, name: &str) -> SimError {
        SimError::Unknown {
            what,
            kind: kind.name().to_owned(),
            name: name.to_owned(),
        }
    }

    fn target(&self, link: LinkId) -> SimResult<(&'w Component, LinkMode)> {
        let def = self
            .comp
            .kind
            .link(link)
            .ok_or_else(|| self.unknown("link", &self.comp.kind, &format!("{link:?}")))?;
        let target = self
            .comp
            .link(link)
            .ok_or_else(|| SimError::UnresolvedLink {
                origin: self.comp.origin(),
                link: def.name.clone(),
                strict: def.mode == LinkMode::Strict,
            })?;
        Ok((self.world.comp(target)?, def.mode))
    }
}

impl Scope for WorldScope<'_> {
    fn component(&self) -> CompId {
        self.comp.id
    }

    fn get(&self, var: VarId) -> SimResult<f64> {
        self.read(self.comp, var, self.view, 0)
    }

    fn var(&self, name: &str) -> SimResult<f64> {
        let var = self
            .comp
            .kind
            .var_id(name)
            .ok_or_else(|| self.unknown("variable", &self.comp.kind, name))?;
        self.get(var)
    }

    fn linked(&self, link: LinkId, var: &str) -> SimResult<f64> {
        let (target, mode) = self.target(link)?;
        let tvar = target
            .kind
            .var_id(var)
            .ok_or_else(|| self.unknown("variable", &target.kind, var))?;
        let view = match mode {
            LinkMode::Lazy => View::Previous,
            LinkMode::Strict => self.view,
        };
        self.read(target, tvar, view, 0)
    }

    fn link_target(&self, link: LinkId) -> Option<CompId> {
        self.comp.link(link)
    }

    fn linked_event(&self, link: LinkId, event: &str) -> SimResult<Option<f64>> {
        let Some(target) = self.comp.link(link) else {
            return Ok(None);
        };
        let target = self.world.comp(target)?;
        let id = target
            .kind
            .event_id(event)
            .ok_or_else(|| self.unknown("event", &target.kind, event))?;
        Ok(target.events[id.index()])
    }

    fn queue_len(&self, queue: QueueId) -> usize {
        self.comp.queue(queue).map_or(0, |q| q.len())
    }

    fn clock(&self) -> f64 {
        self.world.clock()
    }

    fn time_step(&self) -> f64 {
        self.world.config.time_step
    }
}

/// Mutable context handed to transition actions.
pub(crate) struct ActionCtx<'w> {
    world: &'w mut World,
    comp: CompId,
}

impl<'w> ActionCtx<'w> {
    pub fn new(world: &'w mut World, comp: CompId) -> Self {
        Self { world, comp }
    }

    fn scope(&self) -> WorldScope<'_> {
        WorldScope::new(self.world, self.world.at(self.comp), View::Discrete)
    }

    fn this(&self) -> &Component {
        self.world.at(self.comp)
    }

    fn this_mut(&mut self) -> &mut Component {
        self.world.at_mut(self.comp)
    }
}

impl Scope for ActionCtx<'_> {
    fn component(&self) -> CompId {
        self.comp
    }

    fn get(&self, var: VarId) -> SimResult<f64> {
        self.scope().get(var)
    }

    fn var(&self, name: &str) -> SimResult<f64> {
        self.scope().var(name)
    }

    fn linked(&self, link: LinkId, var: &str) -> SimResult<f64> {
        self.scope().linked(link, var)
    }

    fn link_target(&self, link: LinkId) -> Option<CompId> {
        self.this().link(link)
    }

    fn linked_event(&self, link: LinkId, event: &str) -> SimResult<Option<f64>> {
        self.scope().linked_event(link, event)
    }

    fn queue_len(&self, queue: QueueId) -> usize {
        self.scope().queue_len(queue)
    }

    fn clock(&self) -> f64 {
        self.world.clock()
    }

    fn time_step(&self) -> f64 {
        self.world.config.time_step
    }
}

impl ActionContext for ActionCtx<'_> {
    fn set(&mut self, var: VarId, value: f64) -> SimResult<()> {
        let comp = self.this();
        let def = comp.kind.var(var).ok_or_else(|| SimError::Unknown {
            what: "variable",
            kind: comp.kind.name().to_owned(),
            name: format!("{var:?}"),
        })?;
        let refused = if def.strict {
            Some("strict")
        } else {
            match comp.kind.var_kind(comp.state, var) {
                VarKind::Algebraic => Some("algebraic"),
                VarKind::Input => Some("input"),
                VarKind::Continuous | VarKind::Constant => None,
            }
        };
        if let Some(what) = refused {
            return Err(SimError::Assignment {
                origin: comp.origin(),
                var: comp.var_name(var),
                what,
            });
        }

        self.this_mut().store.values[var.index()] = value;
        self.world.round += 1;
        Ok(())
    }

    fn pop(&mut self, queue: QueueId) -> SimResult<Batch> {
        let popped = self
            .this_mut()
            .queues
            .get_mut(queue.index())
            .and_then(|q| q.pop());
        match popped {
            Some(batch) => {
                self.world.round += 1;
                Ok(batch)
            }
            None => {
                let comp = self.this();
                Err(SimError::QueueEmpty {
                    origin: comp.origin(),
                    queue: comp
                        .kind
                        .queue(queue)
                        .map(|q| q.name.clone())
                        .unwrap_or_else(|| format!("{queue:?}")),
                })
            }
        }
    }

    fn unpop(&mut self, queue: QueueId, batch: Batch) {
        if let Some(q) = self.this_mut().queues.get_mut(queue.index()) {
            q.unpop(batch);
        }
        self.world.round += 1;
    }

    fn push(&mut self, queue: QueueId, message: Message) {
        let instant = self.world.instant;
        let comp = self.this_mut();
        if let Some(q) = comp.queues.get_mut(queue.index()) {
            q.push(instant, message);
            comp.inert = false;
        }
        self.world.round += 1;
    }

    fn push_linked(&mut self, link: LinkId, queue: &str, message: Message) -> SimResult<()> {
        let comp = self.this();
        let target = comp.link(link).ok_or_else(|| SimError::UnresolvedLink {
            origin: comp.origin(),
            link: comp.link_name(link),
            strict: comp
                .kind
                .link(link)
                .is_some_and(|l| l.mode == LinkMode::Strict),
        })?;
        self.world.push(target, queue, message)
    }

    fn set_link(&mut self, link: LinkId, target: Option<CompId>) -> SimResult<()> {
        self.world.set_link_id(self.comp, link, target)
    }

    fn create(&mut self, kind: &Arc<KindDef>, init: Init) -> SimResult<CompId> {
        self.world.create(kind, init)
    }

    fn connect(&mut self, input: VarId, source: Option<(CompId, &str)>) -> SimResult<()> {
        self.world.connect_id(self.comp, input, source)
    }

    fn set_dest(&mut self, state: StateId) -> SimResult<()> {
        let comp = self.this();
        if state.index() >= comp.kind.states().len() {
            return Err(SimError::Unknown {
                what: "state",
                kind: comp.kind.name().to_owned(),
                name: format!("{state:?}"),
            });
        }
        self.world.dest = Some(state);
        Ok(())
    }
}
