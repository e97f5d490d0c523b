//! The world: component registry, clock and run loop.

use std::ops::ControlFlow;
use std::sync::Arc;

use hs_core::timing::{PhaseProfile, ProfileSummary, Timer};
use hs_core::{CompId, SimError, SimResult, Tolerances, nearly_equal};
use hs_model::{ActionContext, Init, KindDef, LinkId, Message, Scope, StateId, VarDecl, VarId};

use crate::component::Component;
use crate::config::WorldConfig;
use crate::integrator;
use crate::observer::{NoObserver, StepObserver};
use crate::resolver::{self, Firing};
use crate::scope::{ActionCtx, View, WorldScope};
use crate::topology::{self, Topology};
use crate::zeno::ZenoHook;

/// A closed system of hybrid components advanced in lock step.
pub struct World {
    pub(crate) config: WorldConfig,
    pub(crate) comps: Vec<Component>,
    step_count: u64,
    /// Clock at `base_steps`; moves when the time step changes.
    clock_base: f64,
    base_steps: u64,
    started: bool,
    /// Algebraic cache generation. Bumped whenever values may change.
    pub(crate) round: u64,
    /// Cache generation frozen components use for a whole step.
    pub(crate) step_round: u64,
    /// Discrete instant counter, used to batch queue pushes.
    pub(crate) instant: u64,
    pub(crate) zeno_counter: u32,
    /// Bumped on component creation and link or input changes.
    link_version: u64,
    /// Bumped on anything that can change the integration order.
    pub(crate) topo_version: u64,
    topology: Option<Topology>,
    pub(crate) dependents: Vec<Vec<CompId>>,
    dependents_version: Option<u64>,
    pub(crate) firings: Vec<Firing>,
    /// Destination chosen by the running action, if it overrides one.
    pub(crate) dest: Option<StateId>,
    pub(crate) zeno_hook: Option<Box<dyn ZenoHook>>,
    profile: PhaseProfile,
}

impl World {
    pub fn new(config: WorldConfig) -> SimResult<Self> {
        config.validate()?;
        Ok(Self {
            clock_base: config.clock_start,
            config,
            comps: Vec::new(),
            step_count: 0,
            base_steps: 0,
            started: false,
            round: 0,
            step_round: 0,
            instant: 0,
            zeno_counter: 0,
            link_version: 0,
            topo_version: 0,
            topology: None,
            dependents: Vec::new(),
            dependents_version: None,
            firings: Vec::new(),
            dest: None,
            zeno_hook: None,
            profile: PhaseProfile::default(),
        })
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Current simulation time: `clock_start + step_count * time_step`.
    pub fn clock(&self) -> f64 {
        self.clock_base + (self.step_count - self.base_steps) as f64 * self.config.time_step
    }

    pub fn time_step(&self) -> f64 {
        self.config.time_step
    }

    /// Change the step size for subsequent steps.
    pub fn set_time_step(&mut self, dt: f64) -> SimResult<()> {
        let mut config = self.config.clone();
        config.time_step = dt;
        config.validate()?;
        self.clock_base = self.clock();
        self.base_steps = self.step_count;
        self.config = config;
        Ok(())
    }

    pub fn set_zeno_limit(&mut self, limit: Option<u32>) -> SimResult<()> {
        let mut config = self.config.clone();
        config.zeno_limit = limit;
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Install a hook that is told about over-limit passes instead of
    /// failing immediately.
    pub fn set_zeno_hook(&mut self, hook: impl ZenoHook + 'static) {
        self.zeno_hook = Some(Box::new(hook));
    }

    pub fn clear_zeno_hook(&mut self) {
        self.zeno_hook = None;
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Whether the initial discrete instant has been resolved.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Passes taken by the most recent discrete instant.
    pub fn zeno_counter(&self) -> u32 {
        self.zeno_counter
    }

    /// Transitions fired during the most recent discrete instant.
    pub fn last_firings(&self) -> &[Firing] {
        &self.firings
    }

    pub fn profile(&self) -> ProfileSummary {
        self.profile.summary()
    }

    pub fn len(&self) -> usize {
        self.comps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comps.is_empty()
    }

    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.comps.iter()
    }

    pub fn component(&self, id: CompId) -> Option<&Component> {
        self.comps.get(id.slot())
    }

    pub(crate) fn comp(&self, id: CompId) -> SimResult<&Component> {
        self.comps
            .get(id.slot())
            .ok_or(SimError::NoSuchComponent { id })
    }

    /// Component by an id this world issued.
    pub(crate) fn at(&self, id: CompId) -> &Component {
        &self.comps[id.slot()]
    }

    pub(crate) fn at_mut(&mut self, id: CompId) -> &mut Component {
        &mut self.comps[id.slot()]
    }

    fn touch_links(&mut self) {
        self.link_version += 1;
        self.topo_version += 1;
    }

    /// Add a component. It takes part in the next discrete pass and the
    /// next integration step.
    pub fn create(&mut self, kind: &Arc<KindDef>, init: Init) -> SimResult<CompId> {
        let index = u32::try_from(self.comps.len()).map_err(|_| SimError::InvalidArg {
            what: "too many components",
        })?;
        let id = CompId::from_index(index);
        let mut comp = Component::new(id, Arc::clone(kind));
        comp.name = init.name().map(str::to_owned);

        let unknown = |what: &'static str, name: &str| SimError::Unknown {
            what,
            kind: kind.name().to_owned(),
            name: name.to_owned(),
        };
        for (name, value) in init.values() {
            let var = kind.var_id(name).ok_or_else(|| unknown("variable", name))?;
            if kind.var(var).is_some_and(|d| d.decl == VarDecl::Input) {
                return Err(SimError::Assignment {
                    origin: comp.origin(),
                    var: name.clone(),
                    what: "input",
                });
            }
            comp.store.values[var.index()] = *value;
        }
        for (name, target) in init.links() {
            let link = kind.link_id(name).ok_or_else(|| unknown("link", name))?;
            if let Some(target) = target {
                self.comp(*target)?;
            }
            comp.links[link.index()] = *target;
        }
        if let Some(state) = init.start_state() {
            comp.state = kind.state_id(state).ok_or_else(|| unknown("state", state))?;
        }
        comp.store.begin_step();

        tracing::debug!(id = %id, kind = kind.name(), state = comp.state_name(), "created component");
        self.comps.push(comp);
        self.touch_links();
        Ok(id)
    }

    /// Point a link of `id` at `target`, or clear it with `None`.
    pub fn set_link(&mut self, id: CompId, link: &str, target: Option<CompId>) -> SimResult<()> {
        let comp = self.comp(id)?;
        let link = comp.kind.link_id(link).ok_or_else(|| SimError::Unknown {
            what: "link",
            kind: comp.kind.name().to_owned(),
            name: link.to_owned(),
        })?;
        self.set_link_id(id, link, target)
    }

    pub(crate) fn set_link_id(
        &mut self,
        id: CompId,
        link: LinkId,
        target: Option<CompId>,
    ) -> SimResult<()> {
        if let Some(target) = target {
            self.comp(target)?;
        }
        let comp = self.comps.get_mut(id.slot()).ok_or(SimError::NoSuchComponent { id })?;
        let slot = comp.links.get_mut(link.index()).ok_or(SimError::InvalidArg {
            what: "link index out of range",
        })?;
        *slot = target;
        comp.inert = false;
        self.touch_links();
        Ok(())
    }

    /// Connect input variable `input` of `id` to a variable of another
    /// component, or disconnect it with `None`.
    pub fn connect(
        &mut self,
        id: CompId,
        input: &str,
        source: Option<(CompId, &str)>,
    ) -> SimResult<()> {
        let comp = self.comp(id)?;
        let var = comp.kind.var_id(input).ok_or_else(|| SimError::Unknown {
            what: "variable",
            kind: comp.kind.name().to_owned(),
            name: input.to_owned(),
        })?;
        self.connect_id(id, var, source)
    }

    pub(crate) fn connect_id(
        &mut self,
        id: CompId,
        input: VarId,
        source: Option<(CompId, &str)>,
    ) -> SimResult<()> {
        let comp = self.comp(id)?;
        if comp.kind.var(input).map(|d| d.decl) != Some(VarDecl::Input) {
            return Err(SimError::InvalidArg {
                what: "only input variables can be connected",
            });
        }
        let source = match source {
            Some((src, name)) => {
                let src_comp = self.comp(src)?;
                let var = src_comp.kind.var_id(name).ok_or_else(|| SimError::Unknown {
                    what: "variable",
                    kind: src_comp.kind.name().to_owned(),
                    name: name.to_owned(),
                })?;
                Some((src, var))
            }
            None => None,
        };
        let comp = self.at_mut(id);
        comp.inputs[input.index()] = source;
        comp.inert = false;
        self.touch_links();
        Ok(())
    }

    /// Push a message into a queue of `id`. Pushes made before the next
    /// step count as part of the most recent instant.
    pub fn push(&mut self, id: CompId, queue: &str, message: Message) -> SimResult<()> {
        let instant = self.instant;
        let comp = self.comps.get_mut(id.slot()).ok_or(SimError::NoSuchComponent { id })?;
        let q = comp.kind.queue_id(queue).ok_or_else(|| SimError::Unknown {
            what: "queue",
            kind: comp.kind.name().to_owned(),
            name: queue.to_owned(),
        })?;
        comp.queues[q.index()].push(instant, message);
        comp.inert = false;
        self.round += 1;
        Ok(())
    }

    /// Assign a continuous or constant variable from outside a step.
    pub fn set_value(&mut self, id: CompId, var: &str, value: f64) -> SimResult<()> {
        let comp = self.comp(id)?;
        let var = comp.kind.var_id(var).ok_or_else(|| SimError::Unknown {
            what: "variable",
            kind: comp.kind.name().to_owned(),
            name: var.to_owned(),
        })?;
        ActionCtx::new(self, id).set(var, value)
    }

    /// Current value of a variable, evaluating algebraic and input
    /// variables as needed.
    pub fn value(&self, id: CompId, var: &str) -> SimResult<f64> {
        let comp = self.comp(id)?;
        WorldScope::new(self, comp, View::Discrete).var(var)
    }

    pub fn value_of(&self, id: CompId, var: VarId) -> SimResult<f64> {
        let comp = self.comp(id)?;
        WorldScope::new(self, comp, View::Discrete).get(var)
    }

    pub fn state_name(&self, id: CompId) -> SimResult<&str> {
        Ok(self.comp(id)?.state_name())
    }

    pub(crate) fn refresh_dependents(&mut self) {
        if self.dependents_version != Some(self.link_version) {
            self.dependents = topology::dependents(&self.comps);
            self.dependents_version = Some(self.link_version);
        }
    }

    /// Components to integrate, in order.
    pub(crate) fn integration_order(&mut self) -> SimResult<Vec<CompId>> {
        let cached = self.config.optimizations.strict_ordering
            && self
                .topology
                .as_ref()
                .is_some_and(|t| t.version == self.topo_version);
        if !cached {
            self.topology = Some(Topology::build(&self.comps, self.topo_version)?);
        }
        let Some(topology) = self.topology.as_ref() else {
            return Ok(Vec::new());
        };
        let mut order = topology.order.clone();
        if !self.config.optimizations.strict_ordering {
            order.sort();
        }
        Ok(order)
    }

    /// Re-take the snapshots lazy links read, at the committed values.
    ///
    /// Components no lazy link reads any more lose theirs, so a link that
    /// is pointed back at them later never sees an old snapshot. Returns
    /// the components snapshotted.
    pub(crate) fn refresh_snapshots(&mut self) -> SimResult<Vec<CompId>> {
        let targets = topology::lazy_targets(&self.comps);
        let snapshots = integrator::snapshots(self, &targets, View::Discrete)?;
        for comp in self.comps.iter_mut() {
            comp.store.previous = None;
        }
        for (id, snapshot) in snapshots {
            self.at_mut(id).store.previous = Some(snapshot);
        }
        self.round += 1;
        Ok(targets)
    }

    /// Resolve the discrete instant at the current clock.
    pub fn resolve(&mut self) -> SimResult<()> {
        let timer = self.config.profile.then(Timer::start);
        resolver::resolve_instant(self)?;
        if let Some(timer) = timer {
            self.profile.discrete.record_since(&timer);
        }
        Ok(())
    }

    fn start(&mut self) -> SimResult<()> {
        if !self.started {
            tracing::debug!(world = %self.config.name, clock = self.clock(), "resolving initial instant");
            self.resolve()?;
            self.started = true;
        }
        Ok(())
    }

    /// One step: continuous advance by `time_step`, then discrete
    /// resolution at the new clock.
    pub fn step(&mut self) -> SimResult<()> {
        self.start()?;
        let timer = self.config.profile.then(Timer::start);
        integrator::advance(self)?;
        self.step_count += 1;
        if let Some(timer) = timer {
            self.profile.continuous.record_since(&timer);
        }
        self.resolve()
    }

    fn finished(&self) -> bool {
        self.config.clock_finish.is_some_and(|finish| {
            let clock = self.clock();
            clock > finish || nearly_equal(clock, finish, Tolerances::default())
        })
    }

    /// Run up to `steps` steps. Returns the number of steps taken.
    pub fn run(&mut self, steps: u64) -> SimResult<u64> {
        self.run_with(steps, &mut NoObserver)
    }

    /// Run up to `steps` steps, calling `observer` after each one.
    pub fn run_with<O>(&mut self, steps: u64, observer: &mut O) -> SimResult<u64>
    where
        O: StepObserver + ?Sized,
    {
        self.start()?;
        let mut taken = 0;
        while taken < steps && !self.finished() {
            self.step()?;
            taken += 1;
            if let ControlFlow::Break(()) = observer.on_step(self) {
                break;
            }
        }
        tracing::debug!(world = %self.config.name, steps = taken, clock = self.clock(), "run finished");
        Ok(taken)
    }

    /// Run until the clock has advanced by `duration`.
    pub fn evolve(&mut self, duration: f64) -> SimResult<u64> {
        self.evolve_with(duration, &mut NoObserver)
    }

    pub fn evolve_with<O>(&mut self, duration: f64, observer: &mut O) -> SimResult<u64>
    where
        O: StepObserver + ?Sized,
    {
        if !(duration.is_finite() && duration >= 0.0) {
            return Err(SimError::InvalidArg {
                what: "duration must be finite and non-negative",
            });
        }
        self.start()?;
        let target = self.clock() + duration;
        let tol = Tolerances::default();
        let mut taken = 0;
        while self.clock() < target && !nearly_equal(self.clock(), target, tol) && !self.finished() {
            self.step()?;
            taken += 1;
            if let ControlFlow::Break(()) = observer.on_step(self) {
                break;
            }
        }
        Ok(taken)
    }
}

impl Default for World {
    fn default() -> Self {
        Self {
            config: WorldConfig::default(),
            comps: Vec::new(),
            step_count: 0,
            clock_base: 0.0,
            base_steps: 0,
            started: false,
            round: 0,
            step_round: 0,
            instant: 0,
            zeno_counter: 0,
            link_version: 0,
            topo_version: 0,
            topology: None,
            dependents: Vec::new(),
            dependents_version: None,
            firings: Vec::new(),
            dest: None,
            zeno_hook: None,
            profile: PhaseProfile::default(),
        }
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("name", &self.config.name)
            .field("clock", &self.clock())
            .field("step_count", &self.step_count)
            .field("components", &self.comps.len())
            .finish()
    }
}
