//! Discrete resolution: repeated transition passes until quiescence.

use std::sync::Arc;

use hs_core::{CompId, SimResult};
use hs_model::{EventId, StateId, SyncEvent, VarId};

use crate::scope::{ActionCtx, View, WorldScope};
use crate::topology;
use crate::world::World;
use crate::zeno;

/// A transition chosen to fire in the current pass.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Choice {
    pub comp: CompId,
    /// Position in the source state's transition table.
    pub index: usize,
}

/// Record of a transition that fired during the last discrete instant.
#[derive(Debug, Clone, PartialEq)]
pub struct Firing {
    pub comp: CompId,
    pub transition: Arc<str>,
    pub from: StateId,
    pub to: StateId,
    /// Pass within the instant (1-based).
    pub pass: u32,
}

struct Candidate {
    comp: CompId,
    /// Guard- and wait-enabled transitions, in declaration order.
    enabled: Vec<usize>,
    /// First enabled transition whose syncs may still hold.
    pointer: usize,
}

impl Candidate {
    fn current(&self) -> Option<usize> {
        self.enabled.get(self.pointer).copied()
    }
}

struct Plan {
    comp: CompId,
    index: usize,
    from: StateId,
    to: StateId,
    events: Vec<(EventId, f64)>,
    resets: Vec<(VarId, f64)>,
}

/// Run discrete passes at the current clock until no transition fires.
///
/// Lazy links read the values as of the end of the previous pass.
pub(crate) fn resolve_instant(world: &mut World) -> SimResult<()> {
    world.instant += 1;
    world.firings.clear();
    world.zeno_counter = 0;
    for comp in world.comps.iter_mut() {
        comp.inert = false;
    }
    world.refresh_snapshots()?;

    let mut published: Vec<CompId> = Vec::new();
    loop {
        world.round += 1;
        for id in published.drain(..) {
            world.at_mut(id).events.fill(None);
        }

        let (choices, idle) = enablement(world)?;
        if world.config.optimizations.inertness {
            for id in idle {
                world.at_mut(id).inert = true;
            }
        }
        if choices.is_empty() {
            break;
        }

        world.zeno_counter += 1;
        zeno::check(world, &choices)?;
        fire(world, &choices, &mut published)?;
        world.refresh_snapshots()?;
    }

    for id in published {
        world.at_mut(id).events.fill(None);
    }
    tracing::trace!(
        clock = world.clock(),
        passes = world.zeno_counter,
        firings = world.firings.len(),
        "instant resolved"
    );
    Ok(())
}

/// Choose at most one transition per component, honoring declaration order
/// and sync requirements. Also returns the components with nothing enabled.
fn enablement(world: &World) -> SimResult<(Vec<Choice>, Vec<CompId>)> {
    let skip_inert = world.config.optimizations.inertness;
    let mut candidates: Vec<Candidate> = Vec::new();
    let mut idle = Vec::new();

    for comp in &world.comps {
        if comp.is_exited() || (skip_inert && comp.inert) {
            continue;
        }
        let scope = WorldScope::new(world, comp, View::Discrete);
        let mut enabled = Vec::new();
        for (i, t) in comp.kind.state(comp.state).transitions().iter().enumerate() {
            let waiting = t
                .waits()
                .iter()
                .all(|w| comp.queues[w.queue.index()].head_matches(w.tag.as_deref()));
            if !waiting {
                continue;
            }
            if let Some(guard) = t.guard_expr() {
                if !guard.eval_bool(&scope)? {
                    continue;
                }
            }
            enabled.push(i);
            // Nothing after an unsynchronized enabled transition can win.
            if t.syncs().is_empty() {
                break;
            }
        }
        if enabled.is_empty() {
            idle.push(comp.id);
        } else {
            candidates.push(Candidate {
                comp: comp.id,
                enabled,
                pointer: 0,
            });
        }
    }

    let mut by_slot: Vec<Option<usize>> = vec![None; world.comps.len()];
    for (i, c) in candidates.iter().enumerate() {
        by_slot[c.comp.slot()] = Some(i);
    }

    // Pointers only move forward, so this terminates.
    loop {
        let mut changed = false;
        for ci in 0..candidates.len() {
            let Some(index) = candidates[ci].current() else {
                continue;
            };
            let comp = world.at(candidates[ci].comp);
            let t = &comp.kind.state(comp.state).transitions()[index];
            let satisfied = t
                .syncs()
                .iter()
                .all(|sync| synced(world, &candidates, &by_slot, comp.link(sync.link), sync));
            if !satisfied {
                candidates[ci].pointer += 1;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    let choices = candidates
        .iter()
        .filter_map(|c| {
            c.current().map(|index| Choice {
                comp: c.comp,
                index,
            })
        })
        .collect();
    Ok((choices, idle))
}

/// Whether the linked component's currently chosen transition emits the
/// event `sync` waits for.
fn synced(
    world: &World,
    candidates: &[Candidate],
    by_slot: &[Option<usize>],
    target: Option<CompId>,
    sync: &SyncEvent,
) -> bool {
    let Some(target) = target else {
        return false;
    };
    let Some(candidate) = by_slot.get(target.slot()).copied().flatten() else {
        return false;
    };
    let Some(index) = candidates[candidate].current() else {
        return false;
    };
    let comp = world.at(target);
    let Some(event) = comp.kind.event_id(&sync.event) else {
        return false;
    };
    comp.kind.state(comp.state).transitions()[index].emits(event)
}

/// Fire one pass: publish events, evaluate and commit resets, run actions,
/// then switch states.
fn fire(world: &mut World, choices: &[Choice], published: &mut Vec<CompId>) -> SimResult<()> {
    let mut plans = Vec::with_capacity(choices.len());
    {
        let world: &World = world;
        for choice in choices {
            let comp = world.at(choice.comp);
            let t = &comp.kind.state(comp.state).transitions()[choice.index];
            let scope = WorldScope::new(world, comp, View::Discrete);
            let events = t
                .events()
                .iter()
                .map(|e| {
                    let value = match &e.value {
                        Some(expr) => expr.eval_real(&scope)?,
                        None => 1.0,
                    };
                    Ok((e.event, value))
                })
                .collect::<SimResult<Vec<_>>>()?;
            plans.push(Plan {
                comp: choice.comp,
                index: choice.index,
                from: comp.state,
                to: t.to(),
                events,
                resets: Vec::new(),
            });
        }
    }

    for plan in &plans {
        if !plan.events.is_empty() {
            let comp = world.at_mut(plan.comp);
            for &(event, value) in &plan.events {
                comp.events[event.index()] = Some(value);
            }
            published.push(plan.comp);
        }
    }
    world.round += 1;

    // Every reset sees the values from before any reset of this pass.
    {
        let world: &World = world;
        for plan in plans.iter_mut() {
            let comp = world.at(plan.comp);
            let t = &comp.kind.state(plan.from).transitions()[plan.index];
            let scope = WorldScope::new(world, comp, View::Discrete);
            plan.resets = t
                .resets()
                .iter()
                .map(|r| Ok((r.var, r.expr.eval_real(&scope)?)))
                .collect::<SimResult<Vec<_>>>()?;
        }
    }
    for plan in &plans {
        let comp = world.at_mut(plan.comp);
        for &(var, value) in &plan.resets {
            comp.store.values[var.index()] = value;
        }
    }
    world.round += 1;

    for plan in plans.iter_mut() {
        let kind = Arc::clone(&world.at(plan.comp).kind);
        let t = &kind.state(plan.from).transitions()[plan.index];
        if let Some(action) = t.action_fn() {
            world.dest = None;
            action.run(&mut ActionCtx::new(world, plan.comp))?;
            if let Some(dest) = world.dest.take() {
                plan.to = dest;
            }
        }
    }

    let pass = world.zeno_counter;
    for plan in &plans {
        let kind = Arc::clone(&world.at(plan.comp).kind);
        let t = &kind.state(plan.from).transitions()[plan.index];
        world.at_mut(plan.comp).state = plan.to;
        if plan.from != plan.to {
            world.topo_version += 1;
        }
        tracing::trace!(comp = %plan.comp, transition = t.name(), pass, "fired");
        world.firings.push(Firing {
            comp: plan.comp,
            transition: t.name_arc(),
            from: plan.from,
            to: plan.to,
            pass,
        });
    }
    world.round += 1;

    if world.config.optimizations.inertness {
        world.refresh_dependents();
        let woken = topology::reachable(
            &world.dependents,
            world.comps.len(),
            plans.iter().map(|p| p.comp),
        );
        for (comp, woken) in world.comps.iter_mut().zip(woken) {
            if woken {
                comp.inert = false;
            }
        }
    }
    Ok(())
}
