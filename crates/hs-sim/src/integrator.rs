//! Fixed-step, stage-interleaved integration of all components.
//!
//! Every component is advanced through the same RK stage before any
//! component starts the next one, so strict links observe the current stage
//! and lazy links the stage completed before it. At stage 0 lazy links read
//! the snapshot taken at the step start.

use hs_core::{CompId, SimResult, whole_steps};
use hs_model::{Flow, Integration, Scope, VarDecl, VarId};

use crate::scope::{View, WorldScope};
use crate::store::DelayLine;
use crate::topology;
use crate::world::World;

/// Per-variable stepping rule.
pub trait Integrator {
    /// Number of slope evaluations per step.
    fn stages(&self) -> usize;

    /// Evaluation point for stage `s + 1` once slope `k[s]` is known.
    fn stage_point(&self, x0: f64, k: &[f64; 4], s: usize, dt: f64) -> f64;

    /// Value at the end of the step.
    fn finish(&self, x0: f64, k: &[f64; 4], dt: f64) -> f64;
}

/// Classical RK4 (Runge-Kutta 4th order) integrator.
#[derive(Clone, Debug)]
pub struct RK4;

impl RK4 {
    const NODES: [f64; 3] = [0.5, 0.5, 1.0];
}

impl Integrator for RK4 {
    fn stages(&self) -> usize {
        4
    }

    fn stage_point(&self, x0: f64, k: &[f64; 4], s: usize, dt: f64) -> f64 {
        x0 + Self::NODES[s] * dt * k[s]
    }

    fn finish(&self, x0: f64, k: &[f64; 4], dt: f64) -> f64 {
        // x_new = x + (dt/6) * (k1 + 2*k2 + 2*k3 + k4)
        x0 + dt / 6.0 * (k[0] + 2.0 * k[1] + 2.0 * k[2] + k[3])
    }
}

/// Forward Euler (explicit, 1st order).
/// The derivative is sampled once, at the step start.
#[derive(Clone, Debug)]
pub struct ForwardEuler;

impl Integrator for ForwardEuler {
    fn stages(&self) -> usize {
        1
    }

    fn stage_point(&self, x0: f64, _k: &[f64; 4], _s: usize, _dt: f64) -> f64 {
        x0
    }

    fn finish(&self, x0: f64, k: &[f64; 4], dt: f64) -> f64 {
        x0 + dt * k[0]
    }
}

pub fn integrator_for(method: Integration) -> &'static dyn Integrator {
    match method {
        Integration::Rk4 => &RK4,
        Integration::Euler => &ForwardEuler,
    }
}

/// Value of a derivative variable at the stage after `s`, or at the end of
/// the step for `s == 3`, from the signal samples `k`.
///
/// Stages 1 and 2 sit half a step in, so every difference spans `dt / 2`.
pub(crate) fn derivative_point(current: f64, k: &[f64; 4], s: usize, dt: f64) -> f64 {
    let half = dt / 2.0;
    match s {
        0 => current,
        1 => (k[1] - k[0]) / half,
        2 => (k[2] - k[1]) / half,
        _ => (k[3] - k[1]) / half,
    }
}

type Slopes = Vec<(CompId, VarId, f64)>;
type Snapshots = Vec<(CompId, Vec<f64>)>;

/// Advance every live component by one time step.
pub(crate) fn advance(world: &mut World) -> SimResult<()> {
    let dt = world.config.time_step;
    let order = world.integration_order()?;
    let lazy_targets = world.refresh_snapshots()?;

    if world.config.optimizations.frozen_skip {
        world.refresh_dependents();
        topology::mark_frozen(&mut world.comps, &world.dependents);
    }
    for &id in &order {
        world.at_mut(id).store.begin_step();
    }
    prime_delays(world, &order)?;
    world.round += 1;
    world.step_round = world.round;

    for s in 0..4 {
        world.round += 1;
        let (slopes, snapshots) = evaluate_stage(world, &order, &lazy_targets, s)?;

        for (id, var, k) in slopes {
            world.at_mut(id).store.slopes[var.index()][s] = k;
        }
        for (id, snapshot) in snapshots {
            world.at_mut(id).store.previous = Some(snapshot);
        }
        if s < 3 {
            for &id in &order {
                let comp = world.at_mut(id);
                let store = &mut comp.store;
                for flow in comp.kind.state(comp.state).flows().iter() {
                    let i = flow.var().index();
                    store.staged[i] = match flow {
                        Flow::Differential { method, .. } => integrator_for(*method)
                            .stage_point(store.values[i], &store.slopes[i], s, dt),
                        Flow::Delay { .. } => match &store.delays[i] {
                            Some(line) => line.oldest()[s + 1],
                            None => continue,
                        },
                        Flow::Derivative { .. } => {
                            derivative_point(store.values[i], &store.slopes[i], s, dt)
                        }
                        Flow::Algebraic { .. } => continue,
                    };
                }
            }
        }
    }

    for &id in &order {
        let comp = world.at_mut(id);
        let store = &mut comp.store;
        for flow in comp.kind.state(comp.state).flows().iter() {
            let i = flow.var().index();
            let value = match flow {
                Flow::Differential { method, .. } => {
                    integrator_for(*method).finish(store.values[i], &store.slopes[i], dt)
                }
                Flow::Delay { .. } => match store.delays[i].as_mut() {
                    Some(line) => line.record(store.slopes[i]),
                    None => continue,
                },
                Flow::Derivative { .. } => derivative_point(store.values[i], &store.slopes[i], 3, dt),
                Flow::Algebraic { .. } => continue,
            };
            store.values[i] = value;
            store.staged[i] = value;
        }
    }
    for comp in world.comps.iter_mut() {
        comp.frozen = false;
    }
    world.round += 1;
    Ok(())
}

/// Fill the history of every delay flow entering its first step, then load
/// each delayed variable with the row this step replays.
fn prime_delays(world: &mut World, order: &[CompId]) -> SimResult<()> {
    let dt = world.config.time_step;
    let mut fresh = Vec::new();
    for &id in order {
        let comp = world.at(id);
        let scope = WorldScope::new(world, comp, View::Discrete);
        for flow in comp.kind.state(comp.state).flows().sampled() {
            if let Flow::Delay { var, expr, by } = flow {
                if comp.store.delays[var.index()].is_none() {
                    let steps = whole_steps(by.eval_real(&scope)?, dt)?;
                    fresh.push((id, *var, DelayLine::new(steps, expr.eval_real(&scope)?)));
                }
            }
        }
    }
    for (id, var, line) in fresh {
        tracing::trace!(comp = %id, steps = line.len(), "delay line filled");
        world.at_mut(id).store.delays[var.index()] = Some(line);
    }

    for &id in order {
        let comp = world.at_mut(id);
        let store = &mut comp.store;
        for flow in comp.kind.state(comp.state).flows().sampled() {
            if let Flow::Delay { var, .. } = flow {
                let i = var.index();
                if let Some(line) = &store.delays[i] {
                    store.values[i] = line.oldest()[0];
                    store.staged[i] = store.values[i];
                }
            }
        }
    }
    Ok(())
}

/// Evaluate slopes and lazy snapshots for stage `s` against the staged
/// values, without mutating anything but algebraic caches.
fn evaluate_stage(
    world: &World,
    order: &[CompId],
    lazy_targets: &[CompId],
    s: usize,
) -> SimResult<(Slopes, Snapshots)> {
    let mut slopes = Vec::new();
    for &id in order {
        let comp = world.at(id);
        if s > 0 && comp.frozen {
            continue;
        }
        let scope = WorldScope::new(world, comp, View::Stage(s));
        let flows = comp.kind.state(comp.state).flows();
        for flow in flows.algebraic() {
            scope.get(flow.var())?;
        }
        for flow in flows.iter() {
            let sampled = match flow {
                Flow::Differential { method, .. } => s < integrator_for(*method).stages(),
                Flow::Delay { .. } | Flow::Derivative { .. } => true,
                Flow::Algebraic { .. } => false,
            };
            if sampled {
                slopes.push((id, flow.var(), flow.expr().eval_real(&scope)?));
            }
        }
    }

    let snapshots = snapshots(world, lazy_targets, View::Stage(s))?;
    Ok((slopes, snapshots))
}

/// Every variable of each of `targets` as seen through `view`. Inputs are
/// left as NaN; lazy reads follow them to their sources.
pub(crate) fn snapshots(world: &World, targets: &[CompId], view: View) -> SimResult<Snapshots> {
    targets
        .iter()
        .map(|&id| {
            let comp = world.at(id);
            let scope = WorldScope::new(world, comp, view);
            let snapshot = comp
                .kind
                .vars()
                .iter()
                .enumerate()
                .map(|(i, def)| match def.decl {
                    VarDecl::Input => Ok(f64::NAN),
                    _ => scope.get(VarId::from_index(i)),
                })
                .collect::<SimResult<Vec<f64>>>()?;
            Ok((id, snapshot))
        })
        .collect()
}
