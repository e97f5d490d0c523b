//! Component kinds and world builders for each benchmark scenario.
//!
//! Formulas are kept minimal so the timings measure the engine rather than
//! the evaluator.

use std::sync::Arc;

use hs_model::{Expr, Flow, Init, KindBuilder, KindDef, Message, ModelResult, Transition};
use hs_sim::{Optimizations, World, WorldConfig};

use crate::{BenchResult, BenchmarkScenario, ScenarioKind};

/// Build a world populated for `scenario`.
pub fn build_world(scenario: &BenchmarkScenario, optimizations: Optimizations) -> BenchResult<World> {
    let n = scenario.components;
    let mut config = WorldConfig {
        name: scenario.id.clone(),
        profile: true,
        optimizations,
        ..WorldConfig::default()
    };
    if let ScenarioKind::Connect = scenario.kind {
        config.input_depth_limit = n + 2;
    }
    if let ScenarioKind::Strictness { .. } = scenario.kind {
        config.time_step = 0.01;
    }
    let mut world = World::new(config)?;

    match scenario.kind {
        ScenarioKind::Continuous => {
            let kind = oscillator()?;
            for _ in 0..n {
                world.create(&kind, Init::new().set("x", 0.0).set("y", 1.0))?;
            }
        }
        ScenarioKind::Algebraic => {
            let kind = algebraic_oscillator()?;
            for _ in 0..n {
                world.create(&kind, Init::new().set("x", 0.0).set("y", 1.0))?;
            }
        }
        ScenarioKind::AlgState { non_alg } => {
            let (pure, ticking) = (pure_algebraic()?, ticker()?);
            for _ in 0..n {
                world.create(&pure, Init::new())?;
            }
            for _ in 0..non_alg {
                world.create(&ticking, Init::new())?;
            }
        }
        ScenarioKind::LinkedFlows => {
            let (c, d) = linked_pair()?;
            for _ in 0..n {
                let ci = world.create(&c, Init::new().set("x", 0.0))?;
                let di = world.create(&d, Init::new().set("y", 1.0).link("c", Some(ci)))?;
                world.set_link(ci, "d", Some(di))?;
            }
        }
        ScenarioKind::Connect => {
            let source = world.create(&ticker()?, Init::new())?;
            let connector = connector()?;
            let mut prev = source;
            for _ in 0..n {
                let c = world.create(&connector, Init::new())?;
                world.connect(c, "t", Some((prev, "t")))?;
                prev = c;
            }
            let sink = world.create(&sink()?, Init::new())?;
            world.connect(sink, "t", Some((prev, "t")))?;
        }
        ScenarioKind::Discrete { watchers } => {
            let clock = world.create(&ticker()?, Init::new().named("clock"))?;
            let (sleeper, watcher) = (sleeper()?, watcher()?);
            for i in 0..n {
                let period = period(i);
                let mut target = world.create(
                    &sleeper,
                    Init::new()
                        .set("period", period)
                        .set("next_wakeup", period)
                        .link("clock", Some(clock)),
                )?;
                for _ in 0..watchers {
                    target = world.create(&watcher, Init::new().link("target", Some(target)))?;
                }
            }
        }
        ScenarioKind::Queue => {
            let clock = world.create(&ticker()?, Init::new().named("clock"))?;
            let (sender, receiver) = (sender()?, receiver()?);
            for i in 0..n {
                let r = world.create(&receiver, Init::new())?;
                let period = period(i);
                world.create(
                    &sender,
                    Init::new()
                        .set("period", period)
                        .set("next_wakeup", period)
                        .link("clock", Some(clock))
                        .link("receiver", Some(r)),
                )?;
            }
        }
        ScenarioKind::Inertness { non_inert } => {
            let (inert, cycling) = (inert()?, cycler(10)?);
            for _ in 0..n {
                world.create(&inert, Init::new())?;
            }
            for _ in 0..non_inert {
                world.create(&cycling, Init::new())?;
            }
        }
        ScenarioKind::Strictness { strict } => {
            let simple = simple(strict)?;
            for _ in 0..n {
                let id = world.create(&simple, Init::new())?;
                world.set_link(id, "other", Some(id))?;
            }
            let complex = complex()?;
            let ts = world.time_step();
            for i in 0..100 {
                world.create(&complex, Init::new().set("t", f64::from(i) * ts))?;
            }
        }
    }
    Ok(world)
}

fn period(i: usize) -> f64 {
    ((i % 99) + 1) as f64 / 10.0
}

/// `x' = y`, `y' = -x`.
pub fn oscillator() -> ModelResult<Arc<KindDef>> {
    let mut b = KindBuilder::new("Oscillator");
    let x = b.strict_continuous("x", 0.0);
    let y = b.strict_continuous("y", 0.0);
    let s = b.state("Enter");
    b.flow(s, Flow::diff(x, Expr::var(y)));
    b.flow(s, Flow::diff(y, Expr::real(move |sc| Ok(-sc.get(x)?))));
    b.build()
}

/// The oscillator with each derivative routed through an algebraic variable.
pub fn algebraic_oscillator() -> ModelResult<Arc<KindDef>> {
    let mut b = KindBuilder::new("AlgOscillator");
    let x = b.strict_continuous("x", 0.0);
    let y = b.strict_continuous("y", 0.0);
    let xa = b.continuous("xa", 0.0);
    let ya = b.continuous("ya", 0.0);
    let s = b.state("Enter");
    b.flow(s, Flow::diff(x, Expr::var(ya)));
    b.flow(s, Flow::diff(y, Expr::real(move |sc| Ok(-sc.get(xa)?))));
    b.flow(s, Flow::alg(ya, Expr::var(y)));
    b.flow(s, Flow::alg(xa, Expr::var(x)));
    b.build()
}

/// Algebraic flows only, so the component can be frozen.
fn pure_algebraic() -> ModelResult<Arc<KindDef>> {
    let mut b = KindBuilder::new("PureAlg");
    let x = b.continuous("x", 0.0);
    let s = b.state("Enter");
    b.flow(s, Flow::alg(x, Expr::constant(1.0)));
    b.build()
}

/// `t' = 1`.
fn ticker() -> ModelResult<Arc<KindDef>> {
    let mut b = KindBuilder::new("Ticker");
    let t = b.strict_continuous("t", 0.0);
    let s = b.state("Enter");
    b.flow(s, Flow::diff(t, Expr::constant(1.0)));
    b.build()
}

/// Two kinds whose derivatives read each other through lazy links.
fn linked_pair() -> ModelResult<(Arc<KindDef>, Arc<KindDef>)> {
    let mut c = KindBuilder::new("LinkedC");
    let x = c.strict_continuous("x", 0.0);
    let d_link = c.lazy_link("d");
    let s = c.state("Enter");
    c.flow(s, Flow::diff(x, Expr::real(move |sc| sc.linked(d_link, "y"))));

    let mut d = KindBuilder::new("LinkedD");
    let y = d.strict_continuous("y", 0.0);
    let c_link = d.lazy_link("c");
    let s = d.state("Enter");
    d.flow(s, Flow::diff(y, Expr::real(move |sc| Ok(-sc.linked(c_link, "x")?))));

    Ok((c.build()?, d.build()?))
}

fn connector() -> ModelResult<Arc<KindDef>> {
    let mut b = KindBuilder::new("Connector");
    b.input("t", None);
    b.state("Enter");
    b.build()
}

/// Integrates its input: `u' = t`.
fn sink() -> ModelResult<Arc<KindDef>> {
    let mut b = KindBuilder::new("Sink");
    let t = b.input("t", None);
    let u = b.continuous("u", 0.0);
    let s = b.state("Enter");
    b.flow(s, Flow::diff(u, Expr::var(t)));
    b.build()
}

/// Emits `awake` every `period` of the linked clock's time.
fn sleeper() -> ModelResult<Arc<KindDef>> {
    let mut b = KindBuilder::new("Sleeper");
    let clock = b.strict_link("clock");
    let next = b.constant("next_wakeup", 0.0);
    let period = b.constant("period", 1.0);
    let awake = b.event("awake");
    let s = b.state("Enter");
    b.transition(
        Transition::new("wake", s, s)
            .guard(Expr::pred(move |sc| Ok(sc.linked(clock, "t")? >= sc.get(next)?)))
            .reset(
                next,
                Expr::real(move |sc| Ok(sc.linked(clock, "t")? + sc.get(period)?)),
            )
            .emit(awake),
    );
    b.build()
}

/// Re-emits `awake` whenever its target does.
fn watcher() -> ModelResult<Arc<KindDef>> {
    let mut b = KindBuilder::new("Watcher");
    let target = b.lazy_link("target");
    let awake = b.event("awake");
    let s = b.state("Enter");
    b.transition(Transition::new("relay", s, s).sync(target, "awake").emit(awake));
    b.build()
}

/// Pushes one message into the linked receiver every `period`.
fn sender() -> ModelResult<Arc<KindDef>> {
    let mut b = KindBuilder::new("Sender");
    let clock = b.strict_link("clock");
    let receiver = b.lazy_link("receiver");
    let next = b.constant("next_wakeup", 0.0);
    let period = b.constant("period", 1.0);
    let s = b.state("Enter");
    b.transition(
        Transition::new("send", s, s)
            .guard(Expr::pred(move |sc| Ok(sc.linked(clock, "t")? >= sc.get(next)?)))
            .reset(
                next,
                Expr::real(move |sc| Ok(sc.linked(clock, "t")? + sc.get(period)?)),
            )
            .action(move |ctx| ctx.push_linked(receiver, "q", Message::tag("awake"))),
    );
    b.build()
}

fn receiver() -> ModelResult<Arc<KindDef>> {
    let mut b = KindBuilder::new("Receiver");
    let q = b.queue("q");
    let s = b.state("Enter");
    b.transition(Transition::new("take", s, s).wait(q, None).action(move |ctx| {
        ctx.pop(q)?;
        Ok(())
    }));
    b.build()
}

/// No transitions and no flows.
fn inert() -> ModelResult<Arc<KindDef>> {
    let mut b = KindBuilder::new("Inert");
    b.state("Enter");
    b.build()
}

/// Integrates `t` in `S0`, then walks through `states - 1` transient states
/// back to `S0` in a single instant.
pub fn cycler(states: usize) -> ModelResult<Arc<KindDef>> {
    let mut b = KindBuilder::new("Cycler");
    let t = b.continuous("t", 0.0);
    let ids: Vec<_> = (0..states.max(2)).map(|i| b.state(&format!("S{i}"))).collect();
    b.flow(ids[0], Flow::diff(t, Expr::constant(1.0)));
    b.transition(
        Transition::new("start", ids[0], ids[1])
            .guard(Expr::pred(move |sc| Ok(sc.get(t)? >= 0.1)))
            .reset(t, Expr::constant(0.0)),
    );
    for pair in ids[1..].windows(2) {
        b.transition(Transition::new("next", pair[0], pair[1]));
    }
    b.transition(Transition::new("wrap", ids[ids.len() - 1], ids[0]));
    b.build()
}

/// Five transitions whose guards never hold, over a flow that reads a
/// non-strict variable.
fn simple(strict: bool) -> ModelResult<Arc<KindDef>> {
    let mut b = KindBuilder::new("Simple");
    let y = if strict {
        b.strict_continuous("y", 0.0)
    } else {
        b.continuous("y", 0.0)
    };
    let x = b.continuous("x", 0.0);
    b.lazy_link("other");
    let a = b.state("A");
    let done = b.state("B");
    b.flow(a, Flow::diff(y, Expr::real(move |sc| Ok(1.0 + sc.get(x)?))));
    for _ in 0..5 {
        b.transition(Transition::new("never", a, done).guard(Expr::pred(move |sc| {
            let y = sc.get(y)?;
            Ok(y.powi(2) - y.sin() + y.cos() < 0.0)
        })));
    }
    b.build()
}

/// `t' = 1` in `A`; past one second, a six-state loop resets `t`.
fn complex() -> ModelResult<Arc<KindDef>> {
    let mut b = KindBuilder::new("Complex");
    let t = b.continuous("t", 0.0);
    let names = ["A", "B", "C", "D", "E1", "F"];
    let ids: Vec<_> = names.iter().map(|n| b.state(n)).collect();
    b.flow(ids[0], Flow::diff(t, Expr::constant(1.0)));
    b.transition(
        Transition::new("restart", ids[0], ids[1])
            .guard(Expr::pred(move |sc| Ok(sc.get(t)? > 1.0)))
            .reset(t, Expr::constant(0.0)),
    );
    for pair in ids[1..].windows(2) {
        b.transition(Transition::new("next", pair[0], pair[1]));
    }
    b.transition(Transition::new("wrap", ids[5], ids[0]));
    b.build()
}
