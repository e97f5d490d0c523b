//! Integration tests: continuous evolution.
//!
//! Covers RK4 accuracy, strict versus lazy link staging, delay and
//! derivative flows, algebraic caching, input connections, and the
//! structural errors raised while integrating.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use hs_core::SimError;
use hs_model::{Expr, Flow, Init, KindBuilder, Transition};
use hs_sim::{Optimizations, World, WorldConfig};

use common::{both_settings, world_with};

fn world_dt(dt: f64, optimizations: Optimizations) -> World {
    World::new(WorldConfig {
        time_step: dt,
        optimizations,
        ..WorldConfig::default()
    })
    .unwrap()
}

#[test]
fn rk4_tracks_harmonic_oscillator() {
    let mut b = KindBuilder::new("Oscillator");
    let x = b.continuous("x", 1.0);
    let v = b.continuous("v", 0.0);
    let s = b.state("Swinging");
    b.flow(s, Flow::diff(x, Expr::var(v)));
    b.flow(s, Flow::diff(v, Expr::real(move |sc| Ok(-sc.get(x)?))));
    let kind = b.build().unwrap();

    let mut world = world_with(Optimizations::default());
    let id = world.create(&kind, Init::new()).unwrap();
    world.run(100).unwrap();

    assert!((world.clock() - 1.0).abs() < 1e-12);
    assert!((world.value(id, "x").unwrap() - 1.0f64.cos()).abs() < 1e-8);
    assert!((world.value(id, "v").unwrap() + 1.0f64.sin()).abs() < 1e-8);
}

#[test]
fn euler_flow_samples_step_start() {
    let mut b = KindBuilder::new("Growth");
    let x = b.continuous("x", 1.0);
    let s = b.state("Growing");
    b.flow(s, Flow::euler(x, Expr::var(x)));
    let kind = b.build().unwrap();

    let mut world = world_dt(0.1, Optimizations::default());
    let id = world.create(&kind, Init::new()).unwrap();
    world.run(2).unwrap();

    assert!((world.value(id, "x").unwrap() - 1.21).abs() < 1e-12);
}

/// Source with `u' = 1`, a lazy reader and a strict reader, both
/// integrating `u`.
fn staged_readers(optimizations: Optimizations) -> (World, [hs_core::CompId; 3]) {
    let mut b = KindBuilder::new("Source");
    let u = b.continuous("u", 0.0);
    let s = b.state("On");
    b.flow(s, Flow::diff(u, Expr::constant(1.0)));
    let source = b.build().unwrap();

    let mut b = KindBuilder::new("LazyReader");
    let v = b.continuous("v", 0.0);
    let peer = b.lazy_link("peer");
    let s = b.state("On");
    b.flow(s, Flow::diff(v, Expr::real(move |sc| sc.linked(peer, "u"))));
    let lazy = b.build().unwrap();

    let mut b = KindBuilder::new("StrictReader");
    let w = b.continuous("w", 0.0);
    let peer = b.strict_link("peer");
    let s = b.state("On");
    b.flow(s, Flow::diff(w, Expr::real(move |sc| sc.linked(peer, "u"))));
    let strict = b.build().unwrap();

    let mut world = world_dt(0.1, optimizations);
    let a = world.create(&source, Init::new()).unwrap();
    let l = world
        .create(&lazy, Init::new().link("peer", Some(a)))
        .unwrap();
    let s = world
        .create(&strict, Init::new().link("peer", Some(a)))
        .unwrap();
    (world, [a, l, s])
}

#[test]
fn strict_link_sees_current_stage_and_lazy_link_lags() {
    for opts in both_settings() {
        let (mut world, [_, lazy, strict]) = staged_readers(opts);

        world.run(1).unwrap();
        assert!((world.value(strict, "w").unwrap() - 0.005).abs() < 1e-12);
        assert!((world.value(lazy, "v").unwrap() - 0.0025).abs() < 1e-12);

        world.run(1).unwrap();
        assert!((world.value(strict, "w").unwrap() - 0.02).abs() < 1e-12);
        assert!((world.value(lazy, "v").unwrap() - 0.015).abs() < 1e-12);
    }
}

/// `A` reads `B` through a strict link, `B` reads `A` through a lazy one.
/// A: `p' = 1`, `r' = B.q`. B: `q' = A.p`.
fn feedback_pair(optimizations: Optimizations) -> (World, [hs_core::CompId; 2]) {
    let mut b = KindBuilder::new("Leader");
    let p = b.continuous("p", 0.0);
    let r = b.continuous("r", 0.0);
    let peer = b.strict_link("peer");
    let s = b.state("On");
    b.flow(s, Flow::diff(p, Expr::constant(1.0)));
    b.flow(s, Flow::diff(r, Expr::real(move |sc| sc.linked(peer, "q"))));
    let leader = b.build().unwrap();

    let mut b = KindBuilder::new("Follower");
    let q = b.continuous("q", 0.0);
    let peer = b.lazy_link("peer");
    let s = b.state("On");
    b.flow(s, Flow::diff(q, Expr::real(move |sc| sc.linked(peer, "p"))));
    let follower = b.build().unwrap();

    let mut world = world_dt(0.1, optimizations);
    let fb = world.create(&follower, Init::new()).unwrap();
    let ld = world
        .create(&leader, Init::new().link("peer", Some(fb)))
        .unwrap();
    world.set_link(fb, "peer", Some(ld)).unwrap();
    (world, [ld, fb])
}

#[test]
fn lazy_side_of_feedback_pair_lags_one_stage() {
    let h = 0.1;
    for opts in both_settings() {
        let (mut world, [leader, follower]) = feedback_pair(opts);
        world.run(1).unwrap();

        // p at the stage points: 0, h/2, h/2, h. The lazy side sees the
        // stage before: 0, 0, h/2, h/2.
        let q = h / 6.0 * (0.0 + 2.0 * 0.0 + 2.0 * (h / 2.0) + h / 2.0);
        assert!((world.value(follower, "q").unwrap() - q).abs() < 1e-15);

        // q at its own stage points is 0, 0, 0, h * (h/2); the strict side
        // sees them unshifted.
        let r = h / 6.0 * (h * h / 2.0);
        assert!((world.value(leader, "r").unwrap() - r).abs() < 1e-15);
    }
}

#[test]
fn lazy_link_breaks_algebraic_cycle_between_components() {
    let h = 0.1;
    for opts in both_settings() {
        let mut b = KindBuilder::new("Summer");
        let p = b.continuous("p", 0.0);
        let a = b.continuous("a", 0.0);
        let peer = b.strict_link("peer");
        let s = b.state("On");
        b.flow(s, Flow::diff(p, Expr::constant(1.0)));
        b.flow(s, Flow::alg(a, Expr::real(move |sc| Ok(sc.linked(peer, "b")? + sc.get(p)?))));
        let summer = b.build().unwrap();

        let mut b = KindBuilder::new("Halver");
        let half = b.continuous("b", 0.0);
        let m = b.continuous("m", 0.0);
        let peer = b.lazy_link("peer");
        let s = b.state("On");
        b.flow(s, Flow::alg(half, Expr::real(move |sc| Ok(0.5 * sc.linked(peer, "a")?))));
        b.flow(s, Flow::diff(m, Expr::var(half)));
        let halver = b.build().unwrap();

        let mut world = world_dt(h, opts);
        let hv = world.create(&halver, Init::new()).unwrap();
        let sm = world
            .create(&summer, Init::new().link("peer", Some(hv)))
            .unwrap();
        world.set_link(hv, "peer", Some(sm)).unwrap();

        assert_eq!(world.run(1).unwrap(), 1);
        assert!(world.value(sm, "a").unwrap().is_finite());
        assert!(world.value(hv, "b").unwrap().is_finite());

        // a at the stage points is 0, h/2, 3h/4, 11h/8; b halves the
        // previous stage's a: 0, 0, h/4, 3h/8.
        let expected = h / 6.0 * (2.0 * (h / 4.0) + 3.0 * h / 8.0);
        assert!((world.value(hv, "m").unwrap() - expected).abs() < 1e-15);
    }
}

#[test]
fn relinked_lazy_target_is_read_at_current_values() {
    let mut b = KindBuilder::new("Ramp");
    let u = b.continuous("u", 0.0);
    let s = b.state("On");
    b.flow(s, Flow::diff(u, Expr::constant(1.0)));
    let ramp = b.build().unwrap();

    let mut b = KindBuilder::new("Reader");
    let v = b.continuous("v", 0.0);
    let peer = b.lazy_link("peer");
    let s = b.state("On");
    b.flow(s, Flow::diff(v, Expr::real(move |sc| sc.linked(peer, "u"))));
    let reader = b.build().unwrap();

    // Reads the first ramp for `first` steps, the second for ten, then the
    // first again for one step. Returns the last step's increment.
    let last_increment = |first: u64| {
        let mut world = world_dt(0.1, Optimizations::default());
        let r1 = world.create(&ramp, Init::new()).unwrap();
        let r2 = world.create(&ramp, Init::new()).unwrap();
        let rd = world.create(&reader, Init::new()).unwrap();
        world.set_link(rd, "peer", Some(r1)).unwrap();
        world.run(first).unwrap();
        world.set_link(rd, "peer", Some(r2)).unwrap();
        world.run(11 - first).unwrap();
        world.set_link(rd, "peer", Some(r1)).unwrap();
        let before = world.value(rd, "v").unwrap();
        world.run(1).unwrap();
        world.value(rd, "v").unwrap() - before
    };

    // u runs from 1.1 to 1.2; lazily read stages see 1.1, 1.1, 1.15, 1.15.
    let expected = 0.1 / 6.0 * (1.1 + 2.0 * 1.1 + 2.0 * 1.15 + 1.15);
    for first in [0, 1, 5] {
        assert!((last_increment(first) - expected).abs() < 1e-12, "first = {first}");
    }
}

#[test]
fn null_strict_link_fails_only_when_read() {
    let mut b = KindBuilder::new("Optional");
    let x = b.continuous("x", 0.0);
    let y = b.continuous("y", 0.0);
    let peer = b.strict_link("peer");
    let idle = b.state("Idle");
    let coupled = b.state("Coupled");
    b.flow(idle, Flow::diff(x, Expr::constant(1.0)));
    b.flow(coupled, Flow::diff(y, Expr::real(move |sc| sc.linked(peer, "x"))));
    b.transition(
        Transition::new("couple", idle, coupled)
            .guard(Expr::pred(move |sc| Ok(sc.get(x)? >= 0.25))),
    );
    let kind = b.build().unwrap();

    let mut world = world_dt(0.1, Optimizations::default());
    let id = world.create(&kind, Init::new()).unwrap();
    assert_eq!(world.run(3).unwrap(), 3);
    assert_eq!(world.state_name(id).unwrap(), "Coupled");

    let err = world.run(1).unwrap_err();
    assert!(
        matches!(&err, SimError::UnresolvedLink { strict: true, link, .. } if link == "peer"),
        "{err}"
    );
}

#[test]
fn delay_flow_replays_signal_after_its_delay() {
    for opts in both_settings() {
        let mut b = KindBuilder::new("Delayed");
        let d = b.constant("d", 0.3);
        let t = b.continuous("t", 0.0);
        let u = b.continuous("u", 0.0);
        let delayed = b.continuous("delay_u", 0.0);
        let idu = b.continuous("idu", 0.0);
        let s = b.state("On");
        b.flow(s, Flow::diff(t, Expr::constant(1.0)));
        b.flow(s, Flow::alg(u, Expr::var(t)));
        b.flow(s, Flow::delay(delayed, Expr::var(u), Expr::var(d)));
        b.flow(s, Flow::diff(idu, Expr::var(delayed)));
        let kind = b.build().unwrap();

        let mut world = world_dt(0.1, opts);
        let id = world.create(&kind, Init::new()).unwrap();

        world.run(2).unwrap();
        assert_eq!(world.value(id, "delay_u").unwrap(), 0.0);

        world.run(8).unwrap();
        let clock = world.clock();
        assert!((world.value(id, "delay_u").unwrap() - (clock - 0.3)).abs() < 1e-12);
        // Every stage is replayed, so integrating the delayed ramp is exact.
        let area = (clock - 0.3).powi(2) / 2.0;
        assert!((world.value(id, "idu").unwrap() - area).abs() < 1e-12);
    }
}

#[test]
fn delay_rejects_negative_duration() {
    let mut b = KindBuilder::new("Broken");
    let u = b.continuous("u", 0.0);
    let delayed = b.continuous("delayed", 0.0);
    let s = b.state("On");
    b.flow(s, Flow::delay(delayed, Expr::var(u), Expr::constant(-1.0)));
    let kind = b.build().unwrap();

    let mut world = World::default();
    world.create(&kind, Init::new()).unwrap();
    let err = world.run(1).unwrap_err();
    assert!(matches!(err, SimError::InvalidArg { .. }), "{err}");
}

#[test]
fn derivative_flow_differentiates_stage_samples() {
    for opts in both_settings() {
        let mut b = KindBuilder::new("Differentiator");
        let t = b.continuous("t", 0.0);
        let line = b.continuous("line", 0.0);
        let wave = b.continuous("wave", 0.0);
        let dline = b.continuous("dline", 0.0);
        let dwave = b.continuous("dwave", 0.0);
        let s = b.state("On");
        b.flow(s, Flow::diff(t, Expr::constant(1.0)));
        b.flow(s, Flow::alg(line, Expr::real(move |sc| Ok(3.0 * sc.get(t)?))));
        b.flow(s, Flow::alg(wave, Expr::real(move |sc| Ok(sc.get(t)?.sin()))));
        b.flow(s, Flow::derive(dline, Expr::var(line)));
        b.flow(s, Flow::derive(dwave, Expr::var(wave)));
        let kind = b.build().unwrap();

        let mut world = world_with(opts);
        let id = world.create(&kind, Init::new()).unwrap();

        world.run(1).unwrap();
        assert!((world.value(id, "dline").unwrap() - 3.0).abs() < 1e-9);

        world.run(99).unwrap();
        let clock = world.clock();
        assert!((world.value(id, "dwave").unwrap() - clock.cos()).abs() < 5e-3);
    }
}

#[test]
fn algebraic_is_evaluated_once_per_stage() {
    for opts in both_settings() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let mut b = KindBuilder::new("Shared");
        let x = b.continuous("x", 1.0);
        let y = b.continuous("y", 0.0);
        let z = b.continuous("z", 0.0);
        let s = b.state("On");
        b.flow(
            s,
            Flow::alg(
                z,
                Expr::real(move |sc| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(2.0 * sc.get(x)?)
                }),
            ),
        );
        b.flow(s, Flow::diff(x, Expr::real(move |sc| Ok(-sc.get(z)?))));
        b.flow(s, Flow::diff(y, Expr::var(z)));
        let kind = b.build().unwrap();

        let mut world = world_with(opts);
        let id = world.create(&kind, Init::new()).unwrap();
        world.run(5).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 20);

        let first = world.value(id, "z").unwrap();
        let second = world.value(id, "z").unwrap();
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 21);
    }
}

#[test]
fn pure_algebraic_component_evaluates_once_per_step_when_frozen() {
    let run = |opts: Optimizations| {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let mut b = KindBuilder::new("Gauge");
        let k = b.constant("k", 3.0);
        let g = b.continuous("g", 0.0);
        let s = b.state("Reading");
        b.flow(
            s,
            Flow::alg(
                g,
                Expr::real(move |sc| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(sc.get(k)? * sc.clock())
                }),
            ),
        );
        let kind = b.build().unwrap();

        let mut world = world_dt(0.5, opts);
        let id = world.create(&kind, Init::new()).unwrap();
        world.run(3).unwrap();
        let value = world.value(id, "g").unwrap();
        (calls.load(Ordering::SeqCst), value)
    };

    let (frozen_calls, frozen_value) = run(Optimizations::default());
    let (plain_calls, plain_value) = run(Optimizations::none());

    // One read per step plus the final `value` call.
    assert_eq!(frozen_calls, 3 + 1);
    assert_eq!(plain_calls, 3 * 4 + 1);
    assert_eq!(frozen_value, plain_value);
    assert_eq!(frozen_value, 4.5);
}

#[test]
fn algebraic_cycle_is_reported() {
    let mut b = KindBuilder::new("Loop");
    let a = b.continuous("a", 0.0);
    let c = b.continuous("b", 0.0);
    let s = b.state("On");
    b.flow(s, Flow::alg(a, Expr::real(move |sc| Ok(sc.get(c)? + 1.0))));
    b.flow(s, Flow::alg(c, Expr::real(move |sc| Ok(sc.get(a)? + 1.0))));
    let kind = b.build().unwrap();

    let mut world = World::default();
    world.create(&kind, Init::new()).unwrap();
    let err = world.run(1).unwrap_err();
    assert!(matches!(err, SimError::AlgebraicCycle { .. }), "{err}");
}

fn follower(strict: bool) -> Arc<hs_model::KindDef> {
    let mut b = KindBuilder::new("Follower");
    let x = b.continuous("x", 0.0);
    let peer = if strict {
        b.strict_link("peer")
    } else {
        b.lazy_link("peer")
    };
    let s = b.state("On");
    b.flow(s, Flow::diff(x, Expr::real(move |sc| sc.linked(peer, "x"))));
    b.build().unwrap()
}

#[test]
fn strict_link_cycle_is_reported() {
    let kind = follower(true);
    let mut world = World::default();
    let a = world.create(&kind, Init::new()).unwrap();
    let b = world
        .create(&kind, Init::new().link("peer", Some(a)))
        .unwrap();
    world.set_link(a, "peer", Some(b)).unwrap();

    let err = world.run(1).unwrap_err();
    assert!(matches!(err, SimError::StrictLinkCycle { .. }), "{err}");
}

#[test]
fn lazy_links_may_form_cycles() {
    let kind = follower(false);
    let mut world = World::default();
    let a = world.create(&kind, Init::new()).unwrap();
    let b = world
        .create(&kind, Init::new().link("peer", Some(a)))
        .unwrap();
    world.set_link(a, "peer", Some(b)).unwrap();

    assert_eq!(world.run(3).unwrap(), 3);
}

#[test]
fn null_links_are_unresolved() {
    let mut world = World::default();
    world.create(&follower(true), Init::new()).unwrap();
    let err = world.run(1).unwrap_err();
    assert!(matches!(err, SimError::UnresolvedLink { strict: true, .. }), "{err}");

    let mut world = World::default();
    world.create(&follower(false), Init::new()).unwrap();
    let err = world.run(1).unwrap_err();
    assert!(matches!(err, SimError::UnresolvedLink { strict: false, .. }), "{err}");
}

fn tank() -> Arc<hs_model::KindDef> {
    let mut b = KindBuilder::new("Tank");
    let level = b.continuous("level", 5.0);
    let s = b.state("Draining");
    b.flow(s, Flow::diff(level, Expr::constant(-1.0)));
    b.build().unwrap()
}

fn sensor(default: Option<f64>) -> Arc<hs_model::KindDef> {
    let mut b = KindBuilder::new("Sensor");
    let level = b.input("level", default);
    let seen = b.constant("seen", 0.0);
    let watching = b.state("Watching");
    let tripped = b.state("Tripped");
    b.transition(
        Transition::new("trip", watching, tripped)
            .guard(Expr::pred(move |sc| Ok(sc.get(level)? < 4.5)))
            .reset(seen, Expr::var(level)),
    );
    b.build().unwrap()
}

#[test]
fn input_reads_through_connection() {
    for opts in both_settings() {
        let mut world = world_with(opts);
        let t = world.create(&tank(), Init::new()).unwrap();
        let s = world.create(&sensor(None), Init::new()).unwrap();
        world.connect(s, "level", Some((t, "level"))).unwrap();

        world.run(40).unwrap();
        assert_eq!(world.state_name(s).unwrap(), "Watching");
        world.run(20).unwrap();
        assert_eq!(world.state_name(s).unwrap(), "Tripped");

        let seen = world.value(s, "seen").unwrap();
        assert!(seen < 4.5 && seen > 4.48, "seen = {seen}");
        assert_eq!(
            world.value(s, "level").unwrap(),
            world.value(t, "level").unwrap()
        );
    }
}

#[test]
fn unconnected_input_uses_default_or_fails() {
    let mut world = World::default();
    let s = world.create(&sensor(Some(1.0)), Init::new()).unwrap();
    world.run(0).unwrap();
    assert_eq!(world.state_name(s).unwrap(), "Tripped");

    let mut world = World::default();
    world.create(&sensor(None), Init::new()).unwrap();
    let err = world.run(0).unwrap_err();
    assert!(matches!(err, SimError::UnconnectedInput { .. }), "{err}");
}

#[test]
fn input_chain_cycle_hits_depth_limit() {
    let mut world = World::new(WorldConfig {
        input_depth_limit: 8,
        ..WorldConfig::default()
    })
    .unwrap();
    let kind = sensor(None);
    let a = world.create(&kind, Init::new()).unwrap();
    let b = world.create(&kind, Init::new()).unwrap();
    world.connect(a, "level", Some((b, "level"))).unwrap();
    world.connect(b, "level", Some((a, "level"))).unwrap();

    let err = world.run(0).unwrap_err();
    assert!(matches!(err, SimError::InputDepth { limit: 8, .. }), "{err}");
}

#[test]
fn exited_component_stops_evolving() {
    let mut b = KindBuilder::new("Fuse");
    let x = b.continuous("x", 0.0);
    let s = b.state("Burning");
    b.flow(s, Flow::diff(x, Expr::constant(1.0)));
    b.transition(
        Transition::new("blow", s, hs_model::StateId::EXIT)
            .guard(Expr::pred(move |sc| Ok(sc.get(x)? >= 0.25))),
    );
    let kind = b.build().unwrap();

    let mut world = world_dt(0.1, Optimizations::default());
    let id = world.create(&kind, Init::new()).unwrap();
    world.run(3).unwrap();
    assert!(world.component(id).unwrap().is_exited());
    let frozen = world.value(id, "x").unwrap();

    world.run(5).unwrap();
    assert_eq!(world.value(id, "x").unwrap(), frozen);
    assert_eq!(world.state_name(id).unwrap(), "Exit");
}
