//! Shared component kinds for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use hs_model::{Expr, Flow, KindBuilder, KindDef, Message, Transition};
use hs_sim::{Optimizations, World, WorldConfig};

pub const GRAVITY: f64 = 9.8;

pub fn world_with(optimizations: Optimizations) -> World {
    World::new(WorldConfig {
        time_step: 0.01,
        optimizations,
        ..WorldConfig::default()
    })
    .unwrap()
}

/// Both optimization settings, for equivalence checks.
pub fn both_settings() -> [Optimizations; 2] {
    [Optimizations::default(), Optimizations::none()]
}

/// A ball falling under gravity that bounces off `y = 0`.
pub fn ball(restitution: f64) -> Arc<KindDef> {
    let mut b = KindBuilder::new("Ball");
    let y = b.continuous("y", 10.0);
    let v = b.continuous("v", 0.0);
    let bounces = b.constant("bounces", 0.0);
    let falling = b.state("Falling");
    b.flow(falling, Flow::diff(y, Expr::var(v)));
    b.flow(falling, Flow::diff(v, Expr::constant(-GRAVITY)));
    b.transition(
        Transition::new("bounce", falling, falling)
            .guard(Expr::pred(move |s| Ok(s.get(y)? <= 0.0 && s.get(v)? < 0.0)))
            .reset(v, Expr::real(move |s| Ok(-restitution * s.get(v)?)))
            .reset(bounces, Expr::real(move |s| Ok(s.get(bounces)? + 1.0))),
    );
    b.build().unwrap()
}

/// Two states that keep switching into each other: never quiescent.
pub fn flip_flop() -> Arc<KindDef> {
    let mut b = KindBuilder::new("FlipFlop");
    let a = b.state("A");
    let c = b.state("B");
    b.transition(Transition::new("a_to_b", a, c));
    b.transition(Transition::new("b_to_a", c, a));
    b.build().unwrap()
}

/// `x' = rate`, leaving `Running` for `Done` once `x >= limit`.
pub fn timer(rate: f64, limit: f64) -> Arc<KindDef> {
    let mut b = KindBuilder::new("Timer");
    let x = b.continuous("x", 0.0);
    let running = b.state("Running");
    let done = b.state("Done");
    b.flow(running, Flow::diff(x, Expr::constant(rate)));
    b.transition(
        Transition::new("expire", running, done)
            .guard(Expr::pred(move |s| Ok(s.get(x)? >= limit))),
    );
    b.build().unwrap()
}

/// Pushes two `job` messages into the linked consumer's inbox, once.
pub fn producer() -> Arc<KindDef> {
    let mut b = KindBuilder::new("Producer");
    let out = b.lazy_link("out");
    let idle = b.state("Idle");
    let done = b.state("Done");
    b.transition(Transition::new("send", idle, done).action(move |ctx| {
        ctx.push_linked(out, "inbox", Message::new("job", 1.0))?;
        ctx.push_linked(out, "inbox", Message::new("job", 2.0))
    }));
    b.build().unwrap()
}

/// Takes one message per firing and hands the rest of the batch back.
pub fn consumer() -> Arc<KindDef> {
    let mut b = KindBuilder::new("Consumer");
    let inbox = b.queue("inbox");
    let handled = b.constant("handled", 0.0);
    let total = b.constant("total", 0.0);
    let first_batch = b.constant("first_batch", 0.0);
    let last_batch = b.constant("last_batch", 0.0);
    let waiting = b.state("Waiting");
    b.transition(
        Transition::new("take", waiting, waiting)
            .wait(inbox, Some("job"))
            .action(move |ctx| {
                let mut batch = ctx.pop(inbox)?;
                let n = ctx.get(handled)?;
                if n == 0.0 {
                    ctx.set(first_batch, batch.len() as f64)?;
                }
                ctx.set(last_batch, batch.len() as f64)?;
                let msg = batch.remove(0);
                let sum = ctx.get(total)? + msg.value;
                ctx.set(total, sum)?;
                ctx.set(handled, n + 1.0)?;
                ctx.unpop(inbox, batch);
                Ok(())
            }),
    );
    b.build().unwrap()
}
