//! Property tests: integration accuracy, determinism, and equivalence of
//! the scheduler optimizations.

mod common;

use hs_model::{Expr, Flow, Init, KindBuilder};
use hs_sim::{Optimizations, World, WorldConfig};
use proptest::prelude::*;

use common::{ball, world_with};

fn bouncing_run(opts: Optimizations, heights: &[f64], restitution: f64, steps: u64) -> Vec<f64> {
    let mut world = world_with(opts);
    let kind = ball(restitution);
    let ids: Vec<_> = heights
        .iter()
        .map(|h| world.create(&kind, Init::new().set("y", *h)).unwrap())
        .collect();
    world.run(steps).unwrap();
    ids.iter()
        .flat_map(|id| {
            ["y", "v", "bounces"]
                .into_iter()
                .map(|v| world.value(*id, v).unwrap())
                .collect::<Vec<_>>()
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn decay_matches_closed_form(k in 0.1f64..2.0, steps in 1u64..200) {
        let mut b = KindBuilder::new("Decay");
        let x = b.continuous("x", 1.0);
        let s = b.state("On");
        b.flow(s, Flow::diff(x, Expr::real(move |sc| Ok(-k * sc.get(x)?))));
        let kind = b.build().unwrap();

        let mut world = World::new(WorldConfig { time_step: 0.01, ..WorldConfig::default() }).unwrap();
        let id = world.create(&kind, Init::new()).unwrap();
        world.run(steps).unwrap();

        let exact = (-k * world.clock()).exp();
        prop_assert!((world.value(id, "x").unwrap() - exact).abs() < 1e-7);
    }

    #[test]
    fn oscillator_stays_on_its_orbit(dt in 0.001f64..0.05, steps in 1u64..200) {
        let mut b = KindBuilder::new("Oscillator");
        let x = b.continuous("x", 0.0);
        let y = b.continuous("y", 1.0);
        let s = b.state("On");
        b.flow(s, Flow::diff(x, Expr::var(y)));
        b.flow(s, Flow::diff(y, Expr::real(move |sc| Ok(-sc.get(x)?))));
        let kind = b.build().unwrap();

        let mut world = World::new(WorldConfig { time_step: dt, ..WorldConfig::default() }).unwrap();
        let id = world.create(&kind, Init::new()).unwrap();
        world.run(steps).unwrap();

        let (xv, yv) = (world.value(id, "x").unwrap(), world.value(id, "y").unwrap());
        prop_assert!((xv * xv + yv * yv - 1.0).abs() < 1e-6);
        prop_assert!((xv - world.clock().sin()).abs() < 1e-5);
    }

    #[test]
    fn optimizations_do_not_change_results(
        heights in prop::collection::vec(0.5f64..20.0, 1..5),
        restitution in 0.3f64..0.95,
        steps in 1u64..400,
    ) {
        let fast = bouncing_run(Optimizations::default(), &heights, restitution, steps);
        let plain = bouncing_run(Optimizations::none(), &heights, restitution, steps);
        prop_assert_eq!(fast, plain);
    }

    #[test]
    fn runs_are_deterministic(
        heights in prop::collection::vec(0.5f64..20.0, 1..4),
        steps in 1u64..300,
    ) {
        let a = bouncing_run(Optimizations::default(), &heights, 0.7, steps);
        let b = bouncing_run(Optimizations::default(), &heights, 0.7, steps);
        prop_assert_eq!(a, b);
    }
}
