//! hs-sim: runtime for worlds of hybrid components.
//!
//! A [`World`] owns component instances built from
//! [`hs_model::KindDef`]s and advances them in fixed steps. Each step
//! integrates every component through the same RK stages, then resolves
//! the discrete instant at the new clock: transitions fire in passes until
//! none is enabled, bounded by the zeno limit.
//!
//! # Example
//!
//! ```
//! use hs_model::{Expr, Flow, Init, KindBuilder};
//! use hs_sim::{World, WorldConfig};
//!
//! let mut b = KindBuilder::new("Decay");
//! let x = b.continuous("x", 1.0);
//! let s = b.state("Run");
//! b.flow(s, Flow::diff(x, Expr::real(move |sc| Ok(-sc.get(x)?))));
//! let kind = b.build().unwrap();
//!
//! let mut world = World::new(WorldConfig::default()).unwrap();
//! let id = world.create(&kind, Init::new()).unwrap();
//! world.run(10).unwrap();
//!
//! let x1 = world.value(id, "x").unwrap();
//! assert!((x1 - (-1.0f64).exp()).abs() < 1e-6);
//! ```

pub mod component;
pub mod config;
pub mod integrator;
pub mod observer;
pub mod queue;
pub mod resolver;
pub(crate) mod scope;
pub(crate) mod store;
pub(crate) mod topology;
pub mod world;
pub mod zeno;

pub use component::Component;
pub use config::{ConfigError, ConfigResult, Optimizations, WorldConfig};
pub use integrator::{ForwardEuler, Integrator, RK4};
pub use observer::{NoObserver, StepObserver};
pub use queue::Queue;
pub use resolver::Firing;
pub use world::World;
pub use zeno::{LogZenoHook, ZenoEntry, ZenoHook, ZenoReport};
