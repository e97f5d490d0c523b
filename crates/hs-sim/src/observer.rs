//! Per-step observation of a running world.

use std::ops::ControlFlow;

use crate::world::World;

/// Called after every completed step (continuous advance plus discrete
/// resolution). Returning `Break` stops the run after that step.
pub trait StepObserver {
    fn on_step(&mut self, world: &World) -> ControlFlow<()>;
}

impl<F> StepObserver for F
where
    F: FnMut(&World) -> ControlFlow<()>,
{
    fn on_step(&mut self, world: &World) -> ControlFlow<()> {
        self(world)
    }
}

/// Observer that never interrupts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoObserver;

impl StepObserver for NoObserver {
    fn on_step(&mut self, _world: &World) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}
