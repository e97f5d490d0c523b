//! Step observer that samples channels into trace records.

use std::ops::ControlFlow;

use hs_core::{SimError, SimResult};
use hs_sim::{StepObserver, World};

use crate::hash::compute_trace_id;
use crate::types::{Channel, FiringRecord, Trace, TraceManifest, TraceRecord};
use crate::TraceResult;

/// Records channel values every `every` steps, and every step on which a
/// transition fired when firings are recorded.
#[derive(Debug)]
pub struct Tracer {
    channels: Vec<Channel>,
    every: u64,
    firings: bool,
    records: Vec<TraceRecord>,
    error: Option<SimError>,
}

impl Tracer {
    pub fn new(channels: Vec<Channel>) -> Self {
        Self {
            channels,
            every: 1,
            firings: false,
            records: Vec::new(),
            error: None,
        }
    }

    /// Record every `n`-th step (decimation). Zero is treated as one.
    pub fn every(mut self, n: u64) -> Self {
        self.every = n.max(1);
        self
    }

    pub fn with_firings(mut self, on: bool) -> Self {
        self.firings = on;
        self
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn records(&self) -> &[TraceRecord] {
        &self.records
    }

    /// Record the current state of `world` unconditionally.
    pub fn sample(&mut self, world: &World) -> SimResult<()> {
        let values = self
            .channels
            .iter()
            .map(|c| world.value(c.comp, &c.var))
            .collect::<SimResult<Vec<_>>>()?;
        let firings = if self.firings {
            firing_records(world)
        } else {
            Vec::new()
        };
        self.records.push(TraceRecord {
            step: world.step_count(),
            clock: world.clock(),
            values,
            firings,
        });
        Ok(())
    }

    /// Seal the recording into a [`Trace`] with a content-derived ID.
    pub fn finish(self, world: &World) -> TraceResult<Trace> {
        if let Some(err) = self.error {
            return Err(err.into());
        }
        let time_step = world.time_step();
        let trace_id = compute_trace_id(time_step, &self.channels, &self.records);
        Ok(Trace {
            manifest: TraceManifest {
                trace_id,
                world: world.config().name.clone(),
                timestamp: chrono::Utc::now().to_rfc3339(),
                time_step,
                steps: world.step_count(),
                channels: self.channels,
            },
            records: self.records,
        })
    }
}

impl StepObserver for Tracer {
    fn on_step(&mut self, world: &World) -> ControlFlow<()> {
        let due = world.step_count() % self.every == 0
            || (self.firings && !world.last_firings().is_empty());
        if due {
            if let Err(err) = self.sample(world) {
                self.error = Some(err);
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }
}

fn firing_records(world: &World) -> Vec<FiringRecord> {
    world
        .last_firings()
        .iter()
        .map(|f| {
            let (from, to) = match world.component(f.comp) {
                Some(c) => (
                    c.kind().state(f.from).name().to_owned(),
                    c.kind().state(f.to).name().to_owned(),
                ),
                None => (String::new(), String::new()),
            };
            FiringRecord {
                comp: f.comp,
                transition: f.transition.to_string(),
                from,
                to,
                pass: f.pass,
            }
        })
        .collect()
}
