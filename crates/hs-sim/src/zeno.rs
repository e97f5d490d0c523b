//! Zeno detection: too many discrete passes within one instant.

use std::sync::Arc;

use hs_core::{Origin, SimError, SimResult};
use hs_model::TransitionRole;

use crate::resolver::Choice;
use crate::world::World;

/// One transition that fired in an over-limit pass.
#[derive(Debug, Clone)]
pub struct ZenoEntry {
    pub origin: Origin,
    pub transition: Arc<str>,
    pub role: TransitionRole,
}

/// What was firing when a pass went over the zeno limit.
#[derive(Debug, Clone)]
pub struct ZenoReport {
    /// Pass number within the instant (1-based).
    pub pass: u32,
    pub limit: u32,
    pub clock: f64,
    pub entries: Vec<ZenoEntry>,
}

impl ZenoReport {
    pub(crate) fn collect(world: &World, choices: &[Choice], limit: u32) -> Self {
        let entries = choices
            .iter()
            .map(|choice| {
                let comp = world.at(choice.comp);
                let t = &comp.kind.state(comp.state).transitions()[choice.index];
                ZenoEntry {
                    origin: comp.origin(),
                    transition: t.name_arc(),
                    role: t.role(),
                }
            })
            .collect();
        Self {
            pass: world.zeno_counter,
            limit,
            clock: world.clock(),
            entries,
        }
    }

    pub fn with_role(&self, role: TransitionRole) -> impl Iterator<Item = &ZenoEntry> {
        self.entries.iter().filter(move |e| e.role == role)
    }
}

/// Called for every over-limit pass while the debug cap allows it.
pub trait ZenoHook: Send {
    fn on_zeno(&mut self, report: &ZenoReport);
}

impl<F> ZenoHook for F
where
    F: FnMut(&ZenoReport) + Send,
{
    fn on_zeno(&mut self, report: &ZenoReport) {
        self(report)
    }
}

/// Logs each over-limit pass, grouped by transition role.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogZenoHook;

impl ZenoHook for LogZenoHook {
    fn on_zeno(&mut self, report: &ZenoReport) {
        tracing::warn!(
            pass = report.pass,
            limit = report.limit,
            clock = report.clock,
            "zeno pass"
        );
        for role in [
            TransitionRole::GuardOnly,
            TransitionRole::Event,
            TransitionRole::Reset,
            TransitionRole::General,
        ] {
            for entry in report.with_role(role) {
                tracing::warn!(role = ?role, transition = %entry.transition, "  {}", entry.origin);
            }
        }
    }
}

/// Enforce the zeno limit for the pass about to fire `choices`.
pub(crate) fn check(world: &mut World, choices: &[Choice]) -> SimResult<()> {
    let Some(limit) = world.config.zeno_limit else {
        return Ok(());
    };
    let pass = world.zeno_counter;
    if pass <= limit {
        return Ok(());
    }

    let report = ZenoReport::collect(world, choices, limit);
    let cap = world.config.zeno_cap().unwrap_or(limit);
    match world.zeno_hook.as_mut() {
        Some(hook) if pass <= cap => {
            hook.on_zeno(&report);
            Ok(())
        }
        _ => Err(SimError::Zeno {
            limit,
            passes: pass,
            clock: report.clock,
            active: report.entries.into_iter().map(|e| e.origin).collect(),
        }),
    }
}
