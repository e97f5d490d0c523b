//! Per-instance initialization for `World::create`.

use hs_core::CompId;

/// Initial values, links and start state for a new component.
///
/// Anything not mentioned keeps the kind's defaults.
#[derive(Debug, Clone, Default)]
pub struct Init {
    values: Vec<(String, f64)>,
    links: Vec<(String, Option<CompId>)>,
    start: Option<String>,
    name: Option<String>,
}

impl Init {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the initial value of a continuous or constant variable.
    pub fn set(mut self, var: impl Into<String>, value: f64) -> Self {
        self.values.push((var.into(), value));
        self
    }

    /// Point a link at another component.
    pub fn link(mut self, link: impl Into<String>, target: Option<CompId>) -> Self {
        self.links.push((link.into(), target));
        self
    }

    /// Override the kind's start state.
    pub fn start(mut self, state: impl Into<String>) -> Self {
        self.start = Some(state.into());
        self
    }

    /// Give the instance a human-readable name for diagnostics.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn values(&self) -> &[(String, f64)] {
        &self.values
    }

    pub fn links(&self) -> &[(String, Option<CompId>)] {
        &self.links
    }

    pub fn start_state(&self) -> Option<&str> {
        self.start.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}
