//! World configuration: step size, zeno limits, clock bounds and the
//! optimization switches.

use std::path::Path;

use hs_core::{SimError, SimResult, ensure_finite};
use serde::{Deserialize, Serialize};

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] SimError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Scheduler optimizations. Turning any of them off must not change results.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Optimizations {
    /// Integrate components in strict-link dependency order. When off,
    /// components are still evaluated in an order that respects strict
    /// links, but the order is recomputed from scratch every step.
    pub strict_ordering: bool,
    /// Skip transition scans for components with nothing enabled until one
    /// of their dependencies changes.
    pub inertness: bool,
    /// Evaluate components without differential flows once per step
    /// instead of once per stage.
    pub frozen_skip: bool,
}

impl Optimizations {
    pub fn none() -> Self {
        Self {
            strict_ordering: false,
            inertness: false,
            frozen_skip: false,
        }
    }
}

impl Default for Optimizations {
    fn default() -> Self {
        Self {
            strict_ordering: true,
            inertness: true,
            frozen_skip: true,
        }
    }
}

/// Options for a world.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Label used in logs.
    pub name: String,
    /// Fixed integration step (time units).
    pub time_step: f64,
    /// Discrete passes allowed in one instant before the zeno handling
    /// kicks in. `None` disables the check.
    pub zeno_limit: Option<u32>,
    /// Passes tolerated while a zeno hook is installed. Defaults to three
    /// times `zeno_limit`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zeno_debug_limit: Option<u32>,
    /// Maximum length of an input-variable chain.
    pub input_depth_limit: usize,
    pub clock_start: f64,
    /// Runs stop once the clock passes this value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clock_finish: Option<f64>,
    /// Record time spent in the continuous and discrete phases.
    pub profile: bool,
    pub optimizations: Optimizations,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: "world".to_owned(),
            time_step: 0.1,
            zeno_limit: Some(100),
            zeno_debug_limit: None,
            input_depth_limit: 100,
            clock_start: 0.0,
            clock_finish: None,
            profile: false,
            optimizations: Optimizations::default(),
        }
    }
}

impl WorldConfig {
    pub fn validate(&self) -> SimResult<()> {
        if !(self.time_step.is_finite() && self.time_step > 0.0) {
            return Err(SimError::InvalidArg {
                what: "time_step must be positive and finite",
            });
        }
        ensure_finite(self.clock_start, "clock_start")?;
        if let Some(finish) = self.clock_finish {
            if finish.is_nan() || finish < self.clock_start {
                return Err(SimError::InvalidArg {
                    what: "clock_finish must not precede clock_start",
                });
            }
        }
        if let (Some(limit), Some(debug)) = (self.zeno_limit, self.zeno_debug_limit) {
            if debug < limit {
                return Err(SimError::InvalidArg {
                    what: "zeno_debug_limit must be at least zeno_limit",
                });
            }
        }
        if self.input_depth_limit == 0 {
            return Err(SimError::InvalidArg {
                what: "input_depth_limit must be positive",
            });
        }
        Ok(())
    }

    /// Effective debug cap for the zeno hook.
    pub fn zeno_cap(&self) -> Option<u32> {
        self.zeno_limit
            .map(|limit| self.zeno_debug_limit.unwrap_or(limit.saturating_mul(3)))
    }

    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let config: WorldConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        let config: WorldConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.json` file, or YAML for any other extension.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_yaml_str(&content),
        }
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = WorldConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.time_step, 0.1);
        assert_eq!(config.zeno_limit, Some(100));
        assert_eq!(config.zeno_cap(), Some(300));
        assert!(config.optimizations.inertness);
    }

    #[test]
    fn yaml_fills_missing_fields() {
        let config = WorldConfig::from_yaml_str(
            "time_step: 0.01\nzeno_limit: 5\noptimizations:\n  inertness: false\n",
        )
        .unwrap();
        assert_eq!(config.time_step, 0.01);
        assert_eq!(config.zeno_limit, Some(5));
        assert!(!config.optimizations.inertness);
        assert!(config.optimizations.frozen_skip);
        assert_eq!(config.input_depth_limit, 100);
    }

    #[test]
    fn json_round_trips() {
        let config = WorldConfig {
            clock_finish: Some(10.0),
            ..WorldConfig::default()
        };
        let text = serde_json::to_string(&config).unwrap();
        assert_eq!(WorldConfig::from_json_str(&text).unwrap(), config);
    }

    #[test]
    fn rejects_non_positive_step() {
        let err = WorldConfig::from_yaml_str("time_step: 0.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(SimError::InvalidArg { .. })));
    }

    #[test]
    fn rejects_debug_cap_below_limit() {
        let config = WorldConfig {
            zeno_limit: Some(10),
            zeno_debug_limit: Some(5),
            ..WorldConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
