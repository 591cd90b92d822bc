//! # World Configuration
//!
//! Loaded once at startup, usually from a TOML file shipped with the game:
//!
//! ```toml
//! entity_capacity = 4096
//!
//! [schedule]
//! before = ["input", "physics"]
//! after = ["cleanup"]
//!
//! [timestep]
//! step_seconds = 0.016666668
//! max_steps = 5
//! ```
//!
//! Every field is optional; missing fields take their defaults.

use serde::{Deserialize, Serialize};

use crate::error::{EcsError, EcsResult};

/// Default number of entity slots reserved up front.
pub const DEFAULT_ENTITY_CAPACITY: usize = 1024;

/// Default fixed step (60 Hz).
pub const DEFAULT_STEP_SECONDS: f32 = 1.0 / 60.0;

/// Default cap on fixed steps per frame.
pub const DEFAULT_MAX_STEPS: u32 = 5;

/// Configuration for a [`crate::World`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorldConfig {
    /// Entity slots reserved at creation. The world grows past this on demand.
    pub entity_capacity: usize,
    /// Declared system order within each pass.
    pub schedule: ScheduleConfig,
    /// Fixed-timestep settings for [`crate::FixedTimestep`].
    pub timestep: TimestepConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            entity_capacity: DEFAULT_ENTITY_CAPACITY,
            schedule: ScheduleConfig::default(),
            timestep: TimestepConfig::default(),
        }
    }
}

impl WorldConfig {
    /// Parses and validates a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if the text is not valid TOML, has
    /// unknown keys, or fails [`WorldConfig::validate`].
    pub fn from_toml_str(text: &str) -> EcsResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| EcsError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] naming the first violated constraint.
    pub fn validate(&self) -> EcsResult<()> {
        self.timestep.validate()?;
        self.schedule.validate()
    }
}

/// Declared system order, mirroring a world declaration's groups.
///
/// Within one pass the scheduler runs the systems named in `before` (in that
/// order), then every other system in registration order, then the systems
/// named in `after` (in that order).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleConfig {
    /// Systems that run ahead of the wildcard group.
    pub before: Vec<String>,
    /// Systems that run after the wildcard group.
    pub after: Vec<String>,
}

impl ScheduleConfig {
    /// Returns `true` if `name` is placed explicitly in either group.
    #[must_use]
    pub fn is_placed(&self, name: &str) -> bool {
        self.before.iter().chain(&self.after).any(|n| n == name)
    }

    fn validate(&self) -> EcsResult<()> {
        let mut seen = std::collections::HashSet::new();
        for name in self.before.iter().chain(&self.after) {
            if !seen.insert(name.as_str()) {
                return Err(EcsError::InvalidConfig(format!(
                    "system `{name}` is placed more than once in the schedule"
                )));
            }
        }
        Ok(())
    }
}

/// Fixed-timestep settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimestepConfig {
    /// Length of one fixed step in seconds.
    pub step_seconds: f32,
    /// Maximum fixed steps run per frame. Excess time is dropped.
    pub max_steps: u32,
}

impl Default for TimestepConfig {
    fn default() -> Self {
        Self {
            step_seconds: DEFAULT_STEP_SECONDS,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

impl TimestepConfig {
    pub(crate) fn validate(&self) -> EcsResult<()> {
        if !self.step_seconds.is_finite() || self.step_seconds <= 0.0 {
            return Err(EcsError::InvalidConfig(format!(
                "step_seconds must be positive, got {}",
                self.step_seconds
            )));
        }
        if self.max_steps == 0 {
            return Err(EcsError::InvalidConfig("max_steps must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = WorldConfig::from_toml_str("").unwrap();
        assert_eq!(config, WorldConfig::default());
    }

    #[test]
    fn test_parse_schedule_and_timestep() {
        let config = WorldConfig::from_toml_str(
            r#"
            entity_capacity = 64

            [schedule]
            before = ["input"]
            after = ["cleanup"]

            [timestep]
            step_seconds = 0.02
            "#,
        )
        .unwrap();

        assert_eq!(config.entity_capacity, 64);
        assert_eq!(config.schedule.before, vec!["input".to_string()]);
        assert!(config.schedule.is_placed("cleanup"));
        assert!(!config.schedule.is_placed("physics"));
        assert!((config.timestep.step_seconds - 0.02).abs() < f32::EPSILON);
        assert_eq!(config.timestep.max_steps, DEFAULT_MAX_STEPS);
    }

    #[test]
    fn test_rejects_malformed_input() {
        assert!(matches!(
            WorldConfig::from_toml_str("entity_capacity = \"many\""),
            Err(EcsError::InvalidConfig(_))
        ));
        assert!(matches!(
            WorldConfig::from_toml_str("unknown_key = 1"),
            Err(EcsError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(WorldConfig::from_toml_str("[timestep]\nstep_seconds = 0.0").is_err());
        assert!(WorldConfig::from_toml_str("[timestep]\nmax_steps = 0").is_err());
        assert!(WorldConfig::from_toml_str(
            "[schedule]\nbefore = [\"a\"]\nafter = [\"a\"]"
        )
        .is_err());
    }
}
