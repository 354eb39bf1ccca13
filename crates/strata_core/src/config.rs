//! # World Configuration
//!
//! Tunables for a [`World`](crate::World), loaded once at startup.
//!
//! Every field has a default, so a TOML file only needs the keys it
//! changes:
//!
//! ```toml
//! max_entities = 100000
//! fixed_timestep = 0.02
//! builtin_systems = false
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ecs::{EntityId, DEFAULT_GROWTH_FACTOR};

/// Errors raised while loading or validating a [`WorldConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Runtime tunables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Identifier slots reserved up front. Clamped to `max_entities`.
    pub initial_entity_capacity: usize,
    /// Hard limit on distinct entity indices.
    pub max_entities: u32,
    /// Slots reserved per component type on first use.
    pub initial_component_capacity: usize,
    /// Storage growth multiplier.
    pub component_growth_factor: f32,
    /// Reset component values kept per type for reuse.
    pub component_recycle_limit: usize,
    /// Seconds per fixed step.
    pub fixed_timestep: f32,
    /// Fixed steps run per `tick` before the backlog is dropped.
    pub max_fixed_steps_per_frame: u32,
    /// Upper bound on the delta time fed to `update`.
    pub max_delta_time: f32,
    /// Register transform propagation and lifetime expiry on creation.
    pub builtin_systems: bool,
    /// Log per-frame details at `debug`.
    pub debug: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            initial_entity_capacity: 10_000,
            max_entities: EntityId::MAX_INDEX + 1,
            initial_component_capacity: 1_000,
            component_growth_factor: DEFAULT_GROWTH_FACTOR,
            component_recycle_limit: 64,
            fixed_timestep: 1.0 / 60.0,
            max_fixed_steps_per_frame: 5,
            max_delta_time: 0.25,
            builtin_systems: true,
            debug: false,
        }
    }
}

impl WorldConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed input and
    /// [`ConfigError::Invalid`] when a value is out of range.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise
    /// see [`from_toml_str`](Self::from_toml_str).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&source)?;
        tracing::info!(path = %path.display(), "world config loaded");
        Ok(config)
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fixed_timestep.is_finite() && self.fixed_timestep > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "fixed_timestep must be positive, got {}",
                self.fixed_timestep
            )));
        }
        if self.max_fixed_steps_per_frame == 0 {
            return Err(ConfigError::Invalid(
                "max_fixed_steps_per_frame must be at least 1".to_string(),
            ));
        }
        if !(self.max_delta_time.is_finite() && self.max_delta_time > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "max_delta_time must be positive, got {}",
                self.max_delta_time
            )));
        }
        if self.max_entities == 0 {
            return Err(ConfigError::Invalid("max_entities must be at least 1".to_string()));
        }
        if !(self.component_growth_factor.is_finite() && self.component_growth_factor > 1.0) {
            return Err(ConfigError::Invalid(format!(
                "component_growth_factor must be greater than 1, got {}",
                self.component_growth_factor
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = WorldConfig::default();
        config.validate().unwrap();
        assert_eq!(config.initial_component_capacity, 1_000);
        assert!((config.fixed_timestep - 1.0 / 60.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = WorldConfig::from_toml_str(
            r#"
            max_entities = 500
            builtin_systems = false
            "#,
        )
        .unwrap();
        assert_eq!(config.max_entities, 500);
        assert!(!config.builtin_systems);
        assert_eq!(config.max_fixed_steps_per_frame, 5);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            WorldConfig::from_toml_str("fixed_timestep = 0.0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            WorldConfig::from_toml_str("component_growth_factor = 1.0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            WorldConfig::from_toml_str("max_entities = 0"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_reservation_larger_than_limit_is_clamped() {
        let config =
            WorldConfig::from_toml_str("max_entities = 10\ninitial_entity_capacity = 20").unwrap();
        let world = crate::World::new(WorldConfig {
            builtin_systems: false,
            ..config
        });
        assert_eq!(world.pool().max_entities(), 10);
        assert_eq!(world.stats().max_entities, 10);
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            WorldConfig::from_toml_str("max_entities = \"many\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("strata_config_{}.toml", std::process::id()));
        std::fs::write(&path, "max_delta_time = 0.1\n").unwrap();
        let config = WorldConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert!((config.max_delta_time - 0.1).abs() < f32::EPSILON);

        assert!(matches!(
            WorldConfig::load(path.with_extension("missing")),
            Err(ConfigError::Io(_))
        ));
    }
}
