//! Controller configuration with documented constants
//!
//! All magic numbers used by the command controller are collected here with
//! explanations of their purpose and how they interact with each other.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{ControlError, Result};

/// Configuration for the per-unit command controller
///
/// Distances are in world units, durations in ticks (60 ticks per second).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    // === COMMAND QUEUE ===
    /// Maximum number of queued waypoints per unit
    ///
    /// Requests beyond this are dropped silently (backpressure).
    pub max_queue_size: usize,

    // === PATH SEGMENTS ===
    /// Tolerance for treating the path step as the movement goal itself
    ///
    /// When the pathfinder hands back a point this close to the goal, the unit is
    /// on its final segment and should arrive instead of passing through.
    pub final_point_epsilon: f32,

    /// Amount subtracted from the unit type's range to get the engage range
    pub engage_margin: f32,

    /// Amount subtracted from the unit type's range for the patrol standoff
    ///
    /// A patrolling unit with an ambient target this close holds position.
    pub patrol_standoff_margin: f32,

    /// Minimum arrival radius; the effective radius is max(this, hitSize / 2)
    pub arrival_radius: f32,

    /// Fraction of the engage range that satisfies `stop_when_in_range`
    pub stop_in_range_fraction: f32,

    /// Orbit radius for circle-strafing unit types
    pub circle_radius: f32,

    /// Steering smoothing for flying units
    pub flying_smoothing: f32,

    /// Steering smoothing for grounded units
    pub ground_smoothing: f32,

    /// Size of a world tile, used to convert points to tile coordinates
    pub tile_size: f32,

    // === TARGETING ===
    /// Retarget cadence while an explicit attack target is set
    ///
    /// Faster than the ambient cadence so a lost explicit target is noticed sooner.
    pub retarget_explicit_ticks: u64,

    /// Retarget cadence while auto-targeting
    pub retarget_ambient_ticks: u64,

    /// Extra distance beyond the unit's range that counts as "near" the attack target
    ///
    /// Half of the target's hit size is added on top of this.
    pub near_target_buffer: f32,

    /// Minimum ticks between counter-attack assignments (600 = 10s)
    pub counter_attack_cooldown_ticks: u64,

    /// Range added to `range` when reporting whether the unit is attacking
    pub attacking_margin: f32,

    // === PAYLOAD ===
    /// Distance from the target position within which load-blocks picks up
    pub load_blocks_radius: f32,

    // === FALLBACK ===
    /// How far the naval fallback controller looks for hostiles
    pub fallback_sight_range: f32,

    // === PARALLELIZATION ===
    /// Minimum controller count before using parallel processing
    ///
    /// Below this threshold, thread overhead exceeds benefits.
    pub parallel_threshold: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 50,

            final_point_epsilon: 4.1,
            engage_margin: 10.0,
            patrol_standoff_margin: 2.0,
            arrival_radius: 5.0,
            stop_in_range_fraction: 0.9,
            circle_radius: 80.0,
            flying_smoothing: 40.0,
            ground_smoothing: 100.0,
            tile_size: 8.0,

            retarget_explicit_ticks: 10,
            retarget_ambient_ticks: 20,
            near_target_buffer: 3.0,
            counter_attack_cooldown_ticks: 600,
            attacking_margin: 10.0,

            load_blocks_radius: 1.0,

            fallback_sight_range: 400.0,

            parallel_threshold: 1000,
        }
    }
}

impl ControllerConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ControllerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a TOML file on disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.max_queue_size == 0 {
            return Err(ControlError::InvalidConfig(
                "max_queue_size must be at least 1".into(),
            ));
        }

        if self.retarget_explicit_ticks == 0 || self.retarget_ambient_ticks == 0 {
            return Err(ControlError::InvalidConfig(
                "retarget intervals must be positive".into(),
            ));
        }

        if self.retarget_explicit_ticks > self.retarget_ambient_ticks {
            return Err(ControlError::InvalidConfig(format!(
                "retarget_explicit_ticks ({}) should be <= retarget_ambient_ticks ({})",
                self.retarget_explicit_ticks, self.retarget_ambient_ticks
            )));
        }

        if !(0.0..=1.0).contains(&self.stop_in_range_fraction) {
            return Err(ControlError::InvalidConfig(format!(
                "stop_in_range_fraction ({}) must be within 0..=1",
                self.stop_in_range_fraction
            )));
        }

        if self.tile_size <= 0.0 {
            return Err(ControlError::InvalidConfig("tile_size must be positive".into()));
        }

        Ok(())
    }
}

// === GLOBAL CONFIG ACCESS ===

use std::sync::OnceLock;

static CONFIG: OnceLock<ControllerConfig> = OnceLock::new();

/// Get the global controller config (initializes with defaults if not set)
pub fn config() -> &'static ControllerConfig {
    CONFIG.get_or_init(ControllerConfig::default)
}

/// Set the global controller config (can only be called once)
///
/// Returns Err if config was already set.
pub fn set_config(config: ControllerConfig) -> std::result::Result<(), ControllerConfig> {
    CONFIG.set(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ControllerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_queue_size, 50);
        assert_eq!(config.counter_attack_cooldown_ticks, 600);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ControllerConfig::from_toml_str("max_queue_size = 8\ncircle_radius = 60.0\n")
            .unwrap();
        assert_eq!(config.max_queue_size, 8);
        assert_eq!(config.circle_radius, 60.0);
        assert_eq!(config.final_point_epsilon, 4.1);
    }

    #[test]
    fn test_invalid_toml_rejected() {
        let err = ControllerConfig::from_toml_str("max_queue_size = \"lots\"").unwrap_err();
        assert!(matches!(err, ControlError::TomlError(_)));
    }

    #[test]
    fn test_validation_catches_inverted_cadence() {
        let config = ControllerConfig {
            retarget_explicit_ticks: 30,
            retarget_ambient_ticks: 20,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ControlError::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_queue_rejected() {
        let err = ControllerConfig::from_toml_str("max_queue_size = 0").unwrap_err();
        assert!(matches!(err, ControlError::InvalidConfig(_)));
    }
}
