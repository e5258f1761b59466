//! Simulation tuning loaded from RON.
//!
//! Every field has a default, so a config file only needs to list the
//! values it changes:
//!
//! ```ron
//! SimulationConfig(
//!     ai: (aggro_cooldown_ticks: 40, require_facing: true),
//!     projectile: (speed: 2.0),
//! )
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::{fixed_decimal, Fixed};
use crate::simulation::TICK_RATE;

/// Top-level simulation configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Unit controller tuning.
    pub ai: AiTuning,
    /// Projectile flight tuning.
    pub projectile: ProjectileTuning,
}

/// Controller and combat thresholds shared by every unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiTuning {
    /// Slack added to weapon range before switching from Chase to Attack.
    #[serde(with = "fixed_decimal")]
    pub chase_buffer: Fixed,
    /// Distance at which a move order counts as complete.
    #[serde(with = "fixed_decimal")]
    pub arrival_tolerance: Fixed,
    /// Distance at which a patrol waypoint counts as reached.
    #[serde(with = "fixed_decimal")]
    pub waypoint_tolerance: Fixed,
    /// Ticks a unit keeps pursuing a target's last known position after losing sight of it.
    pub aggro_cooldown_ticks: u32,
    /// Ticks a perception sighting is remembered.
    pub memory_ticks: u32,
    /// Consecutive ticks without progress before a move order is abandoned.
    pub stuck_ticks: u32,
    /// Minimum distance improvement that counts as progress.
    #[serde(with = "fixed_decimal")]
    pub stuck_epsilon: Fixed,
    /// Slack on melee range when a delayed swing resolves.
    #[serde(with = "fixed_decimal")]
    pub melee_epsilon: Fixed,
    /// Only start attacks once the unit faces its target.
    pub require_facing: bool,
    /// Maximum bearing error (radians) accepted when `require_facing` is set.
    #[serde(with = "fixed_decimal")]
    pub facing_tolerance: Fixed,
}

impl Default for AiTuning {
    fn default() -> Self {
        Self {
            chase_buffer: Fixed::from_num(0.25),
            arrival_tolerance: Fixed::from_num(0.5),
            waypoint_tolerance: Fixed::from_num(1),
            aggro_cooldown_ticks: 3 * TICK_RATE,
            memory_ticks: 10 * TICK_RATE,
            stuck_ticks: 3 * TICK_RATE,
            stuck_epsilon: Fixed::from_num(0.05),
            melee_epsilon: Fixed::from_num(0.5),
            require_facing: false,
            facing_tolerance: Fixed::from_num(0.2),
        }
    }
}

/// Homing projectile parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileTuning {
    /// Forward speed in world units per tick.
    #[serde(with = "fixed_decimal")]
    pub speed: Fixed,
    /// Maximum heading change per tick, in radians.
    #[serde(with = "fixed_decimal")]
    pub turn_rate: Fixed,
    /// Ticks before an unlanded projectile expires.
    pub lifetime_ticks: u32,
    /// Contact distance.
    #[serde(with = "fixed_decimal")]
    pub hit_radius: Fixed,
}

impl Default for ProjectileTuning {
    fn default() -> Self {
        Self {
            speed: Fixed::from_num(1.5),
            turn_rate: Fixed::from_num(0.35),
            lifetime_ticks: 5 * TICK_RATE,
            hit_radius: Fixed::from_num(0.6),
        }
    }
}

impl SimulationConfig {
    /// Parse a config from a RON string.
    pub fn from_ron_str(source: &str) -> Result<Self> {
        ron::from_str(source).map_err(|e| GameError::DataParseError {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })
    }

    /// Load a config from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| GameError::DataParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        ron::from_str(&contents).map_err(|e| GameError::DataParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = SimulationConfig::from_ron_str(
            "(ai: (aggro_cooldown_ticks: 40, chase_buffer: 0.5), projectile: (speed: 2.0))",
        )
        .unwrap();

        assert_eq!(config.ai.aggro_cooldown_ticks, 40);
        assert_eq!(config.ai.chase_buffer, Fixed::from_num(0.5));
        assert_eq!(config.ai.stuck_ticks, AiTuning::default().stuck_ticks);
        assert_eq!(config.projectile.speed, Fixed::from_num(2));
        assert_eq!(
            config.projectile.lifetime_ticks,
            ProjectileTuning::default().lifetime_ticks
        );
    }

    #[test]
    fn test_empty_config_is_default() {
        let config = SimulationConfig::from_ron_str("()").unwrap();
        assert_eq!(config, SimulationConfig::default());
    }

    #[test]
    fn test_bad_config_reports_parse_error() {
        let err = SimulationConfig::from_ron_str("(ai: (stuck_ticks: \"soon\"))").unwrap_err();
        assert!(matches!(err, GameError::DataParseError { .. }));
    }
}
