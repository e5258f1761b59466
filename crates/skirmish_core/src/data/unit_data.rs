//! Unit templates for data-driven unit definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::{EngagementProfile, TargetPriority, Team, Weapon, WeaponKind};
use crate::error::{GameError, Result};
use crate::math::{fixed_decimal, Fixed, Vec2Fixed};
use crate::unit::UnitSpawnParams;

/// Weapon section of a unit template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WeaponData {
    /// Delivery mechanism.
    pub kind: WeaponKind,

    /// Raw damage per hit.
    pub damage: u32,

    /// Reach in world units.
    #[serde(with = "fixed_decimal")]
    pub range: Fixed,

    /// Ticks between attack starts.
    pub cooldown_ticks: u32,

    /// Ticks between attack start and effect.
    #[serde(default)]
    pub activation_delay_ticks: u32,
}

impl WeaponData {
    /// Build a fresh weapon from this data.
    #[must_use]
    pub fn to_weapon(&self) -> Weapon {
        Weapon::new(self.kind, self.damage, self.range, self.cooldown_ticks)
            .with_activation_delay(self.activation_delay_ticks)
    }
}

/// Data-driven unit definition.
///
/// # Example RON
///
/// ```ron
/// UnitData(
///     id: "archer",
///     health: 60,
///     speed: 0.2,
///     sight_range: 18.0,
///     priority: Weakest,
///     weapon: Some(WeaponData(
///         kind: Ranged,
///         damage: 12,
///         range: 8.0,
///         cooldown_ticks: 30,
///         activation_delay_ticks: 6,
///     )),
/// )
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnitData {
    /// Unique string identifier for this unit type.
    pub id: String,

    /// Maximum health points.
    pub health: u32,

    /// Flat damage reduction.
    #[serde(default)]
    pub armor: u32,

    /// Score for threat-based targeting.
    #[serde(with = "fixed_decimal", default = "default_threat")]
    pub threat: Fixed,

    /// Movement speed per tick.
    #[serde(with = "fixed_decimal")]
    pub speed: Fixed,

    /// Turn rate in radians per tick.
    #[serde(with = "fixed_decimal", default = "default_turn_rate")]
    pub turn_rate: Fixed,

    /// How far the unit can see.
    #[serde(with = "fixed_decimal")]
    pub sight_range: Fixed,

    /// Distance at which a chase is abandoned.
    #[serde(with = "fixed_decimal", default = "default_lose_interest_range")]
    pub lose_interest_range: Fixed,

    /// Target selection policy.
    #[serde(default)]
    pub priority: TargetPriority,

    /// Weapon (None for non-combat units).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weapon: Option<WeaponData>,
}

fn default_threat() -> Fixed {
    Fixed::ONE
}

fn default_turn_rate() -> Fixed {
    Fixed::from_num(0.3)
}

fn default_lose_interest_range() -> Fixed {
    EngagementProfile::default().lose_interest_range
}

impl UnitData {
    /// Check if this unit can engage in combat.
    #[must_use]
    pub fn is_combatant(&self) -> bool {
        self.weapon.is_some()
    }

    /// Spawn parameters for one unit of this type.
    #[must_use]
    pub fn to_spawn_params(&self, team: Team, position: Vec2Fixed) -> UnitSpawnParams {
        UnitSpawnParams {
            team,
            position,
            health: self.health,
            armor: self.armor,
            threat: self.threat,
            speed: self.speed,
            turn_rate: self.turn_rate,
            weapon: self.weapon.as_ref().map(WeaponData::to_weapon),
            sight_range: self.sight_range,
            priority: self.priority,
            engagement: EngagementProfile {
                lose_interest_range: self.lose_interest_range,
            },
            ..Default::default()
        }
    }
}

/// Unit templates keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitCatalog {
    units: BTreeMap<String, UnitData>,
}

impl UnitCatalog {
    /// Build a catalog. Later duplicates replace earlier ones.
    #[must_use]
    pub fn new(units: Vec<UnitData>) -> Self {
        Self {
            units: units.into_iter().map(|unit| (unit.id.clone(), unit)).collect(),
        }
    }

    /// Parse a RON list of [`UnitData`].
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DataParseError`] on malformed input.
    pub fn from_ron_str(source: &str) -> Result<Self> {
        let units: Vec<UnitData> = ron::from_str(source).map_err(|e| GameError::DataParseError {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })?;
        Ok(Self::new(units))
    }

    /// Look up a template.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::UnknownTemplate`] if no template has this id.
    pub fn get(&self, id: &str) -> Result<&UnitData> {
        self.units
            .get(id)
            .ok_or_else(|| GameError::UnknownTemplate(id.to_string()))
    }

    /// Add or replace a template.
    pub fn insert(&mut self, unit: UnitData) {
        self.units.insert(unit.id.clone(), unit);
    }

    /// Template ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.units.keys().map(String::as_str)
    }

    /// Number of templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Check whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
