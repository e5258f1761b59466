//! Units and their storage.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::combat::{DamageReport, Damageable};
use crate::components::{
    EngagementProfile, EntityId, Health, PatrolRoute, TargetPriority, Team, Weapon,
};
use crate::controller::UnitController;
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::perception::{Perception, SpatialEntry};

/// One autonomous agent.
///
/// Health is only changed through [`Damageable::apply_damage`]; the
/// simulation removes a unit at the end of the tick in which it died.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Unique identifier for this unit.
    pub id: EntityId,
    /// Team affiliation.
    pub team: Team,
    /// World position.
    pub position: Vec2Fixed,
    /// Orientation in radians, counter-clockwise from +X.
    #[serde(with = "fixed_serde")]
    pub facing: Fixed,
    /// Movement speed in world units per tick.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Maximum orientation change per tick, in radians.
    #[serde(with = "fixed_serde")]
    pub turn_rate: Fixed,
    /// Hit points.
    pub health: Health,
    /// Flat damage reduction.
    pub armor: u32,
    /// Score used by threat-based targeting.
    #[serde(with = "fixed_serde")]
    pub threat: Fixed,
    /// Cleared exactly once, by the killing blow.
    pub alive: bool,
    /// Weapon, if the unit can fight.
    pub weapon: Option<Weapon>,
    /// Senses.
    pub perception: Perception,
    /// AI state machine.
    pub controller: UnitController,
    /// Whether movement is delegated to the installed navigation service.
    pub navigated: bool,
    /// Destination last handed to the navigation service.
    pub nav_destination: Option<Vec2Fixed>,
}

impl Unit {
    /// Check whether the unit can fight.
    #[must_use]
    pub fn is_combatant(&self) -> bool {
        self.weapon.is_some()
    }

    /// The unit as perception sees it.
    #[must_use]
    pub fn spatial_entry(&self) -> SpatialEntry {
        SpatialEntry {
            id: self.id,
            team: self.team,
            position: self.position,
            health: self.health.current,
            alive: self.alive,
            combatant: self.is_combatant(),
            threat: self.threat,
        }
    }
}

impl Damageable for Unit {
    fn apply_damage(&mut self, amount: u32, source: Option<EntityId>) -> DamageReport {
        if !self.alive {
            return DamageReport::default();
        }

        let outcome = self.health.apply_damage(amount, self.armor);
        let died = self.health.is_dead();
        if died {
            self.alive = false;
            tracing::debug!(unit = self.id, ?source, "Unit killed");
        }

        DamageReport {
            dealt: outcome.dealt,
            died,
        }
    }

    fn is_alive(&self) -> bool {
        self.alive
    }
}

/// Parameters for spawning a new unit.
///
/// `Default` gives a plain team-0 melee soldier at the origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSpawnParams {
    /// Team affiliation.
    pub team: Team,
    /// Initial position.
    pub position: Vec2Fixed,
    /// Initial orientation.
    pub facing: Fixed,
    /// Maximum (and starting) health.
    pub health: u32,
    /// Flat damage reduction.
    pub armor: u32,
    /// Threat score.
    pub threat: Fixed,
    /// Movement speed per tick.
    pub speed: Fixed,
    /// Turn rate per tick.
    pub turn_rate: Fixed,
    /// Weapon (None for non-combatants).
    pub weapon: Option<Weapon>,
    /// Sight range.
    pub sight_range: Fixed,
    /// Targeting policy.
    pub priority: TargetPriority,
    /// Controller engagement limits.
    pub engagement: EngagementProfile,
    /// Standing patrol assignment.
    pub patrol: Option<PatrolRoute>,
    /// Delegate movement to the navigation service.
    pub navigated: bool,
}

impl Default for UnitSpawnParams {
    fn default() -> Self {
        Self {
            team: Team(0),
            position: Vec2Fixed::ZERO,
            facing: Fixed::ZERO,
            health: 100,
            armor: 0,
            threat: Fixed::from_num(1),
            speed: Fixed::from_num(0.25),
            turn_rate: Fixed::from_num(0.3),
            weapon: Some(Weapon::new(
                crate::components::WeaponKind::Melee,
                10,
                Fixed::from_num(1.5),
                20,
            )),
            sight_range: Fixed::from_num(15),
            priority: TargetPriority::Closest,
            engagement: EngagementProfile::default(),
            patrol: None,
            navigated: false,
        }
    }
}

impl UnitSpawnParams {
    /// Build the unit. The id is assigned by [`EntityStorage::insert`].
    #[must_use]
    pub fn build(self) -> Unit {
        let mut controller = UnitController::new(self.engagement);
        if let Some(route) = self.patrol {
            controller.set_patrol(route);
        }

        Unit {
            id: 0,
            team: self.team,
            position: self.position,
            facing: self.facing,
            speed: self.speed,
            turn_rate: self.turn_rate,
            health: Health::new(self.health.max(1)),
            armor: self.armor,
            threat: self.threat,
            alive: true,
            weapon: self.weapon,
            perception: Perception::new(self.sight_range, self.priority),
            controller,
            navigated: self.navigated,
            nav_destination: None,
        }
    }
}

/// Storage for all units in the simulation.
///
/// Uses a `HashMap` for O(1) lookup by ID, with deterministic
/// iteration via sorted keys when processing systems.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityStorage {
    units: HashMap<EntityId, Unit>,
    next_id: EntityId,
}

impl EntityStorage {
    /// Create empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            units: HashMap::new(),
            next_id: 1,
        }
    }

    /// Insert a new unit and return its ID.
    pub fn insert(&mut self, mut unit: Unit) -> EntityId {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        unit.id = id;
        self.units.insert(id, unit);
        id
    }

    /// Remove a unit by ID.
    pub fn remove(&mut self, id: EntityId) -> Option<Unit> {
        self.units.remove(&id)
    }

    /// Get a unit by ID.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Unit> {
        self.units.get(&id)
    }

    /// Get a mutable reference to a unit by ID.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    /// Check if a unit exists.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.units.contains_key(&id)
    }

    /// Get the number of units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Check if storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Get sorted unit IDs for deterministic iteration.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<_> = self.units.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Iterate over all units (not in deterministic order).
    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &Unit)> {
        self.units.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_assigns_sequential_ids() {
        let mut storage = EntityStorage::new();
        let a = storage.insert(UnitSpawnParams::default().build());
        let b = storage.insert(UnitSpawnParams::default().build());
        assert_eq!((a, b), (1, 2));
        assert_eq!(storage.sorted_ids(), vec![1, 2]);
        assert!(storage.remove(a).is_some());
        assert!(!storage.contains(a));
    }

    #[test]
    fn test_death_fires_once() {
        let mut unit = UnitSpawnParams {
            health: 15,
            ..Default::default()
        }
        .build();

        let first = unit.apply_damage(20, Some(9));
        assert!(first.died);
        assert_eq!(first.dealt, 15);
        assert_eq!(unit.health.current, 0);

        let second = unit.apply_damage(20, Some(9));
        assert!(!second.died);
        assert_eq!(second.dealt, 0);
        assert!(!unit.is_alive());
    }

    #[test]
    fn test_armor_reduces_damage() {
        let mut unit = UnitSpawnParams {
            health: 50,
            armor: 4,
            ..Default::default()
        }
        .build();

        let report = unit.apply_damage(10, None);
        assert_eq!(report.dealt, 6);
        assert_eq!(unit.health.current, 44);
        assert!(unit.is_alive());
    }

    #[test]
    fn test_non_combatant_entry() {
        let unit = UnitSpawnParams {
            weapon: None,
            ..Default::default()
        }
        .build();
        assert!(!unit.spatial_entry().combatant);
    }
}
