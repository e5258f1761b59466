//! Plain data types shared by the simulation systems.
//!
//! Components are pure data with small helpers. The behaviour that drives
//! them lives in [`crate::combat`], [`crate::perception`] and
//! [`crate::controller`].

use serde::{Deserialize, Serialize};

use crate::math::{fixed_decimal, fixed_serde, Fixed, Vec2Fixed};

/// Unique identifier for entities.
pub type EntityId = u64;

/// Simulation time, counted in ticks since the simulation started.
pub type Tick = u64;

/// Team affiliation. Units on different teams are hostile to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Team(pub u8);

impl Team {
    /// Check whether two teams are enemies.
    #[must_use]
    pub const fn is_hostile_to(self, other: Team) -> bool {
        self.0 != other.0
    }
}

// ============================================================================
// Health
// ============================================================================

/// Result of applying raw damage to a [`Health`] pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DamageOutcome {
    /// Damage left after armor (`max(0, amount - armor)`).
    pub mitigated: u32,
    /// Health actually removed; smaller than `mitigated` only when the pool runs dry.
    pub dealt: u32,
}

/// Health component for damageable entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    /// Current health points.
    pub current: u32,
    /// Maximum health points.
    pub max: u32,
}

impl Health {
    /// Create new health component at full health.
    #[must_use]
    pub const fn new(max: u32) -> Self {
        Self { current: max, max }
    }

    /// Check if entity is dead (health == 0).
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.current == 0
    }

    /// Apply flat-armor damage.
    ///
    /// The pool loses `max(0, amount - armor)`, saturating at zero.
    pub fn apply_damage(&mut self, amount: u32, armor: u32) -> DamageOutcome {
        let mitigated = amount.saturating_sub(armor);
        let dealt = mitigated.min(self.current);
        self.current -= dealt;
        DamageOutcome { mitigated, dealt }
    }
}

// ============================================================================
// Weapons
// ============================================================================

/// How a weapon delivers its damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum WeaponKind {
    /// Damage lands after the activation delay if the target is still within reach.
    #[default]
    Melee,
    /// A homing projectile is launched after the activation delay.
    Ranged,
}

/// A unit's weapon.
///
/// Attacks are gated by `cooldown_ticks` measured from the last attack start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Weapon {
    /// Delivery mechanism.
    pub kind: WeaponKind,
    /// Raw damage before armor.
    pub damage: u32,
    /// Reach in world units.
    #[serde(with = "fixed_serde")]
    pub range: Fixed,
    /// Minimum ticks between two attack starts.
    pub cooldown_ticks: u32,
    /// Ticks between the attack start and its effect.
    pub activation_delay_ticks: u32,
    /// Tick of the most recent attack start.
    pub last_attack_tick: Option<Tick>,
}

impl Weapon {
    /// Create a weapon with no activation delay that has never fired.
    #[must_use]
    pub const fn new(kind: WeaponKind, damage: u32, range: Fixed, cooldown_ticks: u32) -> Self {
        Self {
            kind,
            damage,
            range,
            cooldown_ticks,
            activation_delay_ticks: 0,
            last_attack_tick: None,
        }
    }

    /// Builder method to set the activation delay.
    #[must_use]
    pub const fn with_activation_delay(mut self, ticks: u32) -> Self {
        self.activation_delay_ticks = ticks;
        self
    }

    /// First tick at which a new attack may start.
    #[must_use]
    pub fn ready_at(&self) -> Tick {
        self.last_attack_tick
            .map_or(0, |last| last + Tick::from(self.cooldown_ticks))
    }
}

// ============================================================================
// Orders and AI state
// ============================================================================

/// A player command delivered to a single unit.
///
/// A unit holds at most one active order; a new one replaces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Order {
    /// Walk to a point, ignoring enemies on the way.
    Move(Vec2Fixed),
    /// Engage a specific entity.
    Attack {
        /// Entity to engage.
        target: EntityId,
        /// Offset from the target's position to approach, so a group
        /// attacking one target spreads around it.
        approach_offset: Option<Vec2Fixed>,
    },
    /// Drop everything and stand still.
    Stop,
}

impl Order {
    /// Attack order without an approach offset.
    #[must_use]
    pub const fn attack(target: EntityId) -> Self {
        Self::Attack {
            target,
            approach_offset: None,
        }
    }
}

/// The unit controller's finite states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AiState {
    /// Nothing to do.
    #[default]
    Idle,
    /// Walking a patrol route.
    Patrol,
    /// Executing a player move order.
    MoveOrder,
    /// Closing in on a target.
    Chase,
    /// In range of a target and swinging.
    Attack,
}

impl AiState {
    /// Check whether the unit is committed to a target.
    #[must_use]
    pub const fn is_engaged(self) -> bool {
        matches!(self, Self::Chase | Self::Attack)
    }
}

/// Target selection policy used by perception.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TargetPriority {
    /// Nearest hostile.
    #[default]
    Closest,
    /// Hostile with the least current health.
    Weakest,
    /// Hostile with the highest threat score.
    HighestThreat,
}

/// A circular list of patrol waypoints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PatrolRoute {
    /// Waypoints in visiting order.
    pub waypoints: Vec<Vec2Fixed>,
    /// Index of the waypoint currently being approached.
    pub next_index: usize,
}

impl PatrolRoute {
    /// Create a route starting at the first waypoint.
    #[must_use]
    pub fn new(waypoints: Vec<Vec2Fixed>) -> Self {
        Self {
            waypoints,
            next_index: 0,
        }
    }

    /// Check if the route has no waypoints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Waypoint currently being approached.
    #[must_use]
    pub fn current(&self) -> Option<Vec2Fixed> {
        self.waypoints.get(self.next_index).copied()
    }

    /// Move on to the next waypoint, wrapping around at the end.
    pub fn advance(&mut self) {
        if !self.waypoints.is_empty() {
            self.next_index = (self.next_index + 1) % self.waypoints.len();
        }
    }
}

/// Per-unit controller tuning that varies between unit types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EngagementProfile {
    /// Beyond this distance a chase is abandoned unconditionally.
    #[serde(with = "fixed_decimal")]
    pub lose_interest_range: Fixed,
}

impl Default for EngagementProfile {
    fn default() -> Self {
        Self {
            lose_interest_range: Fixed::from_num(25),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_flat_armor() {
        let mut health = Health::new(100);
        let outcome = health.apply_damage(30, 10);
        assert_eq!(outcome.mitigated, 20);
        assert_eq!(outcome.dealt, 20);
        assert_eq!(health.current, 80);
    }

    #[test]
    fn test_health_armor_exceeds_damage() {
        let mut health = Health::new(50);
        let outcome = health.apply_damage(5, 8);
        assert_eq!(outcome.mitigated, 0);
        assert_eq!(health.current, 50);
    }

    #[test]
    fn test_health_saturates_at_zero() {
        let mut health = Health::new(15);
        let outcome = health.apply_damage(20, 0);
        assert_eq!(outcome.mitigated, 20);
        assert_eq!(outcome.dealt, 15);
        assert!(health.is_dead());
    }

    #[test]
    fn test_weapon_ready_at() {
        let mut weapon = Weapon::new(WeaponKind::Melee, 10, Fixed::from_num(2), 20);
        assert_eq!(weapon.ready_at(), 0);
        weapon.last_attack_tick = Some(7);
        assert_eq!(weapon.ready_at(), 27);
    }

    #[test]
    fn test_patrol_route_wraps() {
        let mut route = PatrolRoute::new(vec![Vec2Fixed::ZERO, Vec2Fixed::from_ints(5, 0)]);
        assert_eq!(route.current(), Some(Vec2Fixed::ZERO));
        route.advance();
        assert_eq!(route.current(), Some(Vec2Fixed::from_ints(5, 0)));
        route.advance();
        assert_eq!(route.current(), Some(Vec2Fixed::ZERO));

        let mut empty = PatrolRoute::default();
        empty.advance();
        assert!(empty.current().is_none());
    }

    #[test]
    fn test_team_hostility() {
        assert!(Team(0).is_hostile_to(Team(1)));
        assert!(!Team(2).is_hostile_to(Team(2)));
    }
}
