//! Events emitted by the simulation for external consumers.
//!
//! Rendering, audio, fog-of-war and UI layers subscribe by reading the
//! [`TickEvents`] returned from [`crate::simulation::Simulation::tick`].

use serde::{Deserialize, Serialize};

use crate::components::{AiState, EntityId, Team, Tick, WeaponKind};

/// Damage was applied to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageEvent {
    /// Entity credited with the damage, if it is known.
    pub source: Option<EntityId>,
    /// Entity that took the damage.
    pub target: EntityId,
    /// Raw damage before armor.
    pub amount: u32,
    /// Health actually removed.
    pub dealt: u32,
    /// Whether this hit was the killing blow.
    pub killed: bool,
}

/// A unit died.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathEvent {
    /// The dead unit.
    pub unit: EntityId,
    /// Team the unit belonged to.
    pub team: Team,
    /// Entity credited with the kill.
    pub killer: Option<EntityId>,
}

/// An attack was started (the effect lands later).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackEvent {
    /// Attacking unit.
    pub attacker: EntityId,
    /// Target at the time the attack started.
    pub target: EntityId,
    /// Weapon delivery mechanism.
    pub kind: WeaponKind,
    /// Tick at which the delayed effect resolves.
    pub resolves_at: Tick,
}

/// A projectile left its launcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectileSpawned {
    /// Projectile id (separate namespace from units).
    pub projectile: u64,
    /// Unit that fired it.
    pub owner: EntityId,
    /// Unit it homes on.
    pub target: EntityId,
}

/// A unit controller changed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
    /// Unit whose controller changed.
    pub unit: EntityId,
    /// Previous state.
    pub from: AiState,
    /// New state.
    pub to: AiState,
}

/// Events generated during a simulation tick.
///
/// Spawns, order receipts and other changes made between ticks are
/// reported with the next tick's events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickEvents {
    /// Tick these events belong to.
    pub tick: Tick,
    /// Units spawned.
    pub spawned: Vec<EntityId>,
    /// Damage applications.
    pub damage: Vec<DamageEvent>,
    /// Units that died.
    pub deaths: Vec<DeathEvent>,
    /// Attacks started.
    pub attacks_started: Vec<AttackEvent>,
    /// Projectiles launched.
    pub projectiles_spawned: Vec<ProjectileSpawned>,
    /// Projectiles that expired without hitting anything.
    pub projectiles_expired: Vec<u64>,
    /// Controller state transitions.
    pub state_changes: Vec<StateChange>,
    /// Units that gave up on an unreachable move order.
    pub moves_abandoned: Vec<EntityId>,
}

impl TickEvents {
    /// Check whether nothing happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spawned.is_empty()
            && self.damage.is_empty()
            && self.deaths.is_empty()
            && self.attacks_started.is_empty()
            && self.projectiles_spawned.is_empty()
            && self.projectiles_expired.is_empty()
            && self.state_changes.is_empty()
            && self.moves_abandoned.is_empty()
    }

    /// Move all events from `other` into `self`, keeping `self.tick`.
    pub fn absorb(&mut self, other: &mut TickEvents) {
        self.spawned.append(&mut other.spawned);
        self.damage.append(&mut other.damage);
        self.deaths.append(&mut other.deaths);
        self.attacks_started.append(&mut other.attacks_started);
        self.projectiles_spawned.append(&mut other.projectiles_spawned);
        self.projectiles_expired.append(&mut other.projectiles_expired);
        self.state_changes.append(&mut other.state_changes);
        self.moves_abandoned.append(&mut other.moves_abandoned);
    }

    /// Check whether `unit` died this tick.
    #[must_use]
    pub fn died(&self, unit: EntityId) -> bool {
        self.deaths.iter().any(|d| d.unit == unit)
    }

    /// Total health removed this tick.
    #[must_use]
    pub fn total_damage(&self) -> u64 {
        self.damage.iter().map(|d| u64::from(d.dealt)).sum()
    }
}
