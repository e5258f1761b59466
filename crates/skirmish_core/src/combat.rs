//! Attack timing and damage resolution.
//!
//! Starting an attack and landing it are separate steps:
//!
//! 1. [`CombatResolver::try_attack`] checks the target and the weapon
//!    cooldown, stamps the weapon and queues a pending effect for
//!    `now + activation_delay`.
//! 2. Each tick [`CombatResolver::resolve`] drains the effects that are due.
//!    Melee swings re-check reach against current positions; ranged attacks
//!    launch a homing [`Projectile`]. Effects whose attacker or target is no
//!    longer alive are dropped.
//!
//! All damage goes through the [`Damageable`] capability.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::components::{EntityId, Tick, Weapon, WeaponKind};
use crate::config::SimulationConfig;
use crate::events::{AttackEvent, DamageEvent, DeathEvent, ProjectileSpawned, TickEvents};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::perception::SpatialEntry;
use crate::projectile::Projectile;
use crate::unit::EntityStorage;

/// Outcome of a damage application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DamageReport {
    /// Health actually removed.
    pub dealt: u32,
    /// True only for the hit that killed the entity.
    pub died: bool,
}

/// Anything that can take damage.
pub trait Damageable {
    /// Apply raw damage from `source`. Calls on a dead entity do nothing.
    fn apply_damage(&mut self, amount: u32, source: Option<EntityId>) -> DamageReport;

    /// Check whether the entity is still alive.
    fn is_alive(&self) -> bool;
}

/// Why an attack could not start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AttackFailure {
    /// Target missing, dead, or not hostile.
    #[error("target is missing, dead or not hostile")]
    InvalidTarget,
    /// Target too far away.
    #[error("target at distance {distance} is beyond range {range}")]
    OutOfRange {
        /// Distance to the target.
        distance: Fixed,
        /// Weapon range.
        range: Fixed,
    },
    /// Weapon still cooling down.
    #[error("weapon ready at tick {ready_at}")]
    OnCooldown {
        /// First tick the weapon can fire again.
        ready_at: Tick,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
struct PendingEffect {
    fire_tick: Tick,
    seq: u64,
    attacker: EntityId,
    target: EntityId,
    kind: WeaponKind,
    damage: u32,
    #[serde(with = "fixed_serde")]
    range: Fixed,
}

/// Owns attack timers and projectiles in flight.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatResolver {
    pending: Vec<PendingEffect>,
    next_seq: u64,
    projectiles: Vec<Projectile>,
    next_projectile_id: u64,
}

impl CombatResolver {
    /// Create an idle resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether `weapon` is off cooldown at `now`.
    #[must_use]
    pub fn can_attack(weapon: &Weapon, now: Tick) -> bool {
        now >= weapon.ready_at()
    }

    /// Start an attack.
    ///
    /// On success the weapon's cooldown restarts and the effect is queued;
    /// the returned event describes when it resolves. Success means the
    /// attack started, not that it will land.
    pub fn try_attack(
        &mut self,
        attacker: &SpatialEntry,
        weapon: &mut Weapon,
        target: Option<&SpatialEntry>,
        now: Tick,
        range_slack: Fixed,
    ) -> Result<AttackEvent, AttackFailure> {
        let target = target
            .filter(|t| t.alive && t.id != attacker.id && t.team.is_hostile_to(attacker.team))
            .ok_or(AttackFailure::InvalidTarget)?;

        if !Self::can_attack(weapon, now) {
            return Err(AttackFailure::OnCooldown {
                ready_at: weapon.ready_at(),
            });
        }

        let reach = weapon.range + range_slack;
        if attacker.position.distance_squared(target.position) > reach * reach {
            return Err(AttackFailure::OutOfRange {
                distance: attacker.position.distance(target.position),
                range: weapon.range,
            });
        }

        weapon.last_attack_tick = Some(now);
        let fire_tick = now + Tick::from(weapon.activation_delay_ticks);
        self.pending.push(PendingEffect {
            fire_tick,
            seq: self.next_seq,
            attacker: attacker.id,
            target: target.id,
            kind: weapon.kind,
            damage: weapon.damage,
            range: weapon.range,
        });
        self.next_seq += 1;

        Ok(AttackEvent {
            attacker: attacker.id,
            target: target.id,
            kind: weapon.kind,
            resolves_at: fire_tick,
        })
    }

    /// Number of queued effects.
    #[must_use]
    pub fn pending_effects(&self) -> usize {
        self.pending.len()
    }

    /// Feed the queued effects into a state hash.
    pub fn hash_pending<H: Hasher>(&self, hasher: &mut H) {
        self.pending.hash(hasher);
        self.next_seq.hash(hasher);
    }

    /// Projectiles currently in flight, in launch order.
    #[must_use]
    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    /// Resolve due effects, then fly projectiles.
    pub fn resolve(
        &mut self,
        now: Tick,
        units: &mut EntityStorage,
        config: &SimulationConfig,
        events: &mut TickEvents,
    ) {
        self.resolve_due_effects(now, units, config, events);
        self.step_projectiles(now, units, events);
    }

    fn resolve_due_effects(
        &mut self,
        now: Tick,
        units: &mut EntityStorage,
        config: &SimulationConfig,
        events: &mut TickEvents,
    ) {
        let (mut due, later): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|effect| effect.fire_tick <= now);
        self.pending = later;
        due.sort_by_key(|effect| (effect.fire_tick, effect.seq));

        for effect in due {
            let Some(attacker_pos) = live_position(units, effect.attacker) else {
                tracing::debug!(attacker = effect.attacker, "Attacker gone, effect dropped");
                continue;
            };
            let Some(target_pos) = live_position(units, effect.target) else {
                tracing::debug!(target = effect.target, "Target gone, effect dropped");
                continue;
            };

            match effect.kind {
                WeaponKind::Melee => {
                    let reach = effect.range + config.ai.melee_epsilon;
                    if attacker_pos.distance_squared(target_pos) <= reach * reach {
                        apply_hit(
                            units,
                            Some(effect.attacker),
                            effect.target,
                            effect.damage,
                            events,
                        );
                    } else {
                        tracing::debug!(
                            attacker = effect.attacker,
                            target = effect.target,
                            "Melee swing missed, target moved out of reach"
                        );
                    }
                }
                WeaponKind::Ranged => {
                    let projectile = Projectile::launch(
                        self.next_projectile_id,
                        effect.attacker,
                        effect.target,
                        effect.damage,
                        attacker_pos,
                        target_pos,
                        now,
                        &config.projectile,
                    );
                    self.next_projectile_id += 1;
                    events.projectiles_spawned.push(ProjectileSpawned {
                        projectile: projectile.id,
                        owner: projectile.owner,
                        target: projectile.target,
                    });
                    self.projectiles.push(projectile);
                }
            }
        }
    }

    fn step_projectiles(&mut self, now: Tick, units: &mut EntityStorage, events: &mut TickEvents) {
        if self.projectiles.is_empty() {
            return;
        }

        let positions: Vec<(EntityId, Vec2Fixed)> = units
            .sorted_ids()
            .into_iter()
            .filter_map(|id| units.get(id).map(|unit| (id, unit.position)))
            .collect();

        let mut in_flight = Vec::with_capacity(self.projectiles.len());
        for mut projectile in std::mem::take(&mut self.projectiles) {
            projectile.advance(live_position(units, projectile.target));

            let contact = projectile.find_contact(
                positions
                    .iter()
                    .copied()
                    .filter(|(id, _)| units.get(*id).is_some_and(|unit| unit.alive)),
            );

            if let Some(hit) = contact {
                apply_hit(units, Some(projectile.owner), hit, projectile.damage, events);
            } else if projectile.is_expired(now) {
                events.projectiles_expired.push(projectile.id);
            } else {
                in_flight.push(projectile);
            }
        }
        self.projectiles = in_flight;
    }
}

fn live_position(units: &EntityStorage, id: EntityId) -> Option<Vec2Fixed> {
    units
        .get(id)
        .filter(|unit| unit.alive)
        .map(|unit| unit.position)
}

/// Apply damage to a live unit and record the outcome.
fn apply_hit(
    units: &mut EntityStorage,
    source: Option<EntityId>,
    target: EntityId,
    amount: u32,
    events: &mut TickEvents,
) {
    let Some(unit) = units.get_mut(target) else {
        return;
    };
    if !unit.is_alive() {
        return;
    }

    let team = unit.team;
    let report = unit.apply_damage(amount, source);
    events.damage.push(DamageEvent {
        source,
        target,
        amount,
        dealt: report.dealt,
        killed: report.died,
    });
    if report.died {
        events.deaths.push(DeathEvent {
            unit: target,
            team,
            killer: source,
        });
    }
}
