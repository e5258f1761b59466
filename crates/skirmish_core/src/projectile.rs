//! Homing projectiles.
//!
//! A projectile flies forward at a fixed speed and turns toward its target
//! by a bounded angle each tick. The target reference is weak: if the
//! target disappears the projectile keeps its heading until it hits
//! something else or expires. Flight does not depend on what the firer
//! does after launch.

use serde::{Deserialize, Serialize};

use crate::components::{EntityId, Tick};
use crate::config::ProjectileTuning;
use crate::math::{fixed_serde, rotate_toward, Fixed, Vec2Fixed};

/// A projectile in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projectile {
    /// Projectile id (own namespace, not an [`EntityId`]).
    pub id: u64,
    /// Unit that fired it, for attribution.
    pub owner: EntityId,
    /// Unit it homes on.
    pub target: EntityId,
    /// Raw damage delivered on contact.
    pub damage: u32,
    /// Current position.
    pub position: Vec2Fixed,
    /// Position before the latest step; contact is swept along this segment.
    pub previous: Vec2Fixed,
    /// Current heading in radians.
    #[serde(with = "fixed_serde")]
    pub heading: Fixed,
    /// Forward speed per tick.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Maximum heading change per tick.
    #[serde(with = "fixed_serde")]
    pub turn_rate: Fixed,
    /// Contact distance.
    #[serde(with = "fixed_serde")]
    pub hit_radius: Fixed,
    /// Tick of launch.
    pub spawn_tick: Tick,
    /// Ticks of flight before expiry.
    pub lifetime_ticks: u32,
}

impl Projectile {
    /// Launch a projectile from `origin` aimed straight at `target_position`.
    #[must_use]
    pub fn launch(
        id: u64,
        owner: EntityId,
        target: EntityId,
        damage: u32,
        origin: Vec2Fixed,
        target_position: Vec2Fixed,
        now: Tick,
        tuning: &ProjectileTuning,
    ) -> Self {
        Self {
            id,
            owner,
            target,
            damage,
            position: origin,
            previous: origin,
            heading: (target_position - origin).angle(),
            speed: tuning.speed,
            turn_rate: tuning.turn_rate,
            hit_radius: tuning.hit_radius,
            spawn_tick: now,
            lifetime_ticks: tuning.lifetime_ticks,
        }
    }

    /// Turn toward the target (if it still exists) and move forward one tick.
    pub fn advance(&mut self, target_position: Option<Vec2Fixed>) {
        if let Some(target) = target_position {
            if target != self.position {
                let desired = (target - self.position).angle();
                self.heading = rotate_toward(self.heading, desired, self.turn_rate);
            }
        }
        self.previous = self.position;
        self.position = self.position + Vec2Fixed::from_angle(self.heading).scale(self.speed);
    }

    /// Nearest candidate within the hit radius of the latest flight segment,
    /// ignoring the owner.
    ///
    /// Ties resolve to the lowest id.
    #[must_use]
    pub fn find_contact<I>(&self, candidates: I) -> Option<EntityId>
    where
        I: IntoIterator<Item = (EntityId, Vec2Fixed)>,
    {
        let radius_sq = self.hit_radius * self.hit_radius;
        candidates
            .into_iter()
            .filter(|(id, _)| *id != self.owner)
            .map(|(id, position)| (self.swept_distance_squared(position), id))
            .filter(|(dist_sq, _)| *dist_sq <= radius_sq)
            .min()
            .map(|(_, id)| id)
    }

    fn swept_distance_squared(&self, point: Vec2Fixed) -> Fixed {
        let segment = self.position - self.previous;
        let length_sq = segment.dot(segment);
        if length_sq == Fixed::ZERO {
            return point.distance_squared(self.position);
        }
        let t = ((point - self.previous).dot(segment) / length_sq).clamp(Fixed::ZERO, Fixed::ONE);
        point.distance_squared(self.previous + segment.scale(t))
    }

    /// Check whether the projectile's flight time is over.
    #[must_use]
    pub fn is_expired(&self, now: Tick) -> bool {
        now >= self.spawn_tick + Tick::from(self.lifetime_ticks)
    }
}
