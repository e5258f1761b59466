//! Movement seam.
//!
//! Units flagged as navigated hand their movement to a [`NavigationService`]
//! installed on the simulation. Everything else, and every unit when no
//! service is installed, moves with [`DirectMover`].

use std::collections::BTreeMap;
use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::components::EntityId;
use crate::math::{fixed_serde, rotate_toward, Fixed, Vec2Fixed};

/// External movement provider.
///
/// Implementations must be deterministic: identical call sequences yield
/// identical positions.
pub trait NavigationService: Debug + Send {
    /// Start tracking a unit.
    fn register(&mut self, unit: EntityId, position: Vec2Fixed, speed: Fixed);

    /// Stop tracking a unit.
    fn unregister(&mut self, unit: EntityId);

    /// Route a unit toward `destination`.
    fn set_destination(&mut self, unit: EntityId, destination: Vec2Fixed);

    /// Halt a unit where it stands.
    fn stop(&mut self, unit: EntityId);

    /// Where the service currently has the unit.
    fn current_position(&self, unit: EntityId) -> Option<Vec2Fixed>;

    /// Whether the unit is within tolerance of its destination (or has none).
    fn has_arrived(&self, unit: EntityId) -> bool;

    /// Move every tracked unit by one tick.
    fn advance(&mut self);
}

/// Straight-line fallback movement.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectMover;

impl DirectMover {
    /// Move toward `target` by at most `speed` without overshooting, turning
    /// the facing toward the travel direction by at most `turn_rate`.
    ///
    /// # Returns
    /// The new `(position, facing)` pair.
    #[must_use]
    pub fn step(
        position: Vec2Fixed,
        facing: Fixed,
        target: Vec2Fixed,
        speed: Fixed,
        turn_rate: Fixed,
    ) -> (Vec2Fixed, Fixed) {
        if position == target {
            return (position, facing);
        }
        let facing = rotate_toward(facing, (target - position).angle(), turn_rate);
        (position.step_toward(target, speed), facing)
    }

    /// Turn `facing` toward `point` as seen from `position`.
    #[must_use]
    pub fn face(position: Vec2Fixed, facing: Fixed, point: Vec2Fixed, turn_rate: Fixed) -> Fixed {
        if position == point {
            return facing;
        }
        rotate_toward(facing, (point - position).angle(), turn_rate)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Agent {
    position: Vec2Fixed,
    #[serde(with = "fixed_serde")]
    speed: Fixed,
    destination: Option<Vec2Fixed>,
}

/// A circular area agents cannot enter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedZone {
    /// Zone center.
    pub center: Vec2Fixed,
    /// Zone radius.
    #[serde(with = "fixed_serde")]
    pub radius: Fixed,
}

/// Reference [`NavigationService`]: straight-line travel that refuses to
/// step into blocked zones.
///
/// An agent whose next step would enter a zone stays where it is, which is
/// how unreachable destinations show up to the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectNavigator {
    agents: BTreeMap<EntityId, Agent>,
    #[serde(with = "fixed_serde")]
    arrival_tolerance: Fixed,
    blocked: Vec<BlockedZone>,
}

impl DirectNavigator {
    /// Create a navigator with the given arrival tolerance.
    #[must_use]
    pub fn new(arrival_tolerance: Fixed) -> Self {
        Self {
            agents: BTreeMap::new(),
            arrival_tolerance,
            blocked: Vec::new(),
        }
    }

    /// Builder method to add a blocked zone.
    #[must_use]
    pub fn with_blocked_zone(mut self, center: Vec2Fixed, radius: Fixed) -> Self {
        self.blocked.push(BlockedZone { center, radius });
        self
    }

    /// Number of tracked agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Check if no agents are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Destination of a tracked agent.
    #[must_use]
    pub fn destination(&self, unit: EntityId) -> Option<Vec2Fixed> {
        self.agents.get(&unit).and_then(|agent| agent.destination)
    }

    fn is_blocked(&self, point: Vec2Fixed) -> bool {
        self.blocked
            .iter()
            .any(|zone| point.distance_squared(zone.center) < zone.radius * zone.radius)
    }
}

impl NavigationService for DirectNavigator {
    fn register(&mut self, unit: EntityId, position: Vec2Fixed, speed: Fixed) {
        self.agents.insert(
            unit,
            Agent {
                position,
                speed,
                destination: None,
            },
        );
    }

    fn unregister(&mut self, unit: EntityId) {
        self.agents.remove(&unit);
    }

    fn set_destination(&mut self, unit: EntityId, destination: Vec2Fixed) {
        if let Some(agent) = self.agents.get_mut(&unit) {
            agent.destination = Some(destination);
        }
    }

    fn stop(&mut self, unit: EntityId) {
        if let Some(agent) = self.agents.get_mut(&unit) {
            agent.destination = None;
        }
    }

    fn current_position(&self, unit: EntityId) -> Option<Vec2Fixed> {
        self.agents.get(&unit).map(|agent| agent.position)
    }

    fn has_arrived(&self, unit: EntityId) -> bool {
        let tolerance = self.arrival_tolerance;
        self.agents.get(&unit).is_some_and(|agent| {
            agent.destination.map_or(true, |destination| {
                agent.position.distance_squared(destination) <= tolerance * tolerance
            })
        })
    }

    fn advance(&mut self) {
        let mut moves = Vec::new();
        for (&id, agent) in &self.agents {
            let Some(destination) = agent.destination else {
                continue;
            };
            let next = agent.position.step_toward(destination, agent.speed);
            if !self.is_blocked(next) {
                moves.push((id, next));
            }
        }
        for (id, next) in moves {
            if let Some(agent) = self.agents.get_mut(&id) {
                agent.position = next;
            }
        }
    }
}
