//! Target discovery.
//!
//! Perception asks a [`SpatialQuery`] for everything within sight range,
//! keeps the hostile combatants and orders them by the unit's
//! [`TargetPriority`]. Ties always fall back to distance and then entity id,
//! so two simulations with the same state pick the same target.
//!
//! The simulation provides [`WorldSnapshot`] as its query: a copy of every
//! live unit taken at the start of the tick. Scans never observe health or
//! position changes made later in the same tick.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::{EntityId, Team, TargetPriority, Tick};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};

/// What a spatial query reports about one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialEntry {
    /// Entity id.
    pub id: EntityId,
    /// Team affiliation.
    pub team: Team,
    /// World position.
    pub position: Vec2Fixed,
    /// Current health.
    pub health: u32,
    /// Alive flag.
    pub alive: bool,
    /// Whether the entity can fight (non-combatants are never targeted).
    pub combatant: bool,
    /// Score used by [`TargetPriority::HighestThreat`].
    #[serde(with = "fixed_serde")]
    pub threat: Fixed,
}

/// Radius queries over the world.
pub trait SpatialQuery {
    /// Entities whose position is within `radius` of `center`, in id order.
    fn query(&self, center: Vec2Fixed, radius: Fixed) -> Vec<SpatialEntry>;

    /// Look up a single entity.
    fn lookup(&self, id: EntityId) -> Option<SpatialEntry>;
}

/// Immutable per-tick view of all live units, sorted by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorldSnapshot {
    entries: Vec<SpatialEntry>,
}

impl WorldSnapshot {
    /// Build a snapshot from arbitrary entries.
    #[must_use]
    pub fn from_entries(mut entries: Vec<SpatialEntry>) -> Self {
        entries.sort_unstable_by_key(|entry| entry.id);
        Self { entries }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = &SpatialEntry> {
        self.entries.iter()
    }
}

impl SpatialQuery for WorldSnapshot {
    fn query(&self, center: Vec2Fixed, radius: Fixed) -> Vec<SpatialEntry> {
        let radius_sq = radius * radius;
        self.entries
            .iter()
            .filter(|entry| entry.position.distance_squared(center) <= radius_sq)
            .copied()
            .collect()
    }

    fn lookup(&self, id: EntityId) -> Option<SpatialEntry> {
        self.entries
            .binary_search_by_key(&id, |entry| entry.id)
            .ok()
            .map(|index| self.entries[index])
    }
}

/// When and where a hostile was last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SightRecord {
    /// Tick of the latest sighting.
    pub last_seen: Tick,
    /// Position at the latest sighting.
    pub last_position: Vec2Fixed,
}

/// A unit's senses: sight range, targeting policy and short-term memory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Perception {
    /// How far the unit can see.
    #[serde(with = "fixed_serde")]
    pub sight_range: Fixed,
    /// Targeting policy.
    pub priority: TargetPriority,
    memory: BTreeMap<EntityId, SightRecord>,
}

impl Perception {
    /// Create perception with an empty memory.
    #[must_use]
    pub fn new(sight_range: Fixed, priority: TargetPriority) -> Self {
        Self {
            sight_range,
            priority,
            memory: BTreeMap::new(),
        }
    }

    /// All hostile combatants in sight, best first.
    #[must_use]
    pub fn rank(
        &self,
        world: &dyn SpatialQuery,
        self_id: EntityId,
        self_position: Vec2Fixed,
        self_team: Team,
    ) -> Vec<SpatialEntry> {
        let mut candidates: Vec<(SpatialEntry, Fixed)> = world
            .query(self_position, self.sight_range)
            .into_iter()
            .filter(|entry| {
                entry.id != self_id
                    && entry.alive
                    && entry.combatant
                    && entry.team.is_hostile_to(self_team)
            })
            .map(|entry| (entry, entry.position.distance_squared(self_position)))
            .collect();

        let priority = self.priority;
        candidates.sort_by(|a, b| compare_candidates(priority, a, b));
        candidates.into_iter().map(|(entry, _)| entry).collect()
    }

    /// Pick the best hostile in sight and remember every hostile seen.
    pub fn scan(
        &mut self,
        world: &dyn SpatialQuery,
        self_id: EntityId,
        self_position: Vec2Fixed,
        self_team: Team,
        now: Tick,
        memory_ticks: u32,
    ) -> Option<SpatialEntry> {
        let ranked = self.rank(world, self_id, self_position, self_team);

        for entry in &ranked {
            self.memory.insert(
                entry.id,
                SightRecord {
                    last_seen: now,
                    last_position: entry.position,
                },
            );
        }
        self.memory
            .retain(|_, record| now.saturating_sub(record.last_seen) <= Tick::from(memory_ticks));

        ranked.first().copied()
    }

    /// Latest sighting of `id`, if still remembered.
    #[must_use]
    pub fn last_seen(&self, id: EntityId) -> Option<SightRecord> {
        self.memory.get(&id).copied()
    }

    /// Number of remembered hostiles.
    #[must_use]
    pub fn remembered(&self) -> usize {
        self.memory.len()
    }
}

fn compare_candidates(
    priority: TargetPriority,
    (a, a_dist): &(SpatialEntry, Fixed),
    (b, b_dist): &(SpatialEntry, Fixed),
) -> Ordering {
    let primary = match priority {
        TargetPriority::Closest => Ordering::Equal,
        TargetPriority::Weakest => a.health.cmp(&b.health),
        TargetPriority::HighestThreat => b.threat.cmp(&a.threat),
    };
    primary
        .then_with(|| a_dist.cmp(b_dist))
        .then_with(|| a.id.cmp(&b.id))
}
