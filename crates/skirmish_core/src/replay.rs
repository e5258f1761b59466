//! Replay system for recording and playing back skirmishes.
//!
//! Replays store the initial simulation state and the stream of orders
//! issued during the match. Since the simulation is deterministic, this is
//! enough to recreate every tick.
//!
//! Navigation services are not part of the recorded state. A match that ran
//! with one must be played back with an equivalent service.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::components::{EntityId, Order, Tick};
use crate::error::{GameError, Result};
use crate::navigation::NavigationService;
use crate::simulation::Simulation;

/// A single order record for replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayOrder {
    /// Simulation tick before which the order was issued.
    pub tick: Tick,
    /// Unit that received the order.
    pub unit: EntityId,
    /// The order.
    pub order: Order,
}

/// Replay file format version for compatibility.
pub const REPLAY_VERSION: u32 = 1;

/// Complete replay data structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Replay {
    /// Replay format version.
    pub version: u32,
    /// Scenario identifier or name.
    pub scenario_id: String,
    /// Serialized initial simulation state.
    pub initial_state: Vec<u8>,
    /// Orders in tick order.
    pub orders: Vec<ReplayOrder>,
    /// Final tick when the match ended.
    pub final_tick: Tick,
    /// Final state hash for verification.
    pub final_hash: u64,
}

impl Replay {
    /// Create a new replay from a simulation's initial state.
    ///
    /// # Errors
    /// Returns an error if the simulation cannot be serialized.
    pub fn new(scenario_id: impl Into<String>, initial_state: &Simulation) -> Result<Self> {
        Ok(Self {
            version: REPLAY_VERSION,
            scenario_id: scenario_id.into(),
            initial_state: initial_state.serialize()?,
            orders: Vec::new(),
            final_tick: initial_state.get_tick(),
            final_hash: initial_state.state_hash(),
        })
    }

    /// Record an order issued before `tick` was simulated.
    pub fn record_order(&mut self, tick: Tick, unit: EntityId, order: Order) {
        self.orders.push(ReplayOrder { tick, unit, order });
    }

    /// Finalize the replay with end-of-match state.
    pub fn finalize(&mut self, final_tick: Tick, final_hash: u64) {
        self.final_tick = final_tick;
        self.final_hash = final_hash;
    }

    /// Save the replay to a file.
    ///
    /// # Errors
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = bincode::serialize(self)
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize replay: {}", e)))?;
        std::fs::write(path.as_ref(), bytes)
            .map_err(|e| GameError::InvalidState(format!("Failed to write replay file: {}", e)))?;
        Ok(())
    }

    /// Load a replay from a file.
    ///
    /// # Errors
    /// Returns an error if file reading, deserialization or the version check fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| GameError::InvalidState(format!("Failed to read replay file: {}", e)))?;
        let replay: Self = bincode::deserialize(&bytes)
            .map_err(|e| GameError::InvalidState(format!("Failed to deserialize replay: {}", e)))?;

        if replay.version != REPLAY_VERSION {
            return Err(GameError::InvalidState(format!(
                "Replay version mismatch: expected {}, got {}",
                REPLAY_VERSION, replay.version
            )));
        }

        Ok(replay)
    }

    /// Get the initial simulation state for playback.
    ///
    /// # Errors
    /// Returns an error if state deserialization fails.
    pub fn restore_initial_state(&self) -> Result<Simulation> {
        Simulation::deserialize(&self.initial_state)
    }

    /// Orders issued before a specific tick.
    #[must_use]
    pub fn orders_at_tick(&self, tick: Tick) -> Vec<&ReplayOrder> {
        self.orders.iter().filter(|o| o.tick == tick).collect()
    }

    /// Get the total number of orders in the replay.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Play the replay to its final tick and check the final hash.
    ///
    /// # Errors
    /// Returns [`GameError::ReplayMismatch`] if the playback diverges, or an
    /// error if the initial state cannot be restored.
    pub fn play(&self) -> Result<Simulation> {
        let mut player = ReplayPlayer::new(self.clone())?;
        player.finish()
    }

    /// Like [`play`](Self::play), with a navigation service installed.
    ///
    /// # Errors
    /// Same as [`play`](Self::play).
    pub fn play_with_navigation(
        &self,
        navigation: Box<dyn NavigationService>,
    ) -> Result<Simulation> {
        let mut player = ReplayPlayer::new(self.clone())?;
        player.simulation.set_navigation(navigation);
        player.finish()
    }
}

/// Replay playback controller.
#[derive(Debug)]
pub struct ReplayPlayer {
    replay: Replay,
    simulation: Simulation,
    order_index: usize,
}

impl ReplayPlayer {
    /// Create a new replay player from a replay.
    ///
    /// # Errors
    /// Returns an error if the initial state cannot be restored.
    pub fn new(replay: Replay) -> Result<Self> {
        let simulation = replay.restore_initial_state()?;
        Ok(Self {
            replay,
            simulation,
            order_index: 0,
        })
    }

    /// Advance the replay by one tick.
    ///
    /// Returns true if there are more ticks to play.
    pub fn advance(&mut self) -> bool {
        if self.is_finished() {
            return false;
        }

        let now = self.simulation.get_tick();
        while let Some(record) = self.replay.orders.get(self.order_index) {
            if record.tick > now {
                break;
            }
            if let Err(e) = self.simulation.issue_order(record.unit, record.order) {
                tracing::debug!(unit = record.unit, error = %e, "Replay order skipped");
            }
            self.order_index += 1;
        }

        self.simulation.tick();
        !self.is_finished()
    }

    /// Seek to a specific tick, restarting from the initial state if needed.
    ///
    /// # Errors
    /// Returns an error if state restoration fails.
    pub fn seek(&mut self, target_tick: Tick) -> Result<()> {
        if target_tick < self.simulation.get_tick() {
            self.simulation = self.replay.restore_initial_state()?;
            self.order_index = 0;
        }
        while self.simulation.get_tick() < target_tick && self.advance() {}
        Ok(())
    }

    /// Play to the end and compare against the recorded hash.
    ///
    /// # Errors
    /// Returns [`GameError::ReplayMismatch`] if the hashes differ.
    pub fn finish(&mut self) -> Result<Simulation> {
        while self.advance() {}
        let actual = self.simulation.state_hash();
        if actual != self.replay.final_hash {
            return Err(GameError::ReplayMismatch {
                tick: self.simulation.get_tick(),
                expected: self.replay.final_hash,
                actual,
            });
        }
        let snapshot = self.simulation.serialize()?;
        Simulation::deserialize(&snapshot)
    }

    /// Get the current tick.
    #[must_use]
    pub const fn current_tick(&self) -> Tick {
        self.simulation.get_tick()
    }

    /// Get a reference to the current simulation state.
    #[must_use]
    pub const fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    /// Check if the replay has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.simulation.get_tick() >= self.replay.final_tick
    }

    /// Get progress as a percentage (0-100).
    #[must_use]
    pub fn progress_percent(&self) -> f64 {
        if self.replay.final_tick == 0 {
            100.0
        } else {
            (self.current_tick() as f64 / self.replay.final_tick as f64) * 100.0
        }
    }
}
