//! Error types for the game simulation.
//!
//! Only API misuse and IO surface here. Gameplay failures such as an attack
//! on cooldown are ordinary values (see [`crate::combat::AttackFailure`]).

use thiserror::Error;

use crate::components::EntityId;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all game simulation errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// Invalid entity reference.
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    /// No unit template with this id.
    #[error("Unknown unit template: {0}")]
    UnknownTemplate(String),

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    /// A replay did not reproduce its recorded outcome.
    #[error("Replay diverged at tick {tick}: expected hash {expected}, got {actual}")]
    ReplayMismatch {
        /// Final tick of the replay.
        tick: u64,
        /// Hash recorded in the replay.
        expected: u64,
        /// Hash produced by playback.
        actual: u64,
    },
}
