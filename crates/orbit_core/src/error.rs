//! Error types for the game simulation.

use thiserror::Error;

use crate::abilities::AbilityType;
use crate::ids::{OperatorId, PlanetId, ShipId};
use crate::progression::UpgradeType;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all game simulation errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// Invalid planet reference.
    #[error("Planet not found: {0}")]
    PlanetNotFound(PlanetId),

    /// Invalid ship reference.
    #[error("Ship not found: {0}")]
    ShipNotFound(ShipId),

    /// Invalid operator reference.
    #[error("Operator not found: {0}")]
    OperatorNotFound(OperatorId),

    /// A command tried to control a planet owned by someone else.
    #[error("Planet {planet} is not owned by operator {operator}")]
    NotOwner {
        /// Planet the command referenced.
        planet: PlanetId,
        /// Operator that issued the command.
        operator: OperatorId,
    },

    /// The ability has not been unlocked yet.
    #[error("Ability {0} is locked")]
    AbilityLocked(AbilityType),

    /// The ability is still cooling down.
    #[error("Ability {ability} is on cooldown for another {remaining_ms} ms")]
    AbilityOnCooldown {
        /// The ability that was requested.
        ability: AbilityType,
        /// Milliseconds until it can be used again.
        remaining_ms: u64,
    },

    /// Not enough coins for a purchase.
    #[error("Insufficient coins: need {required}, have {available}")]
    InsufficientCoins {
        /// Coins required.
        required: u64,
        /// Coins available.
        available: u64,
    },

    /// Upgrade is already at its maximum level.
    #[error("Upgrade {0} is already at max level")]
    UpgradeMaxed(UpgradeType),

    /// Ability is already at its maximum level.
    #[error("Ability {0} is already at max level")]
    AbilityMaxed(AbilityType),

    /// The generated or supplied world cannot start a session.
    #[error("Invalid world: {0}")]
    InvalidWorld(String),

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    /// A progress record could not be saved or loaded.
    #[error("Persistence failure: {0}")]
    Persistence(String),

    /// Replay playback diverged from the recording.
    #[error("Desync detected at tick {tick}: expected hash {expected}, got {actual}")]
    DesyncDetected {
        /// Tick where the divergence was found.
        tick: u64,
        /// Hash stored in the replay.
        expected: u64,
        /// Hash produced by playback.
        actual: u64,
    },
}
