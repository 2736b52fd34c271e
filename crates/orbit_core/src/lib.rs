//! # Orbit Core
//!
//! Deterministic simulation core for Orbit Wars, a real-time strategy game
//! about orbiting planets that send fleets at each other.
//!
//! This crate contains **only** simulation logic:
//! - No rendering
//! - No terminal IO (file IO only behind explicit save/load calls)
//! - No system randomness: every draw comes from a session-seeded RNG
//! - No ambient clock: every timestamp is handed in by the scheduler
//!
//! This separation enables:
//! - Headless runs and batch balance checks
//! - Replay recording and verification
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`game`] - Session orchestrator and per-tick systems
//! - [`engine`] - Fixed-timestep scheduler
//! - [`world`] - Entity arena (planets, ships, projectiles, operators)
//! - [`abilities`] - Ability parameters, cooldowns and effects
//! - [`combat`] - Ship engagement and firing
//! - [`bot`] - Bot opponents
//! - [`challenges`] - Achievement tracking
//! - [`progression`] / [`persistence`] - Coins, upgrades and saved progress
//! - [`replay`] - Recording and playback

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod abilities;
pub mod bot;
pub mod challenges;
pub mod combat;
pub mod config;
pub mod difficulty;
pub mod engine;
pub mod error;
pub mod events;
pub mod game;
pub mod generation;
pub mod ids;
pub mod math;
pub mod operator;
pub mod persistence;
pub mod planet;
pub mod progression;
pub mod projectile;
pub mod replay;
pub mod ship;
pub mod time;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::abilities::{AbilityManager, AbilityType};
    pub use crate::bot::{Bot, BotOrder, Policy};
    pub use crate::challenges::{CareerCounters, ChallengeManager, Notification};
    pub use crate::config::{ConfigWarning, DebugFlags, GameConfig};
    pub use crate::difficulty::Difficulty;
    pub use crate::engine::Engine;
    pub use crate::error::{GameError, Result};
    pub use crate::events::{GameEvent, TickEvents};
    pub use crate::game::{Game, GameSnapshot, GameStatus, PlayerCommand};
    pub use crate::generation::{PlanetSeed, WorldGenerator, WorldLayout};
    pub use crate::ids::{OperatorId, PlanetId, ProjectileId, ShipId};
    pub use crate::math::Vec2;
    pub use crate::persistence::{MemoryStore, PersistenceWarning, Profile, ProgressStore};
    pub use crate::planet::{Orbit, Planet, PlanetType};
    pub use crate::progression::{PlayerData, UpgradeType};
    pub use crate::replay::{Replay, ReplayPlayer};
    pub use crate::ship::{Destination, Ship};
    pub use crate::time::{Clock, ManualClock, Millis, SystemClock};
    pub use crate::world::World;
}
