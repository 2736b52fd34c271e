//! JSON protocol for headless game communication.
//!
//! The headless runner communicates via JSON lines (one JSON object per line):
//!
//! **Input (stdin):** Commands from the controller
//! **Output (stdout):** Game state updates and responses
//!
//! # Protocol Flow
//!
//! 1. Runner starts, outputs `{"type":"ready","version":"1.0",...}`
//! 2. Controller sends commands as JSON lines
//! 3. Runner outputs state after each tick batch (with `--auto-state`) or on `query`
//! 4. When the session ends, outputs `{"type":"game_over","result":"won"|"lost",...}`
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","tick":0,"difficulty":"medium","seed":7}
//! -> {"cmd":"target","from":0,"to":4}
//! <- {"type":"ack","cmd":"target"}
//! -> {"cmd":"tick","count":120}
//! <- {"type":"ack","cmd":"tick"}
//! -> {"cmd":"ability","ability":"freeze"}
//! <- {"type":"error","message":"Ability freeze is locked","cmd":"ability"}
//! -> {"cmd":"query"}
//! <- {"type":"state","tick":120,"planets":[...],"ships":[...],...}
//! ```

use orbit_core::abilities::AbilityType;
use orbit_core::challenges::{Challenge, Rarity};
use orbit_core::difficulty::Difficulty;
use orbit_core::game::{Game, GameStatus};
use orbit_core::planet::PlanetType;
use orbit_core::ship::Destination;
use serde::{Deserialize, Serialize};

/// Protocol version announced in `ready`.
pub const PROTOCOL_VERSION: &str = "1.0";

// ============================================================================
// Input Commands (Controller -> Runner)
// ============================================================================

/// Commands that can be sent to the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Advance the simulation by N ticks (default: 1).
    Tick {
        /// Ticks to run.
        #[serde(default = "default_tick_count")]
        count: u32,
    },

    /// Query current game state without advancing time.
    Query,

    /// Toggle a route between two planets.
    Target {
        /// Player-owned source planet.
        from: u32,
        /// Target planet.
        to: u32,
    },

    /// Activate a player ability.
    Ability {
        /// Ability to cast.
        ability: AbilityType,
    },

    /// Pause the session.
    Pause,

    /// Resume the session.
    Resume,

    /// Switch slow mode on or off.
    SlowMode {
        /// New state.
        enabled: bool,
    },

    /// Throw away the current session and start another.
    NewGame {
        /// Difficulty of the new session.
        #[serde(default)]
        difficulty: Difficulty,
        /// World seed.
        #[serde(default)]
        seed: u64,
    },

    /// Report the current state hash (for determinism verification).
    Hash,

    /// List challenges and their progress.
    Challenges,

    /// Quit the runner.
    Quit,
}

const fn default_tick_count() -> u32 {
    1
}

// ============================================================================
// Output Responses (Runner -> Controller)
// ============================================================================

/// Responses sent from the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready to accept commands.
    Ready {
        /// Protocol version.
        version: String,
        /// Current tick.
        tick: u64,
        /// Session difficulty.
        difficulty: Difficulty,
        /// Session seed.
        seed: u64,
    },

    /// Acknowledgment of a command.
    Ack {
        /// Command name.
        cmd: String,
    },

    /// Error processing a command.
    Error {
        /// What went wrong.
        message: String,
        /// Command that failed, if it parsed.
        cmd: Option<String>,
    },

    /// A save did not reach storage; play continues.
    Warning {
        /// Reason.
        message: String,
    },

    /// Current game state.
    State(Box<StateOutput>),

    /// The session has ended.
    GameOver {
        /// Outcome.
        result: GameResultOutput,
        /// Game time at the end.
        elapsed_ms: u64,
        /// Ticks run.
        ticks: u64,
        /// Coins after rewards.
        coins: u64,
    },

    /// State hash for determinism verification.
    StateHash {
        /// Current tick.
        tick: u64,
        /// Hash.
        hash: u64,
    },

    /// Challenge list.
    Challenges {
        /// Entries in display order.
        challenges: Vec<ChallengeOutput>,
    },

    /// Goodbye message before shutdown.
    Bye,
}

// ============================================================================
// State Types
// ============================================================================

/// Full snapshot sent in a `state` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateOutput {
    /// Ticks run.
    pub tick: u64,
    /// Game time, pauses excluded.
    pub game_time_ms: u64,
    /// Session status.
    pub status: StatusOutput,
    /// Whether slow mode is on.
    pub slow_mode: bool,
    /// Player coins.
    pub coins: u64,
    /// Planets in id order.
    pub planets: Vec<PlanetOutput>,
    /// Ships in flight.
    pub ships: Vec<ShipOutput>,
    /// Projectiles in flight.
    pub projectiles: Vec<ProjectileOutput>,
    /// Explosions still playing.
    pub explosions: Vec<ExplosionOutput>,
    /// State hash.
    pub hash: u64,
}

/// One planet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanetOutput {
    pub id: u32,
    pub x: f64,
    pub y: f64,
    pub planet_type: PlanetType,
    /// `None` while neutral; 0 is the player.
    pub owner: Option<u32>,
    pub health: f64,
    pub max_health: f64,
    pub targets: Vec<u32>,
    pub stationed: usize,
}

/// One ship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipOutput {
    pub id: u64,
    pub owner: u32,
    pub x: f64,
    pub y: f64,
    pub health: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_planet: Option<u32>,
    pub missile: bool,
    pub stationary: bool,
}

/// One projectile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileOutput {
    pub id: u64,
    pub owner: u32,
    pub x: f64,
    pub y: f64,
}

/// One explosion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplosionOutput {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
}

/// Session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusOutput {
    InProgress,
    Paused,
    Won,
    Lost,
}

/// Final result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameResultOutput {
    Won,
    Lost,
}

/// One challenge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeOutput {
    pub id: String,
    pub name: String,
    pub description: String,
    pub rarity: Rarity,
    pub reward: u64,
    pub completed: bool,
    /// Progress in `[0, 1]`.
    pub progress: f64,
}

impl From<&Challenge> for ChallengeOutput {
    fn from(challenge: &Challenge) -> Self {
        Self {
            id: challenge.id.clone(),
            name: challenge.name.clone(),
            description: challenge.description.clone(),
            rarity: challenge.rarity,
            reward: challenge.reward,
            completed: challenge.is_completed(),
            progress: challenge.progress_fraction(),
        }
    }
}

impl StateOutput {
    /// Capture everything a controller can see.
    #[must_use]
    pub fn capture(game: &Game) -> Self {
        let world = game.world();
        let status = match game.status() {
            GameStatus::Won => StatusOutput::Won,
            GameStatus::Lost => StatusOutput::Lost,
            GameStatus::Running if game.is_paused() => StatusOutput::Paused,
            GameStatus::Running => StatusOutput::InProgress,
        };
        Self {
            tick: game.tick_count(),
            game_time_ms: game.game_time(),
            status,
            slow_mode: game.is_slow_mode(),
            coins: game.profile().player().coins(),
            planets: world
                .planets()
                .map(|p| PlanetOutput {
                    id: p.id.0,
                    x: p.position.x,
                    y: p.position.y,
                    planet_type: p.planet_type,
                    owner: p.owner().map(|o| o.0),
                    health: p.health(),
                    max_health: p.max_health(),
                    targets: p.targets().iter().map(|t| t.0).collect(),
                    stationed: p.stationed().len(),
                })
                .collect(),
            ships: world
                .ships()
                .map(|s| ShipOutput {
                    id: s.id.0,
                    owner: s.owner.0,
                    x: s.position.x,
                    y: s.position.y,
                    health: s.health,
                    target_planet: match s.destination {
                        Some(Destination::Planet(id)) => Some(id.0),
                        _ => None,
                    },
                    missile: s.missile,
                    stationary: s.stationary,
                })
                .collect(),
            projectiles: world
                .projectiles()
                .map(|p| ProjectileOutput {
                    id: p.id.0,
                    owner: p.owner.0,
                    x: p.position.x,
                    y: p.position.y,
                })
                .collect(),
            explosions: world
                .explosions()
                .iter()
                .map(|e| ExplosionOutput {
                    x: e.position.x,
                    y: e.position.y,
                    radius: e.radius,
                })
                .collect(),
            hash: game.state_hash(),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

impl Response {
    /// Create a ready response for `game`.
    #[must_use]
    pub fn ready(game: &Game) -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
            tick: game.tick_count(),
            difficulty: game.difficulty(),
            seed: game.seed(),
        }
    }

    /// Create an acknowledgment.
    #[must_use]
    pub fn ack(cmd: &str) -> Self {
        Self::Ack {
            cmd: cmd.to_string(),
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Create a state response.
    #[must_use]
    pub fn state(game: &Game) -> Self {
        Self::State(Box::new(StateOutput::capture(game)))
    }

    /// Create a game-over response, if the session has ended.
    #[must_use]
    pub fn game_over(game: &Game) -> Option<Self> {
        let result = match game.status() {
            GameStatus::Won => GameResultOutput::Won,
            GameStatus::Lost => GameResultOutput::Lost,
            GameStatus::Running => return None,
        };
        Some(Self::GameOver {
            result,
            elapsed_ms: game.game_time(),
            ticks: game.tick_count(),
            coins: game.profile().player().coins(),
        })
    }

    /// Serialize to JSON line (with newline).
    #[must_use]
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"Serialization failed: {e}"}}"#)
        });
        json.push('\n');
        json
    }
}

impl Command {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Get command name for acknowledgment.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Tick { .. } => "tick",
            Self::Query => "query",
            Self::Target { .. } => "target",
            Self::Ability { .. } => "ability",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::SlowMode { .. } => "slow_mode",
            Self::NewGame { .. } => "new_game",
            Self::Hash => "hash",
            Self::Challenges => "challenges",
            Self::Quit => "quit",
        }
    }
}
