//! Headless Orbit Wars runner for autopilot testing and CI verification.
//!
//! This crate drives [`orbit_core`] without graphics. A session is
//! controlled via JSON commands on stdin, with game state written to
//! stdout. This enables:
//!
//! - **Scripted play**: an external controller plays the game over JSON lines
//! - **Balance batches**: many seeded autopilot games in parallel
//! - **Replay verification**: check that a recording reproduces its final hash
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: Commands from the controller (tick, target, ability, etc.)
//! - **stdout**: State updates and responses (JSON)
//! - **stderr**: Logs (human-readable)
//!
//! See the [`protocol`] module for the full command/response format.
//!
//! # Example
//!
//! ```bash
//! # Run interactively
//! echo '{"cmd":"tick","count":60}' | cargo run -p orbit_headless
//!
//! # Batch of autopilot games
//! cargo run -p orbit_headless -- batch --difficulty hard --count 200
//!
//! # Verify a recording
//! cargo run -p orbit_headless -- replay game.replay --verify
//! ```

pub mod autopilot;
pub mod batch;
pub mod error;
pub mod game_runner;
pub mod protocol;
pub mod runner;
pub mod store;

pub use autopilot::Autopilot;
pub use batch::{run_batch, BatchConfig, BatchResults, BatchSummary, GameMetrics};
pub use error::HeadlessError;
pub use game_runner::{run_game, GameOutcome, GameResult, GameSetup};
pub use protocol::{Command, Response};
pub use runner::{HeadlessConfig, HeadlessRunner};
pub use store::RonFileStore;
