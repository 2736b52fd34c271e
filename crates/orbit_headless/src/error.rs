//! Errors surfaced by the headless runner.

use orbit_core::config::ConfigError;
use orbit_core::error::GameError;
use orbit_core::persistence::StoreError;
use thiserror::Error;

/// Anything that stops a headless run.
#[derive(Debug, Error)]
pub enum HeadlessError {
    /// The simulation rejected a setup or replay.
    #[error(transparent)]
    Game(#[from] GameError),

    /// A config file could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The progress directory could not be opened.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Reading input or writing output failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Batch results could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, HeadlessError>;
