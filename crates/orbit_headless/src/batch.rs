//! Batch game runner for balance testing.
//!
//! Runs many seeded autopilot games in parallel using rayon and collects
//! per-game metrics plus a summary.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use orbit_core::difficulty::Difficulty;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::game_runner::{run_game, GameOutcome, GameResult, GameSetup, DEFAULT_MAX_STEPS};

/// Configuration for a batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Difficulty of every game
    pub difficulty: Difficulty,
    /// Number of games to run
    pub game_count: u32,
    /// Maximum parallel games (0 = use rayon default)
    pub parallel_games: u32,
    /// Starting seed; game `i` uses `seed_start + i`
    pub seed_start: u64,
    /// Step limit per game
    pub max_steps: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Medium,
            game_count: 100,
            parallel_games: 0,
            seed_start: 0,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

impl BatchConfig {
    /// Config for `game_count` games at `difficulty`
    #[must_use]
    pub fn new(difficulty: Difficulty, game_count: u32) -> Self {
        Self {
            difficulty,
            game_count,
            ..Default::default()
        }
    }

    /// Set seed start
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set the step limit
    #[must_use]
    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = max_steps;
        self
    }
}

/// Metrics from one game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameMetrics {
    /// Seed used
    pub seed: u64,
    /// How it ended
    pub outcome: GameOutcome,
    /// Steps run
    pub steps: u64,
    /// Game time at the end
    pub game_time_ms: u64,
    /// Planets the player held at the end
    pub player_planets: usize,
    /// Planets the player captured
    pub player_captures: u64,
    /// Player planets lost to bots
    pub planets_lost: u64,
    /// Ships destroyed in flight
    pub ships_destroyed: u64,
    /// Final state hash
    pub final_state_hash: u64,
}

impl GameMetrics {
    fn from_result(seed: u64, result: &GameResult) -> Self {
        Self {
            seed,
            outcome: result.outcome,
            steps: result.steps,
            game_time_ms: result.game_time_ms,
            player_planets: result.player_planets,
            player_captures: result.player_captures,
            planets_lost: result.planets_lost,
            ships_destroyed: result.ships_destroyed,
            final_state_hash: result.final_state_hash,
        }
    }
}

/// Aggregate over a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Games completed
    pub total_games: u32,
    /// Player wins
    pub wins: u32,
    /// Player losses
    pub losses: u32,
    /// Games that hit the step limit
    pub timeouts: u32,
    /// `wins / total_games`
    pub win_rate: f64,
    /// Mean game time of won games
    pub mean_win_time_ms: Option<f64>,
    /// Mean planets captured by the player
    pub mean_captures: f64,
}

impl BatchSummary {
    /// Summarize `games`.
    #[must_use]
    pub fn from_games(games: &[GameMetrics]) -> Self {
        if games.is_empty() {
            return Self::default();
        }
        let count = |outcome| games.iter().filter(|g| g.outcome == outcome).count() as u32;
        let total_games = games.len() as u32;
        let wins = count(GameOutcome::Won);
        let win_times: Vec<f64> = games
            .iter()
            .filter(|g| g.outcome == GameOutcome::Won)
            .map(|g| g.game_time_ms as f64)
            .collect();
        Self {
            total_games,
            wins,
            losses: count(GameOutcome::Lost),
            timeouts: count(GameOutcome::Timeout),
            win_rate: f64::from(wins) / f64::from(total_games),
            mean_win_time_ms: (!win_times.is_empty())
                .then(|| win_times.iter().sum::<f64>() / win_times.len() as f64),
            mean_captures: games.iter().map(|g| g.player_captures as f64).sum::<f64>()
                / f64::from(total_games),
        }
    }
}

/// Error during batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchError {
    /// Game index
    pub game_index: u32,
    /// Seed used
    pub seed: u64,
    /// Error message
    pub message: String,
}

/// Results from a batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used
    pub config: BatchConfig,
    /// Individual game metrics, in seed order
    pub games: Vec<GameMetrics>,
    /// Aggregate summary
    pub summary: BatchSummary,
    /// Total runtime
    pub duration_seconds: f64,
    /// Errors encountered
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load results from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Default results path inside `dir`
    #[must_use]
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join("batch_results.json")
    }
}

/// Run a batch of games
pub fn run_batch(config: BatchConfig) -> BatchResults {
    let start = Instant::now();
    let completed = AtomicU32::new(0);

    info!(
        difficulty = %config.difficulty,
        games = config.game_count,
        seed_start = config.seed_start,
        "Starting batch run"
    );

    let play = |i: u32| -> std::result::Result<GameMetrics, BatchError> {
        let seed = config.seed_start.wrapping_add(u64::from(i));
        let setup = GameSetup::new(config.difficulty, seed).with_max_steps(config.max_steps);
        match run_game(&setup) {
            Ok(result) => {
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                if done % 10 == 0 {
                    debug!("Progress: {}/{}", done, config.game_count);
                }
                Ok(GameMetrics::from_result(seed, &result))
            }
            Err(e) => {
                warn!(game = i, seed, error = %e, "Game failed");
                Err(BatchError {
                    game_index: i,
                    seed,
                    message: e.to_string(),
                })
            }
        }
    };

    let run_all = || -> Vec<_> { (0..config.game_count).into_par_iter().map(play).collect() };
    let results = if config.parallel_games > 0 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel_games as usize)
            .build()
        {
            Ok(pool) => pool.install(run_all),
            Err(e) => {
                warn!(error = %e, "Could not build thread pool, using the global one");
                run_all()
            }
        }
    } else {
        run_all()
    };

    let mut games = Vec::new();
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(metrics) => games.push(metrics),
            Err(error) => errors.push(error),
        }
    }

    let summary = BatchSummary::from_games(&games);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        games = games.len(),
        failed = errors.len(),
        win_rate = summary.win_rate,
        duration_seconds,
        "Batch complete"
    );

    BatchResults {
        config,
        games,
        summary,
        duration_seconds,
        errors,
    }
}

/// Hashes of `runs` plays of the same setup.
pub fn determinism_hashes(setup: &GameSetup, runs: u32) -> Result<Vec<u64>> {
    (0..runs)
        .into_par_iter()
        .map(|_| run_game(setup).map(|r| r.final_state_hash))
        .collect()
}

/// Verify determinism by running the same setup several times.
pub fn verify_determinism(setup: &GameSetup, runs: u32) -> Result<bool> {
    let hashes = determinism_hashes(setup, runs)?;
    Ok(hashes.windows(2).all(|w| w[0] == w[1]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_config_default() {
        let config = BatchConfig::default();
        assert_eq!(config.game_count, 100);
        assert_eq!(config.difficulty, Difficulty::Medium);
    }

    #[test]
    fn test_batch_config_builder() {
        let config = BatchConfig::new(Difficulty::Hard, 500)
            .with_seed(12345)
            .with_max_steps(600);
        assert_eq!(config.difficulty, Difficulty::Hard);
        assert_eq!(config.game_count, 500);
        assert_eq!(config.seed_start, 12345);
        assert_eq!(config.max_steps, 600);
    }

    #[test]
    fn test_summary_counts_outcomes() {
        let game = |outcome, time| GameMetrics {
            seed: 0,
            outcome,
            steps: 0,
            game_time_ms: time,
            player_planets: 0,
            player_captures: 2,
            planets_lost: 0,
            ships_destroyed: 0,
            final_state_hash: 0,
        };
        let summary = BatchSummary::from_games(&[
            game(GameOutcome::Won, 1000),
            game(GameOutcome::Won, 3000),
            game(GameOutcome::Lost, 500),
            game(GameOutcome::Timeout, 9000),
        ]);
        assert_eq!(summary.total_games, 4);
        assert_eq!((summary.wins, summary.losses, summary.timeouts), (2, 1, 1));
        assert!((summary.win_rate - 0.5).abs() < f64::EPSILON);
        assert_eq!(summary.mean_win_time_ms, Some(2000.0));
        assert!((summary.mean_captures - 2.0).abs() < f64::EPSILON);
        assert_eq!(BatchSummary::from_games(&[]), BatchSummary::default());
    }

    #[test]
    fn test_run_batch_small() {
        let config = BatchConfig::new(Difficulty::Easy, 4).with_max_steps(300);
        let results = run_batch(config);
        assert_eq!(results.games.len(), 4);
        assert!(results.errors.is_empty());
        let seeds: Vec<u64> = results.games.iter().map(|g| g.seed).collect();
        assert_eq!(seeds, vec![0, 1, 2, 3]);
        assert_eq!(results.summary.total_games, 4);
    }

    #[test]
    fn test_parallel_batch_matches_sequential() {
        let config = BatchConfig::new(Difficulty::Medium, 3).with_max_steps(400);
        let mut single = config.clone();
        single.parallel_games = 1;
        let a = run_batch(config);
        let b = run_batch(single);
        assert_eq!(a.games, b.games);
    }

    #[test]
    fn test_verify_determinism() {
        let setup = GameSetup::new(Difficulty::Hard, 12345).with_max_steps(600);
        assert!(verify_determinism(&setup, 3).unwrap());
    }

    #[test]
    fn test_batch_results_save_load() {
        let results = run_batch(BatchConfig::new(Difficulty::Easy, 2).with_max_steps(120));
        let dir = tempfile::tempdir().unwrap();
        let path = BatchResults::path_in(&dir.path().join("out"));
        results.save(&path).unwrap();
        assert!(path.exists());
        let loaded = BatchResults::load(&path).unwrap();
        assert_eq!(loaded.games, results.games);
        assert_eq!(loaded.config.difficulty, Difficulty::Easy);
    }
}
