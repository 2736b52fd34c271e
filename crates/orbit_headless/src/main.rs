//! Headless Orbit Wars runner.
//!
//! This binary runs the simulation without a renderer, controlled via JSON on
//! stdin/stdout. Designed for bots, CI balance runs and replay verification.
//!
//! # Usage
//!
//! ```bash
//! # Interactive mode - read commands from stdin
//! cargo run -p orbit_headless
//!
//! # Interactive game with saved progression, recorded to a replay
//! cargo run -p orbit_headless -- run --difficulty hard --profile-dir save/ --record game.replay
//!
//! # Run batch balance test
//! cargo run -p orbit_headless -- batch --difficulty extreme --count 200 --output results/
//!
//! # Verify a recorded game
//! cargo run -p orbit_headless -- replay game.replay --verify
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON responses, one per line
//! Logs (stderr): Debug information
//!
//! See the protocol module for command/response format.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use orbit_core::config::GameConfig;
use orbit_core::difficulty::Difficulty;
use orbit_core::replay::{Replay, ReplayPlayer};
use orbit_headless::batch::{determinism_hashes, run_batch, BatchConfig, BatchResults};
use orbit_headless::game_runner::{run_game, GameSetup};
use orbit_headless::runner::{HeadlessConfig, HeadlessRunner};

#[derive(Parser)]
#[command(name = "orbit_headless")]
#[command(about = "Headless Orbit Wars runner for bots, balance testing and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single interactive game
    Run {
        /// Difficulty
        #[arg(short, long, default_value = "medium")]
        difficulty: Difficulty,

        /// World seed
        #[arg(short, long, default_value = "0")]
        seed: u64,

        /// RON file with simulation tunables
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory for saved progression (in memory if omitted)
        #[arg(long)]
        profile_dir: Option<PathBuf>,

        /// Output state after every tick batch
        #[arg(long)]
        auto_state: bool,

        /// Let the autopilot play the player's side
        #[arg(long)]
        autopilot: bool,

        /// Save the replay of the last session here
        #[arg(long)]
        record: Option<PathBuf>,
    },

    /// Run batch of autopilot games for balance testing
    Batch {
        /// Difficulty of every game
        #[arg(short, long, default_value = "medium")]
        difficulty: Difficulty,

        /// Number of games to run
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Maximum parallel games (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Starting random seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Step limit per game (60 steps per second of game time)
        #[arg(long, default_value = "36000")]
        max_steps: u64,
    },

    /// Verify determinism by replaying the same game several times
    Verify {
        /// Difficulty
        #[arg(short, long, default_value = "medium")]
        difficulty: Difficulty,

        /// Seed to test
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of runs
        #[arg(short, long, default_value = "5")]
        runs: u32,

        /// Steps per run
        #[arg(long, default_value = "3600")]
        steps: u64,
    },

    /// Play back a recorded game
    Replay {
        /// Replay file
        file: PathBuf,

        /// Check the final state hash against the recording
        #[arg(long)]
        verify: bool,
    },

    /// Check a tunables file and report corrections
    ValidateConfig {
        /// RON file to check
        path: PathBuf,
    },

    /// Measure simulation throughput
    Benchmark {
        /// Steps to run
        #[arg(short, long, default_value = "10000")]
        ticks: u64,

        /// Difficulty
        #[arg(short, long, default_value = "extreme")]
        difficulty: Difficulty,

        /// World seed
        #[arg(long, default_value = "1")]
        seed: u64,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr (stdout is for protocol); RUST_LOG overrides the level
    let level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(true),
        )
        .with(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .init();

    match cli.command {
        Some(Commands::Run {
            difficulty,
            seed,
            config,
            profile_dir,
            auto_state,
            autopilot,
            record,
        }) => {
            let game = config.map_or_else(GameConfig::default, |path| load_config(&path));
            cmd_run(HeadlessConfig {
                auto_state_output: auto_state,
                autopilot,
                game,
                difficulty,
                seed,
                profile_dir,
                record_path: record,
            });
        }
        Some(Commands::Batch {
            difficulty,
            count,
            parallel,
            output,
            seed,
            max_steps,
        }) => {
            let mut config = BatchConfig::new(difficulty, count)
                .with_seed(seed)
                .with_max_steps(max_steps);
            config.parallel_games = parallel;
            cmd_batch(config, &output);
        }
        Some(Commands::Verify {
            difficulty,
            seed,
            runs,
            steps,
        }) => {
            cmd_verify(difficulty, seed, runs, steps);
        }
        Some(Commands::Replay { file, verify }) => {
            cmd_replay(&file, verify);
        }
        Some(Commands::ValidateConfig { path }) => {
            cmd_validate_config(&path);
        }
        Some(Commands::Benchmark {
            ticks,
            difficulty,
            seed,
        }) => {
            cmd_benchmark(ticks, difficulty, seed);
        }
        None => {
            // Default: interactive mode
            cmd_run(HeadlessConfig::default());
        }
    }
}

/// Load tunables, exiting on unreadable files
fn load_config(path: &Path) -> GameConfig {
    match GameConfig::load(path) {
        Ok((config, warnings)) => {
            for w in &warnings {
                tracing::warn!(field = %w.field, found = %w.found, used = %w.used, "Config value corrected");
            }
            config
        }
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    }
}

/// Run a single interactive game
fn cmd_run(config: HeadlessConfig) {
    tracing::info!("Starting interactive session");

    let runner = match HeadlessRunner::new(config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Failed to start session: {e}");
            std::process::exit(1);
        }
    };

    let stdin = io::stdin();
    if let Err(e) = runner.run(stdin.lock(), io::stdout()) {
        eprintln!("Session failed: {e}");
        std::process::exit(1);
    }
}

/// Run batch of games for balance testing
fn cmd_batch(config: BatchConfig, output: &Path) {
    let batch_start = Instant::now();

    tracing::info!(
        difficulty = %config.difficulty,
        count = config.game_count,
        parallel = config.parallel_games,
        seed = config.seed_start,
        max_steps = config.max_steps,
        output = %output.display(),
        "Batch configuration"
    );

    let results = run_batch(config);

    tracing::info!(
        games_completed = results.games.len(),
        games_failed = results.errors.len(),
        total_duration_secs = format!("{:.1}", batch_start.elapsed().as_secs_f64()),
        "Batch execution finished"
    );

    let results_path = BatchResults::path_in(output);
    if let Err(e) = results.save(&results_path) {
        tracing::error!(error = %e, path = %results_path.display(), "Failed to save results");
        eprintln!("FATAL: Failed to save results: {e}");
        std::process::exit(1);
    }

    let summary = &results.summary;
    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Games played: {}", results.games.len());
    if !results.errors.is_empty() {
        eprintln!("Games FAILED: {}", results.errors.len());
    }
    eprintln!("Duration: {:.1}s", results.duration_seconds);
    eprintln!(
        "Throughput: {:.1} games/sec",
        results.games.len() as f64 / results.duration_seconds.max(0.001)
    );
    eprintln!(
        "\nWon {} / Lost {} / Timed out {}",
        summary.wins, summary.losses, summary.timeouts
    );
    eprintln!("Win rate: {:.1}%", summary.win_rate * 100.0);
    if let Some(ms) = summary.mean_win_time_ms {
        eprintln!("Mean win time: {:.1}s", ms / 1000.0);
    }
    eprintln!("Mean captures: {:.1}", summary.mean_captures);

    if !results.errors.is_empty() {
        eprintln!("\nGAME FAILURES:");
        for error in results.errors.iter().take(10) {
            eprintln!(
                "  Game {} (seed {}): {}",
                error.game_index, error.seed, error.message
            );
        }
        if results.errors.len() > 10 {
            eprintln!("  ... and {} more failures", results.errors.len() - 10);
        }
    }

    eprintln!("\nResults saved to: {}", results_path.display());
}

/// Verify determinism
fn cmd_verify(difficulty: Difficulty, seed: u64, runs: u32, steps: u64) {
    tracing::info!(
        "Verifying determinism: {} with seed {} ({} runs of {} steps)",
        difficulty,
        seed,
        runs,
        steps
    );

    let setup = GameSetup::new(difficulty, seed).with_max_steps(steps);
    let hashes = match determinism_hashes(&setup, runs) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("Failed to run game: {e}");
            std::process::exit(1);
        }
    };

    if hashes.windows(2).all(|w| w[0] == w[1]) {
        eprintln!("PASS: All {runs} runs produced identical results");
        if let Some(hash) = hashes.first() {
            eprintln!("  Final hash: {hash:016x}");
        }
    } else {
        eprintln!("FAIL: Non-determinism detected!");
        for (i, hash) in hashes.iter().enumerate() {
            eprintln!("  Run {i}: {hash:016x}");
        }
        std::process::exit(1);
    }
}

/// Replay a recorded game
fn cmd_replay(file: &Path, verify: bool) {
    if verify {
        tracing::info!("Verifying replay: {}", file.display());
    } else {
        tracing::info!("Playing replay: {}", file.display());
    }

    let replay = match Replay::load(file) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Failed to load replay: {e}");
            std::process::exit(1);
        }
    };

    eprintln!("Loaded replay:");
    eprintln!("  Difficulty: {}", replay.difficulty);
    eprintln!("  Seed: {}", replay.seed);
    eprintln!("  Commands: {}", replay.command_count());
    eprintln!("  Duration: {} steps", replay.duration());

    let mut player = match ReplayPlayer::new(replay) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to create replay player: {e}");
            std::process::exit(1);
        }
    };

    if verify {
        eprintln!("Verifying replay...");
        match player.verify() {
            Ok(hash) => {
                eprintln!("PASS: Replay verification successful");
                eprintln!("  Final hash: {hash:016x}");
            }
            Err(e) => {
                eprintln!("FAIL: {e}");
                std::process::exit(1);
            }
        }
    } else {
        while player.advance() {}
        let game = player.game();
        eprintln!("Playback complete:");
        eprintln!("  Status: {:?}", game.status());
        eprintln!("  Ticks: {}", game.tick_count());
        eprintln!("  Game time: {} ms", game.game_time());
        eprintln!("  State hash: {:016x}", game.state_hash());
    }
}

/// Check a tunables file
fn cmd_validate_config(path: &Path) {
    match GameConfig::load(path) {
        Ok((_, warnings)) if warnings.is_empty() => {
            eprintln!("OK: {} is valid", path.display());
        }
        Ok((_, warnings)) => {
            eprintln!("{} has {} corrected value(s):", path.display(), warnings.len());
            for w in &warnings {
                eprintln!("  {}: {} -> {}", w.field, w.found, w.used);
            }
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("FAIL: {e}");
            std::process::exit(1);
        }
    }
}

/// Measure simulation throughput
fn cmd_benchmark(steps: u64, difficulty: Difficulty, seed: u64) {
    tracing::info!("Running benchmark: {} steps on {}", steps, difficulty);

    let setup = GameSetup::new(difficulty, seed).with_max_steps(steps);
    let start = Instant::now();
    let result = match run_game(&setup) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Benchmark failed: {e}");
            std::process::exit(1);
        }
    };
    let elapsed = start.elapsed();

    let per_second = result.steps as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
    eprintln!("Benchmark Results:");
    eprintln!("  Steps: {} ({:?})", result.steps, result.outcome);
    eprintln!("  Time: {:.2}ms", elapsed.as_secs_f64() * 1000.0);
    eprintln!("  Steps/sec: {per_second:.0}");
    eprintln!("  Realtime factor: {:.1}x", per_second / 60.0);
    eprintln!("  Final hash: {:016x}", result.final_state_hash);
}
