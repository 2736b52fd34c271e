//! Replay system for recording and playing back games.
//!
//! A session is fully determined by its config, difficulty, seed, the
//! player's progression at the start and the stream of commands. Replays
//! store exactly that, keyed by scheduler step, and are played back through
//! [`Engine::step`] on a [`ManualClock`] so every tick sees the same game
//! time it saw while recording.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::difficulty::Difficulty;
use crate::engine::Engine;
use crate::error::{GameError, Result};
use crate::game::{Game, PlayerCommand};
use crate::generation::WorldLayout;
use crate::ids::OperatorId;
use crate::persistence::Profile;
use crate::progression::PlayerData;
use crate::time::ManualClock;

/// A single command record for replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayCommand {
    /// Scheduler step before which the command was applied.
    pub step: u64,
    /// Operator that issued the command.
    pub operator: OperatorId,
    /// The command that was issued.
    pub command: PlayerCommand,
}

impl ReplayCommand {
    /// Create a new replay command record.
    #[must_use]
    pub const fn new(step: u64, operator: OperatorId, command: PlayerCommand) -> Self {
        Self {
            step,
            operator,
            command,
        }
    }
}

/// Replay file format version for compatibility.
pub const REPLAY_VERSION: u32 = 1;

/// Complete replay data structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Replay {
    /// Replay format version.
    pub version: u32,
    /// Session seed.
    pub seed: u64,
    /// Session difficulty.
    pub difficulty: Difficulty,
    /// Config the session ran with.
    pub config: GameConfig,
    /// Hand-built layout, when the session did not generate its world.
    pub layout: Option<WorldLayout>,
    /// Player progression at session start.
    pub player: PlayerData,
    /// Stream of commands in step order.
    pub commands: Vec<ReplayCommand>,
    /// Steps run when recording stopped.
    pub final_step: u64,
    /// Final state hash for verification.
    pub final_hash: u64,
}

impl Replay {
    /// Start recording a session that is about to be created from these
    /// inputs.
    #[must_use]
    pub fn new(
        config: GameConfig,
        difficulty: Difficulty,
        seed: u64,
        layout: Option<WorldLayout>,
        player: PlayerData,
    ) -> Self {
        Self {
            version: REPLAY_VERSION,
            seed,
            difficulty,
            config,
            layout,
            player,
            commands: Vec::new(),
            final_step: 0,
            final_hash: 0,
        }
    }

    /// Start recording `game` before its first tick.
    #[must_use]
    pub fn for_game(game: &Game, layout: Option<WorldLayout>) -> Self {
        Self::new(
            game.config().clone(),
            game.difficulty(),
            game.seed(),
            layout,
            game.profile().player().clone(),
        )
    }

    /// Record a command for replay.
    pub fn record_command(&mut self, step: u64, operator: OperatorId, command: PlayerCommand) {
        self.commands
            .push(ReplayCommand::new(step, operator, command));
    }

    /// Finalize the replay with end-game state.
    pub fn finalize(&mut self, final_step: u64, final_hash: u64) {
        self.final_step = final_step;
        self.final_hash = final_hash;
    }

    /// Save the replay to a file.
    ///
    /// # Errors
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = bincode::serialize(self)
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize replay: {e}")))?;
        std::fs::write(path.as_ref(), bytes)
            .map_err(|e| GameError::InvalidState(format!("Failed to write replay file: {e}")))?;
        Ok(())
    }

    /// Load a replay from a file.
    ///
    /// # Errors
    /// Returns an error if file reading or deserialization fails, or the
    /// file was written by another format version.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| GameError::InvalidState(format!("Failed to read replay file: {e}")))?;
        let replay: Self = bincode::deserialize(&bytes)
            .map_err(|e| GameError::InvalidState(format!("Failed to deserialize replay: {e}")))?;

        if replay.version != REPLAY_VERSION {
            return Err(GameError::InvalidState(format!(
                "Replay version mismatch: expected {REPLAY_VERSION}, got {}",
                replay.version
            )));
        }

        Ok(replay)
    }

    /// Recreate the session as it was before the first step.
    ///
    /// The profile is ephemeral: replaying never touches saved progress.
    pub fn restore_game(&self) -> Result<Game> {
        let mut profile = Profile::ephemeral(&self.config);
        *profile.player_mut() = self.player.clone();
        match &self.layout {
            Some(layout) => Game::from_layout(
                self.config.clone(),
                self.difficulty,
                layout.clone(),
                self.seed,
                profile,
            ),
            None => Game::new(self.config.clone(), self.difficulty, self.seed, profile),
        }
    }

    /// Get commands for a specific step.
    #[must_use]
    pub fn commands_at_step(&self, step: u64) -> Vec<&ReplayCommand> {
        self.commands
            .iter()
            .filter(|cmd| cmd.step == step)
            .collect()
    }

    /// Get the total duration of the replay in steps.
    #[must_use]
    pub const fn duration(&self) -> u64 {
        self.final_step
    }

    /// Get the total number of commands in the replay.
    #[must_use]
    pub fn command_count(&self) -> usize {
        self.commands.len()
    }
}

/// Replay playback controller.
#[derive(Debug)]
pub struct ReplayPlayer {
    replay: Replay,
    engine: Engine,
    clock: ManualClock,
    command_index: usize,
}

impl ReplayPlayer {
    /// Create a new replay player from a replay.
    ///
    /// # Errors
    /// Returns an error if the session cannot be recreated.
    pub fn new(replay: Replay) -> Result<Self> {
        let engine = Engine::new(replay.restore_game()?);
        Ok(Self {
            replay,
            engine,
            clock: ManualClock::default(),
            command_index: 0,
        })
    }

    /// Advance the replay by one step.
    ///
    /// Returns true if there are more steps to play.
    pub fn advance(&mut self) -> bool {
        let step = self.engine.steps();
        if step >= self.replay.final_step {
            return false;
        }

        while let Some(cmd) = self.replay.commands.get(self.command_index) {
            if cmd.step > step {
                break;
            }
            if let Err(e) = self
                .engine
                .game_mut()
                .apply_command(cmd.operator, cmd.command)
            {
                tracing::debug!(step, error = %e, "Replayed command rejected");
            }
            self.command_index += 1;
        }

        self.engine.step(&mut self.clock);
        self.engine.steps() < self.replay.final_step
    }

    /// Play to the end and compare against the recorded hash.
    ///
    /// # Errors
    /// Returns [`GameError::DesyncDetected`] if the final hash differs.
    pub fn verify(&mut self) -> Result<u64> {
        while self.advance() {}
        let actual = self.engine.game().state_hash();
        if actual != self.replay.final_hash {
            return Err(GameError::DesyncDetected {
                tick: self.engine.game().tick_count(),
                expected: self.replay.final_hash,
                actual,
            });
        }
        Ok(actual)
    }

    /// Get the current step.
    #[must_use]
    pub const fn current_step(&self) -> u64 {
        self.engine.steps()
    }

    /// Get a reference to the current session.
    #[must_use]
    pub const fn game(&self) -> &Game {
        self.engine.game()
    }

    /// Get the replay being played.
    #[must_use]
    pub const fn replay(&self) -> &Replay {
        &self.replay
    }
}
