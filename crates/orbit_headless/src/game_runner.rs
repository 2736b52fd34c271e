//! Game execution for headless runs.
//!
//! A [`Session`] steps one game on a manual clock, applies player
//! commands (from a controller or the [`Autopilot`]) and records every
//! one of them into a [`Replay`]. [`run_game`] plays a whole game that
//! way and reports what happened.
//!
//! All loops are bounded: a game that neither side wins stops after
//! `max_steps` and is reported as a timeout.

use std::time::Instant;

use orbit_core::config::GameConfig;
use orbit_core::difficulty::Difficulty;
use orbit_core::engine::Engine;
use orbit_core::error::Result as CoreResult;
use orbit_core::events::{GameEvent, TickEvents};
use orbit_core::game::{Game, GameStatus, PlayerCommand};
use orbit_core::generation::WorldLayout;
use orbit_core::ids::OperatorId;
use orbit_core::persistence::Profile;
use orbit_core::progression::PlayerData;
use orbit_core::replay::Replay;
use orbit_core::time::ManualClock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::autopilot::Autopilot;
use crate::error::Result;

/// Ten minutes of game time at 60 ticks per second.
pub const DEFAULT_MAX_STEPS: u64 = 36_000;

/// Log every N steps so long games show progress.
const PROGRESS_LOG_INTERVAL: u64 = 6_000;

/// One game being stepped and recorded.
#[derive(Debug)]
pub struct Session {
    engine: Engine,
    clock: ManualClock,
    replay: Replay,
    autopilot: Option<Autopilot>,
}

impl Session {
    /// Start recording `game`. `layout` must be the hand-built layout the
    /// game was created from, if any, so that the replay can rebuild it.
    #[must_use]
    pub fn new(game: Game, layout: Option<WorldLayout>, autopilot: Option<Autopilot>) -> Self {
        let replay = Replay::for_game(&game, layout);
        Self {
            engine: Engine::new(game),
            clock: ManualClock::default(),
            replay,
            autopilot,
        }
    }

    /// Apply a player command before the next step and record it.
    pub fn apply(&mut self, command: PlayerCommand) -> CoreResult<()> {
        let step = self.engine.steps();
        self.replay
            .record_command(step, OperatorId::PLAYER, command);
        self.engine
            .game_mut()
            .apply_command(OperatorId::PLAYER, command)
    }

    /// Let the autopilot act, then run one tick interval.
    pub fn step(&mut self) -> TickEvents {
        if let Some(pilot) = self.autopilot {
            let step = self.engine.steps();
            for command in pilot.commands(self.engine.game(), step) {
                if let Err(e) = self.apply(command) {
                    debug!(step, error = %e, "Autopilot command rejected");
                }
            }
        }
        self.engine.step(&mut self.clock)
    }

    /// Steps taken.
    #[must_use]
    pub const fn steps(&self) -> u64 {
        self.engine.steps()
    }

    /// The game.
    #[must_use]
    pub const fn game(&self) -> &Game {
        self.engine.game()
    }

    /// The game, mutably.
    pub fn game_mut(&mut self) -> &mut Game {
        self.engine.game_mut()
    }

    /// Whether the autopilot is playing.
    #[must_use]
    pub const fn has_autopilot(&self) -> bool {
        self.autopilot.is_some()
    }

    /// Stop recording. Returns the game and its finalized replay.
    #[must_use]
    pub fn finish(self) -> (Game, Replay) {
        let mut replay = self.replay;
        replay.finalize(self.engine.steps(), self.engine.game().state_hash());
        (self.engine.into_game(), replay)
    }
}

/// Everything needed to play one game.
#[derive(Debug, Clone)]
pub struct GameSetup {
    /// Simulation tunables.
    pub config: GameConfig,
    /// Difficulty.
    pub difficulty: Difficulty,
    /// World seed.
    pub seed: u64,
    /// Hand-built world instead of a generated one.
    pub layout: Option<WorldLayout>,
    /// Player progression going in.
    pub player: PlayerData,
    /// Step limit.
    pub max_steps: u64,
    /// Whether the autopilot plays the player.
    pub autopilot: bool,
}

impl GameSetup {
    /// Generated autopilot game with default config and a fresh player.
    #[must_use]
    pub fn new(difficulty: Difficulty, seed: u64) -> Self {
        Self {
            config: GameConfig::default(),
            difficulty,
            seed,
            layout: None,
            player: PlayerData::new(),
            max_steps: DEFAULT_MAX_STEPS,
            autopilot: true,
        }
    }

    /// Set the step limit.
    #[must_use]
    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Use a hand-built world.
    #[must_use]
    pub fn with_layout(mut self, layout: WorldLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Start from existing progression.
    #[must_use]
    pub fn with_player(mut self, player: PlayerData) -> Self {
        self.player = player;
        self
    }

    /// Build the game this setup describes.
    pub fn build(&self) -> CoreResult<Game> {
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
}

/// How a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOutcome {
    /// The player took every bot planet.
    Won,
    /// The player lost everything.
    Lost,
    /// Nobody won within the step limit.
    Timeout,
}

/// Result of running a game.
#[derive(Debug)]
pub struct GameResult {
    /// How it ended.
    pub outcome: GameOutcome,
    /// Engine steps run.
    pub steps: u64,
    /// Simulation ticks run.
    pub ticks: u64,
    /// Game time at the end.
    pub game_time_ms: u64,
    /// Final state hash.
    pub final_state_hash: u64,
    /// Planets the player held at the end.
    pub player_planets: usize,
    /// Planets the player captured.
    pub player_captures: u64,
    /// Player planets taken by bots.
    pub planets_lost: u64,
    /// Ships destroyed in flight, both sides.
    pub ships_destroyed: u64,
    /// Coins earned during the game.
    pub coins_earned: u64,
    /// Recording of the game.
    pub replay: Replay,
}

/// Run a complete game.
pub fn run_game(setup: &GameSetup) -> Result<GameResult> {
    let started = Instant::now();
    info!(
        difficulty = %setup.difficulty,
        seed = setup.seed,
        max_steps = setup.max_steps,
        autopilot = setup.autopilot,
        "Starting game"
    );

    let game = setup.build()?;
    let coins_before = game.profile().player().coins();
    let autopilot = setup.autopilot.then(|| Autopilot::new(setup.difficulty));
    let mut session = Session::new(game, setup.layout.clone(), autopilot);

    let mut player_captures = 0;
    let mut planets_lost = 0;
    let mut ships_destroyed = 0;

    while session.steps() < setup.max_steps && !session.game().is_game_over() {
        for event in session.step().events {
            match event {
                GameEvent::PlanetCaptured { by, previous, .. } => {
                    if by.is_player() {
                        player_captures += 1;
                    } else if previous == Some(OperatorId::PLAYER) {
                        planets_lost += 1;
                    }
                }
                GameEvent::ShipDestroyed { .. } => ships_destroyed += 1,
                _ => {}
            }
        }
        if session.steps() % PROGRESS_LOG_INTERVAL == 0 {
            debug!(
                seed = setup.seed,
                step = session.steps(),
                player_planets = session.game().world().planets_owned_by(OperatorId::PLAYER).len(),
                "Game progress"
            );
        }
    }

    let (game, replay) = session.finish();
    let outcome = match game.status() {
        GameStatus::Won => GameOutcome::Won,
        GameStatus::Lost => GameOutcome::Lost,
        GameStatus::Running => GameOutcome::Timeout,
    };
    let result = GameResult {
        outcome,
        steps: replay.final_step,
        ticks: game.tick_count(),
        game_time_ms: game.game_time(),
        final_state_hash: replay.final_hash,
        player_planets: game.world().planets_owned_by(OperatorId::PLAYER).len(),
        player_captures,
        planets_lost,
        ships_destroyed,
        coins_earned: game.profile().player().coins().saturating_sub(coins_before),
        replay,
    };

    info!(
        seed = setup.seed,
        outcome = ?result.outcome,
        steps = result.steps,
        game_time_ms = result.game_time_ms,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Game finished"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbit_core::ids::PlanetId;
    use orbit_core::replay::ReplayPlayer;
    use orbit_test_utils::fixtures::{duel_layout, uncontested_layout};

    #[test]
    fn test_uncontested_game_is_won_immediately() {
        let setup = GameSetup::new(Difficulty::Easy, 1).with_layout(uncontested_layout());
        let result = run_game(&setup).unwrap();
        assert_eq!(result.outcome, GameOutcome::Won);
        assert_eq!(result.steps, 1);
        assert!(result.coins_earned > 0);
    }

    #[test]
    fn test_step_limit_reports_timeout() {
        let setup = GameSetup::new(Difficulty::Extreme, 3).with_max_steps(120);
        let result = run_game(&setup).unwrap();
        assert_eq!(result.outcome, GameOutcome::Timeout);
        assert_eq!(result.steps, 120);
        assert_eq!(result.ticks, 120);
    }

    #[test]
    fn test_autopilot_attacks() {
        let setup = GameSetup::new(Difficulty::Easy, 4)
            .with_layout(duel_layout())
            .with_max_steps(60 * 20);
        let result = run_game(&setup).unwrap();
        let first = result.replay.commands.first().unwrap();
        assert_eq!(first.step, 0);
        assert!(matches!(
            first.command,
            PlayerCommand::ToggleTarget {
                from: PlanetId(0),
                ..
            }
        ));
    }

    #[test]
    fn test_recorded_game_replays() {
        let setup = GameSetup::new(Difficulty::Medium, 8).with_max_steps(900);
        let result = run_game(&setup).unwrap();
        let mut player = ReplayPlayer::new(result.replay).unwrap();
        assert_eq!(player.verify().unwrap(), result.final_state_hash);
    }

    #[test]
    fn test_session_records_rejected_commands() {
        let game = GameSetup::new(Difficulty::Easy, 2).with_layout(duel_layout()).build().unwrap();
        let mut session = Session::new(game, Some(duel_layout()), None);
        session.step();
        assert!(session
            .apply(PlayerCommand::ToggleTarget {
                from: PlanetId(1),
                to: PlanetId(0),
            })
            .is_err());
        let (_, replay) = session.finish();
        assert_eq!(replay.commands_at_step(1).len(), 1);
    }
}
