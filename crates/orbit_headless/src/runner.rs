//! Headless game runner implementation.
//!
//! Reads [`Command`]s as JSON lines, drives one recorded [`Session`] and
//! writes [`Response`]s back as JSON lines. Time only moves on `tick`,
//! so a controller fully decides the pace of the game.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use orbit_core::config::GameConfig;
use orbit_core::difficulty::Difficulty;
use orbit_core::game::{Game, PlayerCommand};
use orbit_core::ids::PlanetId;
use orbit_core::persistence::Profile;
use orbit_core::replay::Replay;
use tracing::{debug, info, warn};

use crate::autopilot::Autopilot;
use crate::error::Result;
use crate::game_runner::Session;
use crate::protocol::{ChallengeOutput, Command, Response};
use crate::store::RonFileStore;

/// Headless runner configuration.
#[derive(Debug, Clone, Default)]
pub struct HeadlessConfig {
    /// Output state after every tick batch (vs only on query).
    pub auto_state_output: bool,
    /// Let the autopilot play the player's side.
    pub autopilot: bool,
    /// Simulation tunables.
    pub game: GameConfig,
    /// Difficulty of the first session.
    pub difficulty: Difficulty,
    /// Seed of the first session.
    pub seed: u64,
    /// Keep progression in RON files here instead of in memory.
    pub profile_dir: Option<PathBuf>,
    /// Save the replay of the last session here on exit.
    pub record_path: Option<PathBuf>,
}

/// Headless runner for scripted or AI-controlled play.
#[derive(Debug)]
pub struct HeadlessRunner {
    config: HeadlessConfig,
    session: Session,
    game_over_sent: bool,
}

impl HeadlessRunner {
    /// Create a runner and its first session.
    pub fn new(config: HeadlessConfig) -> Result<Self> {
        let profile = match &config.profile_dir {
            Some(dir) => Profile::load(&config.game, Box::new(RonFileStore::open(dir)?)),
            None => Profile::ephemeral(&config.game),
        };
        let session = Self::start(&config, config.difficulty, config.seed, profile)?;
        Ok(Self {
            config,
            session,
            game_over_sent: false,
        })
    }

    fn start(
        config: &HeadlessConfig,
        difficulty: Difficulty,
        seed: u64,
        profile: Profile,
    ) -> Result<Session> {
        let game = Game::new(config.game.clone(), difficulty, seed, profile)?;
        let autopilot = config.autopilot.then(|| Autopilot::new(difficulty));
        info!(%difficulty, seed, autopilot = autopilot.is_some(), "Session started");
        Ok(Session::new(game, None, autopilot))
    }

    /// The current game.
    #[must_use]
    pub const fn game(&self) -> &Game {
        self.session.game()
    }

    /// Serve `input` until `quit` or end of input, then finish.
    ///
    /// Returns the replay of the last session, which is also saved to
    /// `record_path` when one is configured.
    pub fn run<R: BufRead, W: Write>(mut self, input: R, mut output: W) -> Result<Replay> {
        write_response(&mut output, &Response::ready(self.game()))?;

        let mut quit = false;
        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let responses = match Command::from_json(line) {
                Ok(cmd) => {
                    debug!(cmd = cmd.name(), "Command received");
                    quit = cmd == Command::Quit;
                    self.handle(cmd)
                }
                Err(e) => vec![Response::error(format!("Parse error: {e}"), None)],
            };
            for response in &responses {
                write_response(&mut output, response)?;
            }
            if quit {
                break;
            }
        }

        if !quit {
            write_response(&mut output, &Response::Bye)?;
        }
        self.finish()
    }

    /// Process one command.
    pub fn handle(&mut self, cmd: Command) -> Vec<Response> {
        let name = cmd.name();
        let mut responses = match cmd {
            Command::Tick { count } => self.tick(count),
            Command::Query => vec![Response::state(self.game())],
            Command::Target { from, to } => self.apply(
                name,
                PlayerCommand::ToggleTarget {
                    from: PlanetId(from),
                    to: PlanetId(to),
                },
            ),
            Command::Ability { ability } => {
                self.apply(name, PlayerCommand::ActivateAbility { ability })
            }
            Command::Pause => self.apply(name, PlayerCommand::Pause),
            Command::Resume => self.apply(name, PlayerCommand::Resume),
            Command::SlowMode { enabled } => {
                self.apply(name, PlayerCommand::SetSlowMode { enabled })
            }
            Command::NewGame { difficulty, seed } => self.new_game(difficulty, seed),
            Command::Hash => vec![Response::StateHash {
                tick: self.game().tick_count(),
                hash: self.game().state_hash(),
            }],
            Command::Challenges => vec![Response::Challenges {
                challenges: self
                    .game()
                    .profile()
                    .challenges()
                    .all_challenges()
                    .into_iter()
                    .map(ChallengeOutput::from)
                    .collect(),
            }],
            Command::Quit => vec![Response::Bye],
        };
        responses.extend(self.drain_warnings());
        responses
    }

    fn tick(&mut self, count: u32) -> Vec<Response> {
        let mut responses = vec![Response::ack("tick")];
        for _ in 0..count {
            if self.game().is_game_over() {
                break;
            }
            self.session.step();
        }
        if self.config.auto_state_output {
            responses.push(Response::state(self.game()));
        }
        if !self.game_over_sent {
            if let Some(over) = Response::game_over(self.game()) {
                info!(
                    status = ?self.game().status(),
                    ticks = self.game().tick_count(),
                    "Game over"
                );
                self.game_over_sent = true;
                responses.push(over);
            }
        }
        responses
    }

    fn apply(&mut self, name: &str, command: PlayerCommand) -> Vec<Response> {
        match self.session.apply(command) {
            Ok(()) => vec![Response::ack(name)],
            Err(e) => {
                debug!(cmd = name, error = %e, "Command rejected");
                vec![Response::error(e.to_string(), Some(name))]
            }
        }
    }

    fn new_game(&mut self, difficulty: Difficulty, seed: u64) -> Vec<Response> {
        let profile = std::mem::replace(
            self.session.game_mut().profile_mut(),
            Profile::ephemeral(&self.config.game),
        );
        match Self::start(&self.config, difficulty, seed, profile) {
            Ok(session) => {
                self.session = session;
                self.game_over_sent = false;
                vec![Response::ready(self.game())]
            }
            Err(e) => vec![Response::error(e.to_string(), Some("new_game"))],
        }
    }

    fn drain_warnings(&mut self) -> Vec<Response> {
        self.session
            .game_mut()
            .profile_mut()
            .take_warnings()
            .into_iter()
            .map(|w| {
                warn!(message = %w.message, "Progress not saved");
                Response::Warning { message: w.message }
            })
            .collect()
    }

    /// End the session, saving its replay if configured.
    pub fn finish(self) -> Result<Replay> {
        let (_, replay) = self.session.finish();
        if let Some(path) = &self.config.record_path {
            replay.save(path)?;
            info!(path = %path.display(), commands = replay.command_count(), "Replay saved");
        }
        Ok(replay)
    }
}

fn write_response<W: Write>(output: &mut W, response: &Response) -> Result<()> {
    output.write_all(response.to_json_line().as_bytes())?;
    output.flush()?;
    Ok(())
}
