//! Test fixtures and helpers.
//!
//! Hand-built worlds for consistent testing, and [`GameRunner`], which
//! steps a session on a manual clock exactly like the headless runner.

use orbit_core::config::GameConfig;
use orbit_core::difficulty::Difficulty;
use orbit_core::engine::Engine;
use orbit_core::error::Result;
use orbit_core::events::{GameEvent, TickEvents};
use orbit_core::game::{Game, PlayerCommand};
use orbit_core::generation::{PlanetSeed, WorldLayout};
use orbit_core::ids::OperatorId;
use orbit_core::math::Vec2;
use orbit_core::persistence::Profile;
use orbit_core::planet::{Orbit, PlanetType};
use orbit_core::time::ManualClock;
use serde::de::DeserializeOwned;

/// A stationary, full-health planet.
#[must_use]
pub fn planet(x: f64, y: f64, owner: Option<OperatorId>) -> PlanetSeed {
    typed_planet(x, y, owner, PlanetType::Normal)
}

/// A stationary, full-health planet of `planet_type`.
#[must_use]
pub fn typed_planet(x: f64, y: f64, owner: Option<OperatorId>, planet_type: PlanetType) -> PlanetSeed {
    PlanetSeed {
        orbit: Orbit::stationary(Vec2::new(x, y)),
        planet_type,
        owner,
        health_fraction: 1.0,
    }
}

/// Player on the left, one bot on the right, a neutral in between.
#[must_use]
pub fn duel_layout() -> WorldLayout {
    WorldLayout {
        width: 1200.0,
        height: 850.0,
        bot_count: 1,
        planets: vec![
            planet(200.0, 425.0, Some(OperatorId::PLAYER)),
            planet(1000.0, 425.0, Some(OperatorId(1))),
            planet(600.0, 425.0, None),
        ],
    }
}

/// No bots at all: the player has already won when the first tick runs.
#[must_use]
pub fn uncontested_layout() -> WorldLayout {
    WorldLayout {
        width: 1200.0,
        height: 850.0,
        bot_count: 0,
        planets: vec![
            planet(300.0, 425.0, Some(OperatorId::PLAYER)),
            planet(900.0, 425.0, None),
        ],
    }
}

/// Player against two bots with a ring of neutrals.
#[must_use]
pub fn skirmish_layout() -> WorldLayout {
    let mut planets = vec![
        planet(150.0, 425.0, Some(OperatorId::PLAYER)),
        planet(1050.0, 200.0, Some(OperatorId(1))),
        planet(1050.0, 650.0, Some(OperatorId(2))),
    ];
    for (i, planet_type) in [PlanetType::Attack, PlanetType::Defence, PlanetType::Speed]
        .into_iter()
        .enumerate()
    {
        planets.push(typed_planet(450.0 + 150.0 * i as f64, 425.0, None, planet_type));
    }
    WorldLayout {
        width: 1200.0,
        height: 850.0,
        bot_count: 2,
        planets,
    }
}

/// Parse any fixture (layouts, configs) from RON text.
pub fn from_ron<T: DeserializeOwned>(src: &str) -> std::result::Result<T, ron::error::SpannedError> {
    ron::from_str(src)
}

/// A session on `layout` with a throwaway profile.
///
/// # Panics
///
/// Panics if the layout is invalid.
#[must_use]
pub fn fixture_game(layout: WorldLayout, seed: u64) -> Game {
    let config = GameConfig::default();
    let profile = Profile::ephemeral(&config);
    Game::from_layout(config, Difficulty::Easy, layout, seed, profile)
        .expect("fixture layout is valid")
}

/// A generated session with a throwaway profile.
///
/// # Panics
///
/// Panics if generation fails.
#[must_use]
pub fn generated_game(difficulty: Difficulty, seed: u64) -> Game {
    let config = GameConfig::default();
    let profile = Profile::ephemeral(&config);
    Game::new(config, difficulty, seed, profile).expect("generated world is valid")
}

/// Steps a session one tick interval at a time on a manual clock.
#[derive(Debug)]
pub struct GameRunner {
    engine: Engine,
    clock: ManualClock,
}

impl GameRunner {
    /// Wrap a session; the first step ticks at time zero.
    #[must_use]
    pub fn new(game: Game) -> Self {
        Self {
            engine: Engine::new(game),
            clock: ManualClock::default(),
        }
    }

    /// Run one tick.
    pub fn step(&mut self) -> TickEvents {
        self.engine.step(&mut self.clock)
    }

    /// Run `steps` ticks and collect every event.
    pub fn run(&mut self, steps: u64) -> Vec<GameEvent> {
        let mut events = Vec::new();
        for _ in 0..steps {
            events.extend(self.step().events);
        }
        events
    }

    /// Run until the game ends or `max_steps` have passed.
    pub fn run_until_over(&mut self, max_steps: u64) -> Vec<GameEvent> {
        let mut events = Vec::new();
        for _ in 0..max_steps {
            if self.game().is_game_over() {
                break;
            }
            events.extend(self.step().events);
        }
        events
    }

    /// Issue a player command.
    pub fn command(&mut self, command: PlayerCommand) -> Result<()> {
        self.engine
            .game_mut()
            .apply_command(OperatorId::PLAYER, command)
    }

    /// Steps taken.
    #[must_use]
    pub const fn steps(&self) -> u64 {
        self.engine.steps()
    }

    /// The session.
    #[must_use]
    pub const fn game(&self) -> &Game {
        self.engine.game()
    }

    /// The session, mutably.
    pub fn game_mut(&mut self) -> &mut Game {
        self.engine.game_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_layouts_are_valid() {
        duel_layout().validate().unwrap();
        uncontested_layout().validate().unwrap();
        skirmish_layout().validate().unwrap();
    }

    #[test]
    fn test_layout_from_ron() {
        let src = ron::to_string(&duel_layout()).unwrap();
        let layout: WorldLayout = from_ron(&src).unwrap();
        assert_eq!(layout, duel_layout());
    }

    #[test]
    fn test_runner_steps() {
        let mut runner = GameRunner::new(fixture_game(duel_layout(), 1));
        runner.run(10);
        assert_eq!(runner.steps(), 10);
        assert_eq!(runner.game().tick_count(), 10);
    }
}
