//! Procedural world layouts.
//!
//! A [`WorldLayout`] is plain data: planet seeds with orbits, types,
//! owners and starting health. [`WorldGenerator`] produces one from a
//! difficulty and the session RNG; tests and fixtures can also build
//! layouts by hand. Either way the layout is validated before a session
//! starts, so a malformed world never starts half-way.

use std::f64::consts::TAU;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::difficulty::Difficulty;
use crate::error::{GameError, Result};
use crate::ids::OperatorId;
use crate::math::Vec2;
use crate::planet::{Orbit, PlanetType};

/// Everything needed to create one planet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanetSeed {
    /// Orbit.
    pub orbit: Orbit,
    /// Type.
    pub planet_type: PlanetType,
    /// Starting owner.
    pub owner: Option<OperatorId>,
    /// Starting health as a fraction of max.
    pub health_fraction: f64,
}

/// A world ready to become a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldLayout {
    /// Map width.
    pub width: f64,
    /// Map height.
    pub height: f64,
    /// Number of bot operators.
    pub bot_count: u32,
    /// Planets in id order.
    pub planets: Vec<PlanetSeed>,
}

impl WorldLayout {
    /// Check that the layout can start a session.
    ///
    /// Requires at least two planets, exactly one player planet, and at
    /// least one planet for every bot.
    pub fn validate(&self) -> Result<()> {
        if self.planets.len() < 2 {
            return Err(GameError::InvalidWorld(format!(
                "need at least 2 planets, got {}",
                self.planets.len()
            )));
        }
        let owned_by = |op: OperatorId| self.planets.iter().filter(|p| p.owner == Some(op)).count();
        let player = owned_by(OperatorId::PLAYER);
        if player != 1 {
            return Err(GameError::InvalidWorld(format!(
                "need exactly 1 player planet, got {player}"
            )));
        }
        for bot in 1..=self.bot_count {
            if owned_by(OperatorId(bot)) == 0 {
                return Err(GameError::InvalidWorld(format!("bot {bot} owns no planet")));
            }
        }
        if let Some(seed) = self
            .planets
            .iter()
            .find(|p| p.owner.is_some_and(|o| o.0 > self.bot_count))
        {
            return Err(GameError::InvalidWorld(format!(
                "planet owned by unknown operator {:?}",
                seed.owner
            )));
        }
        if !(self.width.is_finite() && self.height.is_finite()) || self.width <= 0.0 || self.height <= 0.0 {
            return Err(GameError::InvalidWorld("map size must be positive".to_string()));
        }
        Ok(())
    }
}

/// Generates layouts from a difficulty and config.
#[derive(Debug, Clone)]
pub struct WorldGenerator<'a> {
    config: &'a GameConfig,
    difficulty: Difficulty,
}

impl<'a> WorldGenerator<'a> {
    /// Generator for `difficulty`.
    #[must_use]
    pub const fn new(config: &'a GameConfig, difficulty: Difficulty) -> Self {
        Self { config, difficulty }
    }

    /// Roll a layout.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> WorldLayout {
        let profile = self.difficulty.profile();
        let count = profile.planet_count.max(profile.bot_count + 2) as usize;
        let center = Vec2::new(self.config.width / 2.0, self.config.height / 2.0);
        let min_radius = self.config.min_orbit_radius;
        let max_radius = self.config.max_orbit_radius().max(min_radius + 1.0);
        let slot_angle = TAU / count as f64;

        // Owners are spread around the ring: slot k sits at planet k·n/(bots+1).
        let operators = profile.bot_count as usize + 1;
        let owner_of = |index: usize| {
            (0..operators)
                .find(|k| k * count / operators == index)
                .map(|k| OperatorId(k as u32))
        };

        let planets = (0..count)
            .map(|i| {
                let semi_major = rng.gen_range(min_radius..=max_radius);
                let semi_minor = semi_major * rng.gen_range(0.6..=1.0);
                let jitter = rng.gen_range(-0.25..=0.25) * slot_angle;
                let speed =
                    rng.gen_range(self.config.min_orbital_speed..=self.config.max_orbital_speed);
                let direction = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
                let orbit = Orbit {
                    center,
                    semi_major,
                    semi_minor,
                    angle: (slot_angle * i as f64 + jitter).rem_euclid(TAU),
                    angular_speed: speed * direction,
                    vertical: rng.gen_bool(0.5),
                    z_index: rng.gen_range(-1.0..=1.0),
                };
                let owner = owner_of(i);
                PlanetSeed {
                    orbit,
                    planet_type: roll_planet_type(rng),
                    owner,
                    health_fraction: if owner.is_some() {
                        1.0
                    } else {
                        profile.neutral_garrison
                    },
                }
            })
            .collect();

        WorldLayout {
            width: self.config.width,
            height: self.config.height,
            bot_count: profile.bot_count,
            planets,
        }
    }
}

/// Normal 40%, the others 20% each.
fn roll_planet_type<R: Rng + ?Sized>(rng: &mut R) -> PlanetType {
    match rng.gen_range(0..10) {
        0..=3 => PlanetType::Normal,
        4 | 5 => PlanetType::Attack,
        6 | 7 => PlanetType::Defence,
        _ => PlanetType::Speed,
    }
}
