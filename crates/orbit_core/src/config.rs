//! Session configuration.
//!
//! A flat set of tunables injected at startup. Values outside their safe
//! range are clamped at load time with a warning; configuration problems
//! are never fatal. Apart from [`DebugFlags`] the config is immutable for
//! the lifetime of a session.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::time::Millis;

/// Errors that can occur while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read file.
    #[error("Failed to read config '{path}': {source}")]
    IoError {
        /// Path to the file.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse RON.
    #[error("Failed to parse config '{path}': {source}")]
    ParseError {
        /// Path to the file.
        path: String,
        /// Underlying parse error.
        #[source]
        source: ron::error::SpannedError,
    },
}

/// A value that was out of range and got replaced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigWarning {
    /// Field that was clamped.
    pub field: String,
    /// Value found in the config.
    pub found: f64,
    /// Value used instead.
    pub used: f64,
}

/// Debug switches that stay mutable during a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugFlags {
    /// Player planets ignore enemy damage.
    pub player_planets_invincible: bool,
    /// Player ships ignore damage.
    pub player_ships_invincible: bool,
    /// Player abilities have no cooldown.
    pub remove_ability_cooldowns: bool,
    /// Multiplier applied to coin rewards.
    pub coins_multiplier: f64,
}

impl Default for DebugFlags {
    fn default() -> Self {
        Self {
            player_planets_invincible: false,
            player_ships_invincible: false,
            remove_ability_cooldowns: false,
            coins_multiplier: 1.0,
        }
    }
}

/// All simulation tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Normal tick rate.
    pub ticks_per_second: u32,
    /// Tick rate while slow mode is on.
    pub slow_ticks_per_second: u32,
    /// Map width.
    pub width: f64,
    /// Map height.
    pub height: f64,

    /// Nominal planet diameter before depth scaling.
    pub planet_size: f64,
    /// Base planet health before upgrades.
    pub max_planet_health: f64,
    /// Base production rate of a planet.
    pub ships_per_second: f64,
    /// Floor for the adjusted spawn interval.
    pub min_spawn_interval_ms: Millis,
    /// Health regenerated per second.
    pub planet_regen_rate: f64,

    /// Ship diameter.
    pub ship_size: f64,
    /// Base ship speed per tick.
    pub ship_speed: f64,
    /// Base ship health.
    pub ship_health: f64,
    /// Base ship damage on arrival.
    pub ship_damage: f64,
    /// Radius used when a ship heads for a bare point.
    pub point_arrival_radius: f64,
    /// Maximum number of trail points kept per ship.
    pub trail_max_points: usize,
    /// Maximum age of a trail point.
    pub trail_max_age_ms: Millis,
    /// Ships only chase raiders within this range.
    pub interception_range: f64,

    /// Distance at which a defender engages.
    pub engagement_distance: f64,
    /// Distance beyond which an engaged defender disengages.
    pub disengagement_distance: f64,
    /// Minimum time between shots.
    pub ship_fire_rate_ms: Millis,
    /// Projectile speed per tick.
    pub projectile_speed: f64,
    /// Distance a projectile travels before fizzling.
    pub projectile_max_range: f64,
    /// Damage dealt by one projectile.
    pub projectile_damage: f64,

    /// Explosion radius on ship death.
    pub explosion_radius: f64,
    /// Explosion lifetime.
    pub explosion_duration_ms: Millis,

    /// Smallest orbit radius.
    pub min_orbit_radius: f64,
    /// Largest orbit radius as a fraction of half the shorter map side.
    pub max_orbit_radius_factor: f64,
    /// Slowest orbital speed (radians per tick).
    pub min_orbital_speed: f64,
    /// Fastest orbital speed (radians per tick).
    pub max_orbital_speed: f64,

    /// Base cooldown added to every player ability.
    pub base_ability_cooldown_ms: Millis,
    /// Spawn-rate multiplier while Factory Hype is active.
    pub factory_hype_multiplier: f64,
    /// Stat multiplier while Improved Factories is active.
    pub improved_factories_multiplier: f64,
    /// Missile damage multiplier.
    pub missile_damage_multiplier: f64,
    /// Missile speed multiplier.
    pub missile_speed_multiplier: f64,
    /// Damage fraction a shielded bot planet still takes.
    pub bot_shield_factor: f64,
    /// Damage fraction a shielded ship still takes.
    pub ship_shield_factor: f64,

    /// Base coin reward for a victory.
    pub base_coin_reward: f64,
    /// Victories faster than this many seconds earn a time bonus.
    pub victory_time_bonus_secs: f64,
    /// Coins per planet left neutral at victory.
    pub uncaptured_planet_bonus: u64,

    /// Lifetime of a challenge completion notification.
    pub completion_notification_ms: Millis,
    /// Lifetime of a challenge progress notification.
    pub progress_notification_ms: Millis,

    /// Debug switches.
    pub debug: DebugFlags,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            ticks_per_second: 60,
            slow_ticks_per_second: 20,
            width: 1200.0,
            height: 850.0,
            planet_size: 35.0,
            max_planet_health: 10_000.0,
            ships_per_second: 0.5,
            min_spawn_interval_ms: 100,
            planet_regen_rate: 85.0,
            ship_size: 8.0,
            ship_speed: 3.5,
            ship_health: 1000.0,
            ship_damage: 500.0,
            point_arrival_radius: 10.0,
            trail_max_points: 15,
            trail_max_age_ms: 500,
            interception_range: 200.0,
            engagement_distance: 80.0,
            disengagement_distance: 120.0,
            ship_fire_rate_ms: 500,
            projectile_speed: 6.5,
            projectile_max_range: 225.0,
            projectile_damage: 250.0,
            explosion_radius: 20.0,
            explosion_duration_ms: 300,
            min_orbit_radius: 80.0,
            max_orbit_radius_factor: 0.9,
            min_orbital_speed: 0.005,
            max_orbital_speed: 0.02,
            base_ability_cooldown_ms: 45_000,
            factory_hype_multiplier: 3.0,
            improved_factories_multiplier: 2.0,
            missile_damage_multiplier: 2.0,
            missile_speed_multiplier: 2.0,
            bot_shield_factor: 0.5,
            ship_shield_factor: 0.5,
            base_coin_reward: 10.0,
            victory_time_bonus_secs: 300.0,
            uncaptured_planet_bonus: 2,
            completion_notification_ms: 5000,
            progress_notification_ms: 3000,
            debug: DebugFlags::default(),
        }
    }
}

impl GameConfig {
    /// Parse a RON config and clamp it.
    pub fn from_ron_str(source: &str, path: &str) -> Result<(Self, Vec<ConfigWarning>), ConfigError> {
        let mut config: Self = ron::from_str(source).map_err(|source| ConfigError::ParseError {
            path: path.to_string(),
            source,
        })?;
        let warnings = config.validate();
        Ok((config, warnings))
    }

    /// Load a RON config file and clamp it.
    pub fn load(path: impl AsRef<Path>) -> Result<(Self, Vec<ConfigWarning>), ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            path: display.clone(),
            source,
        })?;
        Self::from_ron_str(&source, &display)
    }

    /// Serialize to pretty RON, e.g. to write a template file.
    pub fn to_ron_string(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Clamp out-of-range values in place.
    ///
    /// Returns one warning per replaced field; each is also logged.
    pub fn validate(&mut self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut fix = |field: &str, found: f64, used: f64| {
            tracing::warn!(field, found, used, "Config value out of range, clamped");
            warnings.push(ConfigWarning {
                field: field.to_string(),
                found,
                used,
            });
        };

        if self.width < 800.0 || !self.width.is_finite() {
            fix("width", self.width, 800.0);
            self.width = 800.0;
        }
        if self.height < 600.0 || !self.height.is_finite() {
            fix("height", self.height, 600.0);
            self.height = 600.0;
        }
        if !(10..=120).contains(&self.ticks_per_second) {
            let used = self.ticks_per_second.clamp(10, 120);
            fix("ticks_per_second", self.ticks_per_second as f64, used as f64);
            self.ticks_per_second = used;
        }
        if self.slow_ticks_per_second == 0 || self.slow_ticks_per_second > self.ticks_per_second {
            let used = self.slow_ticks_per_second.clamp(1, self.ticks_per_second);
            fix(
                "slow_ticks_per_second",
                self.slow_ticks_per_second as f64,
                used as f64,
            );
            self.slow_ticks_per_second = used;
        }
        if self.engagement_distance <= 0.0 || !self.engagement_distance.is_finite() {
            fix("engagement_distance", self.engagement_distance, 80.0);
            self.engagement_distance = 80.0;
        }
        if self.disengagement_distance <= self.engagement_distance
            || !self.disengagement_distance.is_finite()
        {
            let used = self.engagement_distance + 40.0;
            fix("disengagement_distance", self.disengagement_distance, used);
            self.disengagement_distance = used;
        }
        if self.max_planet_health <= 0.0 || !self.max_planet_health.is_finite() {
            fix("max_planet_health", self.max_planet_health, 10_000.0);
            self.max_planet_health = 10_000.0;
        }
        if self.ship_speed <= 0.0 || !self.ship_speed.is_finite() {
            fix("ship_speed", self.ship_speed, 3.5);
            self.ship_speed = 3.5;
        }
        if self.ships_per_second <= 0.0 || !self.ships_per_second.is_finite() {
            fix("ships_per_second", self.ships_per_second, 0.5);
            self.ships_per_second = 0.5;
        }
        if self.base_ability_cooldown_ms < 1000 {
            fix(
                "base_ability_cooldown_ms",
                self.base_ability_cooldown_ms as f64,
                1000.0,
            );
            self.base_ability_cooldown_ms = 1000;
        }
        let orbit_valid = self.min_orbit_radius > 0.0
            && self.max_orbit_radius_factor > 0.0
            && self.max_orbit_radius_factor <= 1.0
            && self.min_orbit_radius < self.max_orbit_radius();
        if !orbit_valid {
            fix("min_orbit_radius", self.min_orbit_radius, 80.0);
            fix("max_orbit_radius_factor", self.max_orbit_radius_factor, 0.9);
            self.min_orbit_radius = 80.0;
            self.max_orbit_radius_factor = 0.9;
        }
        if self.min_orbital_speed > self.max_orbital_speed {
            fix("min_orbital_speed", self.min_orbital_speed, self.max_orbital_speed);
            self.min_orbital_speed = self.max_orbital_speed;
        }
        if self.debug.coins_multiplier < 1.0 || !self.debug.coins_multiplier.is_finite() {
            fix("debug.coins_multiplier", self.debug.coins_multiplier, 1.0);
            self.debug.coins_multiplier = 1.0;
        }

        warnings
    }

    /// Largest orbit radius for this map.
    #[must_use]
    pub fn max_orbit_radius(&self) -> f64 {
        self.width.min(self.height) / 2.0 * self.max_orbit_radius_factor
    }

    /// Milliseconds between ticks at the current rate.
    #[must_use]
    pub fn tick_interval_ms(&self, slow_mode: bool) -> f64 {
        let tps = if slow_mode {
            self.slow_ticks_per_second
        } else {
            self.ticks_per_second
        };
        1000.0 / f64::from(tps.max(1))
    }

    /// Base milliseconds between two ships from one planet.
    #[must_use]
    pub fn base_spawn_interval_ms(&self) -> f64 {
        1000.0 / self.ships_per_second
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let mut config = GameConfig::default();
        assert!(config.validate().is_empty());
        assert_eq!(config, GameConfig::default());
    }

    #[test]
    fn test_disengagement_pushed_above_engagement() {
        let mut config = GameConfig {
            engagement_distance: 80.0,
            disengagement_distance: 60.0,
            ..GameConfig::default()
        };
        let warnings = config.validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "disengagement_distance");
        assert!((config.disengagement_distance - 120.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_clamps_tick_rate_and_map() {
        let mut config = GameConfig {
            ticks_per_second: 500,
            width: 100.0,
            ..GameConfig::default()
        };
        let warnings = config.validate();
        assert_eq!(config.ticks_per_second, 120);
        assert!((config.width - 800.0).abs() < f64::EPSILON);
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn test_invalid_orbit_resets_both_fields() {
        let mut config = GameConfig {
            min_orbit_radius: 10_000.0,
            ..GameConfig::default()
        };
        config.validate();
        assert!((config.min_orbit_radius - 80.0).abs() < f64::EPSILON);
        assert!((config.max_orbit_radius_factor - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let (config, warnings) =
            GameConfig::from_ron_str("(ticks_per_second: 30)", "inline").unwrap();
        assert!(warnings.is_empty());
        assert_eq!(config.ticks_per_second, 30);
        assert!((config.ship_speed - 3.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_bad_ron_is_parse_error() {
        let err = GameConfig::from_ron_str("(ticks_per_second: \"fast\")", "inline").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_tick_interval() {
        let config = GameConfig::default();
        assert!((config.tick_interval_ms(false) - 1000.0 / 60.0).abs() < 1e-9);
        assert!((config.tick_interval_ms(true) - 50.0).abs() < 1e-9);
        assert!((config.base_spawn_interval_ms() - 2000.0).abs() < 1e-9);
    }
}
