//! Special abilities.
//!
//! - [`AbilityType`] is the closed set of twelve abilities with their
//!   parameter tables (player by level, bot fixed, unlock costs).
//! - [`manager`] tracks cooldowns and every active effect, per operator.
//! - [`black_hole`] is the one effect with its own positioned entity.

pub mod black_hole;
pub mod manager;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::time::Millis;

pub use black_hole::BlackHole;
pub use manager::{AbilityManager, EffectOutput};

/// The twelve special abilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbilityType {
    /// Stops enemy ship production.
    Freeze,
    /// Launches missiles from the map center at enemy planets.
    MissileBarrage,
    /// Protects the caster's planets and ships.
    Shield,
    /// Triples the caster's spawn rate.
    FactoryHype,
    /// Doubles new ship stats.
    ImprovedFactories,
    /// Heals all of the caster's planets.
    AnsweredPrayers,
    /// Weakens ships produced by enemy planets.
    Curse,
    /// Spawns a damaging vortex near the caster's planets.
    BlackHole,
    /// Sweeps rotating beams from the caster's planets.
    PlanetaryFlame,
    /// Infects enemy planets, stealing their production.
    PlanetaryInfection,
    /// Keeps the caster's ships moving through combat.
    UnstoppableShips,
    /// Stops enemy planets from orbiting.
    OrbitalFreeze,
}

/// Duration and strength of one activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityParams {
    /// Effect window; zero for instant abilities.
    pub duration_ms: Millis,
    /// Ability-specific strength (missile count, percent, damage, ...).
    pub power: u32,
}

impl AbilityParams {
    const fn new(duration_secs: u64, power: u32) -> Self {
        Self {
            duration_ms: duration_secs * 1000,
            power,
        }
    }
}

/// Highest purchasable ability level.
pub const MAX_ABILITY_LEVEL: u32 = 10;

impl AbilityType {
    /// Every ability in declaration order.
    pub const ALL: [Self; 12] = [
        Self::Freeze,
        Self::MissileBarrage,
        Self::Shield,
        Self::FactoryHype,
        Self::ImprovedFactories,
        Self::AnsweredPrayers,
        Self::Curse,
        Self::BlackHole,
        Self::PlanetaryFlame,
        Self::PlanetaryInfection,
        Self::UnstoppableShips,
        Self::OrbitalFreeze,
    ];

    /// Abilities a bot may be granted.
    pub const BOT_ELIGIBLE: [Self; 10] = [
        Self::Freeze,
        Self::MissileBarrage,
        Self::Shield,
        Self::FactoryHype,
        Self::ImprovedFactories,
        Self::AnsweredPrayers,
        Self::Curse,
        Self::BlackHole,
        Self::PlanetaryFlame,
        Self::UnstoppableShips,
    ];

    /// Stable snake_case key, used in challenge ids.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Freeze => "freeze",
            Self::MissileBarrage => "missile_barrage",
            Self::Shield => "shield",
            Self::FactoryHype => "factory_hype",
            Self::ImprovedFactories => "improved_factories",
            Self::AnsweredPrayers => "answered_prayers",
            Self::Curse => "curse",
            Self::BlackHole => "black_hole",
            Self::PlanetaryFlame => "planetary_flame",
            Self::PlanetaryInfection => "planetary_infection",
            Self::UnstoppableShips => "unstoppable_ships",
            Self::OrbitalFreeze => "orbital_freeze",
        }
    }

    /// Display name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Freeze => "Freeze",
            Self::MissileBarrage => "Missile Barrage",
            Self::Shield => "Shield",
            Self::FactoryHype => "Factory Hype",
            Self::ImprovedFactories => "Improved Factories",
            Self::AnsweredPrayers => "Answered Prayers",
            Self::Curse => "Curse",
            Self::BlackHole => "Black Hole",
            Self::PlanetaryFlame => "Planetary Flame",
            Self::PlanetaryInfection => "Planetary Infection",
            Self::UnstoppableShips => "Unstoppable Ships",
            Self::OrbitalFreeze => "Orbital Freeze",
        }
    }

    /// Abilities whose whole effect is a per-operator expiry.
    #[must_use]
    pub const fn is_timed_flag(self) -> bool {
        matches!(
            self,
            Self::Freeze
                | Self::Shield
                | Self::FactoryHype
                | Self::ImprovedFactories
                | Self::PlanetaryFlame
                | Self::UnstoppableShips
        )
    }

    /// Coins to unlock (level 0 to 1).
    #[must_use]
    pub const fn unlock_cost(self) -> u64 {
        match self {
            Self::Freeze => 300,
            Self::MissileBarrage => 350,
            Self::Shield => 400,
            Self::FactoryHype => 350,
            Self::ImprovedFactories => 500,
            Self::AnsweredPrayers => 250,
            Self::Curse => 350,
            Self::BlackHole => 600,
            Self::PlanetaryFlame => 450,
            Self::PlanetaryInfection => 500,
            Self::UnstoppableShips => 400,
            Self::OrbitalFreeze => 350,
        }
    }

    /// Coins to go from `level` to `level + 1`.
    #[must_use]
    pub fn level_cost(self, level: u32) -> u64 {
        if level == 0 {
            return self.unlock_cost();
        }
        (self.unlock_cost() as f64 * 1.5_f64.powi(level as i32)).round() as u64
    }

    /// Player parameters at `level` (1 = just unlocked).
    #[must_use]
    pub fn player_params(self, level: u32) -> AbilityParams {
        let l = u64::from(level.max(1));
        let lp = level.max(1);
        match self {
            Self::Freeze => AbilityParams::new(5 + l, 0),
            Self::MissileBarrage => AbilityParams::new(0, 2 + lp),
            Self::Shield => AbilityParams::new(8 + l, 0),
            Self::FactoryHype => AbilityParams::new(8 + l, 0),
            Self::ImprovedFactories => AbilityParams::new(10 + l, 0),
            Self::AnsweredPrayers => AbilityParams::new(0, (20 + 5 * lp).min(100)),
            Self::Curse => AbilityParams::new(6 + l, (15 + 5 * lp).min(60)),
            Self::BlackHole => AbilityParams::new(5 + l, 300 + 10 * lp),
            Self::PlanetaryFlame => AbilityParams::new(6 + l, 500 + 20 * lp),
            Self::PlanetaryInfection => AbilityParams::new(8 + l, 1 + lp / 3),
            Self::UnstoppableShips => AbilityParams::new(5 + l, 0),
            Self::OrbitalFreeze => AbilityParams::new(6 + l, 0),
        }
    }

    /// Fixed parameters bots use.
    #[must_use]
    pub const fn bot_params(self) -> AbilityParams {
        match self {
            Self::Freeze => AbilityParams::new(6, 0),
            Self::MissileBarrage => AbilityParams::new(0, 3),
            Self::Shield => AbilityParams::new(10, 0),
            Self::FactoryHype => AbilityParams::new(8, 0),
            Self::ImprovedFactories => AbilityParams::new(12, 0),
            Self::AnsweredPrayers => AbilityParams::new(0, 50),
            Self::Curse => AbilityParams::new(7, 25),
            Self::BlackHole => AbilityParams::new(5, 100),
            Self::PlanetaryFlame => AbilityParams::new(8, 50),
            Self::PlanetaryInfection => AbilityParams::new(10, 30),
            Self::UnstoppableShips => AbilityParams::new(6, 0),
            Self::OrbitalFreeze => AbilityParams::new(10, 2),
        }
    }
}

impl fmt::Display for AbilityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Player cooldown for one activation.
///
/// `(base + duration) × (1 − reduction%)`, or zero when cooldowns are
/// switched off for debugging.
#[must_use]
pub fn player_cooldown_ms(
    base_ms: Millis,
    params: AbilityParams,
    reduction_percent: f64,
    cooldowns_disabled: bool,
) -> Millis {
    if cooldowns_disabled {
        return 0;
    }
    let factor = (1.0 - reduction_percent / 100.0).clamp(0.0, 1.0);
    ((base_ms + params.duration_ms) as f64 * factor).round() as Millis
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_unique() {
        let mut keys: Vec<_> = AbilityType::ALL.iter().map(|a| a.key()).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), 12);
    }

    #[test]
    fn test_bot_pool_excludes_infection_and_orbital_freeze() {
        assert!(!AbilityType::BOT_ELIGIBLE.contains(&AbilityType::PlanetaryInfection));
        assert!(!AbilityType::BOT_ELIGIBLE.contains(&AbilityType::OrbitalFreeze));
    }

    #[test]
    fn test_cooldown_formula() {
        let params = AbilityType::Shield.player_params(2);
        assert_eq!(params.duration_ms, 10_000);
        assert_eq!(player_cooldown_ms(45_000, params, 0.0, false), 55_000);
        assert_eq!(player_cooldown_ms(45_000, params, 20.0, false), 44_000);
        assert_eq!(player_cooldown_ms(45_000, params, 20.0, true), 0);
    }

    #[test]
    fn test_level_costs_grow() {
        let a = AbilityType::BlackHole;
        assert_eq!(a.level_cost(0), 600);
        assert_eq!(a.level_cost(1), 900);
        assert!(a.level_cost(2) > a.level_cost(1));
    }

    #[test]
    fn test_black_hole_power_scales_with_level() {
        assert_eq!(AbilityType::BlackHole.player_params(1).power, 310);
        assert_eq!(AbilityType::BlackHole.player_params(5).power, 350);
        assert_eq!(AbilityType::AnsweredPrayers.player_params(30).power, 100);
    }
}
