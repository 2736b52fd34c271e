//! Persistent player progression: coins, upgrades, unlocked abilities and
//! best times.
//!
//! Upgrade values are percentages; the simulation consumes them as
//! multipliers of `1 + value / 100`. Costs grow geometrically with the
//! current level.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::abilities::{AbilityType, MAX_ABILITY_LEVEL};
use crate::config::GameConfig;
use crate::difficulty::Difficulty;
use crate::error::{GameError, Result};
use crate::time::Millis;

/// Purchasable upgrades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeType {
    /// Chance that a planet produces two ships at once.
    DoubleShipChance,
    /// Ship damage.
    ShipDamage,
    /// Ship health.
    ShipHealth,
    /// Planet max health.
    PlanetHealth,
    /// Incoming planet damage reduction.
    PlanetDamageReduction,
    /// Ship speed.
    ShipSpeed,
    /// Ship production rate.
    ShipSpawnSpeed,
    /// Ability cooldown reduction.
    AbilityCooldown,
}

impl UpgradeType {
    /// Every upgrade.
    pub const ALL: [Self; 8] = [
        Self::DoubleShipChance,
        Self::ShipDamage,
        Self::ShipHealth,
        Self::PlanetHealth,
        Self::PlanetDamageReduction,
        Self::ShipSpeed,
        Self::ShipSpawnSpeed,
        Self::AbilityCooldown,
    ];

    /// Upgrades a bot may be granted.
    pub const BOT_ELIGIBLE: [Self; 5] = [
        Self::ShipDamage,
        Self::ShipHealth,
        Self::ShipSpeed,
        Self::ShipSpawnSpeed,
        Self::PlanetHealth,
    ];

    /// Multiplier a granted bot upgrade applies.
    pub const BOT_MULTIPLIER: f64 = 1.5;

    /// Percentage value at `level`.
    #[must_use]
    pub fn value(self, level: u32) -> f64 {
        let l = f64::from(level);
        match self {
            Self::DoubleShipChance | Self::AbilityCooldown => (2.0 * l).min(50.0),
            Self::ShipDamage => 5.0 * l,
            Self::ShipHealth => 10.0 * l,
            Self::PlanetHealth => 15.0 * l,
            Self::PlanetDamageReduction => (3.0 * l).min(75.0),
            Self::ShipSpeed => 4.0 * l,
            Self::ShipSpawnSpeed => 6.0 * l,
        }
    }

    const fn cost_curve(self) -> (f64, f64) {
        match self {
            Self::DoubleShipChance => (50.0, 1.22),
            Self::ShipDamage => (15.0, 1.15),
            Self::ShipHealth => (12.0, 1.14),
            Self::PlanetHealth => (20.0, 1.17),
            Self::PlanetDamageReduction => (25.0, 1.18),
            Self::ShipSpeed => (16.0, 1.13),
            Self::ShipSpawnSpeed => (18.0, 1.15),
            Self::AbilityCooldown => (30.0, 1.20),
        }
    }

    /// Coins to buy the next level when currently at `level`.
    #[must_use]
    pub fn cost(self, level: u32) -> u64 {
        let (base, growth) = self.cost_curve();
        (base * growth.powi(level as i32)).round() as u64
    }

    /// Highest purchasable level.
    #[must_use]
    pub const fn max_level(self) -> u32 {
        match self {
            Self::DoubleShipChance | Self::PlanetDamageReduction | Self::AbilityCooldown => 25,
            _ => 30,
        }
    }

    /// Display name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::DoubleShipChance => "Double Ship Chance",
            Self::ShipDamage => "Ship Damage",
            Self::ShipHealth => "Ship Health",
            Self::PlanetHealth => "Planet Health",
            Self::PlanetDamageReduction => "Planet Damage Reduction",
            Self::ShipSpeed => "Ship Speed",
            Self::ShipSpawnSpeed => "Ship Spawn Speed",
            Self::AbilityCooldown => "Ability Cooldown",
        }
    }
}

impl fmt::Display for UpgradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// The player's persistent progression record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerData {
    coins: u64,
    upgrades: BTreeMap<UpgradeType, u32>,
    abilities: BTreeMap<AbilityType, u32>,
    best_times: BTreeMap<Difficulty, Millis>,
}

impl PlayerData {
    /// Fresh profile with no coins.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current coins.
    #[must_use]
    pub const fn coins(&self) -> u64 {
        self.coins
    }

    /// Credit coins.
    pub fn add_coins(&mut self, amount: u64) {
        self.coins = self.coins.saturating_add(amount);
    }

    /// Debit coins, or fail without change.
    pub fn spend(&mut self, amount: u64) -> Result<()> {
        if self.coins < amount {
            return Err(GameError::InsufficientCoins {
                required: amount,
                available: self.coins,
            });
        }
        self.coins -= amount;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Upgrades
    // ------------------------------------------------------------------

    /// Level of `upgrade`.
    #[must_use]
    pub fn upgrade_level(&self, upgrade: UpgradeType) -> u32 {
        self.upgrades.get(&upgrade).copied().unwrap_or(0)
    }

    /// Percentage value of `upgrade` at its current level.
    #[must_use]
    pub fn upgrade_value(&self, upgrade: UpgradeType) -> f64 {
        upgrade.value(self.upgrade_level(upgrade))
    }

    /// `1 + value / 100`.
    #[must_use]
    pub fn upgrade_multiplier(&self, upgrade: UpgradeType) -> f64 {
        1.0 + self.upgrade_value(upgrade) / 100.0
    }

    /// Price of the next level of `upgrade`.
    #[must_use]
    pub fn next_upgrade_cost(&self, upgrade: UpgradeType) -> u64 {
        upgrade.cost(self.upgrade_level(upgrade))
    }

    /// Buy one level of `upgrade`. Returns the coins spent.
    pub fn purchase_upgrade(&mut self, upgrade: UpgradeType) -> Result<u64> {
        let level = self.upgrade_level(upgrade);
        if level >= upgrade.max_level() {
            return Err(GameError::UpgradeMaxed(upgrade));
        }
        let cost = upgrade.cost(level);
        self.spend(cost)?;
        self.upgrades.insert(upgrade, level + 1);
        Ok(cost)
    }

    /// Set a level directly (record restore, test setup).
    pub fn set_upgrade_level(&mut self, upgrade: UpgradeType, level: u32) {
        self.upgrades.insert(upgrade, level.min(upgrade.max_level()));
    }

    // ------------------------------------------------------------------
    // Abilities
    // ------------------------------------------------------------------

    /// Level of `ability`; zero while locked.
    #[must_use]
    pub fn ability_level(&self, ability: AbilityType) -> u32 {
        self.abilities.get(&ability).copied().unwrap_or(0)
    }

    /// Whether `ability` has been bought.
    #[must_use]
    pub fn is_ability_unlocked(&self, ability: AbilityType) -> bool {
        self.ability_level(ability) >= 1
    }

    /// Unlocked abilities in declaration order.
    #[must_use]
    pub fn unlocked_abilities(&self) -> Vec<AbilityType> {
        AbilityType::ALL
            .into_iter()
            .filter(|a| self.is_ability_unlocked(*a))
            .collect()
    }

    /// Buy `ability` at level 1. Returns the coins spent.
    pub fn unlock_ability(&mut self, ability: AbilityType) -> Result<u64> {
        if self.is_ability_unlocked(ability) {
            return self.upgrade_ability(ability);
        }
        let cost = ability.unlock_cost();
        self.spend(cost)?;
        self.abilities.insert(ability, 1);
        Ok(cost)
    }

    /// Raise an unlocked ability one level. Returns the coins spent.
    pub fn upgrade_ability(&mut self, ability: AbilityType) -> Result<u64> {
        let level = self.ability_level(ability);
        if level == 0 {
            return Err(GameError::AbilityLocked(ability));
        }
        if level >= MAX_ABILITY_LEVEL {
            return Err(GameError::AbilityMaxed(ability));
        }
        let cost = ability.level_cost(level);
        self.spend(cost)?;
        self.abilities.insert(ability, level + 1);
        Ok(cost)
    }

    /// Set an ability level directly (record restore, test setup).
    pub fn set_ability_level(&mut self, ability: AbilityType, level: u32) {
        self.abilities
            .insert(ability, level.min(MAX_ABILITY_LEVEL));
    }

    // ------------------------------------------------------------------
    // Gold and times
    // ------------------------------------------------------------------

    /// Give away coins. Fails without change if the balance is short.
    pub fn donate_gold(&mut self, amount: u64) -> Result<()> {
        self.spend(amount)
    }

    /// Best winning time on `difficulty`.
    #[must_use]
    pub fn best_time(&self, difficulty: Difficulty) -> Option<Millis> {
        self.best_times.get(&difficulty).copied()
    }

    /// Keep the faster of the stored and the new time. Returns whether
    /// this is a new record.
    pub fn record_best_time(&mut self, difficulty: Difficulty, elapsed_ms: Millis) -> bool {
        match self.best_times.get(&difficulty) {
            Some(&best) if best <= elapsed_ms => false,
            _ => {
                self.best_times.insert(difficulty, elapsed_ms);
                true
            }
        }
    }
}

/// Coins for a win: `floor(base × reward factor + max(0, bonus − secs))`
/// plus a bonus per planet nobody captured, times the debug multiplier.
#[must_use]
pub fn victory_reward(
    config: &GameConfig,
    difficulty: Difficulty,
    elapsed_ms: Millis,
    uncaptured_planets: usize,
) -> u64 {
    let secs = elapsed_ms as f64 / 1000.0;
    let time_bonus = (config.victory_time_bonus_secs - secs).max(0.0);
    let base =
        (config.base_coin_reward * difficulty.profile().reward_factor + time_bonus).floor();
    let total = base as u64 + config.uncaptured_planet_bonus * uncaptured_planets as u64;
    (total as f64 * config.debug.coins_multiplier.max(1.0)).floor() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upgrade_cost_curve() {
        assert_eq!(UpgradeType::ShipDamage.cost(0), 15);
        assert_eq!(UpgradeType::ShipDamage.cost(1), 17);
        assert_eq!(UpgradeType::DoubleShipChance.cost(2), 74);
    }

    #[test]
    fn test_purchase_deducts_exact_cost() {
        let mut data = PlayerData::new();
        data.add_coins(100);
        let cost = data.purchase_upgrade(UpgradeType::ShipHealth).unwrap();
        assert_eq!(cost, 12);
        assert_eq!(data.coins(), 88);
        assert_eq!(data.upgrade_level(UpgradeType::ShipHealth), 1);
        assert!((data.upgrade_multiplier(UpgradeType::ShipHealth) - 1.1).abs() < 1e-12);
    }

    #[test]
    fn test_insufficient_coins_leaves_state() {
        let mut data = PlayerData::new();
        data.add_coins(10);
        let before = data.clone();
        assert!(matches!(
            data.purchase_upgrade(UpgradeType::ShipHealth),
            Err(GameError::InsufficientCoins {
                required: 12,
                available: 10
            })
        ));
        assert_eq!(data, before);
    }

    #[test]
    fn test_maxed_upgrade_rejected() {
        let mut data = PlayerData::new();
        data.add_coins(u64::MAX / 2);
        data.set_upgrade_level(UpgradeType::AbilityCooldown, 25);
        assert!(matches!(
            data.purchase_upgrade(UpgradeType::AbilityCooldown),
            Err(GameError::UpgradeMaxed(UpgradeType::AbilityCooldown))
        ));
        assert!((data.upgrade_value(UpgradeType::AbilityCooldown) - 50.0).abs() < 1e-12);
    }

    #[test]
    fn test_unlock_then_upgrade_ability() {
        let mut data = PlayerData::new();
        data.add_coins(2000);
        assert!(matches!(
            data.upgrade_ability(AbilityType::Shield),
            Err(GameError::AbilityLocked(AbilityType::Shield))
        ));
        assert_eq!(data.unlock_ability(AbilityType::Shield).unwrap(), 400);
        assert!(data.is_ability_unlocked(AbilityType::Shield));
        assert_eq!(data.upgrade_ability(AbilityType::Shield).unwrap(), 600);
        assert_eq!(data.ability_level(AbilityType::Shield), 2);
        assert_eq!(data.coins(), 1000);
    }

    #[test]
    fn test_best_time_keeps_minimum() {
        let mut data = PlayerData::new();
        assert!(data.record_best_time(Difficulty::Hard, 90_000));
        assert!(!data.record_best_time(Difficulty::Hard, 95_000));
        assert!(data.record_best_time(Difficulty::Hard, 80_000));
        assert_eq!(data.best_time(Difficulty::Hard), Some(80_000));
    }

    #[test]
    fn test_victory_reward() {
        let config = GameConfig::default();
        // 10 × 1.5 + (300 − 120) = 195, plus 2 × 3 neutral planets
        assert_eq!(victory_reward(&config, Difficulty::Hard, 120_000, 3), 201);
        // slow win: no time bonus
        assert_eq!(victory_reward(&config, Difficulty::Easy, 400_000, 0), 5);
    }

    #[test]
    fn test_donation_spends() {
        let mut data = PlayerData::new();
        data.add_coins(50);
        assert!(data.donate_gold(60).is_err());
        data.donate_gold(20).unwrap();
        assert_eq!(data.coins(), 30);
    }
}
