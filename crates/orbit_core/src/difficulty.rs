//! Difficulty tiers and their tuning table.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Difficulty selected when starting a session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    /// One bot, six planets.
    Easy,
    /// Two bots, ten planets.
    #[default]
    Medium,
    /// Four bots with granted abilities and upgrades.
    Hard,
    /// Six bots with more granted abilities and upgrades.
    Extreme,
}

/// Numbers that differ per difficulty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifficultyProfile {
    /// Number of bot operators.
    pub bot_count: u32,
    /// Total number of planets.
    pub planet_count: u32,
    /// Time between bot decisions.
    pub decision_interval_ms: u64,
    /// Willingness to attack with weakened planets.
    pub aggressiveness: f64,
    /// Quality of bot target scoring and reinforcement.
    pub efficiency: f64,
    /// Victory reward multiplier.
    pub reward_factor: f64,
    /// Starting health of neutral planets as a fraction of max.
    pub neutral_garrison: f64,
    /// Inclusive range of abilities granted to each bot.
    pub granted_abilities: (u32, u32),
    /// Inclusive range of upgrades granted to each bot.
    pub granted_upgrades: (u32, u32),
}

impl Difficulty {
    /// All tiers, easiest first.
    pub const ALL: [Self; 4] = [Self::Easy, Self::Medium, Self::Hard, Self::Extreme];

    /// Tuning table entry.
    #[must_use]
    pub const fn profile(self) -> DifficultyProfile {
        match self {
            Self::Easy => DifficultyProfile {
                bot_count: 1,
                planet_count: 6,
                decision_interval_ms: 3000,
                aggressiveness: 0.6,
                efficiency: 0.7,
                reward_factor: 0.5,
                neutral_garrison: 0.3,
                granted_abilities: (0, 0),
                granted_upgrades: (0, 0),
            },
            Self::Medium => DifficultyProfile {
                bot_count: 2,
                planet_count: 10,
                decision_interval_ms: 2200,
                aggressiveness: 1.0,
                efficiency: 1.0,
                reward_factor: 1.0,
                neutral_garrison: 0.5,
                granted_abilities: (0, 0),
                granted_upgrades: (0, 0),
            },
            Self::Hard => DifficultyProfile {
                bot_count: 4,
                planet_count: 14,
                decision_interval_ms: 1500,
                aggressiveness: 1.4,
                efficiency: 1.2,
                reward_factor: 1.5,
                neutral_garrison: 0.7,
                granted_abilities: (1, 2),
                granted_upgrades: (2, 4),
            },
            Self::Extreme => DifficultyProfile {
                bot_count: 6,
                planet_count: 18,
                decision_interval_ms: 1000,
                aggressiveness: 1.8,
                efficiency: 1.4,
                reward_factor: 2.0,
                neutral_garrison: 0.8,
                granted_abilities: (2, 4),
                granted_upgrades: (4, 5),
            },
        }
    }

    /// Upper-case display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Easy => "EASY",
            Self::Medium => "MEDIUM",
            Self::Hard => "HARD",
            Self::Extreme => "EXTREME",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            "extreme" => Ok(Self::Extreme),
            other => Err(format!("unknown difficulty '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harder_tiers_have_more_bots() {
        let counts: Vec<u32> = Difficulty::ALL
            .iter()
            .map(|d| d.profile().bot_count)
            .collect();
        assert_eq!(counts, vec![1, 2, 4, 6]);
    }

    #[test]
    fn test_every_tier_leaves_room_for_neutrals() {
        for difficulty in Difficulty::ALL {
            let profile = difficulty.profile();
            assert!(profile.planet_count > profile.bot_count + 1);
        }
    }

    #[test]
    fn test_parse_difficulty() {
        assert_eq!("Hard".parse::<Difficulty>(), Ok(Difficulty::Hard));
        assert!("nightmare".parse::<Difficulty>().is_err());
    }
}
