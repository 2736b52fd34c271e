//! Achievement catalog and progress tracking.
//!
//! The [`ChallengeManager`] is a pure event sink: it keeps career counters,
//! per-game tracking and the fixed catalog, and returns the coins a call
//! awarded. Crediting those coins and saving the result is the caller's
//! job (see [`Profile`](crate::persistence::Profile)).
//!
//! Completion is idempotent: once a challenge is complete, further
//! progress updates are ignored and never re-award coins.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::abilities::AbilityType;
use crate::config::GameConfig;
use crate::difficulty::Difficulty;
use crate::planet::PlanetType;
use crate::time::Millis;

/// How hard a challenge is, for sorting and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    /// Most players get these.
    Common,
    /// A bit of effort.
    Uncommon,
    /// Dedicated play.
    Rare,
    /// Long grind or high skill.
    Epic,
    /// Exceptional.
    Legendary,
}

/// What a challenge measures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ChallengeKind {
    /// Win on `difficulty` within `limit_ms`.
    MissionTime {
        /// Required difficulty.
        difficulty: Difficulty,
        /// Time limit.
        limit_ms: Millis,
    },
    /// Use any ability `target` times.
    AbilityCount {
        /// Required uses.
        target: u64,
    },
    /// Use one ability `target` times.
    SpecificAbilityCount {
        /// The ability.
        ability: AbilityType,
        /// Required uses.
        target: u64,
    },
    /// Buy one specific ability.
    AbilityPurchase {
        /// The ability.
        ability: AbilityType,
    },
    /// Capture `target` planets in total.
    PlanetCaptureCount {
        /// Required captures.
        target: u64,
    },
    /// Win `target` games on `difficulty` without losing a planet.
    PerfectGameCount {
        /// Required difficulty.
        difficulty: Difficulty,
        /// Required games.
        target: u64,
    },
    /// Donate `target` gold in total.
    GoldDonated {
        /// Required gold.
        target: u64,
    },
    /// Unlock `target` abilities.
    AbilityUnlockCount {
        /// Required unlocks.
        target: u64,
    },
    /// Buy `target` upgrades.
    UpgradePurchaseCount {
        /// Required purchases.
        target: u64,
    },
    /// Win without capturing a planet of this type.
    PlanetTypeExclusion {
        /// The avoided type.
        excluded: PlanetType,
    },
}

impl ChallengeKind {
    /// Count that completes a counter challenge.
    #[must_use]
    pub const fn target(&self) -> Option<u64> {
        match *self {
            Self::AbilityCount { target }
            | Self::SpecificAbilityCount { target, .. }
            | Self::PlanetCaptureCount { target }
            | Self::PerfectGameCount { target, .. }
            | Self::GoldDonated { target }
            | Self::AbilityUnlockCount { target }
            | Self::UpgradePurchaseCount { target } => Some(target),
            Self::AbilityPurchase { .. } => Some(1),
            Self::MissionTime { .. } | Self::PlanetTypeExclusion { .. } => None,
        }
    }
}

/// One catalog entry with its progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge {
    /// Stable id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// One-line description.
    pub description: String,
    /// What it measures.
    pub kind: ChallengeKind,
    /// Rarity.
    pub rarity: Rarity,
    /// Coins awarded on completion.
    pub reward: u64,
    completed: bool,
    progress: u64,
}

/// Effect of a progress update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressChange {
    /// Already complete or the value did not move.
    Unchanged,
    /// Progress moved but the target is not reached.
    Advanced,
    /// This update completed the challenge.
    Completed,
}

impl Challenge {
    fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        kind: ChallengeKind,
        rarity: Rarity,
        reward: u64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            kind,
            rarity,
            reward,
            completed: false,
            progress: 0,
        }
    }

    /// Whether the challenge is done.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.completed
    }

    /// Current progress value.
    #[must_use]
    pub const fn progress(&self) -> u64 {
        self.progress
    }

    /// Progress in `[0, 1]`.
    #[must_use]
    pub fn progress_fraction(&self) -> f64 {
        match self.kind.target() {
            Some(target) if target > 0 => (self.progress as f64 / target as f64).min(1.0),
            _ if self.completed => 1.0,
            _ => 0.0,
        }
    }

    /// Set progress to `value`, completing the challenge if it reaches
    /// the target. Does nothing once completed.
    pub fn update_progress(&mut self, value: u64) -> ProgressChange {
        if self.completed {
            return ProgressChange::Unchanged;
        }
        let old = self.progress;
        self.progress = value;
        match self.kind.target() {
            Some(target) if value >= target => {
                self.complete();
                ProgressChange::Completed
            }
            _ if old != value => ProgressChange::Advanced,
            _ => ProgressChange::Unchanged,
        }
    }

    /// Mark complete. Returns false if it already was.
    pub fn complete(&mut self) -> bool {
        if self.completed {
            return false;
        }
        self.completed = true;
        self.progress = self.kind.target().unwrap_or(1);
        true
    }
}

/// Build the fixed catalog.
#[must_use]
pub fn catalog() -> Vec<Challenge> {
    use ChallengeKind as K;
    use Rarity as R;

    let mut list = vec![
        Challenge::new("speed_easy", "Speed Demon I", "Complete an Easy mission in under 60 seconds",
            K::MissionTime { difficulty: Difficulty::Easy, limit_ms: 60_000 }, R::Common, 50),
        Challenge::new("speed_medium", "Speed Demon II", "Complete a Medium mission in under 90 seconds",
            K::MissionTime { difficulty: Difficulty::Medium, limit_ms: 90_000 }, R::Uncommon, 100),
        Challenge::new("speed_hard", "Lightning Strike", "Complete a Hard mission in under 120 seconds",
            K::MissionTime { difficulty: Difficulty::Hard, limit_ms: 120_000 }, R::Rare, 200),
        Challenge::new("speed_extreme", "Impossible Speed", "Complete an Extreme mission in under 180 seconds",
            K::MissionTime { difficulty: Difficulty::Extreme, limit_ms: 180_000 }, R::Legendary, 500),
        Challenge::new("ability_novice", "Ability Novice", "Use 25 abilities in total",
            K::AbilityCount { target: 25 }, R::Common, 30),
        Challenge::new("ability_adept", "Ability Adept", "Use 100 abilities in total",
            K::AbilityCount { target: 100 }, R::Uncommon, 75),
        Challenge::new("ability_master", "Ability Master", "Use 500 abilities in total",
            K::AbilityCount { target: 500 }, R::Rare, 200),
    ];

    for ability in AbilityType::ALL {
        let name = ability.display_name();
        list.push(Challenge::new(
            specialist_id(ability),
            format!("{name} Specialist"),
            format!("Use {name} 20 times"),
            K::SpecificAbilityCount { ability, target: 20 },
            R::Uncommon,
            80,
        ));
        list.push(Challenge::new(
            purchase_id(ability),
            format!("Unlock {name}"),
            format!("Purchase the {name} ability"),
            K::AbilityPurchase { ability },
            R::Common,
            50,
        ));
    }

    list.extend([
        Challenge::new("conqueror_basic", "Basic Conqueror", "Capture 50 planets total",
            K::PlanetCaptureCount { target: 50 }, R::Common, 40),
        Challenge::new("conqueror_advanced", "Advanced Conqueror", "Capture 200 planets total",
            K::PlanetCaptureCount { target: 200 }, R::Uncommon, 100),
        Challenge::new("conqueror_master", "Galactic Emperor", "Capture 1000 planets total",
            K::PlanetCaptureCount { target: 1000 }, R::Epic, 300),
        Challenge::new("perfect_easy", "Easy Perfectionist", "Win 5 Easy games without losing a planet",
            K::PerfectGameCount { difficulty: Difficulty::Easy, target: 5 }, R::Uncommon, 80),
        Challenge::new("perfect_medium", "Medium Perfectionist", "Win 3 Medium games without losing a planet",
            K::PerfectGameCount { difficulty: Difficulty::Medium, target: 3 }, R::Rare, 150),
        Challenge::new("perfect_hard", "Untouchable", "Win 1 Hard game without losing a planet",
            K::PerfectGameCount { difficulty: Difficulty::Hard, target: 1 }, R::Epic, 300),
        Challenge::new("generous_basic", "Generous Soul", "Donate 500 gold total",
            K::GoldDonated { target: 500 }, R::Common, 25),
        Challenge::new("generous_advanced", "Philanthropist", "Donate 2000 gold total",
            K::GoldDonated { target: 2000 }, R::Rare, 100),
        Challenge::new("unlock_collector", "Ability Collector", "Unlock 5 different abilities",
            K::AbilityUnlockCount { target: 5 }, R::Uncommon, 60),
        Challenge::new("upgrade_buyer", "Upgrade Enthusiast", "Purchase 50 upgrades total",
            K::UpgradePurchaseCount { target: 50 }, R::Uncommon, 75),
        Challenge::new("no_attack_planets", "Pacifist Victory", "Win a game without capturing Attack planets",
            K::PlanetTypeExclusion { excluded: PlanetType::Attack }, R::Rare, 120),
        Challenge::new("no_defence_planets", "Offensive Master", "Win a game without capturing Defence planets",
            K::PlanetTypeExclusion { excluded: PlanetType::Defence }, R::Rare, 120),
        Challenge::new("no_speed_planets", "Methodical Victory", "Win a game without capturing Speed planets",
            K::PlanetTypeExclusion { excluded: PlanetType::Speed }, R::Rare, 120),
    ]);
    list
}

fn specialist_id(ability: AbilityType) -> String {
    format!("ability_{}_specialist", ability.key())
}

fn purchase_id(ability: AbilityType) -> String {
    format!("purchase_{}", ability.key())
}

/// Career counters that survive between sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CareerCounters {
    /// Planets captured by the player.
    pub planets_captured: u64,
    /// Player ability activations.
    pub abilities_used: u64,
    /// Gold donated.
    pub gold_donated: u64,
    /// Upgrades bought.
    pub upgrades_purchased: u64,
    /// Abilities unlocked.
    pub abilities_unlocked: u64,
    /// Perfect wins per difficulty.
    pub perfect_games: BTreeMap<Difficulty, u64>,
    /// Uses per ability.
    pub ability_usage: BTreeMap<AbilityType, u64>,
}

/// A completed challenge as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedChallenge {
    /// Challenge id.
    pub id: String,
    /// Progress at completion.
    pub progress: u64,
}

/// The persisted challenge state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengeRecord {
    /// Career counters.
    pub counters: CareerCounters,
    /// Completed challenges.
    pub completed: Vec<CompletedChallenge>,
}

/// What a notification reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationKind {
    /// A challenge was completed.
    Completed {
        /// Rarity.
        rarity: Rarity,
        /// Coins awarded.
        reward: u64,
    },
    /// A counter moved.
    Progress {
        /// New value.
        progress: u64,
        /// Target.
        target: u64,
    },
}

/// A time-boxed on-screen message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Challenge name.
    pub name: String,
    /// Challenge description.
    pub description: String,
    /// Payload.
    pub kind: NotificationKind,
    /// Creation time.
    pub created: Millis,
    /// How long it stays up.
    pub display_ms: Millis,
}

impl Notification {
    /// Whether it should still be shown at `now`.
    #[must_use]
    pub fn is_visible(&self, now: Millis) -> bool {
        now.saturating_sub(self.created) < self.display_ms
    }
}

#[derive(Debug, Clone, Default)]
struct GameTracking {
    difficulty: Option<Difficulty>,
    lost_planet: bool,
    captured_types: BTreeSet<PlanetType>,
}

/// The challenge catalog plus everything that feeds it.
#[derive(Debug, Clone)]
pub struct ChallengeManager {
    challenges: Vec<Challenge>,
    counters: CareerCounters,
    game: GameTracking,
    notifications: Vec<Notification>,
    completion_ms: Millis,
    progress_ms: Millis,
}

impl ChallengeManager {
    /// Fresh catalog with no progress.
    #[must_use]
    pub fn new(config: &GameConfig) -> Self {
        Self {
            challenges: catalog(),
            counters: CareerCounters::default(),
            game: GameTracking::default(),
            notifications: Vec::new(),
            completion_ms: config.completion_notification_ms,
            progress_ms: config.progress_notification_ms,
        }
    }

    /// Restore from a stored record.
    ///
    /// Completed challenges come back completed; incomplete counter
    /// challenges recompute their progress from the restored counters.
    #[must_use]
    pub fn from_record(config: &GameConfig, record: &ChallengeRecord) -> Self {
        let mut manager = Self::new(config);
        manager.counters = record.counters.clone();
        for done in &record.completed {
            if let Some(challenge) = manager.challenges.iter_mut().find(|c| c.id == done.id) {
                challenge.completed = true;
                challenge.progress = done.progress;
            }
        }
        let counters = manager.counters.clone();
        for challenge in manager.challenges.iter_mut().filter(|c| !c.completed) {
            challenge.progress = match challenge.kind {
                ChallengeKind::AbilityCount { .. } => counters.abilities_used,
                ChallengeKind::SpecificAbilityCount { ability, .. } => {
                    counters.ability_usage.get(&ability).copied().unwrap_or(0)
                }
                ChallengeKind::PlanetCaptureCount { .. } => counters.planets_captured,
                ChallengeKind::PerfectGameCount { difficulty, .. } => {
                    counters.perfect_games.get(&difficulty).copied().unwrap_or(0)
                }
                ChallengeKind::GoldDonated { .. } => counters.gold_donated,
                ChallengeKind::AbilityUnlockCount { .. } => counters.abilities_unlocked,
                ChallengeKind::UpgradePurchaseCount { .. } => counters.upgrades_purchased,
                ChallengeKind::AbilityPurchase { .. }
                | ChallengeKind::MissionTime { .. }
                | ChallengeKind::PlanetTypeExclusion { .. } => 0,
            };
        }
        manager
    }

    /// Snapshot for storage.
    #[must_use]
    pub fn to_record(&self) -> ChallengeRecord {
        ChallengeRecord {
            counters: self.counters.clone(),
            completed: self
                .challenges
                .iter()
                .filter(|c| c.completed)
                .map(|c| CompletedChallenge {
                    id: c.id.clone(),
                    progress: c.progress,
                })
                .collect(),
        }
    }

    /// Challenge by id.
    #[must_use]
    pub fn challenge(&self, id: &str) -> Option<&Challenge> {
        self.challenges.iter().find(|c| c.id == id)
    }

    /// Catalog in definition order.
    #[must_use]
    pub fn achievements(&self) -> &[Challenge] {
        &self.challenges
    }

    /// Catalog sorted by rarity, incomplete first within a rarity.
    #[must_use]
    pub fn all_challenges(&self) -> Vec<&Challenge> {
        let mut list: Vec<&Challenge> = self.challenges.iter().collect();
        list.sort_by_key(|c| (c.rarity, c.completed));
        list
    }

    /// Career counters.
    #[must_use]
    pub const fn counters(&self) -> &CareerCounters {
        &self.counters
    }

    // ------------------------------------------------------------------
    // Event sinks. Each returns the coins it awarded.
    // ------------------------------------------------------------------

    /// A session started.
    pub fn on_game_start(&mut self, difficulty: Difficulty) {
        self.game = GameTracking {
            difficulty: Some(difficulty),
            ..GameTracking::default()
        };
    }

    /// The player won after `elapsed_ms` of game time.
    pub fn on_game_won(&mut self, difficulty: Difficulty, elapsed_ms: Millis, now: Millis) -> u64 {
        let mut awarded = 0;

        let speed: Vec<usize> = self
            .indices(|k| {
                matches!(k, ChallengeKind::MissionTime { difficulty: d, limit_ms }
                    if *d == difficulty && elapsed_ms <= *limit_ms)
            })
            .collect();
        for index in speed {
            awarded += self.complete_at(index, now);
        }

        if !self.game.lost_planet {
            let count = self.counters.perfect_games.entry(difficulty).or_insert(0);
            *count += 1;
            let value = *count;
            awarded += self.update_where(
                |k| matches!(k, ChallengeKind::PerfectGameCount { difficulty: d, .. } if *d == difficulty),
                value,
                now,
            );
        }

        let captured = self.game.captured_types.clone();
        let exclusions: Vec<usize> = self
            .indices(|k| {
                matches!(k, ChallengeKind::PlanetTypeExclusion { excluded } if !captured.contains(excluded))
            })
            .collect();
        for index in exclusions {
            awarded += self.complete_at(index, now);
        }

        self.game.difficulty = None;
        awarded
    }

    /// The player captured a planet of `planet_type`.
    pub fn on_planet_captured(&mut self, planet_type: PlanetType, now: Millis) -> u64 {
        self.counters.planets_captured += 1;
        self.game.captured_types.insert(planet_type);
        let value = self.counters.planets_captured;
        self.update_where(
            |k| matches!(k, ChallengeKind::PlanetCaptureCount { .. }),
            value,
            now,
        )
    }

    /// The player lost a planet.
    pub fn on_planet_lost(&mut self) {
        self.game.lost_planet = true;
    }

    /// The player used `ability`.
    pub fn on_ability_used(&mut self, ability: AbilityType, now: Millis) -> u64 {
        self.counters.abilities_used += 1;
        let specific = self.counters.ability_usage.entry(ability).or_insert(0);
        *specific += 1;
        let specific = *specific;
        let total = self.counters.abilities_used;

        self.update_where(|k| matches!(k, ChallengeKind::AbilityCount { .. }), total, now)
            + self.update_where(
                |k| matches!(k, ChallengeKind::SpecificAbilityCount { ability: a, .. } if *a == ability),
                specific,
                now,
            )
    }

    /// The player unlocked `ability`.
    pub fn on_ability_purchased(&mut self, ability: AbilityType, now: Millis) -> u64 {
        self.counters.abilities_unlocked += 1;
        let unlocked = self.counters.abilities_unlocked;
        self.update_where(
            |k| matches!(k, ChallengeKind::AbilityPurchase { ability: a } if *a == ability),
            1,
            now,
        ) + self.update_where(
            |k| matches!(k, ChallengeKind::AbilityUnlockCount { .. }),
            unlocked,
            now,
        )
    }

    /// The player bought an upgrade level.
    pub fn on_upgrade_purchased(&mut self, now: Millis) -> u64 {
        self.counters.upgrades_purchased += 1;
        let value = self.counters.upgrades_purchased;
        self.update_where(
            |k| matches!(k, ChallengeKind::UpgradePurchaseCount { .. }),
            value,
            now,
        )
    }

    /// The player donated `amount` gold.
    pub fn on_gold_donated(&mut self, amount: u64, now: Millis) -> u64 {
        self.counters.gold_donated += amount;
        let value = self.counters.gold_donated;
        self.update_where(|k| matches!(k, ChallengeKind::GoldDonated { .. }), value, now)
    }

    // ------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------

    /// Visible notifications, oldest first; expired ones are dropped.
    pub fn pending_notifications(&mut self, now: Millis) -> &[Notification] {
        self.notifications.retain(|n| n.is_visible(now));
        &self.notifications
    }

    /// Dismiss one notification by index.
    pub fn dismiss_notification(&mut self, index: usize) -> Option<Notification> {
        (index < self.notifications.len()).then(|| self.notifications.remove(index))
    }

    // ------------------------------------------------------------------

    fn indices<'a>(
        &'a self,
        pred: impl Fn(&ChallengeKind) -> bool + 'a,
    ) -> impl Iterator<Item = usize> + 'a {
        self.challenges
            .iter()
            .enumerate()
            .filter(move |(_, c)| pred(&c.kind))
            .map(|(i, _)| i)
    }

    fn update_where(&mut self, pred: impl Fn(&ChallengeKind) -> bool, value: u64, now: Millis) -> u64 {
        let targets: Vec<usize> = self.indices(pred).collect();
        let mut awarded = 0;
        for index in targets {
            let challenge = &mut self.challenges[index];
            match challenge.update_progress(value) {
                ProgressChange::Completed => awarded += self.announce_completion(index, now),
                ProgressChange::Advanced => {
                    if let Some(target) = challenge.kind.target() {
                        let notification = Notification {
                            name: challenge.name.clone(),
                            description: challenge.description.clone(),
                            kind: NotificationKind::Progress {
                                progress: value,
                                target,
                            },
                            created: now,
                            display_ms: self.progress_ms,
                        };
                        self.notifications.push(notification);
                    }
                }
                ProgressChange::Unchanged => {}
            }
        }
        awarded
    }

    fn complete_at(&mut self, index: usize, now: Millis) -> u64 {
        if self.challenges[index].complete() {
            self.announce_completion(index, now)
        } else {
            0
        }
    }

    fn announce_completion(&mut self, index: usize, now: Millis) -> u64 {
        let challenge = &self.challenges[index];
        tracing::info!(
            challenge = %challenge.id,
            reward = challenge.reward,
            "Challenge completed"
        );
        self.notifications.push(Notification {
            name: challenge.name.clone(),
            description: challenge.description.clone(),
            kind: NotificationKind::Completed {
                rarity: challenge.rarity,
                reward: challenge.reward,
            },
            created: now,
            display_ms: self.completion_ms,
        });
        challenge.reward
    }
}
