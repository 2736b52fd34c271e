//! Progress storage and the session-independent player profile.
//!
//! The core never knows the storage medium. It hands plain records to a
//! [`ProgressStore`] after every mutation. A failed save is logged and
//! queued as a [`PersistenceWarning`] for the UI; gameplay state is
//! unaffected and play continues unsaved.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::abilities::AbilityType;
use crate::challenges::{ChallengeManager, ChallengeRecord};
use crate::config::GameConfig;
use crate::difficulty::Difficulty;
use crate::error::{GameError, Result};
use crate::events::GameEvent;
use crate::ids::OperatorId;
use crate::progression::{victory_reward, PlayerData, UpgradeType};
use crate::time::Millis;

/// The stored form of [`PlayerData`].
pub type PlayerRecord = PlayerData;

/// Errors raised by a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the medium failed.
    #[error("Store IO failed for '{path}': {source}")]
    Io {
        /// Location of the record.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A record could not be encoded.
    #[error("Failed to encode record: {0}")]
    Encode(#[from] ron::Error),

    /// A stored record could not be decoded.
    #[error("Failed to decode record: {0}")]
    Decode(#[from] ron::error::SpannedError),

    /// The store refused the operation.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Abstract save/load surface for progression records.
pub trait ProgressStore: Send {
    /// Stored player record, if any.
    fn load_player(&self) -> std::result::Result<Option<PlayerRecord>, StoreError>;

    /// Replace the player record.
    fn save_player(&mut self, record: &PlayerRecord) -> std::result::Result<(), StoreError>;

    /// Stored challenge record, if any.
    fn load_challenges(&self) -> std::result::Result<Option<ChallengeRecord>, StoreError>;

    /// Replace the challenge record.
    fn save_challenges(&mut self, record: &ChallengeRecord)
        -> std::result::Result<(), StoreError>;
}

#[derive(Debug, Default)]
struct MemoryInner {
    player: Option<PlayerRecord>,
    challenges: Option<ChallengeRecord>,
    fail_saves: bool,
    saves: u64,
}

/// In-memory store. Clones share the same contents, so a test can keep
/// a handle after giving one to a [`Profile`].
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent save fail (or succeed again).
    pub fn set_fail_saves(&self, fail: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_saves = fail;
        }
    }

    /// Number of successful saves.
    #[must_use]
    pub fn save_count(&self) -> u64 {
        self.inner.lock().map_or(0, |inner| inner.saves)
    }

    fn with<T>(
        &self,
        f: impl FnOnce(&mut MemoryInner) -> std::result::Result<T, StoreError>,
    ) -> std::result::Result<T, StoreError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store poisoned".to_string()))?;
        f(&mut inner)
    }
}

impl ProgressStore for MemoryStore {
    fn load_player(&self) -> std::result::Result<Option<PlayerRecord>, StoreError> {
        self.with(|inner| Ok(inner.player.clone()))
    }

    fn save_player(&mut self, record: &PlayerRecord) -> std::result::Result<(), StoreError> {
        self.with(|inner| {
            if inner.fail_saves {
                return Err(StoreError::Unavailable("save disabled".to_string()));
            }
            inner.player = Some(record.clone());
            inner.saves += 1;
            Ok(())
        })
    }

    fn load_challenges(&self) -> std::result::Result<Option<ChallengeRecord>, StoreError> {
        self.with(|inner| Ok(inner.challenges.clone()))
    }

    fn save_challenges(
        &mut self,
        record: &ChallengeRecord,
    ) -> std::result::Result<(), StoreError> {
        self.with(|inner| {
            if inner.fail_saves {
                return Err(StoreError::Unavailable("save disabled".to_string()));
            }
            inner.challenges = Some(record.clone());
            inner.saves += 1;
            Ok(())
        })
    }
}

/// A save that did not make it to storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistenceWarning {
    /// Human-readable reason.
    pub message: String,
}

/// Player progression, challenges and where they are saved.
pub struct Profile {
    player: PlayerData,
    challenges: ChallengeManager,
    store: Option<Box<dyn ProgressStore>>,
    warnings: Vec<PersistenceWarning>,
    config: GameConfig,
}

impl std::fmt::Debug for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Profile")
            .field("player", &self.player)
            .field("has_store", &self.store.is_some())
            .field("warnings", &self.warnings)
            .finish_non_exhaustive()
    }
}

impl Profile {
    /// Profile that is never saved.
    #[must_use]
    pub fn ephemeral(config: &GameConfig) -> Self {
        Self {
            player: PlayerData::new(),
            challenges: ChallengeManager::new(config),
            store: None,
            warnings: Vec::new(),
            config: config.clone(),
        }
    }

    /// Load from `store`. Unreadable records fall back to defaults with a
    /// warning.
    #[must_use]
    pub fn load(config: &GameConfig, store: Box<dyn ProgressStore>) -> Self {
        let mut profile = Self::ephemeral(config);
        match store.load_player() {
            Ok(Some(record)) => profile.player = record,
            Ok(None) => {}
            Err(err) => profile.warn(format!("Failed to load player data: {err}")),
        }
        match store.load_challenges() {
            Ok(Some(record)) => {
                profile.challenges = ChallengeManager::from_record(config, &record);
            }
            Ok(None) => {}
            Err(err) => profile.warn(format!("Failed to load challenge progress: {err}")),
        }
        profile.store = Some(store);
        profile
    }

    /// Progression data.
    #[must_use]
    pub const fn player(&self) -> &PlayerData {
        &self.player
    }

    /// Mutable progression data for setup. Changes are saved on the next
    /// mutation through this profile, or by [`Profile::save`].
    pub fn player_mut(&mut self) -> &mut PlayerData {
        &mut self.player
    }

    /// Challenge tracker.
    #[must_use]
    pub const fn challenges(&self) -> &ChallengeManager {
        &self.challenges
    }

    /// Mutable challenge tracker, for notifications.
    pub fn challenges_mut(&mut self) -> &mut ChallengeManager {
        &mut self.challenges
    }

    /// Drain save failures since the last call.
    pub fn take_warnings(&mut self) -> Vec<PersistenceWarning> {
        std::mem::take(&mut self.warnings)
    }

    /// Buy an upgrade level.
    pub fn purchase_upgrade(&mut self, upgrade: UpgradeType, now: Millis) -> Result<u64> {
        let cost = self.player.purchase_upgrade(upgrade)?;
        let reward = self.challenges.on_upgrade_purchased(now);
        self.player.add_coins(reward);
        self.save();
        Ok(cost)
    }

    /// Unlock an ability, or raise it a level if already unlocked.
    pub fn unlock_ability(&mut self, ability: AbilityType, now: Millis) -> Result<u64> {
        let was_unlocked = self.player.is_ability_unlocked(ability);
        let cost = self.player.unlock_ability(ability)?;
        if !was_unlocked {
            let reward = self.challenges.on_ability_purchased(ability, now);
            self.player.add_coins(reward);
        }
        self.save();
        Ok(cost)
    }

    /// Raise an unlocked ability a level.
    pub fn upgrade_ability(&mut self, ability: AbilityType) -> Result<u64> {
        let cost = self.player.upgrade_ability(ability)?;
        self.save();
        Ok(cost)
    }

    /// Give away coins.
    pub fn donate_gold(&mut self, amount: u64, now: Millis) -> Result<()> {
        if amount == 0 {
            return Err(GameError::InvalidState("donation must be positive".to_string()));
        }
        self.player.donate_gold(amount)?;
        let reward = self.challenges.on_gold_donated(amount, now);
        self.player.add_coins(reward);
        self.save();
        Ok(())
    }

    /// Feed a simulation event into the tracker. Only the player's own
    /// captures, losses and ability uses count.
    pub fn observe(&mut self, event: &GameEvent, now: Millis) {
        let reward = match *event {
            GameEvent::GameStarted { difficulty } => {
                self.challenges.on_game_start(difficulty);
                return;
            }
            GameEvent::PlanetCaptured {
                by, previous, planet_type, ..
            } => {
                if previous == Some(OperatorId::PLAYER) {
                    self.challenges.on_planet_lost();
                }
                if by.is_player() {
                    self.challenges.on_planet_captured(planet_type, now)
                } else {
                    return;
                }
            }
            GameEvent::AbilityUsed { operator, ability } if operator.is_player() => {
                self.challenges.on_ability_used(ability, now)
            }
            _ => return,
        };
        self.player.add_coins(reward);
        self.save();
    }

    /// Credit a victory: coins, best time and challenges.
    ///
    /// Returns the total coins gained.
    pub fn credit_victory(
        &mut self,
        difficulty: Difficulty,
        elapsed_ms: Millis,
        uncaptured_planets: usize,
        now: Millis,
    ) -> u64 {
        let reward = victory_reward(&self.config, difficulty, elapsed_ms, uncaptured_planets);
        let bonus = self.challenges.on_game_won(difficulty, elapsed_ms, now);
        self.player.add_coins(reward + bonus);
        if self.player.record_best_time(difficulty, elapsed_ms) {
            tracing::info!(%difficulty, elapsed_ms, "New best time");
        }
        self.save();
        reward + bonus
    }

    /// Write both records. Failures become warnings.
    pub fn save(&mut self) {
        let Some(store) = self.store.as_mut() else {
            return;
        };
        let result = store
            .save_player(&self.player)
            .and_then(|()| store.save_challenges(&self.challenges.to_record()));
        if let Err(err) = result {
            self.warn(format!("Progress not saved: {err}"));
        }
    }

    fn warn(&mut self, message: String) {
        tracing::warn!(%message, "Persistence failure");
        self.warnings.push(PersistenceWarning { message });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planet::PlanetType;

    fn profile_with(store: &MemoryStore) -> Profile {
        Profile::load(&GameConfig::default(), Box::new(store.clone()))
    }

    #[test]
    fn test_mutations_are_saved() {
        let store = MemoryStore::new();
        let mut profile = profile_with(&store);
        profile.player_mut().add_coins(100);
        profile.purchase_upgrade(UpgradeType::ShipDamage, 0).unwrap();
        assert_eq!(store.save_count(), 2);

        let reloaded = profile_with(&store);
        assert_eq!(reloaded.player().upgrade_level(UpgradeType::ShipDamage), 1);
        assert_eq!(reloaded.player().coins(), 85);
        assert_eq!(reloaded.challenges().counters().upgrades_purchased, 1);
    }

    #[test]
    fn test_failed_save_queues_one_warning() {
        let store = MemoryStore::new();
        let mut profile = profile_with(&store);
        profile.player_mut().add_coins(100);
        store.set_fail_saves(true);

        profile.donate_gold(10, 0).unwrap();
        assert_eq!(profile.player().coins(), 90);
        assert_eq!(profile.take_warnings().len(), 1);
        assert!(profile.take_warnings().is_empty());
    }

    #[test]
    fn test_rejected_purchase_does_not_save() {
        let store = MemoryStore::new();
        let mut profile = profile_with(&store);
        assert!(profile.unlock_ability(AbilityType::BlackHole, 0).is_err());
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn test_observe_counts_only_player_events() {
        let mut profile = Profile::ephemeral(&GameConfig::default());
        profile.observe(
            &GameEvent::AbilityUsed {
                operator: OperatorId(2),
                ability: AbilityType::Shield,
            },
            0,
        );
        assert_eq!(profile.challenges().counters().abilities_used, 0);
        profile.observe(
            &GameEvent::PlanetCaptured {
                planet: crate::ids::PlanetId(1),
                by: OperatorId::PLAYER,
                previous: None,
                planet_type: PlanetType::Normal,
            },
            0,
        );
        assert_eq!(profile.challenges().counters().planets_captured, 1);
    }

    #[test]
    fn test_victory_credits_reward_and_best_time() {
        let mut profile = Profile::ephemeral(&GameConfig::default());
        profile.observe(
            &GameEvent::GameStarted {
                difficulty: Difficulty::Medium,
            },
            0,
        );
        let gained = profile.credit_victory(Difficulty::Medium, 200_000, 0, 200_000);
        // 10 + 100 time bonus, plus the Medium perfect-game progress and
        // three planet-type exclusions (3 × 120)
        assert_eq!(gained, 110 + 360);
        assert_eq!(profile.player().coins(), gained);
        assert_eq!(profile.player().best_time(Difficulty::Medium), Some(200_000));
    }
}
