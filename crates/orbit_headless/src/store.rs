//! File-backed progress store.
//!
//! One RON file per record in a directory:
//!
//! ```text
//! <dir>/player.ron
//! <dir>/challenges.ron
//! ```
//!
//! Writes go to a temporary file that is then renamed over the record,
//! so a crash mid-save leaves the previous record intact.

use std::fs;
use std::path::{Path, PathBuf};

use orbit_core::challenges::ChallengeRecord;
use orbit_core::persistence::{PlayerRecord, ProgressStore, StoreError};
use ron::ser::PrettyConfig;
use serde::de::DeserializeOwned;
use serde::Serialize;

const PLAYER_FILE: &str = "player.ron";
const CHALLENGES_FILE: &str = "challenges.ron";

/// Progress records as RON files in one directory.
#[derive(Debug, Clone)]
pub struct RonFileStore {
    dir: PathBuf,
}

impl RonFileStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    /// Directory holding the records.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, StoreError> {
        let path = self.dir.join(name);
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path).map_err(|source| StoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Some(ron::from_str(&text)?))
    }

    fn write<T: Serialize>(&self, name: &str, record: &T) -> Result<(), StoreError> {
        let path = self.dir.join(name);
        let text = ron::ser::to_string_pretty(record, PrettyConfig::default())?;
        let tmp = path.with_extension("ron.tmp");
        let io_err = |source| StoreError::Io {
            path: path.display().to_string(),
            source,
        };
        fs::write(&tmp, text).map_err(io_err)?;
        fs::rename(&tmp, &path).map_err(io_err)?;
        tracing::debug!(path = %path.display(), "Record saved");
        Ok(())
    }
}

impl ProgressStore for RonFileStore {
    fn load_player(&self) -> Result<Option<PlayerRecord>, StoreError> {
        self.read(PLAYER_FILE)
    }

    fn save_player(&mut self, record: &PlayerRecord) -> Result<(), StoreError> {
        self.write(PLAYER_FILE, record)
    }

    fn load_challenges(&self) -> Result<Option<ChallengeRecord>, StoreError> {
        self.read(CHALLENGES_FILE)
    }

    fn save_challenges(&mut self, record: &ChallengeRecord) -> Result<(), StoreError> {
        self.write(CHALLENGES_FILE, record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbit_core::abilities::AbilityType;
    use orbit_core::config::GameConfig;
    use orbit_core::persistence::Profile;
    use orbit_core::progression::{PlayerData, UpgradeType};

    #[test]
    fn test_missing_records_load_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = RonFileStore::open(dir.path()).unwrap();
        assert!(store.load_player().unwrap().is_none());
        assert!(store.load_challenges().unwrap().is_none());
    }

    #[test]
    fn test_player_record_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = RonFileStore::open(dir.path().join("profile")).unwrap();
        let mut player = PlayerData::new();
        player.add_coins(1234);
        player.set_upgrade_level(UpgradeType::ShipSpeed, 3);
        player.set_ability_level(AbilityType::BlackHole, 2);
        store.save_player(&player).unwrap();

        assert!(store.dir().join(PLAYER_FILE).exists());
        assert!(!store.dir().join("player.ron.tmp").exists());
        assert_eq!(store.load_player().unwrap(), Some(player));
    }

    #[test]
    fn test_corrupt_record_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(PLAYER_FILE), "(coins: \"lots\"").unwrap();
        let store = RonFileStore::open(dir.path()).unwrap();
        assert!(matches!(store.load_player(), Err(StoreError::Decode(_))));
    }

    #[test]
    fn test_profile_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let config = GameConfig::default();
        {
            let store = RonFileStore::open(dir.path()).unwrap();
            let mut profile = Profile::load(&config, Box::new(store));
            profile.player_mut().add_coins(500);
            profile.purchase_upgrade(UpgradeType::ShipSpeed, 0).unwrap();
        }
        let store = RonFileStore::open(dir.path()).unwrap();
        let profile = Profile::load(&config, Box::new(store));
        assert_eq!(profile.player().upgrade_level(UpgradeType::ShipSpeed), 1);
        assert!(profile.player().coins() < 500);
    }
}
