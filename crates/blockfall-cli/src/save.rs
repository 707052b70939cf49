use std::{fs, io, path::Path};

use anyhow::Context;
use blockfall_engine::SessionSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::util;

/// A paused game written on quit and picked up on the next start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedGame {
    pub saved_at: DateTime<Utc>,
    pub score: u64,
    pub session: SessionSnapshot,
}

pub fn load(path: &Path) -> anyhow::Result<SavedGame> {
    let saved: SavedGame = util::read_json_file("save", path)?;
    saved
        .session
        .validate()
        .with_context(|| format!("Invalid saved session: {}", path.display()))?;
    Ok(saved)
}

pub fn store(path: &Path, saved: &SavedGame) -> anyhow::Result<()> {
    util::write_json_file("save", path, saved)
}

/// Deletes the save file; a missing file is not an error.
pub fn remove(path: &Path) -> anyhow::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => {
            Err(e).with_context(|| format!("Failed to remove save file: {}", path.display()))
        }
    }
}

#[cfg(test)]
mod tests {
    use blockfall_engine::{GameConfig, GameSession, PieceSeed};

    use super::*;

    #[test]
    fn test_store_load_remove() {
        let path = util::temp_path("save/game.json");
        let session = GameSession::new(GameConfig::default(), PieceSeed::from_bytes([7; 16]));
        let saved = SavedGame {
            saved_at: DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
            score: 42,
            session: session.snapshot(),
        };

        store(&path, &saved).unwrap();
        assert_eq!(load(&path).unwrap(), saved);

        remove(&path).unwrap();
        assert!(!path.exists());
        remove(&path).unwrap();
    }

    #[test]
    fn test_load_rejects_illegal_piece() {
        let path = util::temp_path("save/illegal.json");
        let json = r#"{
            "saved_at": "2024-01-01T00:00:00Z",
            "score": 1,
            "session": {"field": "4x2:0,2", "piece": "O#0@1,0"}
        }"#;
        util::create_parent_dir(&path).unwrap();
        fs::write(&path, json).unwrap();

        let err = load(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid saved session"), "{err}");
        remove(&path).unwrap();
    }
}
