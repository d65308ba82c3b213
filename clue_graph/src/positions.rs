//! Per-script record of user-dragged clue positions.
//!
//! The whole record is one JSON object `{script_id: {clue_id: {x, y}}}`.
//! Every change re-reads the file and replaces only the changed script, so
//! caches for different scripts can share one file. Missing or unreadable
//! files count as an empty record and write failures are only logged; the
//! layout simply recomputes whatever is not cached.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use mystery_model::{ClueId, ScriptId};

use crate::config::app_data_dir;
use crate::layout::Position;

/// Positions cache filename
pub const POSITIONS_FILE: &str = "clue_positions.json";

type PositionRecord = HashMap<ScriptId, HashMap<ClueId, Position>>;

#[derive(Debug, Clone, Default)]
pub struct PositionCache {
    path: Option<PathBuf>,
    record: PositionRecord,
}

impl PositionCache {
    /// Open a cache backed by `path`. The file is created on first write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let record = read_record(&path);
        Self {
            path: Some(path),
            record,
        }
    }

    /// Open the cache in the platform data directory, or in memory if there is none.
    pub fn open_default() -> Self {
        match app_data_dir() {
            Some(dir) => Self::open(dir.join(POSITIONS_FILE)),
            None => {
                tracing::warn!("No data directory available, clue positions will not persist");
                Self::in_memory()
            }
        }
    }

    /// A cache that never touches the disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Saved positions for one script. Empty if none were saved.
    pub fn get(&self, script: ScriptId) -> HashMap<ClueId, Position> {
        self.record.get(&script).cloned().unwrap_or_default()
    }

    pub fn set(&mut self, script: ScriptId, clue: ClueId, position: Position) {
        self.record.entry(script).or_default().insert(clue, position);
        self.persist(script);
    }

    /// Forget every saved position of one script.
    pub fn clear(&mut self, script: ScriptId) {
        if self.record.remove(&script).is_some() {
            self.persist(script);
        }
    }

    fn persist(&mut self, script: ScriptId) {
        let Some(path) = self.path.clone() else {
            return;
        };

        let mut merged = read_record(&path);
        match self.record.get(&script) {
            Some(positions) => {
                merged.insert(script, positions.clone());
            }
            None => {
                merged.remove(&script);
            }
        }

        if let Err(e) = write_record(&path, &merged) {
            tracing::warn!("Failed to save clue positions to {:?}: {}", path, e);
            return;
        }
        self.record = merged;
    }
}

fn read_record(path: &Path) -> PositionRecord {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return PositionRecord::new(),
        Err(e) => {
            tracing::warn!("Failed to read clue positions from {:?}: {}", path, e);
            return PositionRecord::new();
        }
    };

    match serde_json::from_str(&content) {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!("Ignoring corrupt clue positions in {:?}: {}", path, e);
            PositionRecord::new()
        }
    }
}

fn write_record(path: &Path, record: &PositionRecord) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string(record)?;
    std::fs::write(path, json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(POSITIONS_FILE);
        let script = ScriptId::new();
        let clue = ClueId::new();

        let mut cache = PositionCache::open(&path);
        assert!(cache.get(script).is_empty());
        cache.set(script, clue, Position::new(12.5, -3.0));

        let reopened = PositionCache::open(&path);
        assert_eq!(reopened.get(script)[&clue], Position::new(12.5, -3.0));
    }

    #[test]
    fn test_scripts_do_not_collide() {
        let mut cache = PositionCache::in_memory();
        let (first, second) = (ScriptId::new(), ScriptId::new());
        let clue = ClueId::new();

        cache.set(first, clue, Position::new(1.0, 1.0));
        cache.set(second, clue, Position::new(2.0, 2.0));
        cache.clear(first);

        assert!(cache.get(first).is_empty());
        assert_eq!(cache.get(second)[&clue], Position::new(2.0, 2.0));
    }

    #[test]
    fn test_caches_sharing_a_file_keep_each_others_scripts() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(POSITIONS_FILE);
        let (first_script, second_script) = (ScriptId::new(), ScriptId::new());
        let clue = ClueId::new();

        let mut first = PositionCache::open(&path);
        let mut second = PositionCache::open(&path);
        first.set(first_script, clue, Position::new(1.0, 2.0));
        second.set(second_script, clue, Position::new(3.0, 4.0));

        let reopened = PositionCache::open(&path);
        assert_eq!(reopened.get(first_script)[&clue], Position::new(1.0, 2.0));
        assert_eq!(reopened.get(second_script)[&clue], Position::new(3.0, 4.0));

        second.clear(second_script);
        let reopened = PositionCache::open(&path);
        assert_eq!(reopened.get(first_script).len(), 1);
        assert!(reopened.get(second_script).is_empty());
    }

    #[test]
    fn test_corrupt_file_reads_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(POSITIONS_FILE);
        std::fs::write(&path, "{not json").unwrap();

        let mut cache = PositionCache::open(&path);
        let script = ScriptId::new();
        assert!(cache.get(script).is_empty());

        // the next write replaces the corrupt content
        cache.set(script, ClueId::new(), Position::default());
        assert_eq!(PositionCache::open(&path).get(script).len(), 1);
    }

    #[test]
    fn test_unwritable_path_is_not_fatal() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "").unwrap();

        let mut cache = PositionCache::open(blocker.join(POSITIONS_FILE));
        let script = ScriptId::new();
        let clue = ClueId::new();
        cache.set(script, clue, Position::new(4.0, 4.0));

        assert_eq!(cache.get(script)[&clue], Position::new(4.0, 4.0));
    }
}
