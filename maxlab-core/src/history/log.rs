//! History storage backends

use super::store::Turn;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Ordered, append-only turn storage
pub trait HistoryStore: Send {
    /// Append a turn. A timestamp earlier than the last stored turn is
    /// clamped so timestamps never go backwards.
    fn append(&mut self, turn: Turn) -> crate::Result<()>;

    /// Load every stored turn in insertion order
    fn load(&self) -> crate::Result<Vec<Turn>>;

    /// Remove every stored turn
    fn clear(&mut self) -> crate::Result<()>;
}

fn clamp_timestamp(turns: &[Turn], mut turn: Turn) -> Turn {
    if let Some(last) = turns.last() {
        if turn.timestamp < last.timestamp {
            turn.timestamp = last.timestamp;
        }
    }
    turn
}

/// History kept in memory only
#[derive(Debug, Default, Clone)]
pub struct MemoryHistory {
    turns: Vec<Turn>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for MemoryHistory {
    fn append(&mut self, turn: Turn) -> crate::Result<()> {
        let turn = clamp_timestamp(&self.turns, turn);
        self.turns.push(turn);
        Ok(())
    }

    fn load(&self) -> crate::Result<Vec<Turn>> {
        Ok(self.turns.clone())
    }

    fn clear(&mut self) -> crate::Result<()> {
        self.turns.clear();
        Ok(())
    }
}

/// History persisted as a pretty-printed JSON array, rewritten in full on
/// every change
#[derive(Debug)]
pub struct JsonHistoryFile {
    path: PathBuf,
    turns: Vec<Turn>,
}

impl JsonHistoryFile {
    /// Start an empty history at `path` without reading it
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            turns: Vec::new(),
        }
    }

    /// Open the history at `path`; a missing file is an empty history
    pub fn open<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let mut history = Self::new(path);
        history.turns = history.read()?;
        debug!(
            "Loaded {} turns from {}",
            history.turns.len(),
            history.path.display()
        );
        Ok(history)
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of turns held
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    fn read(&self) -> crate::Result<Vec<Turn>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&content).map_err(|e| {
            crate::Error::History(format!("{} is not a turn list: {}", self.path.display(), e))
        })
    }

    fn write(&self) -> crate::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(&self.turns)?;
        std::fs::write(&self.path, content)?;
        debug!("History saved ({} turns)", self.turns.len());
        Ok(())
    }
}

impl HistoryStore for JsonHistoryFile {
    fn append(&mut self, turn: Turn) -> crate::Result<()> {
        let turn = clamp_timestamp(&self.turns, turn);
        self.turns.push(turn);
        self.write()
    }

    fn load(&self) -> crate::Result<Vec<Turn>> {
        self.read()
    }

    fn clear(&mut self) -> crate::Result<()> {
        self.turns.clear();
        self.write()
    }
}

#[cfg(test)]
mod tests {
    use super::super::store::Role;
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_append_and_reload_preserves_order() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("chat_history.json");

        let mut history = JsonHistoryFile::new(&path);
        let turns: Vec<Turn> = (0..6)
            .map(|i| {
                if i % 2 == 0 {
                    Turn::user(format!("question {}", i))
                } else {
                    Turn::assistant(format!("**answer** {} ✅", i))
                }
            })
            .collect();
        for turn in &turns {
            history.append(turn.clone()).unwrap();
        }

        let reopened = JsonHistoryFile::open(&path).unwrap();
        let loaded = reopened.load().unwrap();
        assert_eq!(loaded, turns);
        assert_eq!(reopened.len(), 6);
    }

    #[test]
    fn test_file_is_a_plain_json_array() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("h.json");
        let mut history = JsonHistoryFile::new(&path);
        history.append(Turn::user("héllo")).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let array = value.as_array().unwrap();
        assert_eq!(array.len(), 1);
        assert_eq!(array[0]["role"], "user");
        assert_eq!(array[0]["content"], "héllo");
        assert!(raw.contains("héllo"));
    }

    #[test]
    fn test_missing_file_opens_empty() {
        let temp_dir = TempDir::new().unwrap();
        let history = JsonHistoryFile::open(temp_dir.path().join("absent.json")).unwrap();
        assert!(history.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("h.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = JsonHistoryFile::open(&path).unwrap_err();
        assert!(matches!(err, crate::Error::History(_)));
    }

    #[test]
    fn test_clear_rewrites_empty_array() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("h.json");
        let mut history = JsonHistoryFile::new(&path);
        history.append(Turn::user("one")).unwrap();
        history.clear().unwrap();

        assert!(history.load().unwrap().is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "[]");
    }

    #[test]
    fn test_timestamps_never_go_backwards() {
        let mut history = MemoryHistory::new();
        let first = Turn::user("first");
        let mut earlier = Turn::assistant("second");
        earlier.timestamp = first.timestamp - Duration::seconds(30);

        history.append(first.clone()).unwrap();
        history.append(earlier).unwrap();

        let turns = history.load().unwrap();
        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(turns[1].timestamp, first.timestamp);
    }
}
