use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("checkpoint io: {0}")]
    Io(#[from] std::io::Error),
    #[error("checkpoint state corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedMessage {
    pub id: String,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct State {
    last_checked: DateTime<Utc>,
    processed: Vec<ProcessedMessage>,
}

/// Durable scan boundary for the recharge monitor.
///
/// Holds the cursor ("messages processed up to here") plus the ids applied
/// since the cursor last advanced, so replaying a window after a crash is a
/// no-op. Persisted as a JSON file, rewritten on every mutation.
pub struct CheckpointStore {
    path: PathBuf,
    state: State,
}

impl CheckpointStore {
    /// Open the store in `dir`, starting from `initial` when no state file
    /// exists yet.
    pub fn open(dir: &Path, initial: DateTime<Utc>) -> Result<Self, CheckpointError> {
        fs::create_dir_all(dir)?;
        let path = dir.join("checkpoint.json");
        let state = if path.exists() {
            serde_json::from_str(&fs::read_to_string(&path)?)?
        } else {
            State {
                last_checked: initial,
                processed: Vec::new(),
            }
        };
        Ok(Self { path, state })
    }

    pub fn last_checked(&self) -> DateTime<Utc> {
        self.state.last_checked
    }

    pub fn is_processed(&self, id: &str) -> bool {
        self.state.processed.iter().any(|p| p.id == id)
    }

    pub fn mark_processed(
        &mut self,
        id: &str,
        received_at: DateTime<Utc>,
    ) -> Result<(), CheckpointError> {
        self.state.processed.push(ProcessedMessage {
            id: id.to_string(),
            received_at,
        });
        self.persist()
    }

    /// Advance the cursor. Ids received at or before the new cursor can never
    /// be fetched again, so they are pruned; anything newer stays to guard
    /// the next window.
    pub fn advance(&mut self, to: DateTime<Utc>) -> Result<(), CheckpointError> {
        self.state.last_checked = to;
        self.state.processed.retain(|p| p.received_at > to);
        self.persist()
    }

    fn persist(&self) -> Result<(), CheckpointError> {
        let data = serde_json::to_string_pretty(&self.state)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_open_starts_from_initial() {
        let dir = tempdir().unwrap();
        let store = CheckpointStore::open(dir.path(), at(1000)).unwrap();

        assert_eq!(store.last_checked(), at(1000));
        assert!(!store.is_processed("msg-001"));
    }

    #[test]
    fn test_mark_and_advance_survive_reopen() {
        let dir = tempdir().unwrap();

        let mut store = CheckpointStore::open(dir.path(), at(1000)).unwrap();
        store.mark_processed("msg-001", at(1500)).unwrap();
        store.advance(at(1200)).unwrap();

        let reopened = CheckpointStore::open(dir.path(), at(9999)).unwrap();
        assert_eq!(reopened.last_checked(), at(1200));
        assert!(reopened.is_processed("msg-001"));
    }

    #[test]
    fn test_advance_prunes_ids_at_or_before_cursor() {
        let dir = tempdir().unwrap();
        let mut store = CheckpointStore::open(dir.path(), at(1000)).unwrap();

        store.mark_processed("old", at(1100)).unwrap();
        store.mark_processed("boundary", at(1200)).unwrap();
        store.mark_processed("fresh", at(1300)).unwrap();
        store.advance(at(1200)).unwrap();

        assert!(!store.is_processed("old"));
        assert!(!store.is_processed("boundary"));
        assert!(store.is_processed("fresh"));
    }

    #[test]
    fn test_unadvanced_marks_persist_for_replay() {
        let dir = tempdir().unwrap();

        // Crash before advance: the mark is already durable.
        let mut store = CheckpointStore::open(dir.path(), at(1000)).unwrap();
        store.mark_processed("msg-001", at(1500)).unwrap();
        drop(store);

        let reopened = CheckpointStore::open(dir.path(), at(0)).unwrap();
        assert_eq!(reopened.last_checked(), at(1000));
        assert!(reopened.is_processed("msg-001"));
    }

    #[test]
    fn test_corrupt_state_is_an_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("checkpoint.json"), "not json").unwrap();

        let result = CheckpointStore::open(dir.path(), at(1000));
        assert!(matches!(result, Err(CheckpointError::Corrupt(_))));
    }
}
