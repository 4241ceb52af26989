//! JSON checkpoint file
//!
//! The checkpoint is a single pretty-printed object:
//!
//! ```json
//! {
//!   "lastProcessedId": 110
//! }
//! ```

use crate::state::CrawlState;
use crate::storage::atomic::{ensure_parent_dir, write_json_atomic};
use crate::storage::{CheckpointStore, StorageError, StorageResult};
use std::path::{Path, PathBuf};

/// Checkpoint stored as a JSON file on the local filesystem
#[derive(Debug, Clone)]
pub struct JsonCheckpointStore {
    path: PathBuf,
    seed_id: u64,
}

impl JsonCheckpointStore {
    /// Creates a store at `path`
    ///
    /// `seed_id` becomes the checkpoint when no file exists yet, so the first
    /// batch starts at `seed_id + 1`.
    pub fn new(path: impl Into<PathBuf>, seed_id: u64) -> Self {
        Self {
            path: path.into(),
            seed_id,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the checkpoint without creating a default
    ///
    /// Returns `Ok(None)` when the file does not exist.
    pub fn peek(&self) -> StorageResult<Option<CrawlState>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content)
                .map(Some)
                .map_err(|e| StorageError::corrupt(&self.path, e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(&self.path, e)),
        }
    }
}

impl CheckpointStore for JsonCheckpointStore {
    fn load(&mut self) -> StorageResult<CrawlState> {
        ensure_parent_dir(&self.path)?;

        match self.peek()? {
            Some(state) => {
                tracing::info!(
                    "Found checkpoint {}, resuming from id {}",
                    state.last_processed_id,
                    state.last_processed_id + 1
                );
                Ok(state)
            }
            None => {
                let state = CrawlState::new(self.seed_id);
                tracing::info!(
                    "No checkpoint at {}, creating one at id {}",
                    self.path.display(),
                    self.seed_id
                );
                self.save(&state)?;
                Ok(state)
            }
        }
    }

    fn save(&mut self, state: &CrawlState) -> StorageResult<()> {
        write_json_atomic(&self.path, state)?;
        tracing::debug!("Checkpoint saved at id {}", state.last_processed_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_first_load_creates_default_checkpoint() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data/state.json");
        let mut store = JsonCheckpointStore::new(&path, 10);

        let state = store.load().unwrap();

        assert_eq!(state.last_processed_id, 10);
        assert!(path.exists());
        let on_disk: CrawlState =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk, state);
        assert_eq!(state.next_range(100).start, 11);
        assert_eq!(state.next_range(100).end, 110);
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonCheckpointStore::new(dir.path().join("state.json"), 10);

        store.save(&CrawlState::new(4_210)).unwrap();
        let state = store.load().unwrap();

        assert_eq!(state.last_processed_id, 4_210);
    }

    #[test]
    fn test_save_is_pretty_printed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let mut store = JsonCheckpointStore::new(&path, 10);

        store.save(&CrawlState::new(110)).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "{\n  \"lastProcessedId\": 110\n}");
    }

    #[test]
    fn test_corrupt_checkpoint_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();
        let mut store = JsonCheckpointStore::new(&path, 10);

        let err = store.load().unwrap_err();

        assert!(err.is_corrupt());
        // The corrupt file must be left for inspection, not reset
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn test_unreadable_checkpoint_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        // A directory at the checkpoint path cannot be read as a file
        std::fs::create_dir_all(&path).unwrap();
        let mut store = JsonCheckpointStore::new(&path, 10);

        assert!(matches!(store.load(), Err(StorageError::Io { .. })));
    }

    #[test]
    fn test_peek_does_not_create() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        let store = JsonCheckpointStore::new(&path, 10);

        assert!(store.peek().unwrap().is_none());
        assert!(!path.exists());
    }
}
