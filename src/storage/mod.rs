//! Storage module for persisting crawl progress and results
//!
//! This module handles all file persistence for the crawler:
//! - The checkpoint (`state.json`), the only resume anchor
//! - The record archive (`users.json`), deduplicated by address
//! - Crash-safe replacement of both via write-temp-then-rename

mod archive;
mod atomic;
mod checkpoint;
mod traits;

pub use archive::{filter_new, JsonArchive};
pub use atomic::{temp_path, write_atomic};
pub use checkpoint::JsonCheckpointStore;
pub use traits::{CheckpointStore, RecordArchive, StorageError, StorageResult};

use crate::config::OutputConfig;

/// Opens the checkpoint store and archive named by the output configuration
///
/// Nothing is read or created until the stores are first used.
pub fn open_storage(output: &OutputConfig, seed_id: u64) -> (JsonCheckpointStore, JsonArchive) {
    (
        JsonCheckpointStore::new(&output.state_path, seed_id),
        JsonArchive::new(&output.archive_path),
    )
}
