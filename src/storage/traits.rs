//! Storage traits and error types
//!
//! This module defines the trait interfaces the crawl controller persists
//! through, and the errors they report.

use crate::state::{CrawlState, UserRecord};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Corrupt file {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn corrupt(path: &Path, source: serde_json::Error) -> Self {
        Self::Corrupt {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Returns true if the underlying file exists but could not be parsed
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt { .. })
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persistence for the single resume anchor
pub trait CheckpointStore {
    /// Loads the checkpoint
    ///
    /// When no checkpoint exists yet, a default one is created, written
    /// and returned. Any other failure (unreadable or unparseable file) is
    /// returned as an error; progress must never be silently reset.
    fn load(&mut self) -> StorageResult<CrawlState>;

    /// Overwrites the checkpoint
    fn save(&mut self, state: &CrawlState) -> StorageResult<()>;
}

/// Durable, deduplicated collection of discovered records
pub trait RecordArchive {
    /// Appends the records whose address is not already archived
    ///
    /// # Returns
    ///
    /// The number of records actually written, which may be smaller than
    /// `records.len()` when some addresses are already present.
    fn append(&mut self, records: &[UserRecord]) -> StorageResult<usize>;

    /// Reads every archived record
    ///
    /// Unlike `append`, this does not paper over a corrupt archive.
    fn records(&self) -> StorageResult<Vec<UserRecord>>;
}
