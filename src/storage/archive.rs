//! JSON record archive
//!
//! The archive is a pretty-printed JSON array of user records in append
//! order. It is rewritten in full on every update through a temporary
//! sibling and a rename, so readers never see a partial array.

use crate::state::UserRecord;
use crate::storage::atomic::write_json_atomic;
use crate::storage::{RecordArchive, StorageError, StorageResult};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Record archive stored as a JSON file on the local filesystem
#[derive(Debug, Clone)]
pub struct JsonArchive {
    path: PathBuf,
}

impl JsonArchive {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the current collection for merging
    ///
    /// A missing, blank, unreadable or unparseable archive all count as
    /// empty. The corrupt cases are logged, since records that only lived
    /// in the damaged file will not come back.
    fn load_for_merge(&self) -> Vec<UserRecord> {
        match self.records() {
            Ok(records) => {
                tracing::debug!("Loaded {} existing records", records.len());
                records
            }
            Err(e) => {
                tracing::warn!("Archive unusable, starting fresh: {}", e);
                Vec::new()
            }
        }
    }
}

/// Filters `incoming` down to records whose address is not in `existing`
///
/// Matching ignores ASCII case. Duplicates inside `incoming` are not
/// collapsed: ids are unique upstream and each id maps to one address.
pub fn filter_new<'a>(existing: &[UserRecord], incoming: &'a [UserRecord]) -> Vec<&'a UserRecord> {
    let known: HashSet<String> = existing.iter().map(UserRecord::dedup_key).collect();
    incoming
        .iter()
        .filter(|record| !known.contains(&record.dedup_key()))
        .collect()
}

impl RecordArchive for JsonArchive {
    fn append(&mut self, records: &[UserRecord]) -> StorageResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut all = self.load_for_merge();
        let fresh: Vec<UserRecord> = filter_new(&all, records).into_iter().cloned().collect();

        if fresh.is_empty() {
            tracing::info!("All {} records were already archived", records.len());
            return Ok(0);
        }

        let appended = fresh.len();
        all.extend(fresh);
        write_json_atomic(&self.path, &all)?;

        tracing::info!(
            "Saved {} new records (batch had {}, archive now {})",
            appended,
            records.len(),
            all.len()
        );
        Ok(appended)
    }

    fn records(&self) -> StorageResult<Vec<UserRecord>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(&self.path, e)),
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content).map_err(|e| StorageError::corrupt(&self.path, e))
    }
}
