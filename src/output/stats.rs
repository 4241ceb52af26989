//! Statistics over the checkpoint and archive files
//!
//! This module provides functionality for inspecting a crawl's output
//! without modifying it: nothing here creates a missing checkpoint or
//! rewrites a damaged archive.

use crate::state::CrawlState;
use crate::storage::{JsonArchive, JsonCheckpointStore, RecordArchive};
use crate::ScanError;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Crawl output summary
#[derive(Debug, Clone)]
pub struct ArchiveStatistics {
    /// Persisted checkpoint, if a crawl has ever started
    pub checkpoint: Option<CrawlState>,

    /// Number of records in the archive
    pub total_records: u64,

    /// Distinct lowercased addresses (equals `total_records` for a healthy archive)
    pub unique_addresses: u64,

    /// Lowest and highest record id
    pub id_span: Option<(u64, u64)>,

    /// Records with neither a twitter username nor a display name
    pub records_without_twitter: u64,

    /// Last modification of the archive file
    pub archive_modified: Option<DateTime<Utc>>,
}

impl ArchiveStatistics {
    /// Records found per identifier attempted since the seed
    pub fn hit_rate(&self, seed_id: u64) -> Option<f64> {
        let checkpoint = self.checkpoint?;
        let attempted = checkpoint.last_processed_id.checked_sub(seed_id)?;
        if attempted == 0 {
            return None;
        }
        Some(self.total_records as f64 / attempted as f64)
    }
}

/// Loads statistics from the checkpoint and archive
///
/// # Returns
///
/// * `Ok(ArchiveStatistics)` - Successfully loaded statistics
/// * `Err(ScanError)` - A file exists but cannot be read or parsed
pub fn load_statistics(
    checkpoint: &JsonCheckpointStore,
    archive: &JsonArchive,
) -> Result<ArchiveStatistics, ScanError> {
    let state = checkpoint.peek().map_err(ScanError::Checkpoint)?;
    let records = archive.records().map_err(ScanError::Archive)?;

    let unique: HashSet<String> = records.iter().map(|r| r.dedup_key()).collect();
    let id_span = records
        .iter()
        .map(|r| r.id)
        .min()
        .zip(records.iter().map(|r| r.id).max());
    let records_without_twitter = records
        .iter()
        .filter(|r| r.twitter_username.is_empty() && r.twitter_name.is_empty())
        .count() as u64;

    let archive_modified = std::fs::metadata(archive.path())
        .and_then(|m| m.modified())
        .ok()
        .map(DateTime::<Utc>::from);

    Ok(ArchiveStatistics {
        checkpoint: state,
        total_records: records.len() as u64,
        unique_addresses: unique.len() as u64,
        id_span,
        records_without_twitter,
        archive_modified,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &ArchiveStatistics, seed_id: u64, batch_size: u64) {
    println!("=== Crawl Statistics ===\n");

    println!("Checkpoint:");
    match stats.checkpoint {
        Some(state) => {
            let next = state.next_range(batch_size);
            println!("  Last processed id: {}", state.last_processed_id);
            println!("  Next batch: {}", next);
        }
        None => println!("  No checkpoint yet (first batch starts at {})", seed_id + 1),
    }
    println!();

    println!("Archive:");
    println!("  Total records: {}", stats.total_records);
    println!("  Unique addresses: {}", stats.unique_addresses);
    if let Some((low, high)) = stats.id_span {
        println!("  Id span: {} - {}", low, high);
    }
    println!(
        "  Records without twitter data: {}",
        stats.records_without_twitter
    );
    if let Some(modified) = stats.archive_modified {
        println!("  Last written: {}", modified.format("%Y-%m-%d %H:%M:%S UTC"));
    }

    if stats.unique_addresses != stats.total_records {
        println!(
            "\n  Warning: {} records share an address with another record",
            stats.total_records - stats.unique_addresses
        );
    }

    if let Some(rate) = stats.hit_rate(seed_id) {
        println!("\nHit Rate: {:.1}% of attempted ids resolved to a user", rate * 100.0);
    }
}
