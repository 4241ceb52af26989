//! Crawl controller - the batch loop
//!
//! One batch runs at a time. Each cycle:
//! 1. Takes the range `[checkpoint + 1, checkpoint + batch_size]`
//! 2. Fetches the whole range concurrently
//! 3. Appends newly discovered records to the archive
//! 4. Advances and persists the checkpoint, whatever happened above
//! 5. Stops once enough consecutive batches found nobody
//!
//! The archive is written before the checkpoint. A crash between the two
//! re-fetches part of a range on restart, which the archive's address
//! dedup absorbs.

use crate::config::{Config, CrawlerConfig};
use crate::crawler::executor::{BatchError, BatchExecutor, BatchReport};
use crate::crawler::fetcher::ApiFetcher;
use crate::state::{BatchRange, ControllerState, CrawlState};
use crate::storage::{
    open_storage, CheckpointStore, JsonArchive, JsonCheckpointStore, RecordArchive, StorageError,
};
use crate::ScanError;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Why a batch's discoveries were not persisted
#[derive(Debug, Error)]
pub enum BatchFault {
    #[error("batch execution failed: {0}")]
    Execution(#[from] BatchError),

    #[error("archive write failed: {0}")]
    Archive(#[from] StorageError),
}

/// What a single controller cycle did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchCycle {
    pub range: BatchRange,

    /// Records the batch resolved
    pub found: usize,

    /// Records that were new to the archive
    pub appended: usize,

    pub absent: usize,

    pub failed: usize,

    /// The batch hit an orchestration or archive fault; its discoveries are lost
    pub faulted: bool,

    /// Empty-batch streak after this cycle
    pub consecutive_empty: u32,

    /// Controller state after this cycle
    pub state: ControllerState,
}

/// Totals for a finished crawl
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    pub initial_checkpoint: u64,
    pub final_checkpoint: u64,
    pub batches: u64,
    pub records_found: u64,
    pub records_appended: u64,
    pub absent_ids: u64,
    pub failed_ids: u64,
    pub faulted_batches: u64,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

impl CrawlSummary {
    /// Identifiers covered since the crawl started
    pub fn ids_processed(&self) -> u64 {
        self.final_checkpoint - self.initial_checkpoint
    }
}

/// Identifiers per minute; zero until any time has passed
pub fn throughput_per_minute(ids_processed: u64, elapsed: Duration) -> f64 {
    let minutes = elapsed.as_secs_f64() / 60.0;
    if minutes > 0.0 {
        ids_processed as f64 / minutes
    } else {
        0.0
    }
}

/// Drives batches from the checkpoint until the identifier space runs dry
pub struct CrawlController<C, A> {
    executor: BatchExecutor,
    checkpoints: C,
    archive: A,
    batch_size: u64,
    empty_batch_threshold: u32,
    state: ControllerState,
    checkpoint: CrawlState,
    initial_checkpoint: u64,
    consecutive_empty: u32,
    started_at: DateTime<Utc>,
    started: Instant,
    batches: u64,
    records_found: u64,
    records_appended: u64,
    absent_ids: u64,
    failed_ids: u64,
    faulted_batches: u64,
}

impl CrawlController<JsonCheckpointStore, JsonArchive> {
    /// Builds a controller backed by the API and the configured JSON files
    pub fn from_config(config: &Config) -> Result<Self, ScanError> {
        let fetcher = ApiFetcher::from_config(config)?;
        let executor = BatchExecutor::new(Arc::new(fetcher), config.api.max_connections);
        let (checkpoints, archive) = open_storage(&config.output, config.crawler.seed_id);
        Self::new(executor, checkpoints, archive, &config.crawler)
    }
}

impl<C: CheckpointStore, A: RecordArchive> CrawlController<C, A> {
    /// Creates a controller, loading (or creating) the checkpoint
    ///
    /// # Returns
    ///
    /// * `Err(ScanError::Checkpoint)` - the checkpoint exists but cannot be
    ///   read; the crawl must not start from scratch over it
    pub fn new(
        executor: BatchExecutor,
        mut checkpoints: C,
        archive: A,
        config: &CrawlerConfig,
    ) -> Result<Self, ScanError> {
        let checkpoint = checkpoints.load().map_err(ScanError::Checkpoint)?;

        Ok(Self {
            executor,
            checkpoints,
            archive,
            batch_size: config.batch_size.max(1),
            empty_batch_threshold: config.empty_batch_threshold.max(1),
            state: ControllerState::Running,
            checkpoint,
            initial_checkpoint: checkpoint.last_processed_id,
            consecutive_empty: 0,
            started_at: Utc::now(),
            started: Instant::now(),
            batches: 0,
            records_found: 0,
            records_appended: 0,
            absent_ids: 0,
            failed_ids: 0,
            faulted_batches: 0,
        })
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn checkpoint(&self) -> CrawlState {
        self.checkpoint
    }

    pub fn consecutive_empty(&self) -> u32 {
        self.consecutive_empty
    }

    /// Range the next cycle will request
    pub fn next_range(&self) -> BatchRange {
        self.checkpoint.next_range(self.batch_size)
    }

    pub fn archive(&self) -> &A {
        &self.archive
    }

    /// Runs cycles until the controller stops
    pub async fn run(&mut self) -> Result<CrawlSummary, ScanError> {
        tracing::info!(
            "Starting crawl at id {} (batch size {})",
            self.next_range().start,
            self.batch_size
        );

        while self.step().await?.is_some() {}

        let summary = self.summary();
        tracing::info!(
            "Crawl stopped after {} batches: {} ids, {} records found, {} appended, {} failed ids",
            summary.batches,
            summary.ids_processed(),
            summary.records_found,
            summary.records_appended,
            summary.failed_ids
        );
        Ok(summary)
    }

    /// Performs one batch cycle
    ///
    /// # Returns
    ///
    /// * `Ok(Some(cycle))` - a batch was attempted and the checkpoint advanced
    /// * `Ok(None)` - the controller had already stopped
    /// * `Err(ScanError::Checkpoint)` - the checkpoint could not be persisted
    pub async fn step(&mut self) -> Result<Option<BatchCycle>, ScanError> {
        if self.state.is_terminal() {
            return Ok(None);
        }

        let range = self.next_range();
        tracing::info!("Processing batch {}", range);

        let mut cycle = BatchCycle {
            range,
            found: 0,
            appended: 0,
            absent: 0,
            failed: 0,
            faulted: false,
            consecutive_empty: self.consecutive_empty,
            state: self.state,
        };

        match self.process(&range).await {
            Ok((report, appended)) => {
                cycle.found = report.found.len();
                cycle.appended = appended;
                cycle.absent = report.absent.len();
                cycle.failed = report.failed.len();

                tracing::info!(
                    "Found {} users in batch {} ({} absent, {} failed)",
                    cycle.found,
                    range,
                    cycle.absent,
                    cycle.failed
                );

                if cycle.found == 0 {
                    self.consecutive_empty += 1;
                    tracing::info!(
                        "Batch returned no users ({} in a row)",
                        self.consecutive_empty
                    );
                } else {
                    self.consecutive_empty = 0;
                }

                self.records_found += cycle.found as u64;
                self.records_appended += appended as u64;
                self.absent_ids += cycle.absent as u64;
                self.failed_ids += cycle.failed as u64;
            }
            Err(fault) => {
                // The checkpoint still moves past this range; its discoveries are not retried
                tracing::error!("Batch {} error: {}", range, fault);
                cycle.faulted = true;
                self.faulted_batches += 1;
            }
        }

        self.checkpoint.advance_to(&range);
        self.checkpoints
            .save(&self.checkpoint)
            .map_err(ScanError::Checkpoint)?;
        self.batches += 1;

        if self.consecutive_empty >= self.empty_batch_threshold {
            tracing::info!(
                "No users found in last {} batches. Stopping.",
                self.consecutive_empty
            );
            self.state = ControllerState::Stopped;
        }

        let processed = self.checkpoint.last_processed_id - self.initial_checkpoint;
        tracing::info!(
            "Checkpoint at {} ({:.1} IDs/min)",
            self.checkpoint.last_processed_id,
            throughput_per_minute(processed, self.started.elapsed())
        );

        cycle.consecutive_empty = self.consecutive_empty;
        cycle.state = self.state;
        Ok(Some(cycle))
    }

    async fn process(&mut self, range: &BatchRange) -> Result<(BatchReport, usize), BatchFault> {
        let report = self.executor.run(&range.ids()).await?;
        let appended = if report.found.is_empty() {
            0
        } else {
            self.archive.append(&report.found)?
        };
        Ok((report, appended))
    }

    /// Totals so far
    pub fn summary(&self) -> CrawlSummary {
        CrawlSummary {
            initial_checkpoint: self.initial_checkpoint,
            final_checkpoint: self.checkpoint.last_processed_id,
            batches: self.batches,
            records_found: self.records_found,
            records_appended: self.records_appended,
            absent_ids: self.absent_ids,
            failed_ids: self.failed_ids,
            faulted_batches: self.faulted_batches,
            started_at: self.started_at,
            elapsed: self.started.elapsed(),
        }
    }
}

/// Runs a complete crawl from the configuration
///
/// # Example
///
/// ```no_run
/// use friendscan::config::Config;
/// use friendscan::crawler::run_crawl;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let summary = run_crawl(&Config::default()).await?;
/// println!("Appended {} records", summary.records_appended);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: &Config) -> Result<CrawlSummary, ScanError> {
    let mut controller = CrawlController::from_config(config)?;
    controller.run().await
}
