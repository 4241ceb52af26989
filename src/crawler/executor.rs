//! Concurrent batch execution
//!
//! Every identifier of a batch is fetched on its own task. The executor
//! waits for all of them to settle; one identifier failing never cancels
//! its siblings. A semaphore keeps the number of in-flight requests under
//! the transport's connection cap.

use crate::crawler::fetcher::{FetchOutcome, RecordFetcher};
use crate::state::UserRecord;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Orchestration failures, as opposed to individual fetch failures
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("{failed} of {total} fetch tasks did not complete: {message}")]
    Worker {
        failed: usize,
        total: usize,
        message: String,
    },
}

/// Everything a batch learned, per identifier class
///
/// Only `found` is persisted today. `absent` and `failed` are kept apart so a
/// caller can tell a confirmed gap from an identifier that should be retried.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Resolved records, ordered by id
    pub found: Vec<UserRecord>,

    /// Identifiers the API confirmed do not exist
    pub absent: Vec<u64>,

    /// Identifiers that exhausted their retries
    pub failed: Vec<u64>,
}

impl BatchReport {
    fn record(&mut self, id: u64, outcome: FetchOutcome) {
        match outcome {
            FetchOutcome::Found(record) => self.found.push(record),
            FetchOutcome::Absent => self.absent.push(id),
            FetchOutcome::Failed { .. } => self.failed.push(id),
        }
    }

    fn sort(&mut self) {
        self.found.sort_by_key(|r| r.id);
        self.absent.sort_unstable();
        self.failed.sort_unstable();
    }

    /// Total identifiers accounted for
    pub fn settled(&self) -> usize {
        self.found.len() + self.absent.len() + self.failed.len()
    }
}

/// Fans a batch of identifiers out to a shared fetcher
#[derive(Clone)]
pub struct BatchExecutor {
    fetcher: Arc<dyn RecordFetcher>,
    limiter: Arc<Semaphore>,
}

impl BatchExecutor {
    /// Creates an executor allowing at most `max_in_flight` concurrent fetches
    pub fn new(fetcher: Arc<dyn RecordFetcher>, max_in_flight: usize) -> Self {
        Self {
            fetcher,
            limiter: Arc::new(Semaphore::new(max_in_flight.max(1))),
        }
    }

    /// Fetches every identifier and waits for all of them to settle
    ///
    /// # Returns
    ///
    /// * `Ok(BatchReport)` - every task completed (whatever its outcome)
    /// * `Err(BatchError)` - at least one task panicked or was cancelled;
    ///   the remaining tasks are still awaited before returning
    pub async fn run(&self, ids: &[u64]) -> Result<BatchReport, BatchError> {
        let mut tasks = JoinSet::new();

        for &id in ids {
            let fetcher = Arc::clone(&self.fetcher);
            let limiter = Arc::clone(&self.limiter);
            tasks.spawn(async move {
                let _permit = limiter.acquire_owned().await.ok();
                (id, fetcher.fetch(id).await)
            });
        }

        let mut report = BatchReport::default();
        let mut failed_tasks = 0;
        let mut first_failure = None;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((id, outcome)) => report.record(id, outcome),
                Err(e) => {
                    tracing::error!("Fetch task did not complete: {}", e);
                    failed_tasks += 1;
                    first_failure.get_or_insert_with(|| e.to_string());
                }
            }
        }

        if let Some(message) = first_failure {
            return Err(BatchError::Worker {
                failed: failed_tasks,
                total: ids.len(),
                message,
            });
        }

        report.sort();
        tracing::debug!(
            "Batch settled: {} found, {} absent, {} failed",
            report.found.len(),
            report.absent.len(),
            report.failed.len()
        );
        Ok(report)
    }
}
