/// Crawl progress definitions
///
/// `CrawlState` is the persisted resume anchor; `ControllerState` and
/// `BatchRange` describe the batch loop while it runs.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Persisted crawl progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlState {
    /// Highest identifier whose batch has been attempted and persisted
    pub last_processed_id: u64,
}

impl CrawlState {
    pub fn new(last_processed_id: u64) -> Self {
        Self { last_processed_id }
    }

    /// The range the next batch must cover
    ///
    /// Resumption is exclusive of the checkpoint: nothing at or below
    /// `last_processed_id` is requested again.
    pub fn next_range(&self, batch_size: u64) -> BatchRange {
        let start = self.last_processed_id + 1;
        BatchRange {
            start,
            end: start + batch_size.saturating_sub(1),
        }
    }

    /// Moves the checkpoint to the end of an attempted range
    ///
    /// The checkpoint never moves backwards.
    pub fn advance_to(&mut self, range: &BatchRange) {
        self.last_processed_id = self.last_processed_id.max(range.end);
    }
}

/// An inclusive range of sequential identifiers processed as one unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchRange {
    pub start: u64,
    pub end: u64,
}

impl BatchRange {
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    pub fn ids(&self) -> Vec<u64> {
        (self.start..=self.end).collect()
    }
}

impl fmt::Display for BatchRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Lifecycle of the batch loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerState {
    /// Batches are still being issued
    Running,

    /// The identifier space looks exhausted; terminal
    Stopped,
}

impl ControllerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped)
    }
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}
