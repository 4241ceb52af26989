//! Crawler module for identifier resolution and batch orchestration
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with bounded retry (`fetcher`, `backoff`)
//! - Concurrent settle-all batch execution (`executor`)
//! - The checkpointed batch loop (`controller`)

mod backoff;
mod controller;
mod executor;
mod fetcher;

pub use backoff::{RetryExhausted, RetryPolicy};
pub use controller::{
    run_crawl, throughput_per_minute, BatchCycle, BatchFault, CrawlController, CrawlSummary,
};
pub use executor::{BatchError, BatchExecutor, BatchReport};
pub use fetcher::{
    build_http_client, classify_response, ApiFetcher, FetchError, FetchOutcome, RecordFetcher,
};

use crate::config::Config;
use crate::ScanError;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Load or create the checkpoint
/// 2. Build the HTTP client
/// 3. Issue batches until `empty-batch-threshold` in a row come back empty
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - Crawl stopped on an exhausted identifier space
/// * `Err(ScanError)` - Checkpoint corruption or setup failure
pub async fn crawl(config: &Config) -> Result<CrawlSummary, ScanError> {
    run_crawl(config).await
}
