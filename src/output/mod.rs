//! Output module for crawl reports
//!
//! This module handles:
//! - Inspecting the checkpoint and archive (`--stats`)
//! - Printing the end-of-run summary

pub mod stats;

pub use stats::{load_statistics, print_statistics, ArchiveStatistics};

use crate::crawler::{throughput_per_minute, CrawlSummary};

/// Prints a finished crawl's totals to stdout
pub fn print_summary(summary: &CrawlSummary) {
    println!("=== Crawl Summary ===\n");
    println!(
        "  Started: {}",
        summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("  Elapsed: {:.1}s", summary.elapsed.as_secs_f64());
    println!(
        "  Ids: {} - {} ({} batches)",
        summary.initial_checkpoint + 1,
        summary.final_checkpoint,
        summary.batches
    );
    println!(
        "  Records: {} found, {} new",
        summary.records_found, summary.records_appended
    );
    println!(
        "  Absent ids: {}, failed ids: {}",
        summary.absent_ids, summary.failed_ids
    );
    if summary.faulted_batches > 0 {
        println!(
            "  Faulted batches: {} (their discoveries were not saved)",
            summary.faulted_batches
        );
    }
    println!(
        "  Throughput: {:.1} ids/min",
        throughput_per_minute(summary.ids_processed(), summary.elapsed)
    );
}
