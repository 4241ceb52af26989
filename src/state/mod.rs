//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `UserRecord`: a resolved user, the unit stored in the archive
//! - `CrawlState`: the persisted checkpoint (last processed identifier)
//! - `BatchRange`: the contiguous identifiers covered by one batch
//! - `ControllerState`: whether the batch loop is still running

mod crawl_state;
mod record;

// Re-export main types
pub use crawl_state::{BatchRange, ControllerState, CrawlState};
pub use record::UserRecord;
