//! friendscan: a resumable user-id crawler
//!
//! This crate walks a sequential numeric identifier space exposed by a remote
//! HTTP API, resolves each identifier to a user record, and accumulates the
//! discovered records into a deduplicated JSON archive that survives restarts
//! and partial writes.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for friendscan operations
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[source] storage::StorageError),

    #[error("Archive error: {0}")]
    Archive(#[source] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for friendscan operations
pub type Result<T> = std::result::Result<T, ScanError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlController, FetchOutcome};
pub use state::{ControllerState, CrawlState, UserRecord};
pub use storage::{JsonArchive, JsonCheckpointStore};
