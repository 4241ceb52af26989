use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Browser-like user agent sent with every API request
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36";

/// Main configuration structure for friendscan
///
/// Every section falls back to its defaults, so an empty TOML document
/// describes the stock crawl.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Batch loop configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Checkpoint written on the very first run; crawling starts after it
    #[serde(rename = "seed-id")]
    pub seed_id: u64,

    /// Number of sequential identifiers fetched per batch
    #[serde(rename = "batch-size")]
    pub batch_size: u64,

    /// Consecutive batches without a single record before the crawl stops
    #[serde(rename = "empty-batch-threshold")]
    pub empty_batch_threshold: u32,

    /// Total attempts per identifier, including the first
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Base of the linear retry delay (milliseconds)
    #[serde(rename = "retry-base-delay-ms")]
    pub retry_base_delay_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            seed_id: 10,
            batch_size: 100,
            empty_batch_threshold: 3,
            max_attempts: 3,
            retry_base_delay_ms: 500,
        }
    }
}

impl CrawlerConfig {
    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

/// Remote API and transport configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Scheme and host of the API; ids are requested at `{base-url}/users/by-id/{id}`
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// `message` value the API returns for an unknown identifier
    #[serde(rename = "not-found-message")]
    pub not_found_message: String,

    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Upper bound on simultaneous requests and pooled connections
    #[serde(rename = "max-connections")]
    pub max_connections: usize,

    /// Skip TLS certificate verification (needed behind intercepting proxies)
    #[serde(rename = "accept-invalid-certs")]
    pub accept_invalid_certs: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://prod-api.kosetto.com".to_string(),
            not_found_message: "Address/User not found.".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 10,
            max_connections: 100,
            accept_invalid_certs: true,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Outbound proxy; credentials are passed through as HTTP basic auth
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the checkpoint file
    #[serde(rename = "state-path")]
    pub state_path: PathBuf,

    /// Path to the record archive
    #[serde(rename = "archive-path")]
    pub archive_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            state_path: PathBuf::from("data/state.json"),
            archive_path: PathBuf::from("data/users.json"),
        }
    }
}
