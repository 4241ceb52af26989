//! HTTP fetcher implementation
//!
//! This module resolves single identifiers against the remote API:
//! - Building the shared HTTP client (proxy, TLS, keep-alive, timeout)
//! - Classifying responses into found / absent / transient failure
//! - Retrying transient failures under a bounded `RetryPolicy`
//!
//! # Response Classification
//!
//! | Response | Outcome |
//! |----------|---------|
//! | Body `message` equals the not-found message (any status) | Absent, not retried |
//! | 2xx with an `address` field | Found |
//! | Other status | Transient, retried |
//! | 2xx body that is not a user object | Transient, retried |
//! | Timeout / connection error | Transient, retried |

use crate::config::{ApiConfig, Config, ProxyConfig};
use crate::crawler::backoff::RetryPolicy;
use crate::state::UserRecord;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, Proxy};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Result of resolving one identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The identifier belongs to a user
    Found(UserRecord),

    /// The API confirmed there is no user with this identifier
    Absent,

    /// Every attempt failed; the identifier is dropped for this run
    Failed {
        /// Attempts made before giving up
        attempts: u32,
        /// Description of the last error
        error: String,
    },
}

impl FetchOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Transient errors from a single request; these are retried, never raised
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("unexpected payload: {0}")]
    Payload(String),
}

/// Resolves identifiers to outcomes
///
/// Implementations are shared across every task of a batch, so they must be
/// usable concurrently without mutation.
#[async_trait]
pub trait RecordFetcher: Send + Sync {
    async fn fetch(&self, id: u64) -> FetchOutcome;
}

/// Builds the HTTP client shared by every fetch
///
/// # Arguments
///
/// * `api` - Timeout, connection cap, TLS and header settings
/// * `proxy` - Optional outbound proxy with basic credentials
pub fn build_http_client(api: &ApiConfig, proxy: Option<&ProxyConfig>) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

    let mut builder = Client::builder()
        .user_agent(api.user_agent.as_str())
        .default_headers(headers)
        .timeout(api.timeout())
        .connect_timeout(api.timeout())
        .pool_max_idle_per_host(api.max_connections)
        .pool_idle_timeout(api.timeout())
        .tcp_keepalive(Duration::from_secs(10))
        .danger_accept_invalid_certs(api.accept_invalid_certs)
        .gzip(true)
        .brotli(true);

    if let Some(proxy_config) = proxy {
        let mut proxy = Proxy::all(proxy_config.url.as_str())?;
        if let Some(username) = &proxy_config.username {
            proxy = proxy.basic_auth(username, proxy_config.password.as_deref().unwrap_or(""));
        }
        builder = builder.proxy(proxy);
    }

    builder.build()
}

/// Classifies one API response
///
/// # Returns
///
/// * `Ok(Some(record))` - the identifier resolved to a user
/// * `Ok(None)` - the API's not-found payload
/// * `Err(FetchError)` - anything else; worth retrying
pub fn classify_response(
    id: u64,
    status: u16,
    body: &str,
    not_found_message: &str,
) -> Result<Option<UserRecord>, FetchError> {
    let value: Option<Value> = serde_json::from_str(body).ok();

    let message = value
        .as_ref()
        .and_then(|v| v.get("message"))
        .and_then(Value::as_str);
    if message == Some(not_found_message) {
        return Ok(None);
    }

    if !(200..300).contains(&status) {
        return Err(FetchError::Status(status));
    }

    let value = value.ok_or_else(|| FetchError::Payload("body is not JSON".to_string()))?;
    let field = |name: &str| value.get(name).and_then(Value::as_str).map(str::to_string);

    let address = field("address")
        .filter(|a| !a.is_empty())
        .ok_or_else(|| FetchError::Payload("missing address".to_string()))?;

    Ok(Some(UserRecord {
        id,
        address,
        twitter_username: field("twitterUsername").unwrap_or_default(),
        twitter_name: field("twitterName").unwrap_or_default(),
    }))
}

/// Fetcher for the `/users/by-id/{id}` endpoint
#[derive(Debug, Clone)]
pub struct ApiFetcher {
    client: Client,
    base_url: String,
    not_found_message: String,
    retry: RetryPolicy,
}

impl ApiFetcher {
    pub fn new(client: Client, api: &ApiConfig, retry: RetryPolicy) -> Self {
        Self {
            client,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            not_found_message: api.not_found_message.clone(),
            retry,
        }
    }

    /// Builds the client and retry policy from the full configuration
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let client = build_http_client(&config.api, config.proxy.as_ref())?;
        Ok(Self::new(
            client,
            &config.api,
            RetryPolicy::from_config(&config.crawler),
        ))
    }

    pub fn user_url(&self, id: u64) -> String {
        format!("{}/users/by-id/{}", self.base_url, id)
    }

    async fn fetch_once(&self, id: u64) -> Result<Option<UserRecord>, FetchError> {
        let response = self.client.get(self.user_url(id)).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        classify_response(id, status, &body, &self.not_found_message)
    }
}

#[async_trait]
impl RecordFetcher for ApiFetcher {
    async fn fetch(&self, id: u64) -> FetchOutcome {
        let label = format!("id {}", id);
        match self.retry.run(&label, |_| self.fetch_once(id)).await {
            Ok(Some(record)) => {
                tracing::debug!("ID {}: found user {}", id, record.twitter_username);
                FetchOutcome::Found(record)
            }
            Ok(None) => {
                tracing::debug!("ID {}: user not found", id);
                FetchOutcome::Absent
            }
            Err(exhausted) => {
                tracing::error!(
                    "Failed to fetch ID {} after {} attempts: {}",
                    id,
                    exhausted.attempts,
                    exhausted.last_error
                );
                FetchOutcome::Failed {
                    attempts: exhausted.attempts,
                    error: exhausted.last_error.to_string(),
                }
            }
        }
    }
}
