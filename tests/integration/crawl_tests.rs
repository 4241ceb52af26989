//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the user API and run the
//! full batch loop end-to-end against checkpoint and archive files in a
//! temporary directory.

use friendscan::config::{load_config, ApiConfig, Config, CrawlerConfig, OutputConfig};
use friendscan::crawler::{
    build_http_client, run_crawl, ApiFetcher, FetchOutcome, RecordFetcher, RetryPolicy,
};
use friendscan::{CrawlState, ScanError, UserRecord};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

const NOT_FOUND: &str = "Address/User not found.";

/// Creates a test configuration pointing at the mock server with small batches
fn create_test_config(base_url: &str, dir: &Path, seed_id: u64) -> Config {
    Config {
        crawler: CrawlerConfig {
            seed_id,
            batch_size: 5,
            empty_batch_threshold: 3,
            max_attempts: 3,
            retry_base_delay_ms: 5, // Very short for testing
        },
        api: ApiConfig {
            base_url: base_url.to_string(),
            timeout_secs: 5,
            max_connections: 5,
            ..ApiConfig::default()
        },
        proxy: None,
        output: OutputConfig {
            state_path: dir.join("state.json"),
            archive_path: dir.join("users.json"),
        },
    }
}

fn user_body(address: &str, username: &str) -> serde_json::Value {
    serde_json::json!({
        "address": address,
        "twitterUsername": username,
        "twitterName": username.to_uppercase(),
        "twitterPfpUrl": "https://example.com/pfp.png",
    })
}

fn not_found_body() -> serde_json::Value {
    serde_json::json!({ "message": NOT_FOUND })
}

/// Mounts a user at `id`; must be mounted before the not-found fallback
async fn mount_user(server: &MockServer, id: u64, address: &str, username: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/users/by-id/{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_body(address, username)))
        .mount(server)
        .await;
}

/// Every other id answers with the API's not-found payload
async fn mount_not_found_fallback(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/users/by-id/\d+$"))
        .respond_with(ResponseTemplate::new(404).set_body_json(not_found_body()))
        .mount(server)
        .await;
}

fn read_archive(path: &Path) -> Vec<UserRecord> {
    let text = std::fs::read_to_string(path).expect("Failed to read archive");
    serde_json::from_str(&text).expect("Archive is not valid JSON")
}

fn read_checkpoint(path: &Path) -> CrawlState {
    let text = std::fs::read_to_string(path).expect("Failed to read checkpoint");
    serde_json::from_str(&text).expect("Checkpoint is not valid JSON")
}

/// Ids requested from the mock server, in arrival order
async fn requested_ids(server: &MockServer) -> Vec<u64> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter_map(|r| r.url.path().rsplit('/').next()?.parse().ok())
        .collect()
}

#[tokio::test]
async fn test_full_crawl_until_exhausted() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_user(&mock_server, 1, "0xAaAa", "alice").await;
    mount_user(&mock_server, 2, "0xBbBb", "bob").await;
    mount_user(&mock_server, 4, "0xCcCc", "carol").await;
    // Same wallet as id 1 in a different case
    mount_user(&mock_server, 7, "0xAAAA", "alice_alt").await;
    mount_not_found_fallback(&mock_server).await;

    let config = create_test_config(&mock_server.uri(), dir.path(), 0);
    let summary = run_crawl(&config).await.expect("Crawl failed");

    // 1-5 and 6-10 have users, then 11-15, 16-20, 21-25 come back empty
    assert_eq!(summary.initial_checkpoint, 0);
    assert_eq!(summary.final_checkpoint, 25);
    assert_eq!(summary.batches, 5);
    assert_eq!(summary.records_found, 4);
    assert_eq!(summary.records_appended, 3);
    assert_eq!(summary.absent_ids, 21);
    assert_eq!(summary.failed_ids, 0);
    assert_eq!(summary.faulted_batches, 0);

    let archive = read_archive(&config.output.archive_path);
    let ids: Vec<u64> = archive.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2, 4]);
    assert_eq!(archive[0].address, "0xAaAa");
    assert_eq!(archive[0].twitter_username, "alice");
    assert_eq!(archive[0].twitter_name, "ALICE");

    assert_eq!(
        read_checkpoint(&config.output.state_path),
        CrawlState::new(25)
    );

    let mut ids = requested_ids(&mock_server).await;
    ids.sort_unstable();
    assert_eq!(ids, (1..=25).collect::<Vec<u64>>());

    // Temporary files never outlive a write
    assert!(!dir.path().join("state.json.tmp").exists());
    assert!(!dir.path().join("users.json.tmp").exists());
}

#[tokio::test]
async fn test_crawl_resumes_from_checkpoint() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_user(&mock_server, 103, "0xDdDd", "dave").await;
    mount_not_found_fallback(&mock_server).await;

    let config = create_test_config(&mock_server.uri(), dir.path(), 0);
    std::fs::write(&config.output.state_path, r#"{"lastProcessedId": 100}"#).unwrap();
    std::fs::write(
        &config.output.archive_path,
        r#"[{"id": 50, "address": "0xEeEe", "twitterUsername": "erin", "twitterName": "Erin"}]"#,
    )
    .unwrap();

    let summary = run_crawl(&config).await.expect("Crawl failed");

    assert_eq!(summary.initial_checkpoint, 100);
    assert_eq!(summary.final_checkpoint, 120);
    assert_eq!(summary.records_appended, 1);

    // Nothing at or below the checkpoint is fetched again
    let ids = requested_ids(&mock_server).await;
    assert!(ids.iter().all(|&id| id > 100), "refetched: {:?}", ids);

    let archive = read_archive(&config.output.archive_path);
    let ids: Vec<u64> = archive.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![50, 103]);
}

#[tokio::test]
async fn test_rerun_over_same_range_appends_nothing() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_user(&mock_server, 12, "0x1212", "twelve").await;
    mount_not_found_fallback(&mock_server).await;

    let config = create_test_config(&mock_server.uri(), dir.path(), 10);
    let first = run_crawl(&config).await.expect("First crawl failed");
    assert_eq!(first.records_appended, 1);

    // Rewind the checkpoint so the same ids are fetched again
    std::fs::write(&config.output.state_path, r#"{"lastProcessedId": 10}"#).unwrap();
    let second = run_crawl(&config).await.expect("Second crawl failed");

    assert_eq!(second.records_found, 1);
    assert_eq!(second.records_appended, 0);
    assert_eq!(read_archive(&config.output.archive_path).len(), 1);
}

#[tokio::test]
async fn test_corrupt_checkpoint_aborts_before_fetching() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_not_found_fallback(&mock_server).await;

    let config = create_test_config(&mock_server.uri(), dir.path(), 0);
    std::fs::write(&config.output.state_path, "{ not json").unwrap();

    let result = run_crawl(&config).await;

    assert!(matches!(result, Err(ScanError::Checkpoint(_))));
    assert!(requested_ids(&mock_server).await.is_empty());
    // The damaged file is left for the operator
    assert_eq!(
        std::fs::read_to_string(&config.output.state_path).unwrap(),
        "{ not json"
    );
}

#[tokio::test]
async fn test_unwritable_archive_faults_batch_but_advances() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_user(&mock_server, 3, "0x0303", "three").await;
    mount_not_found_fallback(&mock_server).await;

    let config = create_test_config(&mock_server.uri(), dir.path(), 0);
    // A directory where the archive file should be makes every write fail
    std::fs::create_dir_all(&config.output.archive_path).unwrap();

    let summary = run_crawl(&config).await.expect("Crawl failed");

    assert_eq!(summary.faulted_batches, 1);
    assert_eq!(summary.records_appended, 0);
    // The faulted batch neither counts as empty nor resets the streak
    assert_eq!(summary.batches, 4);
    assert_eq!(summary.final_checkpoint, 20);
    assert_eq!(
        read_checkpoint(&config.output.state_path),
        CrawlState::new(20)
    );
    // The failed write cleaned up after itself
    assert!(!dir.path().join("users.json.tmp").exists());
}

#[tokio::test]
async fn test_crawl_from_config_file() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_user(&mock_server, 21, "0x2121", "from_toml").await;
    mount_not_found_fallback(&mock_server).await;

    let config_path = dir.path().join("friendscan.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
[crawler]
seed-id = 20
batch-size = 2
empty-batch-threshold = 2
retry-base-delay-ms = 1

[api]
base-url = "{}"
max-connections = 2

[output]
state-path = "{}"
archive-path = "{}"
"#,
            mock_server.uri(),
            dir.path().join("state.json").display(),
            dir.path().join("users.json").display(),
        ),
    )
    .unwrap();

    let config = load_config(&config_path).expect("Failed to load config");
    let summary = run_crawl(&config).await.expect("Crawl failed");

    // 21-22 has a user, 23-24 and 25-26 are empty
    assert_eq!(summary.final_checkpoint, 26);
    assert_eq!(summary.batches, 3);
    assert_eq!(read_archive(&dir.path().join("users.json")).len(), 1);
}

fn test_fetcher(base_url: &str) -> ApiFetcher {
    let api = ApiConfig {
        base_url: base_url.to_string(),
        timeout_secs: 5,
        ..ApiConfig::default()
    };
    let client = build_http_client(&api, None).expect("Failed to build client");
    ApiFetcher::new(client, &api, RetryPolicy::new(3, Duration::from_millis(5)))
}

#[tokio::test]
async fn test_fetch_retries_transient_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/by-id/42"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream hiccup"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/by-id/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_body("0x4242", "answer")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let outcome = test_fetcher(&mock_server.uri()).fetch(42).await;

    match outcome {
        FetchOutcome::Found(record) => {
            assert_eq!(record.id, 42);
            assert_eq!(record.address, "0x4242");
            assert_eq!(record.twitter_username, "answer");
        }
        other => panic!("Expected a record, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_gives_up_after_three_attempts() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/by-id/7"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;

    let outcome = test_fetcher(&mock_server.uri()).fetch(7).await;

    assert!(outcome.is_failed());
    assert!(matches!(outcome, FetchOutcome::Failed { attempts: 3, .. }));
}

#[tokio::test]
async fn test_not_found_payload_is_absent_without_retry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/by-id/9"))
        .respond_with(ResponseTemplate::new(404).set_body_json(not_found_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let outcome = test_fetcher(&mock_server.uri()).fetch(9).await;

    assert_eq!(outcome, FetchOutcome::Absent);
}

#[tokio::test]
async fn test_record_without_address_is_a_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/by-id/5"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "twitterUsername": "ghost" })),
        )
        .mount(&mock_server)
        .await;

    let outcome = test_fetcher(&mock_server.uri()).fetch(5).await;

    assert!(outcome.is_failed());
}

#[tokio::test]
async fn test_failed_ids_do_not_block_the_crawl() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_user(&mock_server, 1, "0x0101", "one").await;
    Mock::given(method("GET"))
        .and(path("/users/by-id/2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    mount_not_found_fallback(&mock_server).await;

    let config = create_test_config(&mock_server.uri(), dir.path(), 0);
    let summary = run_crawl(&config).await.expect("Crawl failed");

    assert_eq!(summary.failed_ids, 1);
    assert_eq!(summary.records_appended, 1);
    assert_eq!(summary.faulted_batches, 0);
    // Id 2 is behind the checkpoint now and will not be retried by a resume
    assert_eq!(summary.final_checkpoint, 20);
}
