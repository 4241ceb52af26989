//! friendscan main entry point
//!
//! This is the command-line interface for the friendscan user crawler.

use clap::Parser;
use friendscan::config::{load_config_with_hash, Config};
use friendscan::crawler::crawl;
use friendscan::output::{load_statistics, print_statistics, print_summary};
use friendscan::storage::open_storage;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// friendscan: a resumable user-id crawler
///
/// friendscan walks the API's user ids in batches from the last checkpoint,
/// appends every newly discovered user to a deduplicated JSON archive, and
/// stops once several batches in a row find nobody.
#[derive(Parser, Debug)]
#[command(name = "friendscan")]
#[command(version = "1.0.0")]
#[command(about = "A resumable user-id crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show where the crawl would resume without fetching
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics for the checkpoint and archive and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            match load_config_with_hash(path) {
                Ok((cfg, hash)) => {
                    tracing::info!("Configuration loaded successfully (hash: {})", hash);
                    cfg
                }
                Err(e) => {
                    tracing::error!("Failed to load configuration: {}", e);
                    return Err(e.into());
                }
            }
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(&config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("friendscan=info,warn"),
            1 => EnvFilter::new("friendscan=debug,info"),
            2 => EnvFilter::new("friendscan=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the resolved configuration and resume point
fn handle_dry_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== friendscan Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Seed id: {}", config.crawler.seed_id);
    println!("  Batch size: {}", config.crawler.batch_size);
    println!(
        "  Empty batches before stopping: {}",
        config.crawler.empty_batch_threshold
    );
    println!(
        "  Attempts per id: {} (base delay {}ms)",
        config.crawler.max_attempts, config.crawler.retry_base_delay_ms
    );

    println!("\nAPI:");
    println!("  Endpoint: {}/users/by-id/{{id}}", config.api.base_url);
    println!("  Timeout: {}s", config.api.timeout_secs);
    println!("  Max connections: {}", config.api.max_connections);
    println!("  Accept invalid certs: {}", config.api.accept_invalid_certs);
    match &config.proxy {
        Some(proxy) => println!(
            "  Proxy: {}{}",
            proxy.url,
            if proxy.username.is_some() {
                " (authenticated)"
            } else {
                ""
            }
        ),
        None => println!("  Proxy: none"),
    }

    println!("\nOutput:");
    println!("  Checkpoint: {}", config.output.state_path.display());
    println!("  Archive: {}", config.output.archive_path.display());

    let (checkpoints, _) = open_storage(&config.output, config.crawler.seed_id);
    let resume = checkpoints
        .peek()?
        .unwrap_or(friendscan::CrawlState::new(config.crawler.seed_id));

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Next batch would be {}",
        resume.next_range(config.crawler.batch_size)
    );

    Ok(())
}

/// Handles the --stats mode: shows statistics for the crawl output
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let (checkpoints, archive) = open_storage(&config.output, config.crawler.seed_id);
    let stats = load_statistics(&checkpoints, &archive)?;
    print_statistics(&stats, config.crawler.seed_id, config.crawler.batch_size);
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        "Crawling {} with batches of {}",
        config.api.base_url,
        config.crawler.batch_size
    );

    match crawl(config).await {
        Ok(summary) => {
            tracing::info!("Crawl completed successfully");
            print_summary(&summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
