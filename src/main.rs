//! Driftnet main entry point
//!
//! This is the command-line interface for the Driftnet crawler.

use anyhow::{bail, Context};
use clap::Parser;
use driftnet::config::{load_config_with_hash, Config};
use driftnet::crawler::crawl;
use driftnet::storage::SqliteStorage;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Driftnet: a concurrent, scoped web crawler
///
/// Driftnet crawls outward from a set of seed URLs with a fixed worker
/// pool, skips URLs it has already seen, and stores every fetched page.
#[derive(Parser, Debug)]
#[command(name = "driftnet")]
#[command(version)]
#[command(about = "A concurrent, scoped web crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Discard the existing dedup filter and start with an empty one
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "serve", "export"])]
    fresh: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "serve", "export"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "serve", "export"])]
    stats: bool,

    /// Serve the read API over the database until Ctrl+C
    #[arg(long, conflicts_with_all = ["dry_run", "stats", "export"])]
    serve: bool,

    /// Write every page in the KV store to DIR, one file per page, and exit
    #[arg(long, value_name = "DIR", conflicts_with_all = ["dry_run", "stats", "serve"])]
    export: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config).map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.dry_run {
        handle_dry_run(&config, &hash);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.serve {
        handle_serve(&config).await?;
    } else if let Some(dir) = &cli.export {
        handle_export(&config, dir)?;
    } else {
        handle_crawl(&config, cli.fresh).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("driftnet=info,warn"),
            1 => EnvFilter::new("driftnet=debug,info"),
            2 => EnvFilter::new("driftnet=trace,debug"),
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

/// Opens the relational store used by `--stats` and `--serve`
fn open_database(config: &Config) -> anyhow::Result<SqliteStorage> {
    let path = &config.storage.database_path;
    if path.is_empty() {
        bail!("storage.database-path must be set to read crawl results");
    }

    SqliteStorage::open(Path::new(path))
        .with_context(|| format!("failed to open database {}", path))
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config, hash: &str) {
    println!("=== Driftnet Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Workers: {}", config.crawler.workers);
    println!("  Frontier capacity: {}", config.crawler.frontier_capacity);
    println!("  Politeness delay: {}ms", config.crawler.politeness_delay);
    println!("  Fetch timeout: {}s", config.crawler.fetch_timeout);
    println!("  Strip query strings: {}", config.crawler.strip_query);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nDedup:");
    println!("  Backend: {:?}", config.dedup.backend);
    println!("  Filter key: {}", config.dedup.filter_key);
    println!(
        "  Capacity: {} at error rate {}",
        config.dedup.capacity, config.dedup.error_rate
    );

    println!("\nStorage:");
    println!("  Backend: {:?}", config.storage.backend);
    println!("  Database: {}", config.storage.database_path);
    println!("  KV store: {}", config.storage.kv_path);

    println!(
        "\nAllowed Domains ({}):",
        config.scope.allowed_domains.len()
    );
    for domain in &config.scope.allowed_domains {
        println!("  - {}", domain);
    }

    println!("\nSeeds ({}):", config.scope.seeds.len());
    for seed in &config.scope.seeds {
        println!("  * {}", seed);
    }

    println!("\n✓ Configuration is valid (hash: {})", hash);
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use driftnet::output::{load_statistics, print_statistics};

    println!("Database: {}\n", config.storage.database_path);

    let storage = open_database(config)?;
    let stats = load_statistics(&storage).context("failed to load statistics")?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --export mode: dumps the KV store to one file per page
fn handle_export(config: &Config, dir: &Path) -> anyhow::Result<()> {
    use driftnet::output::export_pages;
    use driftnet::storage::KvStorage;

    let path = Path::new(&config.storage.kv_path);
    if config.storage.kv_path.is_empty() || !path.exists() {
        bail!("no KV store at storage.kv-path '{}'", config.storage.kv_path);
    }

    let store = KvStorage::open(path)
        .with_context(|| format!("failed to open KV store {}", path.display()))?;
    let written = export_pages(&store, dir)
        .with_context(|| format!("failed to export pages to {}", dir.display()))?;

    println!("✓ Exported {} pages to {}", written, dir.display());
    Ok(())
}

/// Handles the --serve mode: runs the read API until Ctrl+C
async fn handle_serve(config: &Config) -> anyhow::Result<()> {
    let storage = open_database(config)?;
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl+C, stopping server");
        }
        trigger.cancel();
    });

    driftnet::api::serve(&config.api.listen, storage, cancel)
        .await
        .with_context(|| format!("read API on {} failed", config.api.listen))
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, fresh: bool) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh crawl (discarding the existing dedup filter)");
    } else {
        tracing::info!("Starting crawl (reusing the existing dedup filter)");
    }
    tracing::info!("Seed URLs: {}", config.scope.seeds.len());

    match crawl(config, fresh).await {
        Ok(report) => {
            println!("{}", report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
