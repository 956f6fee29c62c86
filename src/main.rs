//! Searchlight main entry point
//!
//! Loads the TOML configuration, opens the database and serves the search
//! engine API.

use clap::Parser;
use searchlight::config::load_config;
use searchlight::http::{self, AppState};
use searchlight::indexing::{IndexingContext, IndexingService};
use searchlight::storage::{self, SqliteStorage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Searchlight: a multi-site crawling search engine
///
/// Crawls the configured sites into an inverted lemma index and serves
/// indexing, statistics and search over an HTTP API.
#[derive(Parser, Debug)]
#[command(name = "searchlight")]
#[command(version)]
#[command(about = "A multi-site crawling search engine", long_about = None)]
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

    /// Validate the config and show what would be served without starting
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            return Err(e.into());
        }
    };

    if cli.dry_run {
        print_config_summary(&config);
        return Ok(());
    }

    let storage = storage::shared(SqliteStorage::new(Path::new(&config.server.database_path))?);
    tracing::info!("Database ready at {}", config.server.database_path);

    let bind_addr = config.server.bind_addr.clone();
    let ctx = Arc::new(IndexingContext::new(config.clone(), storage.clone())?);
    let state = Arc::new(AppState {
        indexing: IndexingService::new(ctx),
        storage,
        config,
    });

    let app = http::router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Listening on http://{bind_addr}");
    axum::serve(listener, app).await?;

    Ok(())
}

/// Sets up the tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("searchlight=info,warn"),
            1 => EnvFilter::new("searchlight=debug,info"),
            2 => EnvFilter::new("searchlight=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Prints the effective configuration for --dry-run
fn print_config_summary(config: &searchlight::Config) {
    println!("=== Searchlight Dry Run ===\n");

    println!("Server:");
    println!("  Bind address: {}", config.server.bind_addr);
    println!("  Database: {}", config.server.database_path);

    println!("\nIndexing:");
    println!(
        "  Parallelism: {}",
        config.indexing.effective_parallelism()
    );

    println!("\nFetcher:");
    println!("  User agent: {}", config.fetcher.user_agent);
    println!("  Referrer: {}", config.fetcher.referrer);
    println!("  Request timeout: {}ms", config.fetcher.request_timeout_ms);
    println!(
        "  Politeness delay: {}ms",
        config.fetcher.politeness_delay_ms
    );

    println!("\nSearch:");
    println!(
        "  High-frequency lemma threshold: {}",
        config.search.high_frequency_lemma_threshold
    );

    println!("\nSites ({}):", config.sites.len());
    for site in &config.sites {
        println!("  - {} ({})", site.name, site.url);
    }

    println!("\n✓ Configuration is valid");
}
