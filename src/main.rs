//! Roundabout main entry point
//!
//! This is the command-line interface for the Roundabout site mirror.

use clap::Parser;
use roundabout::config::{load_config_with_hash, validate, Config};
use roundabout::crawler::crawl;
use roundabout::mirror::dated_store_path;
use roundabout::output::print_statistics;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Roundabout: crawls a single web application into an offline mirror
///
/// Roundabout follows same-host links found in HTML, CSS and AJAX-flagged
/// anchors, fetches every resource once, and writes a browsable copy of the
/// site with internal links rewritten to point into the mirror.
#[derive(Parser, Debug)]
#[command(name = "roundabout")]
#[command(version)]
#[command(about = "Mirrors a single web application for offline browsing", long_about = None)]
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

    /// Validate config and show what would be mirrored without crawling
    #[arg(long)]
    dry_run: bool,

    /// Crawl this URL instead of the configured base-url
    #[arg(long, value_name = "URL")]
    url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let mut config = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            cfg
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Some(url) = cli.url {
        tracing::info!("Overriding base-url with {}", url);
        config.crawler.base_url = url;
        validate(&config)?;
    }

    if cli.dry_run {
        handle_dry_run(&config);
    } else {
        handle_crawl(config).await?;
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
            0 => EnvFilter::new("roundabout=info,warn"),
            1 => EnvFilter::new("roundabout=debug,info"),
            2 => EnvFilter::new("roundabout=trace,debug"),
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

/// Handles the --dry-run mode: shows the resolved configuration
fn handle_dry_run(config: &Config) {
    println!("=== Roundabout Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Base URL: {}", config.crawler.base_url);
    println!(
        "  Max concurrent fetches: {}",
        config.crawler.max_concurrent_fetches
    );
    println!("  Request timeout: {}s", config.crawler.request_timeout);
    println!("  Follow assets: {}", config.crawler.follow_assets);

    println!("\nReject Patterns ({}):", config.crawler.reject.len());
    for pattern in &config.crawler.reject {
        println!("  - {}", pattern);
    }

    println!("\nNode: {}:{}", config.node.host, config.node.port);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    let store_path = dated_store_path(
        Path::new(&config.output.mirror_root),
        chrono::Local::now().date_naive(),
        &config.output.subfolder,
    );
    println!("\nOutput:");
    println!("  Mirror: {}", store_path.display());
    println!(
        "  Clean before crawl: {}",
        if config.output.clean { "yes" } else { "no" }
    );

    println!("\n✓ Configuration is valid");
    println!("✓ Would start mirroring from {}", config.crawler.base_url);
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    if !config.crawler.reject.is_empty() {
        tracing::info!("Reject patterns: {}", config.crawler.reject.join(", "));
    }

    match crawl(config).await {
        Ok(stats) => {
            tracing::info!("Crawl completed successfully");
            print_statistics(&stats);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
