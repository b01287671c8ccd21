//! aq - quota-paced API client
//!
//! CLI entry point: fetches items through the rate-limited queue.

use std::fs::{self, File};
use std::path::Path;

use clap::Parser;
use eyre::{Result, WrapErr};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use apiqueue::api::{HttpApi, PacedClient};
use apiqueue::cli::{Cli, Command, get_log_path};
use apiqueue::config::Config;

/// Open (truncate) the log file, creating its directory
fn open_log_file(path: &Path) -> Result<File> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).wrap_err_with(|| format!("Failed to create log directory {}", dir.display()))?;
    }
    File::create(path).wrap_err_with(|| format!("Failed to create log file {}", path.display()))
}

/// Crate-scoped default filter; `RUST_LOG` directives still apply
fn log_filter(verbose: bool) -> Result<EnvFilter> {
    let directive = if verbose { "apiqueue=debug" } else { "apiqueue=info" };
    Ok(EnvFilter::from_default_env().add_directive(directive.parse()?))
}

/// Send tracing output to `log_path`; stdout carries results only
fn setup_logging(verbose: bool, log_path: &Path) -> Result<()> {
    let log_file = open_log_file(log_path)?;
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(log_filter(verbose)?)
        .init();

    info!(verbose, log_path = %log_path.display(), "Logging initialized");
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).wrap_err("Failed to encode output")?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, &get_log_path()).wrap_err("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).wrap_err("Failed to load configuration")?;
    info!(base_url = %config.api.base_url, "aq loaded config");

    let api = HttpApi::from_config(&config.api).wrap_err("Failed to create HTTP client")?;
    let client = PacedClient::new(api, config.queue.clone());

    match cli.command {
        Command::Items { all: true } => {
            let items = client.get_all_items().await.wrap_err("Failed to fetch all items")?;
            info!(count = items.len(), "Fetched all pages");
            print_json(&items)
        }
        Command::Items { all: false } => {
            let items = client.get_items().await.wrap_err("Failed to fetch items")?;
            print_json(&items)
        }
        Command::Item { id } => {
            let item = client
                .get_item(&id)
                .await
                .wrap_err_with(|| format!("Failed to fetch item {}", id))?;
            print_json(&item)
        }
        Command::RateLimit => {
            let snapshot = client.rate_limit().await.wrap_err("Failed to read rate limit")?;
            print_json(&snapshot)
        }
    }
}
