//! Cache administration CLI.
//!
//! Operates on the same database and configuration as the gateway
//! binary, so a deploy script can precache a new generation or inspect
//! store state without the proxy running.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use presta_client::{FetchConfig, FetchRequest, Fetcher, Gateway, HttpFetcher, Lifecycle, fetch};
use presta_core::{AppConfig, CacheDb};

#[derive(Parser)]
#[command(name = "presta", about = "Offline cache gateway administration", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List cache store generations and their entry counts.
    Status,
    /// Fetch the shell manifest and promote a fresh generation.
    Precache,
    /// Delete store generations that no longer match the configured versions.
    Purge,
    /// Send one request through the gateway and report where it was served from.
    Get {
        /// URL or site-relative path to request.
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load()?;
    let db = CacheDb::open(&config.db_path).await?;

    match cli.command {
        Command::Status => status(&db).await,
        Command::Precache => precache(db, &config).await,
        Command::Purge => purge(&db, &config).await,
        Command::Get { url } => get(db, &config, &url).await,
    }
}

async fn status(db: &CacheDb) -> Result<()> {
    let stores = db.list_stores().await?;
    if stores.is_empty() {
        println!("no cache stores");
        return Ok(());
    }
    for store in stores {
        println!(
            "{:<16} {:<6} {:>6} entries  created {}",
            store.name,
            store.family.as_str(),
            store.entry_count,
            store.created_at
        );
    }
    Ok(())
}

async fn precache(db: CacheDb, config: &AppConfig) -> Result<()> {
    let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(FetchConfig::from_app_config(config))?);
    let mut lifecycle = Lifecycle::new(db.clone(), fetcher, config)?;
    lifecycle.install().await?;
    let removed = lifecycle.activate().await?;
    println!(
        "precached {} paths into {} ({} stale generation{} removed)",
        config.shell_manifest.len(),
        config.shell_version,
        removed,
        if removed == 1 { "" } else { "s" }
    );
    Ok(())
}

async fn purge(db: &CacheDb, config: &AppConfig) -> Result<()> {
    let removed = db
        .delete_stale_stores(&[config.shell_version.as_str(), config.api_version.as_str()])
        .await?;
    println!("removed {removed} stale store generation(s)");
    Ok(())
}

async fn get(db: CacheDb, config: &AppConfig, raw_url: &str) -> Result<()> {
    let url = if raw_url.starts_with('/') {
        let origin = url::Url::parse(&config.page_origin)?;
        fetch::resolve_path(&origin, raw_url)?
    } else {
        fetch::canonicalize(raw_url)?
    };

    let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(FetchConfig::from_app_config(config))?);
    let gateway = Gateway::new(db, fetcher, config)?;
    let response = gateway.handle(&FetchRequest::get(url)).await?;

    println!(
        "{} {} bytes via {}",
        response.status,
        response.body.len(),
        response.source.as_str()
    );
    Ok(())
}
