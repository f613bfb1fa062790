//! presta-gateway entry point.
//!
//! This is the main binary that fronts the Empresta aê origin: it loads
//! configuration, opens the cache database, runs the install/activate
//! cycle for the configured generation, then serves the interception
//! endpoint. Logging goes to stderr as JSON.

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use presta_client::{FetchConfig, Fetcher, Gateway, HttpFetcher, Lifecycle};
use presta_core::{AppConfig, CacheDb};

mod proxy;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let db = CacheDb::open(&config.db_path).await?;
    let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(FetchConfig::from_app_config(&config))?);

    let mut lifecycle = Lifecycle::new(db.clone(), fetcher.clone(), &config)?;
    match lifecycle.install().await {
        Ok(()) => {
            let removed = lifecycle.activate().await?;
            tracing::info!(
                shell = %config.shell_version,
                api = %config.api_version,
                removed,
                "cache generation active"
            );
        }
        Err(err) => {
            tracing::warn!(error = %err, "install failed; previous generation keeps serving");
        }
    }

    let gateway = Gateway::new(db, fetcher, &config)?;
    let app = proxy::router(gateway, &config)?;

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, origin = %config.page_origin, "presta-gateway listening");
    axum::serve(listener, app).await?;

    Ok(())
}
