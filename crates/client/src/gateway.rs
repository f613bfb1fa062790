//! Strategy execution over the cache stores.
//!
//! The gateway fronts every request from the host page. API routes are
//! answered network-first with the durable store as a degraded fallback,
//! shell and static assets cache-first from the precached generation, and
//! mutating requests pass straight through untouched.

use std::sync::Arc;

use bytes::Bytes;
use presta_core::cache::key::request_key;
use presta_core::{AppConfig, CacheDb, CachedResponse, Error, StoreFamily};

use crate::classify::{RouteClass, RoutingConfig, classify};
use crate::fetch::{FetchRequest, FetchedResponse, Fetcher};

/// Where a gateway response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    /// Fresh from the origin server.
    Network,
    /// Served from a cache store.
    Cache,
}

impl ResponseSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseSource::Network => "network",
            ResponseSource::Cache => "cache",
        }
    }
}

/// Response handed back to the interception point.
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub source: ResponseSource,
}

impl GatewayResponse {
    fn from_network(response: FetchedResponse) -> Self {
        let headers = response
            .headers
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        Self {
            status: response.status.as_u16(),
            headers,
            body: response.bytes,
            source: ResponseSource::Network,
        }
    }

    fn from_cache(entry: CachedResponse) -> Self {
        Self {
            status: entry.status,
            headers: entry.headers,
            body: Bytes::from(entry.body),
            source: ResponseSource::Cache,
        }
    }
}

/// The request gateway.
///
/// Classifies each request and runs the matching caching strategy over
/// the active store generations. Handlers are independent; concurrent
/// requests for the same key race and the last store write wins.
pub struct Gateway {
    db: CacheDb,
    fetcher: Arc<dyn Fetcher>,
    routing: RoutingConfig,
    shell_store: String,
    api_store: String,
    mock_header: String,
    precache_static_misses: bool,
}

impl Gateway {
    /// Build a gateway over an open cache database.
    pub fn new(db: CacheDb, fetcher: Arc<dyn Fetcher>, config: &AppConfig) -> Result<Self, Error> {
        Ok(Self {
            db,
            fetcher,
            routing: RoutingConfig::from_app_config(config)?,
            shell_store: config.shell_version.clone(),
            api_store: config.api_version.clone(),
            mock_header: config.mock_header.clone(),
            precache_static_misses: config.precache_static_misses,
        })
    }

    /// Serve one request.
    ///
    /// Mutating requests go straight to the network and their responses
    /// are never inspected or stored. GETs are dispatched to the strategy
    /// their classification picked.
    pub async fn handle(&self, request: &FetchRequest) -> Result<GatewayResponse, Error> {
        if !request.is_get() {
            let response = self.fetcher.fetch(request).await?;
            return Ok(GatewayResponse::from_network(response));
        }

        match classify(&request.method, &request.url, &self.routing) {
            RouteClass::Api => self.network_first(request).await,
            RouteClass::AppShell | RouteClass::Other => self.cache_first(request).await,
        }
    }

    /// Network-first: live answers win, the store is a degraded fallback.
    async fn network_first(&self, request: &FetchRequest) -> Result<GatewayResponse, Error> {
        let key = request_key(&request.method, request.url.as_str());

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.status.is_success() && !self.is_mock(&response) {
                    if let Err(err) = self.store_response(&self.api_store, StoreFamily::Api, &key, request, &response).await {
                        tracing::warn!(url = %request.url, error = %err, "cache write failed; serving live response");
                    }
                }
                Ok(GatewayResponse::from_network(response))
            }
            Err(err) => match self.db.match_entry(&self.api_store, &key).await {
                Ok(Some(entry)) => {
                    tracing::debug!(url = %request.url, "network failed; serving cached response");
                    Ok(GatewayResponse::from_cache(entry))
                }
                Ok(None) => Err(err),
                Err(cache_err) => {
                    tracing::warn!(url = %request.url, error = %cache_err, "cache fallback read failed");
                    Err(err)
                }
            },
        }
    }

    /// Cache-first: stored answers win, the network covers misses.
    ///
    /// Staleness is handled at the generation level (a new shell ships
    /// under a new store name), so a hit is returned without revalidation.
    async fn cache_first(&self, request: &FetchRequest) -> Result<GatewayResponse, Error> {
        let key = request_key(&request.method, request.url.as_str());

        for store in [&self.shell_store, &self.api_store] {
            match self.db.match_entry(store, &key).await {
                Ok(Some(entry)) => return Ok(GatewayResponse::from_cache(entry)),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(url = %request.url, store = %store, error = %err, "cache read failed");
                }
            }
        }

        let response = self.fetcher.fetch(request).await?;
        if self.precache_static_misses && response.status.is_success() && !self.is_mock(&response) {
            if let Err(err) = self
                .store_response(&self.shell_store, StoreFamily::Shell, &key, request, &response)
                .await
            {
                tracing::warn!(url = %request.url, error = %err, "cache write failed; serving live response");
            }
        }
        Ok(GatewayResponse::from_network(response))
    }

    async fn store_response(
        &self, store: &str, family: StoreFamily, key: &str, request: &FetchRequest, response: &FetchedResponse,
    ) -> Result<(), Error> {
        // stores are created lazily on first write
        self.db.open_store(store, family).await?;
        self.db.put_entry(store, key, &response.capture(request)).await
    }

    fn is_mock(&self, response: &FetchedResponse) -> bool {
        response.header(&self.mock_header).is_some()
    }
}
