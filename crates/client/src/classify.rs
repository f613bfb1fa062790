//! Request route classification.
//!
//! Classification is a pure function over the request method and URL, kept
//! free of any transport hook so it can be tested on its own. The result
//! picks the serving strategy: API routes go network-first, everything
//! else a GET can reach goes cache-first, and mutating requests bypass
//! the cache entirely.

use presta_core::{AppConfig, Error};
use url::{Origin, Url};

/// How a request will be served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Precached application shell asset; served cache-first.
    AppShell,
    /// Dynamic same-origin API route; served network-first with cache fallback.
    Api,
    /// Anything else: non-GET, cross-origin, or an unlisted asset.
    Other,
}

/// Routing tables the classifier works from.
#[derive(Debug, Clone)]
pub struct RoutingConfig {
    page_origin: Origin,
    api_prefixes: Vec<String>,
    shell_paths: Vec<String>,
}

impl RoutingConfig {
    /// Build the routing tables from the application configuration.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = Url::parse(&config.page_origin)
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", config.page_origin, e)))?;
        Ok(Self {
            page_origin: origin.origin(),
            api_prefixes: config.api_prefixes.clone(),
            shell_paths: config.shell_manifest.clone(),
        })
    }

    fn same_origin(&self, url: &Url) -> bool {
        url.origin() == self.page_origin
    }
}

/// Classify a request by method and URL.
///
/// Non-GET requests are always `Other`: mutating requests must never be
/// served stale or cached as a side effect.
pub fn classify(method: &str, url: &Url, routing: &RoutingConfig) -> RouteClass {
    if !method.eq_ignore_ascii_case("GET") {
        return RouteClass::Other;
    }
    if !routing.same_origin(url) {
        return RouteClass::Other;
    }

    let path = url.path();
    if routing.api_prefixes.iter().any(|prefix| path.starts_with(prefix.as_str())) {
        return RouteClass::Api;
    }
    if routing.shell_paths.iter().any(|shell| shell == path) {
        return RouteClass::AppShell;
    }

    RouteClass::Other
}
