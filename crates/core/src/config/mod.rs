//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (PRESTA_*)
//! 2. TOML config file (if PRESTA_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (PRESTA_*)
/// 2. TOML config file (if PRESTA_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite cache database.
    ///
    /// Set via PRESTA_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin the host page is served from; all gateway traffic is
    /// resolved against it.
    ///
    /// Set via PRESTA_PAGE_ORIGIN environment variable.
    #[serde(default = "default_page_origin")]
    pub page_origin: String,

    /// Address the proxy binary listens on.
    ///
    /// Set via PRESTA_LISTEN_ADDR environment variable.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Name of the active shell store generation. Bumping this string is
    /// the sole invalidation mechanism for precached shell assets.
    #[serde(default = "default_shell_version")]
    pub shell_version: String,

    /// Name of the active API store generation.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Paths precached during install. Must track build output; a missing
    /// entry fails the whole install.
    #[serde(default = "default_shell_manifest")]
    pub shell_manifest: Vec<String>,

    /// Path prefixes served network-first. Extending the origin's route
    /// surface requires updating this list in lockstep.
    #[serde(default = "default_api_prefixes")]
    pub api_prefixes: Vec<String>,

    /// Response header marking client-synthesized responses; anything
    /// carrying it is never written to a store.
    #[serde(default = "default_mock_header")]
    pub mock_header: String,

    /// Whether successful cache-first misses are written back to the
    /// shell store. Off by default: shell content is governed by the
    /// install manifest alone.
    #[serde(default)]
    pub precache_static_misses: bool,

    /// User-Agent string for upstream requests.
    ///
    /// Set via PRESTA_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via PRESTA_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Upstream request timeout in milliseconds.
    ///
    /// Set via PRESTA_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./presta-cache.sqlite")
}

fn default_page_origin() -> String {
    "http://localhost:5173".into()
}

fn default_listen_addr() -> String {
    "127.0.0.1:8787".into()
}

fn default_shell_version() -> String {
    "shell-v2".into()
}

fn default_api_version() -> String {
    "api-v1".into()
}

fn default_shell_manifest() -> Vec<String> {
    ["/", "/index.html", "/manifest.json", "/icon-192.png", "/icon-512.png"]
        .map(String::from)
        .to_vec()
}

fn default_api_prefixes() -> Vec<String> {
    ["/api/", "/auth/", "/users/", "/items/", "/chats/", "/health"]
        .map(String::from)
        .to_vec()
}

fn default_mock_header() -> String {
    "x-mock-response".into()
}

fn default_user_agent() -> String {
    "presta/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            page_origin: default_page_origin(),
            listen_addr: default_listen_addr(),
            shell_version: default_shell_version(),
            api_version: default_api_version(),
            shell_manifest: default_shell_manifest(),
            api_prefixes: default_api_prefixes(),
            mock_header: default_mock_header(),
            precache_static_misses: false,
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `PRESTA_`
    /// 2. TOML file from `PRESTA_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("PRESTA_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("PRESTA_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
