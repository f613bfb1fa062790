//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `page_origin` is not an absolute http(s) URL
    /// - `shell_version` / `api_version` are empty or collide
    /// - a manifest path or API prefix does not start with `/`
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` or `mock_header` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        match url::Url::parse(&self.page_origin) {
            Ok(origin) if origin.scheme() == "http" || origin.scheme() == "https" => {}
            Ok(origin) => {
                return Err(ConfigError::Invalid {
                    field: "page_origin".into(),
                    reason: format!("unsupported scheme: {}", origin.scheme()),
                });
            }
            Err(e) => {
                return Err(ConfigError::Invalid { field: "page_origin".into(), reason: e.to_string() });
            }
        }

        if self.shell_version.is_empty() {
            return Err(ConfigError::Invalid { field: "shell_version".into(), reason: "must not be empty".into() });
        }
        if self.api_version.is_empty() {
            return Err(ConfigError::Invalid { field: "api_version".into(), reason: "must not be empty".into() });
        }
        if self.shell_version == self.api_version {
            return Err(ConfigError::Invalid {
                field: "api_version".into(),
                reason: "must differ from shell_version".into(),
            });
        }

        if self.shell_manifest.is_empty() {
            return Err(ConfigError::Invalid { field: "shell_manifest".into(), reason: "must not be empty".into() });
        }
        for path in &self.shell_manifest {
            if !path.starts_with('/') {
                return Err(ConfigError::Invalid {
                    field: "shell_manifest".into(),
                    reason: format!("path must start with '/': {path}"),
                });
            }
        }
        for prefix in &self.api_prefixes {
            if !prefix.starts_with('/') {
                return Err(ConfigError::Invalid {
                    field: "api_prefixes".into(),
                    reason: format!("prefix must start with '/': {prefix}"),
                });
            }
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }
        if self.mock_header.is_empty() {
            return Err(ConfigError::Invalid { field: "mock_header".into(), reason: "must not be empty".into() });
        }

        Ok(())
    }
}
