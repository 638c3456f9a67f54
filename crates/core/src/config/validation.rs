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

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

fn validate_name_part(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(invalid(field, "must not be empty"));
    }
    if value.chars().any(char::is_whitespace) {
        return Err(invalid(field, "must not contain whitespace"));
    }
    Ok(())
}

fn validate_paths(field: &str, paths: &[String]) -> Result<(), ConfigError> {
    for path in paths {
        if !path.starts_with('/') {
            return Err(invalid(field, format!("path must start with '/': {path}")));
        }
        if path.contains('#') {
            return Err(invalid(field, format!("path must not contain a fragment: {path}")));
        }
    }
    Ok(())
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_prefix` or `version` is empty or contains whitespace
    /// - `origin` is not a bare http(s) origin
    /// - an asset or navigation path does not start with `/`
    /// - `offline_fallback` is not one of the pinned assets
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    ///
    /// Returns `ConfigError::Missing` if `navigation_paths` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_name_part("cache_prefix", &self.cache_prefix)?;
        validate_name_part("version", &self.version)?;

        let origin = self.origin_url()?;
        if origin.host_str().is_none() {
            return Err(invalid("origin", "must have a host"));
        }
        if origin.path() != "/" || origin.query().is_some() || origin.fragment().is_some() {
            return Err(invalid("origin", "must not have a path, query or fragment"));
        }

        validate_paths("precache", &self.precache)?;
        validate_paths("navigation_paths", &self.navigation_paths)?;

        if self.navigation_paths.is_empty() {
            return Err(ConfigError::Missing {
                field: "navigation_paths".into(),
                hint: "list at least the site root, e.g. [\"/\"]".into(),
            });
        }

        if let Some(fallback) = &self.offline_fallback
            && !self.precache.iter().any(|p| p == fallback)
        {
            return Err(invalid("offline_fallback", format!("{fallback} is not in precache")));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.precache.is_empty() {
            tracing::warn!("precache is empty; install will create an empty store");
        }

        Ok(())
    }
}
