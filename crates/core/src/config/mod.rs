//! Deployment configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (APPSHELL_*)
//! 2. TOML config file (if APPSHELL_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The version string and the asset list are deploy-time constants: they
//! are read once at startup and never change while the agent runs.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

mod validation;

pub use validation::ConfigError;

/// Agent configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (APPSHELL_*)
/// 2. TOML config file (if APPSHELL_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Prefix of every store name; the version is appended.
    ///
    /// Set via APPSHELL_CACHE_PREFIX environment variable.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Deployment version. Change it to roll out a new store.
    ///
    /// Set via APPSHELL_VERSION environment variable.
    #[serde(default = "default_version")]
    pub version: String,

    /// Origin of the site this agent serves (scheme, host, port).
    ///
    /// Set via APPSHELL_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Pinned asset paths, fetched at install and served cache-first.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Main document paths, served network-first.
    #[serde(default = "default_navigation_paths")]
    pub navigation_paths: Vec<String>,

    /// Pinned page served when a main document is offline and uncached.
    #[serde(default)]
    pub offline_fallback: Option<String>,

    /// Activate right after install instead of waiting for old clients.
    ///
    /// Set via APPSHELL_SKIP_WAITING environment variable.
    #[serde(default = "default_true")]
    pub skip_waiting: bool,

    /// Take control of already-open clients on activation.
    ///
    /// Set via APPSHELL_CLAIM_CLIENTS environment variable.
    #[serde(default = "default_true")]
    pub claim_clients: bool,

    /// Path to the SQLite store database.
    ///
    /// Set via APPSHELL_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for network requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Network request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum response body size in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

fn default_cache_prefix() -> String {
    "appshell-cache".into()
}

fn default_version() -> String {
    "v1".into()
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_precache() -> Vec<String> {
    ["/", "/index.html", "/manifest.json", "/icon-192x192.png", "/icon-512x512.png", "/favicon.ico"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_navigation_paths() -> Vec<String> {
    vec!["/".into(), "/index.html".into()]
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./appshell-cache.sqlite")
}

fn default_user_agent() -> String {
    "appshell/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_prefix: default_cache_prefix(),
            version: default_version(),
            origin: default_origin(),
            precache: default_precache(),
            navigation_paths: default_navigation_paths(),
            offline_fallback: None,
            skip_waiting: true,
            claim_clients: true,
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
        }
    }
}

impl AppConfig {
    /// The current store version identifier.
    pub fn cache_name(&self) -> String {
        format!("{}-{}", self.cache_prefix, self.version)
    }

    /// Parsed origin URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin is not an http(s) URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => {
                Err(ConfigError::Invalid { field: "origin".into(), reason: format!("unsupported scheme: {scheme}") })
            }
        }
    }

    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file or environment cannot be parsed,
    /// or validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("APPSHELL_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("APPSHELL_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        Self::from_figment(&figment)
    }

    /// Extract and validate from an already-assembled figment.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
