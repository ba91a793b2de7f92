//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (PWA_SW_*)
//! 2. TOML config file (if PWA_SW_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The loaded [`AppConfig`] is compiled into an immutable [`WorkerSettings`]
//! value which the worker receives at construction.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Deserializer, Serialize};

mod settings;
mod validation;

pub use settings::WorkerSettings;
pub use validation::ConfigError;

use crate::exclusion::DEFAULT_NEVER_CACHE;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (PWA_SW_*)
/// 2. TOML config file (if PWA_SW_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Site identifier embedded in the cache name.
    ///
    /// Set via PWA_SW_SITE_ID environment variable.
    #[serde(default = "default_site_id")]
    pub site_id: String,

    /// Version tag embedded in the cache name. Bumping it invalidates every
    /// previously cached entry on the next activation.
    ///
    /// Set via PWA_SW_VERSION environment variable.
    #[serde(default = "default_version", deserialize_with = "string_or_number")]
    pub version: String,

    /// Explicit cache name, overriding `{site_id}-superpwa-{version}`.
    #[serde(default)]
    pub cache_name: Option<String>,

    /// Start page, cached at install.
    ///
    /// Set via PWA_SW_START_PAGE environment variable.
    #[serde(default = "default_start_page")]
    pub start_page: String,

    /// Page served when a request cannot be satisfied. Defaults to the
    /// start page.
    #[serde(default)]
    pub offline_page: Option<String>,

    /// Regular expressions for URLs that always bypass the worker.
    ///
    /// Set via PWA_SW_NEVER_CACHE_URLS environment variable (`[a, b]`).
    #[serde(default = "default_never_cache_urls")]
    pub never_cache_urls: Vec<String>,

    /// Path to SQLite cache database. Cache stores are kept in memory when
    /// unset.
    ///
    /// Set via PWA_SW_DB_PATH environment variable.
    #[serde(default)]
    pub db_path: Option<PathBuf>,

    /// User-Agent string for network requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Network request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum response body size in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Filename of the generated worker script.
    #[serde(default = "default_sw_filename")]
    pub sw_filename: String,

    /// Whether the site is part of a multisite network.
    #[serde(default)]
    pub multisite: bool,

    /// Push-notification worker integration.
    ///
    /// Nested keys use a double underscore: PWA_SW_PUSH__ENABLED.
    #[serde(default)]
    pub push: PushConfig,
}

/// Settings for merging a push-notification worker into ours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Script imported at the top of the generated worker.
    #[serde(default = "default_push_sdk_url")]
    pub sdk_url: String,

    /// Sender id added to the manifest as `gcm_sender_id`.
    #[serde(default = "default_gcm_sender_id", deserialize_with = "string_or_number")]
    pub gcm_sender_id: String,

    /// Worker filename the push provider expects.
    #[serde(default = "default_push_sw_filename")]
    pub sw_filename: String,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            sdk_url: default_push_sdk_url(),
            gcm_sender_id: default_gcm_sender_id(),
            sw_filename: default_push_sw_filename(),
        }
    }
}

/// Accept `VERSION=3` from the environment, which figment parses as a number.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Unsigned(u64),
        Signed(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Unsigned(n) => n.to_string(),
        Raw::Signed(n) => n.to_string(),
        Raw::Float(n) => n.to_string(),
    })
}

fn default_site_id() -> String {
    "localhost".into()
}

fn default_version() -> String {
    "1".into()
}

fn default_start_page() -> String {
    "http://localhost/".into()
}

fn default_never_cache_urls() -> Vec<String> {
    DEFAULT_NEVER_CACHE.iter().map(|p| p.to_string()).collect()
}

fn default_user_agent() -> String {
    "pwa-sw/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_sw_filename() -> String {
    "superpwa-sw.js".into()
}

fn default_push_sdk_url() -> String {
    "https://cdn.onesignal.com/sdks/OneSignalSDKWorker.js".into()
}

fn default_gcm_sender_id() -> String {
    "482941778795".into()
}

fn default_push_sw_filename() -> String {
    "OneSignalSDKWorker.js".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            site_id: default_site_id(),
            version: default_version(),
            cache_name: None,
            start_page: default_start_page(),
            offline_page: None,
            never_cache_urls: default_never_cache_urls(),
            db_path: None,
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            sw_filename: default_sw_filename(),
            multisite: false,
            push: PushConfig::default(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Name of the current cache store.
    pub fn cache_name(&self) -> String {
        match &self.cache_name {
            Some(name) => name.clone(),
            None => format!("{}-superpwa-{}", self.site_id, self.version),
        }
    }

    /// Offline page, falling back to the start page.
    pub fn offline_page(&self) -> &str {
        self.offline_page.as_deref().unwrap_or(&self.start_page)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `PWA_SW_`
    /// 2. TOML file from `PWA_SW_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("PWA_SW_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("PWA_SW_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Compile this configuration into the settings a worker runs with.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if a page URL or an exclusion pattern
    /// does not parse.
    pub fn worker_settings(&self) -> Result<WorkerSettings, ConfigError> {
        WorkerSettings::from_config(self)
    }
}
