//! Validation of loaded configuration.

use crate::config::AppConfig;
use crate::exclusion::ExclusionSet;
use crate::urls::canonicalize;
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

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - the cache name or `user_agent` is empty
    /// - `start_page` or `offline_page` is not an http(s) URL
    /// - an entry of `never_cache_urls` is not a valid regular expression
    /// - `max_bytes` is outside 1 byte..=50MB
    /// - `timeout_ms` is outside 100ms..=5 minutes
    ///
    /// Returns `ConfigError::Missing` if push integration is enabled without
    /// an SDK URL.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_name().trim().is_empty() {
            return Err(invalid("cache_name", "must not be empty"));
        }

        let start = canonicalize(&self.start_page).map_err(|e| invalid("start_page", e))?;
        let offline = canonicalize(self.offline_page()).map_err(|e| invalid("offline_page", e))?;
        if start.origin() != offline.origin() {
            tracing::warn!(
                start_page = %start,
                offline_page = %offline,
                "offline_page is cross-origin to start_page; it is cached but never served"
            );
        }

        ExclusionSet::new(&self.never_cache_urls).map_err(|e| invalid("never_cache_urls", e))?;

        if !(1..=MAX_BODY_BYTES).contains(&self.max_bytes) {
            return Err(invalid("max_bytes", "must be between 1 byte and 50MB"));
        }

        if !(MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&self.timeout_ms) {
            return Err(invalid("timeout_ms", "must be between 100ms and 5 minutes (300000ms)"));
        }

        if self.user_agent.trim().is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.sw_filename.trim().is_empty() {
            return Err(invalid("sw_filename", "must not be empty"));
        }

        if self.push.enabled && self.push.sdk_url.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "push.sdk_url".into(),
                hint: "Set PWA_SW_PUSH__SDK_URL or disable push integration".into(),
            });
        }

        Ok(())
    }
}

const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;
const MIN_TIMEOUT_MS: u64 = 100;
const MAX_TIMEOUT_MS: u64 = 300_000;

pub(super) fn invalid(field: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.to_string() }
}
