//! Immutable settings a worker instance runs with.

use url::Url;

use super::validation::invalid;
use super::{AppConfig, ConfigError};
use crate::exclusion::ExclusionSet;
use crate::urls::canonicalize;

/// Compiled worker configuration.
///
/// Built once from [`AppConfig`] (or directly in tests) and shared read-only
/// by every handler of one worker instance.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    cache_name: String,
    start_page: Url,
    offline_page: Url,
    never_cache: ExclusionSet,
    import_script: Option<Url>,
}

impl WorkerSettings {
    /// Settings with the default WordPress exclusion set.
    pub fn new(cache_name: impl Into<String>, start_page: Url, offline_page: Url) -> Self {
        Self {
            cache_name: cache_name.into(),
            start_page,
            offline_page,
            never_cache: ExclusionSet::wordpress(),
            import_script: None,
        }
    }

    pub fn with_never_cache(mut self, never_cache: ExclusionSet) -> Self {
        self.never_cache = never_cache;
        self
    }

    /// Script imported at the top of the generated worker.
    pub fn with_import_script(mut self, url: Url) -> Self {
        self.import_script = Some(url);
        self
    }

    /// Same settings under a different cache name.
    pub fn with_cache_name(mut self, cache_name: impl Into<String>) -> Self {
        self.cache_name = cache_name.into();
        self
    }

    pub(super) fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let start_page = canonicalize(&config.start_page).map_err(|e| invalid("start_page", e))?;
        let offline_page = canonicalize(config.offline_page()).map_err(|e| invalid("offline_page", e))?;
        let never_cache = ExclusionSet::new(&config.never_cache_urls).map_err(|e| invalid("never_cache_urls", e))?;

        let import_script = if config.push.enabled && !config.multisite {
            Some(canonicalize(&config.push.sdk_url).map_err(|e| invalid("push.sdk_url", e))?)
        } else {
            None
        };

        Ok(Self { cache_name: config.cache_name(), start_page, offline_page, never_cache, import_script })
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub fn start_page(&self) -> &Url {
        &self.start_page
    }

    pub fn offline_page(&self) -> &Url {
        &self.offline_page
    }

    pub fn never_cache(&self) -> &ExclusionSet {
        &self.never_cache
    }

    pub fn import_script(&self) -> Option<&Url> {
        self.import_script.as_ref()
    }

    /// URLs cached at install, in order: start page, then offline page.
    pub fn seed_urls(&self) -> [&Url; 2] {
        [&self.start_page, &self.offline_page]
    }
}
