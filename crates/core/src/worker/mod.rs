//! The offline cache worker.
//!
//! One [`OfflineWorker`] is one instance of the browser-side script: it owns
//! immutable [`WorkerSettings`], moves through [`WorkerState`], and answers
//! the three events a service worker receives.
//!
//! ### Install
//! Opens the current cache store and adds every seed URL. Each add is
//! best-effort: a transport error or non-2xx status is logged and skipped.
//!
//! ### Activate
//! Deletes every cache store except the current one, then claims all open
//! clients so the new policy applies without a reload.
//!
//! ### Fetch
//! Routes the request (see [`policy`]) and serves it from network, cache or
//! the offline page. Failures never escape: the worst case is the offline
//! page, or a 503 placeholder when even that is not cached.

pub mod lifecycle;
pub mod policy;

pub use lifecycle::WorkerState;
pub use policy::{BypassReason, Route};

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use url::Url;

use crate::Error;
use crate::cache::CacheStorage;
use crate::config::WorkerSettings;
use crate::message::{Request, Response};
use crate::network::{ClientRegistry, ConnectivityProbe, Network, OriginResolver};

/// Event handlers of a worker instance.
///
/// A host (browser shim, test harness, MCP server) calls these directly.
/// `on_install` and `on_activate` return only once all of their work has
/// settled.
#[async_trait::async_trait]
pub trait WorkerEvents: Send + Sync {
    async fn on_install(&self) -> Result<InstallReport, Error>;

    async fn on_activate(&self) -> Result<ActivationReport, Error>;

    /// Never fails: network errors degrade to cached content or the offline
    /// page.
    async fn on_fetch(&self, request: Request) -> FetchOutcome;
}

/// Capabilities injected into a worker.
#[derive(Clone)]
pub struct WorkerContext {
    pub cache: Arc<dyn CacheStorage>,
    pub network: Arc<dyn Network>,
    pub connectivity: Arc<dyn ConnectivityProbe>,
    pub origin: Arc<dyn OriginResolver>,
    pub clients: Arc<dyn ClientRegistry>,
}

/// A seed URL that could not be cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SkippedSeed {
    pub url: String,
    pub reason: String,
}

/// Outcome of the install handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct InstallReport {
    pub cache_name: String,
    /// Seed URLs now in the cache store.
    pub cached: Vec<String>,
    pub skipped: Vec<SkippedSeed>,
}

/// Outcome of the activate handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ActivationReport {
    pub cache_name: String,
    /// Stale cache stores deleted.
    pub removed: Vec<String>,
    pub clients_claimed: usize,
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Network,
    Cache,
    /// The cached offline page, standing in for an unreachable resource.
    OfflineFallback,
    /// 503 answer used when the offline page is not cached either.
    Placeholder,
}

/// Result of the fetch handler.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// Not intercepted; the host performs the request itself.
    PassThrough(BypassReason),
    Respond { response: Response, source: ResponseSource },
}

impl FetchOutcome {
    pub fn response(&self) -> Option<&Response> {
        match self {
            FetchOutcome::Respond { response, .. } => Some(response),
            FetchOutcome::PassThrough(_) => None,
        }
    }

    pub fn source(&self) -> Option<ResponseSource> {
        match self {
            FetchOutcome::Respond { source, .. } => Some(*source),
            FetchOutcome::PassThrough(_) => None,
        }
    }

    pub fn is_pass_through(&self) -> bool {
        matches!(self, FetchOutcome::PassThrough(_))
    }
}

/// One instance of the offline cache worker.
pub struct OfflineWorker {
    id: u64,
    settings: Arc<WorkerSettings>,
    ctx: WorkerContext,
    state: RwLock<WorkerState>,
    /// Serializes install and activate.
    transition: Mutex<()>,
}

impl OfflineWorker {
    /// Create a worker in the `Installing` state.
    pub fn new(settings: WorkerSettings, ctx: WorkerContext) -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::SeqCst),
            settings: Arc::new(settings),
            ctx,
            state: RwLock::new(WorkerState::Installing),
            transition: Mutex::new(()),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    pub fn context(&self) -> &WorkerContext {
        &self.ctx
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    /// Mark this instance as superseded. It stops intercepting fetches.
    pub async fn retire(&self) {
        self.set_state(WorkerState::Redundant).await;
    }

    /// A retired worker stays `Redundant`, even if a handler it was running
    /// completes afterwards.
    async fn set_state(&self, next: WorkerState) {
        let mut state = self.state.write().await;
        if state.is_terminal() {
            if next != *state {
                tracing::debug!(worker = self.id, to = %next, "worker is redundant; state change dropped");
            }
            return;
        }
        if *state != next {
            tracing::info!(worker = self.id, from = %*state, to = %next, "worker state changed");
            *state = next;
        }
    }

    /// Fetch one seed URL and store it. Non-2xx responses are rejected.
    async fn add_seed(&self, url: &Url) -> Result<(), Error> {
        let request = Request::get(url.clone());
        let response = self.ctx.network.fetch(&request).await?;
        if !response.is_ok() {
            return Err(Error::HttpError(format!("status {} for {url}", response.status.as_u16())));
        }
        self.ctx
            .cache
            .put(self.settings.cache_name(), &request, &response)
            .await
    }

    /// Store a runtime response, logging and continuing on failure.
    async fn store(&self, request: &Request, response: &Response) {
        if let Err(e) = self
            .ctx
            .cache
            .put(self.settings.cache_name(), request, response)
            .await
        {
            tracing::warn!(url = %request.url, error = %e, "failed to store response; continuing");
        }
    }

    /// Look up the current store, treating storage failures as a miss.
    async fn cached(&self, request: &Request) -> Option<Response> {
        match self.ctx.cache.lookup(self.settings.cache_name(), request).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "cache lookup failed; treating as miss");
                None
            }
        }
    }

    /// Serve the cached offline page in place of `request`.
    async fn offline_fallback(&self, request: &Request) -> FetchOutcome {
        let offline = Request::get(self.settings.offline_page().clone());
        match self.ctx.cache.lookup_any(&offline).await {
            Ok(Some(response)) => {
                tracing::debug!(url = %request.url, "serving offline page");
                FetchOutcome::Respond { response, source: ResponseSource::OfflineFallback }
            }
            Ok(None) => {
                tracing::warn!(url = %request.url, offline_page = %offline.url, "offline page is not cached");
                FetchOutcome::Respond {
                    response: Response::offline_placeholder(request.url.clone()),
                    source: ResponseSource::Placeholder,
                }
            }
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "offline page lookup failed");
                FetchOutcome::Respond {
                    response: Response::offline_placeholder(request.url.clone()),
                    source: ResponseSource::Placeholder,
                }
            }
        }
    }

    async fn network_only(&self, request: &Request) -> FetchOutcome {
        match self.ctx.network.fetch(request).await {
            Ok(response) => FetchOutcome::Respond { response, source: ResponseSource::Network },
            Err(e) => {
                tracing::debug!(url = %request.url, method = %request.method, error = %e, "network request failed");
                self.offline_fallback(request).await
            }
        }
    }

    async fn fetch_and_store(&self, request: &Request) -> FetchOutcome {
        match self.ctx.network.fetch(request).await {
            Ok(response) => {
                self.store(request, &response).await;
                FetchOutcome::Respond { response, source: ResponseSource::Network }
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "network request failed");
                self.offline_fallback(request).await
            }
        }
    }

    async fn cache_first(&self, request: &Request) -> FetchOutcome {
        if let Some(response) = self.cached(request).await {
            tracing::debug!(url = %request.url, "cache hit");
            return FetchOutcome::Respond { response, source: ResponseSource::Cache };
        }
        self.fetch_and_store(request).await
    }
}

#[async_trait::async_trait]
impl WorkerEvents for OfflineWorker {
    async fn on_install(&self) -> Result<InstallReport, Error> {
        let _transition = self.transition.lock().await;
        self.state().await.expect(WorkerState::Installing, "install")?;

        let cache_name = self.settings.cache_name().to_string();
        tracing::info!(worker = self.id, cache_name = %cache_name, "installing worker");

        if let Err(e) = self.ctx.cache.open(&cache_name).await {
            tracing::warn!(worker = self.id, error = %e, "failed to open cache store; install failed");
            self.set_state(WorkerState::Redundant).await;
            return Err(e);
        }

        let mut seeds: Vec<&Url> = self.settings.seed_urls().to_vec();
        seeds.dedup();

        let results = join_all(seeds.iter().map(|url| self.add_seed(url))).await;

        let mut report = InstallReport { cache_name, cached: Vec::new(), skipped: Vec::new() };
        for (url, result) in seeds.iter().zip(results) {
            match result {
                Ok(()) => report.cached.push(url.to_string()),
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "skipping seed URL");
                    report
                        .skipped
                        .push(SkippedSeed { url: url.to_string(), reason: e.to_string() });
                }
            }
        }

        self.set_state(WorkerState::Waiting).await;
        Ok(report)
    }

    async fn on_activate(&self) -> Result<ActivationReport, Error> {
        let _transition = self.transition.lock().await;
        self.state().await.expect(WorkerState::Waiting, "activate")?;
        self.set_state(WorkerState::Activating).await;

        let cache_name = self.settings.cache_name().to_string();
        let stale: Vec<String> = match self.ctx.cache.keys().await {
            Ok(keys) => keys.into_iter().filter(|k| *k != cache_name).collect(),
            Err(e) => {
                tracing::warn!(worker = self.id, error = %e, "failed to list cache stores; skipping cleanup");
                Vec::new()
            }
        };

        let results = join_all(stale.iter().map(|name| self.ctx.cache.delete(name))).await;
        let mut removed = Vec::new();
        for (name, result) in stale.into_iter().zip(results) {
            match result {
                Ok(true) => {
                    tracing::info!(cache_name = %name, "old cache removed");
                    removed.push(name);
                }
                Ok(false) => {}
                Err(e) => tracing::warn!(cache_name = %name, error = %e, "failed to remove old cache"),
            }
        }

        let clients_claimed = self.ctx.clients.claim();
        self.set_state(WorkerState::Active).await;

        Ok(ActivationReport { cache_name, removed, clients_claimed })
    }

    async fn on_fetch(&self, request: Request) -> FetchOutcome {
        if !self.state().await.can_intercept_fetch() {
            return FetchOutcome::PassThrough(BypassReason::NotActive);
        }

        let origin = self.ctx.origin.origin();
        let online = self.ctx.connectivity.is_online();

        match policy::route(&request, &self.settings, &origin, online) {
            Route::Bypass(reason) => {
                tracing::debug!(url = %request.url, ?reason, "request not intercepted");
                FetchOutcome::PassThrough(reason)
            }
            Route::NetworkOnly => self.network_only(&request).await,
            Route::Revalidate => self.fetch_and_store(&request).await,
            Route::CacheFirst => self.cache_first(&request).await,
        }
    }
}
