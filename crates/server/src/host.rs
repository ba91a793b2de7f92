//! Hosts worker instances the way a browser does for one site.
//!
//! At most two instances exist at a time: the active worker that intercepts
//! fetches, and an incoming one being installed or waiting to take over.
//! Activating the incoming worker retires the previous active one.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use pwa_client::script::push::{configured_hooks, is_pwa_ready};
use pwa_client::{GeneratedWorker, Hooks, generate_manifest, generate_worker};
use pwa_core::network::{ClientSet, ConnectivityFlag, FixedOrigin};
use pwa_core::worker::{ActivationReport, BypassReason, InstallReport, ResponseSource, WorkerContext};
use pwa_core::{
    AppConfig, CacheStorage, ConnectivityProbe, Error, FetchOutcome, Network, OfflineWorker, Request, Response, WorkerEvents,
    WorkerState,
};

/// Summary of one worker instance.
#[derive(Debug, Clone, Serialize, schemars::JsonSchema)]
pub struct WorkerSummary {
    pub id: u64,
    pub state: WorkerState,
    pub cache_name: String,
}

/// Snapshot of the host.
#[derive(Debug, Clone, Serialize, schemars::JsonSchema)]
pub struct HostStatus {
    pub active: Option<WorkerSummary>,
    pub incoming: Option<WorkerSummary>,
    pub version: String,
    pub online: bool,
    pub clients_open: usize,
    pub clients_controlled: usize,
    pub pwa_ready: bool,
}

/// A response delivered to the page, with how it was produced.
#[derive(Debug, Clone)]
pub struct Delivered {
    pub response: Response,
    /// `None` when the request bypassed the worker.
    pub source: Option<ResponseSource>,
    pub bypass: Option<BypassReason>,
}

struct Slots {
    config: AppConfig,
    active: Option<Arc<OfflineWorker>>,
    incoming: Option<Arc<OfflineWorker>>,
}

/// Owns the shared capabilities and the worker instances of one site.
pub struct WorkerHost {
    cache: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    connectivity: Arc<ConnectivityFlag>,
    clients: Arc<ClientSet>,
    hooks: Hooks,
    slots: RwLock<Slots>,
}

fn config_error(err: impl std::fmt::Display) -> Error {
    Error::InvalidInput(err.to_string())
}

impl WorkerHost {
    /// Create a host with one incoming worker for `config`, not yet installed.
    ///
    /// `network` should already honour `connectivity`.
    pub fn new(
        config: AppConfig, cache: Arc<dyn CacheStorage>, network: Arc<dyn Network>,
        connectivity: Arc<ConnectivityFlag>,
    ) -> Result<Self, Error> {
        let hooks = configured_hooks(&config)?;
        let mut host = Self {
            cache,
            network,
            connectivity,
            clients: Arc::new(ClientSet::new(1)),
            hooks,
            slots: RwLock::new(Slots { config: config.clone(), active: None, incoming: None }),
        };
        let worker = host.spawn(&config)?;
        host.slots.get_mut().incoming = Some(worker);
        Ok(host)
    }

    fn spawn(&self, config: &AppConfig) -> Result<Arc<OfflineWorker>, Error> {
        let settings = config.worker_settings().map_err(config_error)?;
        let ctx = WorkerContext {
            cache: self.cache.clone(),
            network: self.network.clone(),
            connectivity: self.connectivity.clone(),
            origin: Arc::new(FixedOrigin::of(settings.start_page())),
            clients: self.clients.clone(),
        };
        let worker = Arc::new(OfflineWorker::new(settings, ctx));
        tracing::info!(worker = worker.id(), cache_name = worker.settings().cache_name(), "worker registered");
        Ok(worker)
    }

    async fn incoming(&self) -> Result<Arc<OfflineWorker>, Error> {
        self.slots
            .read()
            .await
            .incoming
            .clone()
            .ok_or_else(|| Error::InvalidState("no incoming worker; use sw_upgrade to register one".into()))
    }

    /// Install the incoming worker.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        let worker = self.incoming().await?;
        let result = worker.on_install().await;
        if worker.state().await.is_terminal() {
            let mut slots = self.slots.write().await;
            if slots.incoming.as_ref().is_some_and(|w| w.id() == worker.id()) {
                slots.incoming = None;
            }
        }
        result
    }

    /// Activate the incoming worker, retiring the previously active one.
    pub async fn activate(&self) -> Result<ActivationReport, Error> {
        let worker = self.incoming().await?;
        let report = worker.on_activate().await?;

        let previous = {
            let mut slots = self.slots.write().await;
            if slots.incoming.as_ref().is_some_and(|w| w.id() == worker.id()) {
                slots.incoming = None;
            }
            slots.active.replace(worker)
        };
        if let Some(previous) = previous {
            previous.retire().await;
        }
        Ok(report)
    }

    /// Register a worker for `version` and install it.
    ///
    /// It waits beside the active worker until [`activate`](Self::activate).
    /// The new version must map to a new cache store, otherwise activation
    /// could not drop the old entries: a fixed `cache_name` or an unchanged
    /// version is rejected.
    pub async fn upgrade(&self, version: String) -> Result<InstallReport, Error> {
        let worker = {
            let mut slots = self.slots.write().await;
            if let Some(name) = &slots.config.cache_name {
                return Err(Error::InvalidInput(format!(
                    "cache_name is fixed to {name:?}; unset it so the cache store follows the version"
                )));
            }
            let mut config = slots.config.clone();
            config.version = version;
            if config.cache_name() == slots.config.cache_name() {
                return Err(Error::InvalidInput(format!("version {:?} is already registered", config.version)));
            }
            config.validate().map_err(config_error)?;
            let worker = self.spawn(&config)?;
            slots.config = config;
            if let Some(replaced) = slots.incoming.replace(worker.clone()) {
                replaced.retire().await;
            }
            worker
        };
        self.install().await.inspect_err(|e| {
            tracing::warn!(worker = worker.id(), error = %e, "upgrade install failed");
        })
    }

    /// Deliver `request` to the page, through the active worker if any.
    ///
    /// Requests the worker does not intercept go straight to the network.
    pub async fn fetch(&self, request: Request) -> Result<Delivered, Error> {
        let active = self.slots.read().await.active.clone();
        let outcome = match active {
            Some(worker) => worker.on_fetch(request.clone()).await,
            None => FetchOutcome::PassThrough(BypassReason::NotActive),
        };

        match outcome {
            FetchOutcome::Respond { response, source } => Ok(Delivered { response, source: Some(source), bypass: None }),
            FetchOutcome::PassThrough(reason) => {
                let response = self.network.fetch(&request).await?;
                Ok(Delivered { response, source: None, bypass: Some(reason) })
            }
        }
    }

    pub fn set_online(&self, online: bool) {
        self.connectivity.set_online(online);
        tracing::info!(online, "connectivity changed");
    }

    pub async fn status(&self) -> HostStatus {
        let slots = self.slots.read().await;
        HostStatus {
            active: summarize(slots.active.as_deref()).await,
            incoming: summarize(slots.incoming.as_deref()).await,
            version: slots.config.version.clone(),
            online: self.connectivity.is_online(),
            clients_open: self.clients.open(),
            clients_controlled: self.clients.controlled(),
            pwa_ready: is_pwa_ready(&slots.config),
        }
    }

    pub fn cache(&self) -> &Arc<dyn CacheStorage> {
        &self.cache
    }

    /// Script of the newest registered worker.
    pub async fn script(&self) -> Result<GeneratedWorker, Error> {
        let slots = self.slots.read().await;
        let worker = slots
            .incoming
            .as_ref()
            .or(slots.active.as_ref())
            .ok_or_else(|| Error::InvalidState("no worker registered".into()))?;
        Ok(generate_worker(worker.settings(), &slots.config.sw_filename, &self.hooks))
    }

    /// Manifest of the site with hooks applied.
    pub async fn manifest(&self) -> Result<serde_json::Value, Error> {
        let slots = self.slots.read().await;
        let settings = slots.config.worker_settings().map_err(config_error)?;
        Ok(generate_manifest(&slots.config.site_id, &settings, &self.hooks))
    }
}

async fn summarize(worker: Option<&OfflineWorker>) -> Option<WorkerSummary> {
    let worker = worker?;
    Some(WorkerSummary {
        id: worker.id(),
        state: worker.state().await,
        cache_name: worker.settings().cache_name().to_string(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use http::StatusCode;
    use pwa_core::MemoryCache;
    use pwa_core::network::{GatedNetwork, StaticNetwork};
    use url::Url;

    pub(crate) const SITE: &str = "https://example.com/";
    pub(crate) const OFFLINE: &str = "https://example.com/offline/";

    pub(crate) fn site_config() -> AppConfig {
        AppConfig {
            site_id: "example.com".into(),
            start_page: SITE.into(),
            offline_page: Some(OFFLINE.into()),
            ..Default::default()
        }
    }

    pub(crate) fn site_network() -> StaticNetwork {
        let page = |s: &str, body: &'static str| (Url::parse(s).unwrap(), body);
        [
            page(SITE, "<h1>Home</h1>"),
            page(OFFLINE, "<h1>Offline</h1>"),
            page("https://example.com/style.css", "body {}"),
            page("https://example.com/contact", "sent"),
        ]
        .into_iter()
        .fold(StaticNetwork::new(), |network, (url, body)| {
            network.route(&url, Response::new(url.clone(), StatusCode::OK, body))
        })
    }

    /// Host over an in-memory cache and a stub site.
    pub(crate) fn host() -> WorkerHost {
        let flag = Arc::new(ConnectivityFlag::default());
        let network = Arc::new(GatedNetwork::new(site_network(), flag.clone()));
        WorkerHost::new(site_config(), Arc::new(MemoryCache::new()), network, flag).unwrap()
    }

    pub(crate) async fn active_host() -> WorkerHost {
        let host = host();
        host.install().await.unwrap();
        host.activate().await.unwrap();
        host
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_new_host_has_incoming_worker() {
        let status = host().status().await;
        assert!(status.active.is_none());
        let incoming = status.incoming.unwrap();
        assert_eq!(incoming.state, WorkerState::Installing);
        assert_eq!(incoming.cache_name, "example.com-superpwa-1");
        assert!(status.online);
        assert!(status.pwa_ready);
    }

    #[tokio::test]
    async fn test_install_then_activate() {
        let host = host();
        let report = host.install().await.unwrap();
        assert_eq!(report.cached.len(), 2);

        let report = host.activate().await.unwrap();
        assert_eq!(report.clients_claimed, 1);

        let status = host.status().await;
        assert!(status.incoming.is_none());
        assert_eq!(status.active.unwrap().state, WorkerState::Active);
        assert_eq!(status.clients_controlled, 1);
    }

    #[tokio::test]
    async fn test_activate_without_incoming() {
        let host = active_host().await;
        assert!(matches!(host.activate().await, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_fetch_before_activation_goes_to_network() {
        let host = host();
        let delivered = host.fetch(Request::navigate(url(SITE))).await.unwrap();
        assert_eq!(delivered.bypass, Some(BypassReason::NotActive));
        assert!(delivered.source.is_none());
        assert_eq!(delivered.response.body.as_ref(), b"<h1>Home</h1>");
    }

    #[tokio::test]
    async fn test_offline_round_trip() {
        let host = active_host().await;
        host.fetch(Request::get(url("https://example.com/style.css"))).await.unwrap();

        host.set_online(false);
        let cached = host.fetch(Request::get(url("https://example.com/style.css"))).await.unwrap();
        assert_eq!(cached.source, Some(ResponseSource::Cache));

        let fallback = host.fetch(Request::navigate(url("https://example.com/unknown/"))).await.unwrap();
        assert_eq!(fallback.source, Some(ResponseSource::OfflineFallback));
        assert_eq!(fallback.response.body.as_ref(), b"<h1>Offline</h1>");
    }

    #[tokio::test]
    async fn test_bypassed_request_offline_is_an_error() {
        let host = active_host().await;
        host.set_online(false);
        let err = host
            .fetch(Request::navigate(url("https://example.com/wp-admin/")))
            .await
            .unwrap_err();
        assert!(err.is_fetch_failure());
    }

    #[tokio::test]
    async fn test_upgrade_replaces_cache() {
        let host = active_host().await;
        let report = host.upgrade("2".into()).await.unwrap();
        assert_eq!(report.cache_name, "example.com-superpwa-2");

        let status = host.status().await;
        assert_eq!(status.version, "2");
        assert_eq!(status.active.as_ref().unwrap().cache_name, "example.com-superpwa-1");
        assert_eq!(status.incoming.as_ref().unwrap().state, WorkerState::Waiting);
        assert_eq!(host.cache().keys().await.unwrap().len(), 2);

        let activation = host.activate().await.unwrap();
        assert_eq!(activation.removed, vec!["example.com-superpwa-1"]);
        assert_eq!(host.cache().keys().await.unwrap(), vec!["example.com-superpwa-2"]);
        assert_eq!(host.status().await.active.unwrap().cache_name, "example.com-superpwa-2");
    }

    #[tokio::test]
    async fn test_upgrade_refused_with_fixed_cache_name() {
        let flag = Arc::new(ConnectivityFlag::default());
        let network = Arc::new(GatedNetwork::new(site_network(), flag.clone()));
        let config = AppConfig { cache_name: Some("example-cache".into()), ..site_config() };
        let host = WorkerHost::new(config, Arc::new(MemoryCache::new()), network, flag).unwrap();
        host.install().await.unwrap();
        host.activate().await.unwrap();
        host.fetch(Request::get(url("https://example.com/style.css"))).await.unwrap();

        assert!(matches!(host.upgrade("2".into()).await, Err(Error::InvalidInput(_))));

        let status = host.status().await;
        assert_eq!(status.version, "1");
        assert!(status.incoming.is_none());
        assert_eq!(status.active.unwrap().state, WorkerState::Active);
        assert_eq!(host.cache().entry_urls("example-cache").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_upgrade_to_same_version_refused() {
        let host = active_host().await;
        assert!(matches!(host.upgrade("1".into()).await, Err(Error::InvalidInput(_))));
        assert!(host.status().await.incoming.is_none());
    }

    #[tokio::test]
    async fn test_script_follows_newest_worker() {
        let host = active_host().await;
        assert!(host.script().await.unwrap().script.contains("example.com-superpwa-1"));
        host.upgrade("3".into()).await.unwrap();
        assert!(host.script().await.unwrap().script.contains("example.com-superpwa-3"));
    }

    #[tokio::test]
    async fn test_push_enabled_host() {
        let flag = Arc::new(ConnectivityFlag::default());
        let network = Arc::new(GatedNetwork::new(site_network(), flag.clone()));
        let mut config = site_config();
        config.push.enabled = true;
        let host = WorkerHost::new(config, Arc::new(MemoryCache::new()), network, flag).unwrap();

        let script = host.script().await.unwrap();
        assert_eq!(script.filename, "OneSignalSDKWorker.js");
        assert_eq!(script.script.matches("importScripts(").count(), 1);
        assert_eq!(host.manifest().await.unwrap()["gcm_sender_id"], "482941778795");
    }
}
