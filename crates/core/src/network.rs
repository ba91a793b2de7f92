//! Capabilities the worker receives from its host.
//!
//! The browser hands a service worker `fetch`, `navigator.onLine`,
//! `location.origin` and `clients.claim()` as globals. Here each one is a
//! trait object injected at construction, so a harness can simulate offline
//! and cross-origin scenarios deterministically.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use url::{Origin, Url};

use crate::Error;
use crate::message::{Request, Response};
use crate::urls::without_fragment;

/// Performs network requests on behalf of the worker.
///
/// Mirrors browser `fetch` semantics: any HTTP status is a successful
/// response; only transport failures are errors.
#[async_trait::async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Reports whether the client believes it has network connectivity.
pub trait ConnectivityProbe: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Resolves the origin the worker is registered for.
pub trait OriginResolver: Send + Sync {
    fn origin(&self) -> Origin;
}

/// The set of client pages a worker can take control of.
pub trait ClientRegistry: Send + Sync {
    /// Take control of every open client. Returns how many were claimed.
    fn claim(&self) -> usize;
}

/// Connectivity switch shared between a harness and the worker.
#[derive(Debug)]
pub struct ConnectivityFlag {
    online: AtomicBool,
}

impl ConnectivityFlag {
    pub fn new(online: bool) -> Self {
        Self { online: AtomicBool::new(online) }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

impl Default for ConnectivityFlag {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ConnectivityProbe for ConnectivityFlag {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

/// Origin fixed at construction.
#[derive(Debug, Clone)]
pub struct FixedOrigin(Origin);

impl FixedOrigin {
    /// Origin of the given page URL.
    pub fn of(url: &Url) -> Self {
        Self(url.origin())
    }
}

impl OriginResolver for FixedOrigin {
    fn origin(&self) -> Origin {
        self.0.clone()
    }
}

/// Counts open client pages and which of them are controlled.
#[derive(Debug, Default)]
pub struct ClientSet {
    open: AtomicUsize,
    controlled: AtomicUsize,
}

impl ClientSet {
    pub fn new(open: usize) -> Self {
        Self { open: AtomicUsize::new(open), controlled: AtomicUsize::new(0) }
    }

    /// A new page was opened. It starts uncontrolled.
    pub fn connect(&self) {
        self.open.fetch_add(1, Ordering::SeqCst);
    }

    pub fn open(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    pub fn controlled(&self) -> usize {
        self.controlled.load(Ordering::SeqCst)
    }
}

impl ClientRegistry for ClientSet {
    fn claim(&self) -> usize {
        let open = self.open();
        let previously = self.controlled.swap(open, Ordering::SeqCst);
        open.saturating_sub(previously)
    }
}

/// Serves canned responses by URL; anything else fails like a dropped
/// connection.
///
/// Used for offline demos and tests.
#[derive(Debug, Default)]
pub struct StaticNetwork {
    routes: HashMap<String, Response>,
    hits: AtomicUsize,
}

impl StaticNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `response` for requests to `url` (fragment ignored).
    pub fn route(mut self, url: &Url, response: Response) -> Self {
        self.routes.insert(without_fragment(url).to_string(), response);
        self
    }

    /// Number of fetches attempted so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Network for StaticNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        self.routes
            .get(without_fragment(&request.url).as_str())
            .cloned()
            .ok_or_else(|| Error::Network(format!("connection refused: {}", request.url)))
    }
}

/// Fails every request while the probe reports offline.
pub struct GatedNetwork<N> {
    inner: N,
    probe: Arc<dyn ConnectivityProbe>,
}

impl<N: Network> GatedNetwork<N> {
    pub fn new(inner: N, probe: Arc<dyn ConnectivityProbe>) -> Self {
        Self { inner, probe }
    }

    pub fn inner(&self) -> &N {
        &self.inner
    }
}

#[async_trait::async_trait]
impl<N: Network> Network for GatedNetwork<N> {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        if !self.probe.is_online() {
            return Err(Error::Network(format!("offline: {}", request.url)));
        }
        self.inner.fetch(request).await
    }
}
