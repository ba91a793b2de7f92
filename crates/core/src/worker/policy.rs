//! Fetch routing policy.
//!
//! Pure decision logic: given a request, the worker settings, the worker
//! origin and the connectivity hint, pick how the request is served. The
//! checks run in a fixed order; the first bypass wins.

use serde::{Deserialize, Serialize};
use url::Origin;

use crate::config::WorkerSettings;
use crate::message::Request;
use crate::urls::{is_http_scheme, is_same_origin};

/// Why a request was left to the browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum BypassReason {
    /// The worker is not active yet, or has been replaced.
    NotActive,
    /// URL matched a never-cache pattern.
    Excluded(String),
    /// Scheme other than http/https.
    UnsupportedScheme(String),
    CrossOrigin,
}

/// How an intercepted request is served.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "route", content = "detail", rename_all = "snake_case")]
pub enum Route {
    Bypass(BypassReason),
    /// Non-GET: network only, offline page on failure, cache untouched.
    NetworkOnly,
    /// Online navigation: network first, refresh the cached copy.
    Revalidate,
    /// Cache first, then network, then offline page.
    CacheFirst,
}

/// Decide how `request` is served.
pub fn route(request: &Request, settings: &WorkerSettings, origin: &Origin, online: bool) -> Route {
    if let Some(pattern) = settings.never_cache().first_match(request.url.as_str()) {
        return Route::Bypass(BypassReason::Excluded(pattern.to_string()));
    }

    if !is_http_scheme(&request.url) {
        return Route::Bypass(BypassReason::UnsupportedScheme(request.url.scheme().to_string()));
    }

    if !is_same_origin(&request.url, origin) {
        return Route::Bypass(BypassReason::CrossOrigin);
    }

    if !request.is_get() {
        return Route::NetworkOnly;
    }

    if request.is_navigation() && online {
        return Route::Revalidate;
    }

    Route::CacheFirst
}
