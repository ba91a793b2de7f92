//! Browser worker script and manifest generation.
//!
//! The script is rendered from a fixed template by placeholder substitution.
//! Every substituted value is a JSON string literal, so page URLs and
//! exclusion patterns cannot break out of the surrounding JavaScript.

pub mod hooks;
pub mod push;

pub use hooks::{FilterChain, Hooks};
pub use push::PushIntegration;

use serde::Serialize;
use serde_json::{Value, json};
use url::Url;

use pwa_core::WorkerSettings;

static WORKER_TEMPLATE: &str = r#"'use strict';

const cacheName = {{CACHE_NAME}};
const startPage = {{START_PAGE}};
const offlinePage = {{OFFLINE_PAGE}};
const filesToCache = [startPage, offlinePage];
const neverCacheUrls = [{{NEVER_CACHE_URLS}}];

self.addEventListener('install', function(e) {
	e.waitUntil(
		caches.open(cacheName).then(function(cache) {
			return Promise.all(filesToCache.map(function(url) {
				return cache.add(url).catch(function(reason) {
					console.log('pwa-sw: ' + String(reason) + ' ' + url);
				});
			}));
		})
	);
});

self.addEventListener('activate', function(e) {
	e.waitUntil(
		caches.keys().then(function(keyList) {
			return Promise.all(keyList.map(function(key) {
				if (key !== cacheName) {
					return caches.delete(key);
				}
			}));
		}).then(function() {
			return self.clients.claim();
		})
	);
});

function offlineResponse() {
	return caches.match(offlinePage).then(function(response) {
		return response || new Response('Offline', { status: 503, headers: { 'Content-Type': 'text/plain; charset=utf-8' } });
	});
}

function fetchAndStore(request) {
	return fetch(request).then(function(response) {
		var copy = response.clone();
		caches.open(cacheName).then(function(cache) {
			return cache.put(request, copy);
		}).catch(function(reason) {
			console.log('pwa-sw: ' + String(reason));
		});
		return response;
	});
}

self.addEventListener('fetch', function(e) {
	if (neverCacheUrls.some(function(pattern) { return pattern.test(e.request.url); })) {
		return;
	}

	if (!/^https?:\/\//i.test(e.request.url)) {
		return;
	}

	if (new URL(e.request.url).origin !== location.origin) {
		return;
	}

	if (e.request.method !== 'GET') {
		e.respondWith(fetch(e.request).catch(offlineResponse));
		return;
	}

	if (e.request.mode === 'navigate' && navigator.onLine) {
		e.respondWith(fetchAndStore(e.request).catch(offlineResponse));
		return;
	}

	e.respondWith(
		caches.open(cacheName).then(function(cache) {
			return cache.match(e.request);
		}).catch(function() {
			return undefined;
		}).then(function(response) {
			return response || fetchAndStore(e.request);
		}).catch(offlineResponse)
	);
});
"#;

/// A generated worker ready to be served.
#[derive(Debug, Clone, PartialEq, Serialize, schemars::JsonSchema)]
pub struct GeneratedWorker {
    pub filename: String,
    pub script: String,
}

fn js_string(value: &str) -> String {
    Value::String(value.to_string()).to_string()
}

/// The `importScripts` line for `url`.
pub fn import_line(url: &str) -> String {
    format!("importScripts({});\n", js_string(url))
}

/// Prepend an `importScripts` line unless the script already starts with it.
pub fn prepend_import(script: String, url: &str) -> String {
    let line = import_line(url);
    if script.starts_with(&line) { script } else { line + &script }
}

/// Render the worker script for `settings`, before any filters.
pub fn render_script(settings: &WorkerSettings) -> String {
    let patterns = settings
        .never_cache()
        .sources()
        .map(|source| format!("new RegExp({})", js_string(source)))
        .collect::<Vec<_>>()
        .join(", ");

    let script = WORKER_TEMPLATE
        .replace("{{CACHE_NAME}}", &js_string(settings.cache_name()))
        .replace("{{START_PAGE}}", &js_string(settings.start_page().as_str()))
        .replace("{{OFFLINE_PAGE}}", &js_string(settings.offline_page().as_str()))
        .replace("{{NEVER_CACHE_URLS}}", &patterns);

    match settings.import_script() {
        Some(url) => prepend_import(script, url.as_str()),
        None => script,
    }
}

/// Base web app manifest for a site, before any filters.
pub fn render_manifest(name: &str, start_page: &Url) -> Value {
    json!({
        "name": name,
        "short_name": name,
        "start_url": start_page.as_str(),
        "scope": "/",
        "display": "standalone",
    })
}

/// Render the worker and run it through the filename and template hooks.
pub fn generate_worker(settings: &WorkerSettings, sw_filename: &str, hooks: &Hooks) -> GeneratedWorker {
    let filename = hooks.sw_filename.apply(sw_filename.to_string());
    let script = hooks.sw_template.apply(render_script(settings));
    tracing::debug!(filename = %filename, bytes = script.len(), "generated worker script");
    GeneratedWorker { filename, script }
}

/// Render the manifest and run it through the manifest hook.
pub fn generate_manifest(name: &str, settings: &WorkerSettings, hooks: &Hooks) -> Value {
    hooks.manifest.apply(render_manifest(name, settings.start_page()))
}
