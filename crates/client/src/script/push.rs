//! Merging a push-notification provider's worker into ours.
//!
//! A browser allows one worker per scope, so the push provider's script is
//! imported at the top of the offline worker and the file is renamed to the
//! name the provider registers. Not supported on multisite networks.

use serde_json::Value;

use pwa_core::config::PushConfig;
use pwa_core::urls::canonicalize;
use pwa_core::{AppConfig, Error};

use super::hooks::Hooks;
use super::prepend_import;

/// Filter id used on every hook this integration touches.
pub const FILTER_ID: &str = "push_integration";

/// Filters that merge a push provider's worker into the offline worker.
#[derive(Debug, Clone, PartialEq)]
pub struct PushIntegration {
    sdk_url: String,
    gcm_sender_id: String,
    sw_filename: String,
}

impl PushIntegration {
    /// Fails when `sdk_url` is not a usable http(s) URL.
    ///
    /// The URL is canonicalized exactly as [`WorkerSettings`] does it, so the
    /// template filter and the rendered script agree on one import line.
    ///
    /// [`WorkerSettings`]: pwa_core::WorkerSettings
    pub fn new(config: &PushConfig) -> Result<Self, Error> {
        let sdk_url = canonicalize(&config.sdk_url)?;
        Ok(Self {
            sdk_url: sdk_url.into(),
            gcm_sender_id: config.gcm_sender_id.clone(),
            sw_filename: config.sw_filename.clone(),
        })
    }

    /// Register the manifest, filename and template filters.
    ///
    /// Refused on multisite networks; returns whether the filters were added.
    pub fn register(&self, hooks: &mut Hooks, multisite: bool) -> bool {
        if multisite {
            tracing::warn!(
                sdk_url = %self.sdk_url,
                "push integration is not supported on multisite networks; disable one of them"
            );
            return false;
        }

        let sender = self.gcm_sender_id.clone();
        hooks.manifest.add(FILTER_ID, move |mut manifest: Value| {
            if let Some(fields) = manifest.as_object_mut() {
                fields.insert("gcm_sender_id".into(), Value::String(sender.clone()));
            }
            manifest
        });

        let filename = self.sw_filename.clone();
        hooks.sw_filename.add(FILTER_ID, move |_| filename.clone());

        let sdk_url = self.sdk_url.clone();
        hooks
            .sw_template
            .add(FILTER_ID, move |script| prepend_import(script, &sdk_url));

        tracing::info!(sw_filename = %self.sw_filename, "push integration registered");
        true
    }

    /// Remove every filter added by [`register`](Self::register).
    pub fn unregister(&self, hooks: &mut Hooks) {
        let removed = [
            hooks.manifest.remove(FILTER_ID),
            hooks.sw_filename.remove(FILTER_ID),
            hooks.sw_template.remove(FILTER_ID),
        ];
        if removed.iter().any(|r| *r) {
            tracing::info!("push integration unregistered");
        }
    }
}

/// Hooks for `config`, with the push integration registered when enabled.
pub fn configured_hooks(config: &AppConfig) -> Result<Hooks, Error> {
    let mut hooks = Hooks::new();
    if config.push.enabled {
        PushIntegration::new(&config.push)?.register(&mut hooks, config.multisite);
    }
    Ok(hooks)
}

/// Whether the site can be served as a PWA with this configuration.
///
/// Push integration on a multisite network leaves two workers competing for
/// one scope.
pub fn is_pwa_ready(config: &AppConfig) -> bool {
    !(config.push.enabled && config.multisite)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::{generate_manifest, generate_worker};
    use pwa_core::WorkerSettings;
    use url::Url;

    fn settings() -> WorkerSettings {
        let start = Url::parse("https://example.com/").unwrap();
        WorkerSettings::new("example.com-superpwa-1", start.clone(), start)
    }

    #[test]
    fn test_register_applies_all_filters() {
        let push = PushIntegration::new(&PushConfig::default()).unwrap();
        let mut hooks = Hooks::new();
        assert!(push.register(&mut hooks, false));

        let worker = generate_worker(&settings(), "superpwa-sw.js", &hooks);
        assert_eq!(worker.filename, "OneSignalSDKWorker.js");
        assert!(
            worker
                .script
                .starts_with("importScripts(\"https://cdn.onesignal.com/sdks/OneSignalSDKWorker.js\");\n")
        );

        let manifest = generate_manifest("Example", &settings(), &hooks);
        assert_eq!(manifest["gcm_sender_id"], "482941778795");
    }

    #[test]
    fn test_register_twice_does_not_duplicate() {
        let push = PushIntegration::new(&PushConfig::default()).unwrap();
        let mut hooks = Hooks::new();
        push.register(&mut hooks, false);
        push.register(&mut hooks, false);

        assert_eq!(hooks.sw_template.len(), 1);
        let script = generate_worker(&settings(), "superpwa-sw.js", &hooks).script;
        assert_eq!(script.matches("importScripts(").count(), 1);
    }

    #[test]
    fn test_no_double_import_with_configured_settings() {
        let config = AppConfig { push: PushConfig { enabled: true, ..Default::default() }, ..Default::default() };
        let settings = config.worker_settings().unwrap();
        let hooks = configured_hooks(&config).unwrap();

        let script = generate_worker(&settings, &config.sw_filename, &hooks).script;
        assert_eq!(script.matches("importScripts(").count(), 1);
    }

    #[test]
    fn test_single_import_for_non_canonical_sdk_url() {
        for sdk_url in [
            "https://CDN.onesignal.com/sdks/OneSignalSDKWorker.js",
            "cdn.onesignal.com/sdks/OneSignalSDKWorker.js",
            "  https://cdn.onesignal.com/sdks/OneSignalSDKWorker.js#v16 ",
        ] {
            let config = AppConfig {
                push: PushConfig { enabled: true, sdk_url: sdk_url.into(), ..Default::default() },
                ..Default::default()
            };
            let settings = config.worker_settings().unwrap();
            let hooks = configured_hooks(&config).unwrap();

            let script = generate_worker(&settings, &config.sw_filename, &hooks).script;
            assert_eq!(script.matches("importScripts(").count(), 1, "sdk_url {sdk_url:?}");
            assert!(
                script.starts_with("importScripts(\"https://cdn.onesignal.com/sdks/OneSignalSDKWorker.js\");\n"),
                "sdk_url {sdk_url:?}"
            );
        }
    }

    #[test]
    fn test_rejects_unusable_sdk_url() {
        let config = PushConfig { sdk_url: "ftp://cdn.onesignal.com/worker.js".into(), ..Default::default() };
        assert!(matches!(PushIntegration::new(&config), Err(Error::InvalidUrl(_))));
        assert!(
            configured_hooks(&AppConfig { push: PushConfig { enabled: true, ..config }, ..Default::default() }).is_err()
        );
    }

    #[test]
    fn test_unregister_restores_defaults() {
        let push = PushIntegration::new(&PushConfig::default()).unwrap();
        let mut hooks = Hooks::new();
        push.register(&mut hooks, false);
        push.unregister(&mut hooks);

        let worker = generate_worker(&settings(), "superpwa-sw.js", &hooks);
        assert_eq!(worker.filename, "superpwa-sw.js");
        assert!(!worker.script.contains("importScripts"));
        assert!(generate_manifest("Example", &settings(), &hooks).get("gcm_sender_id").is_none());
    }

    #[test]
    fn test_refused_on_multisite() {
        let push = PushIntegration::new(&PushConfig::default()).unwrap();
        let mut hooks = Hooks::new();
        assert!(!push.register(&mut hooks, true));
        assert!(hooks.manifest.is_empty());
        assert!(hooks.sw_filename.is_empty());
        assert!(hooks.sw_template.is_empty());
    }

    #[test]
    fn test_pwa_ready() {
        let mut config = AppConfig::default();
        assert!(is_pwa_ready(&config));
        config.multisite = true;
        assert!(is_pwa_ready(&config));
        config.push.enabled = true;
        assert!(!is_pwa_ready(&config));
    }

    #[test]
    fn test_configured_hooks() {
        let disabled = configured_hooks(&AppConfig::default()).unwrap();
        assert!(disabled.sw_filename.is_empty());

        let enabled =
            configured_hooks(&AppConfig { push: PushConfig { enabled: true, ..Default::default() }, ..Default::default() })
                .unwrap();
        assert!(enabled.sw_filename.contains(FILTER_ID));
    }
}
