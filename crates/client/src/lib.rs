//! Client code for pwa-sw.
//!
//! This crate provides the HTTP network the worker fetches through, and
//! generation of the browser worker script and manifest, shared by the
//! server.

pub mod fetch;
pub mod script;

pub use fetch::{FetchConfig, HttpNetwork};
pub use script::{GeneratedWorker, Hooks, PushIntegration, generate_manifest, generate_worker, render_script};
