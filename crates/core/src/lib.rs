//! Core types and the offline cache worker for pwa-sw.
//!
//! This crate provides:
//! - The offline cache worker (install, activate, fetch handlers)
//! - Cache stores with in-memory and SQLite backends
//! - Capability traits for network, connectivity, origin and clients
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod exclusion;
pub mod message;
pub mod network;
pub mod urls;
pub mod worker;

pub use cache::{CacheDb, CacheStorage, MemoryCache};
pub use config::{AppConfig, WorkerSettings};
pub use error::Error;
pub use exclusion::ExclusionSet;
pub use message::{Request, RequestMode, Response};
pub use network::{ClientRegistry, ConnectivityProbe, Network, OriginResolver};
pub use worker::{FetchOutcome, OfflineWorker, WorkerEvents, WorkerState};
