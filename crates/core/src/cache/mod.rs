//! Named cache stores holding captured responses.
//!
//! A cache store maps request identity (the URL without fragment) to the
//! last response stored for it. Stores are addressed by name; the worker
//! keeps exactly one current store and deletes the others on activation.
//!
//! Two backends implement [`CacheStorage`]:
//!
//! - [`MemoryCache`]: process-local, for tests and ephemeral harnesses
//! - [`CacheDb`]: SQLite via tokio-rusqlite, WAL mode, versioned migrations

pub mod connection;
pub mod hash;
pub mod memory;
pub mod migrations;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use memory::MemoryCache;

use crate::message::{Request, Response};

/// Storage for named cache stores.
///
/// All methods are safe to call concurrently.
#[async_trait::async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open the store named `cache_name`, creating it if absent.
    async fn open(&self, cache_name: &str) -> Result<(), Error>;

    /// Names of all existing stores, oldest first.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Delete a store and every entry in it.
    ///
    /// Returns false if no such store existed.
    async fn delete(&self, cache_name: &str) -> Result<bool, Error>;

    /// Store `response` for `request`, replacing any previous entry.
    ///
    /// Creates the store if absent. Only GET requests can be stored.
    async fn put(&self, cache_name: &str, request: &Request, response: &Response) -> Result<(), Error>;

    /// Look up `request` in a single store.
    async fn lookup(&self, cache_name: &str, request: &Request) -> Result<Option<Response>, Error>;

    /// Look up `request` across all stores, oldest store first.
    async fn lookup_any(&self, request: &Request) -> Result<Option<Response>, Error>;

    /// URLs stored in a store, in insertion order.
    async fn entry_urls(&self, cache_name: &str) -> Result<Vec<String>, Error>;
}

pub(crate) fn ensure_cacheable(request: &Request) -> Result<(), Error> {
    if request.is_get() {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("cannot cache {} request for {}", request.method, request.url)))
    }
}
