//! In-memory cache stores.

use std::sync::Arc;

use tokio::sync::RwLock;

use super::{CacheStorage, ensure_cacheable};
use crate::Error;
use crate::message::{Request, Response};

#[derive(Debug, Default)]
struct NamedStore {
    name: String,
    /// (cache key, response), in insertion order.
    entries: Vec<(String, Response)>,
}

impl NamedStore {
    fn get(&self, key: &str) -> Option<&Response> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, r)| r)
    }

    /// Replacing an entry moves it to the end.
    fn insert(&mut self, key: String, response: Response) {
        self.entries.retain(|(k, _)| *k != key);
        self.entries.push((key, response));
    }
}

/// Process-local cache stores.
///
/// Uses a Vec behind a tokio RwLock so stores keep their creation order.
/// Clones share the same stores.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    stores: Arc<RwLock<Vec<NamedStore>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CacheStorage for MemoryCache {
    async fn open(&self, cache_name: &str) -> Result<(), Error> {
        let mut stores = self.stores.write().await;
        if !stores.iter().any(|s| s.name == cache_name) {
            stores.push(NamedStore { name: cache_name.to_string(), entries: Vec::new() });
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        let stores = self.stores.read().await;
        Ok(stores.iter().map(|s| s.name.clone()).collect())
    }

    async fn delete(&self, cache_name: &str) -> Result<bool, Error> {
        let mut stores = self.stores.write().await;
        let before = stores.len();
        stores.retain(|s| s.name != cache_name);
        Ok(stores.len() != before)
    }

    async fn put(&self, cache_name: &str, request: &Request, response: &Response) -> Result<(), Error> {
        ensure_cacheable(request)?;
        let mut stores = self.stores.write().await;
        let index = match stores.iter().position(|s| s.name == cache_name) {
            Some(index) => index,
            None => {
                stores.push(NamedStore { name: cache_name.to_string(), entries: Vec::new() });
                stores.len() - 1
            }
        };
        stores[index].insert(request.cache_key(), response.clone());
        Ok(())
    }

    async fn lookup(&self, cache_name: &str, request: &Request) -> Result<Option<Response>, Error> {
        let key = request.cache_key();
        let stores = self.stores.read().await;
        Ok(stores
            .iter()
            .find(|s| s.name == cache_name)
            .and_then(|s| s.get(&key))
            .cloned())
    }

    async fn lookup_any(&self, request: &Request) -> Result<Option<Response>, Error> {
        let key = request.cache_key();
        let stores = self.stores.read().await;
        Ok(stores.iter().find_map(|s| s.get(&key)).cloned())
    }

    async fn entry_urls(&self, cache_name: &str) -> Result<Vec<String>, Error> {
        let stores = self.stores.read().await;
        Ok(stores
            .iter()
            .find(|s| s.name == cache_name)
            .map(|s| s.entries.iter().map(|(_, r)| r.url.to_string()).collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, StatusCode};
    use url::Url;

    fn page(url: &str, body: &'static str) -> (Request, Response) {
        let url = Url::parse(url).unwrap();
        (Request::get(url.clone()), Response::new(url, StatusCode::OK, body))
    }

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let cache = MemoryCache::new();
        cache.open("v1").await.unwrap();
        cache.open("v1").await.unwrap();
        cache.open("v2").await.unwrap();
        assert_eq!(cache.keys().await.unwrap(), vec!["v1", "v2"]);
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let cache = MemoryCache::new();
        let (req, old) = page("https://example.com/", "old");
        let (_, new) = page("https://example.com/", "new");
        cache.put("v1", &req, &old).await.unwrap();
        cache.put("v1", &req, &new).await.unwrap();

        let hit = cache.lookup("v1", &req).await.unwrap().unwrap();
        assert_eq!(hit.body.as_ref(), b"new");
        assert_eq!(cache.entry_urls("v1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_put_rejects_post() {
        let cache = MemoryCache::new();
        let (req, resp) = page("https://example.com/form", "ok");
        let post = Request { method: Method::POST, ..req };
        let result = cache.put("v1", &post, &resp).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_delete_removes_entries() {
        let cache = MemoryCache::new();
        let (req, resp) = page("https://example.com/", "body");
        cache.put("v1", &req, &resp).await.unwrap();

        assert!(cache.delete("v1").await.unwrap());
        assert!(!cache.delete("v1").await.unwrap());
        assert!(cache.lookup_any(&req).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lookup_any_prefers_oldest_store() {
        let cache = MemoryCache::new();
        let (req, first) = page("https://example.com/", "first");
        let (_, second) = page("https://example.com/", "second");
        cache.put("v1", &req, &first).await.unwrap();
        cache.put("v2", &req, &second).await.unwrap();

        let hit = cache.lookup_any(&req).await.unwrap().unwrap();
        assert_eq!(hit.body.as_ref(), b"first");
        assert!(cache.lookup("v3", &req).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let cache = MemoryCache::new();
        let clone = cache.clone();
        clone.open("shared").await.unwrap();
        assert_eq!(cache.keys().await.unwrap(), vec!["shared"]);
    }
}
