//! SQLite implementation of [`CacheStorage`].
//!
//! Stores live in `cache_stores`, ordered by creation. Entries live in
//! `cache_entries` and are removed with their store by a cascading delete.

use super::connection::CacheDb;
use super::{CacheStorage, ensure_cacheable};
use crate::Error;
use crate::message::{Request, Response};
use http::StatusCode;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;
use url::Url;

/// Raw row from `cache_entries`.
struct EntryRow {
    url: String,
    status_code: i64,
    headers_json: String,
    body: Vec<u8>,
}

impl EntryRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self { url: row.get(0)?, status_code: row.get(1)?, headers_json: row.get(2)?, body: row.get(3)? })
    }

    fn into_response(self) -> Result<Response, Error> {
        let url = Url::parse(&self.url).map_err(|e| Error::CorruptEntry(format!("url {}: {e}", self.url)))?;
        let status = u16::try_from(self.status_code)
            .ok()
            .and_then(|code| StatusCode::from_u16(code).ok())
            .ok_or_else(|| Error::CorruptEntry(format!("status {} for {}", self.status_code, self.url)))?;
        let pairs: Vec<(String, String)> = serde_json::from_str(&self.headers_json)
            .map_err(|e| Error::CorruptEntry(format!("headers for {}: {e}", self.url)))?;

        Ok(Response { url, status, headers: Response::headers_from_pairs(&pairs), body: self.body.into() })
    }
}

fn insert_store(conn: &rusqlite::Connection, cache_name: &str) -> Result<(), Error> {
    conn.execute(
        "INSERT OR IGNORE INTO cache_stores (name, created_at) VALUES (?1, ?2)",
        params![cache_name, chrono::Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

#[async_trait::async_trait]
impl CacheStorage for CacheDb {
    async fn open(&self, cache_name: &str) -> Result<(), Error> {
        let cache_name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> { insert_store(conn, &cache_name) })
            .await
            .map_err(Error::from)
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM cache_stores ORDER BY id ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, cache_name: &str) -> Result<bool, Error> {
        let cache_name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM cache_stores WHERE name = ?1", params![cache_name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Upsert an entry; a replaced entry moves to the end of the store.
    async fn put(&self, cache_name: &str, request: &Request, response: &Response) -> Result<(), Error> {
        ensure_cacheable(request)?;

        let cache_name = cache_name.to_string();
        let key_hash = request.cache_key();
        let url = response.url.to_string();
        let status_code = i64::from(response.status.as_u16());
        let headers_json = serde_json::to_string(&response.header_pairs())
            .map_err(|e| Error::InvalidInput(format!("failed to serialize headers: {e}")))?;
        let body = response.body.to_vec();
        let stored_at = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                insert_store(&tx, &cache_name)?;
                tx.execute(
                    "INSERT INTO cache_entries (
                    cache_name, key_hash, url, status_code, headers_json, body, stored_at, seq
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7,
                    (SELECT COALESCE(MAX(seq), 0) + 1 FROM cache_entries WHERE cache_name = ?1))
                ON CONFLICT(cache_name, key_hash) DO UPDATE SET
                    url = excluded.url,
                    status_code = excluded.status_code,
                    headers_json = excluded.headers_json,
                    body = excluded.body,
                    stored_at = excluded.stored_at,
                    seq = excluded.seq",
                    params![cache_name, key_hash, url, status_code, headers_json, body, stored_at],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn lookup(&self, cache_name: &str, request: &Request) -> Result<Option<Response>, Error> {
        let cache_name = cache_name.to_string();
        let key_hash = request.cache_key();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let result = conn.query_row(
                    "SELECT url, status_code, headers_json, body
                FROM cache_entries WHERE cache_name = ?1 AND key_hash = ?2",
                    params![cache_name, key_hash],
                    EntryRow::from_row,
                );

                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(EntryRow::into_response).transpose()
    }

    async fn lookup_any(&self, request: &Request) -> Result<Option<Response>, Error> {
        let key_hash = request.cache_key();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let result = conn.query_row(
                    "SELECT e.url, e.status_code, e.headers_json, e.body
                FROM cache_entries e
                JOIN cache_stores s ON s.name = e.cache_name
                WHERE e.key_hash = ?1
                ORDER BY s.id ASC
                LIMIT 1",
                    params![key_hash],
                    EntryRow::from_row,
                );

                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(EntryRow::into_response).transpose()
    }

    async fn entry_urls(&self, cache_name: &str) -> Result<Vec<String>, Error> {
        let cache_name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM cache_entries WHERE cache_name = ?1 ORDER BY seq ASC")?;
                let urls = stmt
                    .query_map(params![cache_name], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderValue, Method, header};

    fn make_response(url: &str, body: &'static str) -> Response {
        let mut response = Response::new(Url::parse(url).unwrap(), StatusCode::OK, body);
        response
            .headers
            .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html; charset=UTF-8"));
        response
    }

    fn get(url: &str) -> Request {
        Request::get(Url::parse(url).unwrap())
    }

    #[tokio::test]
    async fn test_put_and_lookup() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let request = get("https://example.com/");
        db.put("site-v1", &request, &make_response("https://example.com/", "<h1>Home</h1>"))
            .await
            .unwrap();

        let hit = db.lookup("site-v1", &request).await.unwrap().unwrap();
        assert_eq!(hit.status, StatusCode::OK);
        assert_eq!(hit.body.as_ref(), b"<h1>Home</h1>");
        assert_eq!(hit.content_type(), Some("text/html; charset=UTF-8"));
    }

    #[tokio::test]
    async fn test_lookup_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open("site-v1").await.unwrap();
        assert!(db.lookup("site-v1", &get("https://example.com/nope")).await.unwrap().is_none());
        assert!(db.lookup_any(&get("https://example.com/nope")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites_and_reorders() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.put("v1", &get("https://example.com/a"), &make_response("https://example.com/a", "a1"))
            .await
            .unwrap();
        db.put("v1", &get("https://example.com/b"), &make_response("https://example.com/b", "b1"))
            .await
            .unwrap();
        db.put("v1", &get("https://example.com/a"), &make_response("https://example.com/a", "a2"))
            .await
            .unwrap();

        let hit = db.lookup("v1", &get("https://example.com/a")).await.unwrap().unwrap();
        assert_eq!(hit.body.as_ref(), b"a2");
        assert_eq!(
            db.entry_urls("v1").await.unwrap(),
            vec!["https://example.com/b", "https://example.com/a"]
        );
    }

    #[tokio::test]
    async fn test_keys_in_creation_order_and_delete_cascades() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open("v1").await.unwrap();
        db.put("v2", &get("https://example.com/"), &make_response("https://example.com/", "x"))
            .await
            .unwrap();
        db.open("v1").await.unwrap();
        assert_eq!(db.keys().await.unwrap(), vec!["v1", "v2"]);

        assert!(db.delete("v2").await.unwrap());
        assert!(!db.delete("v2").await.unwrap());
        assert_eq!(db.keys().await.unwrap(), vec!["v1"]);

        let orphans: i64 = db
            .conn
            .call(|conn| conn.query_row("SELECT COUNT(*) FROM cache_entries", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[tokio::test]
    async fn test_lookup_any_prefers_oldest_store() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let request = get("https://example.com/offline");
        db.open("old").await.unwrap();
        db.open("new").await.unwrap();
        db.put("new", &request, &make_response("https://example.com/offline", "new"))
            .await
            .unwrap();
        db.put("old", &request, &make_response("https://example.com/offline", "old"))
            .await
            .unwrap();

        let hit = db.lookup_any(&request).await.unwrap().unwrap();
        assert_eq!(hit.body.as_ref(), b"old");
    }

    #[tokio::test]
    async fn test_put_rejects_non_get() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let mut request = get("https://example.com/wp-comments-post.php");
        request.method = Method::POST;
        let result = db
            .put("v1", &request, &make_response("https://example.com/", "x"))
            .await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_file_backed_persists() {
        let dir = std::env::temp_dir().join(format!("pwa-sw-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("cache.sqlite");
        let request = get("https://example.com/");

        {
            let db = CacheDb::open(&path).await.unwrap();
            db.put("v1", &request, &make_response("https://example.com/", "persisted"))
                .await
                .unwrap();
        }

        let db = CacheDb::open(&path).await.unwrap();
        let hit = db.lookup("v1", &request).await.unwrap().unwrap();
        assert_eq!(hit.body.as_ref(), b"persisted");

        drop(db);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
