//! Request and response values passed between the worker, the cache and the
//! network.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode, header};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::Error;
use crate::cache::hash::compute_cache_key;

/// Request mode as reported by the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Full document load.
    Navigate,
    SameOrigin,
    NoCors,
    #[default]
    Cors,
}

impl RequestMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestMode::Navigate => "navigate",
            RequestMode::SameOrigin => "same-origin",
            RequestMode::NoCors => "no-cors",
            RequestMode::Cors => "cors",
        }
    }
}

impl fmt::Display for RequestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "navigate" => Ok(RequestMode::Navigate),
            "same-origin" => Ok(RequestMode::SameOrigin),
            "no-cors" => Ok(RequestMode::NoCors),
            "cors" => Ok(RequestMode::Cors),
            other => Err(Error::InvalidInput(format!("unknown request mode: {other}"))),
        }
    }
}

/// An outgoing request seen by the worker.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub mode: RequestMode,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl Request {
    pub fn new(method: Method, url: Url, mode: RequestMode) -> Self {
        Self { method, url, mode, headers: HeaderMap::new(), body: None }
    }

    /// A sub-resource GET request.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url, RequestMode::Cors)
    }

    /// A full-page navigation.
    pub fn navigate(url: Url) -> Self {
        Self::new(Method::GET, url, RequestMode::Navigate)
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn is_get(&self) -> bool {
        self.method == Method::GET
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// Identity of this request inside a cache store.
    pub fn cache_key(&self) -> String {
        compute_cache_key(&self.url)
    }
}

/// A captured response.
#[derive(Debug, Clone)]
pub struct Response {
    /// The final URL after redirects.
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    pub fn new(url: Url, status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self { url, status, headers: HeaderMap::new(), body: body.into() }
    }

    /// Status is in the 2xx range.
    pub fn is_ok(&self) -> bool {
        self.status.is_success()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Placeholder returned when the offline page itself is unavailable.
    pub fn offline_placeholder(url: Url) -> Self {
        let mut response = Self::new(url, StatusCode::SERVICE_UNAVAILABLE, Bytes::from_static(b"Offline"));
        response
            .headers
            .insert(header::CONTENT_TYPE, header::HeaderValue::from_static("text/plain; charset=utf-8"));
        response
    }

    /// Headers as ordered name/value pairs, for persistence.
    pub fn header_pairs(&self) -> Vec<(String, String)> {
        self.headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect()
    }

    /// Rebuild a header map from persisted pairs, skipping invalid entries.
    pub fn headers_from_pairs(pairs: &[(String, String)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            let (Ok(name), Ok(value)) =
                (header::HeaderName::from_bytes(name.as_bytes()), header::HeaderValue::from_str(value))
            else {
                continue;
            };
            headers.append(name, value);
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_mode_parse() {
        assert_eq!("navigate".parse::<RequestMode>().unwrap(), RequestMode::Navigate);
        assert_eq!("No-Cors".parse::<RequestMode>().unwrap(), RequestMode::NoCors);
        assert!("websocket".parse::<RequestMode>().is_err());
    }

    #[test]
    fn test_request_mode_serde() {
        let json = serde_json::to_string(&RequestMode::SameOrigin).unwrap();
        assert_eq!(json, "\"same-origin\"");
    }

    #[test]
    fn test_cache_key_ignores_fragment() {
        let a = Request::get(Url::parse("https://example.com/page#top").unwrap());
        let b = Request::navigate(Url::parse("https://example.com/page").unwrap());
        assert_eq!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_request_kinds() {
        let url = Url::parse("https://example.com/").unwrap();
        assert!(Request::navigate(url.clone()).is_navigation());
        assert!(!Request::get(url.clone()).is_navigation());
        let post = Request::new(Method::POST, url, RequestMode::Cors).with_body("a=1");
        assert!(!post.is_get());
        assert_eq!(post.body.as_deref(), Some(&b"a=1"[..]));
    }

    #[test]
    fn test_offline_placeholder() {
        let response = Response::offline_placeholder(Url::parse("https://example.com/x").unwrap());
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(!response.is_ok());
        assert_eq!(response.content_type(), Some("text/plain; charset=utf-8"));
    }

    #[test]
    fn test_header_pairs_round_trip() {
        let mut response = Response::new(Url::parse("https://example.com/").unwrap(), StatusCode::OK, "hi");
        response
            .headers
            .insert(header::CONTENT_TYPE, header::HeaderValue::from_static("text/html"));
        response
            .headers
            .append(header::SET_COOKIE, header::HeaderValue::from_static("a=1"));
        response
            .headers
            .append(header::SET_COOKIE, header::HeaderValue::from_static("b=2"));

        let rebuilt = Response::headers_from_pairs(&response.header_pairs());
        assert_eq!(rebuilt.get(header::CONTENT_TYPE).unwrap(), "text/html");
        assert_eq!(rebuilt.get_all(header::SET_COOKIE).iter().count(), 2);
    }

    #[test]
    fn test_headers_from_pairs_skips_invalid() {
        let pairs = vec![("bad header".to_string(), "x".to_string()), ("x-ok".to_string(), "1".to_string())];
        let headers = Response::headers_from_pairs(&pairs);
        assert_eq!(headers.len(), 1);
    }
}
