//! URL canonicalization and scheme/origin checks.

use url::{Origin, Url};

/// Why a configured page URL was rejected.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<UrlError> for crate::Error {
    fn from(err: UrlError) -> Self {
        crate::Error::InvalidUrl(err.to_string())
    }
}

/// Canonicalize a configured page URL (start page, offline page).
///
/// Surrounding whitespace is trimmed, a missing scheme becomes `https://`,
/// the host is lowercased and the fragment dropped. The query string is
/// kept as written (`?p=12` selects a WordPress post).
pub fn canonicalize(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };

    let mut parsed = Url::parse(&url_str).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    if !is_http_scheme(&parsed) {
        return Err(UrlError::UnsupportedScheme(parsed.scheme().to_string()));
    }

    if let Some(host) = parsed.host_str() {
        let lowered = host.to_lowercase();
        parsed
            .set_host(Some(&lowered))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Parse a request URL without rewriting it.
///
/// Unlike [`canonicalize`], any scheme is accepted: requests for
/// `chrome-extension:` or `data:` URLs still reach the worker and are
/// passed through by the fetch policy.
pub fn parse_request_url(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }
    Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))
}

/// True for `http` and `https` URLs.
pub fn is_http_scheme(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// True when `url` belongs to `origin`.
pub fn is_same_origin(url: &Url, origin: &Origin) -> bool {
    url.origin() == *origin
}

/// Copy of `url` with the fragment removed.
pub fn without_fragment(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_fragment(None);
    url
}
