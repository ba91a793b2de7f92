//! Request identity keys.

use sha2::{Digest, Sha256};
use url::Url;

use crate::urls::without_fragment;

/// Compute the cache key for a request URL.
///
/// Fragments never reach the server, so `page#a` and `page#b` share a key.
/// The query string is part of the identity.
pub fn compute_cache_key(url: &Url) -> String {
    let mut hasher = Sha256::new();
    hasher.update(without_fragment(url).as_str().as_bytes());
    hex::encode(hasher.finalize())
}
