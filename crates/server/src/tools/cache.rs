//! Cache inspection tools: cache_keys, cache_entries.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use pwa_core::Error;

use super::json_result;
use crate::host::WorkerHost;

/// Parameters for the cache_entries tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheEntriesParams {
    /// Name of the cache store to list.
    pub cache_name: String,
}

/// Output from the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysOutput {
    /// Cache store names, oldest first.
    pub keys: Vec<String>,
}

/// Output from the cache_entries tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheEntriesOutput {
    pub cache_name: String,
    /// Stored URLs in insertion order.
    pub urls: Vec<String>,
}

pub async fn keys_impl(host: &WorkerHost) -> Result<CallToolResult, McpError> {
    let keys = host.cache().keys().await?;
    json_result(&CacheKeysOutput { keys })
}

pub async fn entries_impl(host: &WorkerHost, params: CacheEntriesParams) -> Result<CallToolResult, McpError> {
    if params.cache_name.trim().is_empty() {
        return Err(Error::InvalidInput("cache_name cannot be empty".into()).into());
    }

    let keys = host.cache().keys().await?;
    if !keys.contains(&params.cache_name) {
        return Err(Error::CacheMiss(format!("no cache store named {}", params.cache_name)).into());
    }

    let urls = host.cache().entry_urls(&params.cache_name).await?;
    json_result(&CacheEntriesOutput { cache_name: params.cache_name, urls })
}
