//! Lifecycle tools: sw_install, sw_activate, sw_upgrade, sw_status,
//! sw_set_online.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use pwa_core::Error;

use super::json_result;
use crate::host::WorkerHost;

/// Parameters for the sw_upgrade tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwUpgradeParams {
    /// New version tag. The cache name embeds it, so a new version gets a
    /// fresh cache store. Must differ from the current version; refused when
    /// a fixed `cache_name` is configured.
    pub version: String,
}

/// Parameters for the sw_set_online tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwSetOnlineParams {
    pub online: bool,
}

pub async fn install_impl(host: &WorkerHost) -> Result<CallToolResult, McpError> {
    let report = host.install().await?;
    json_result(&report)
}

pub async fn activate_impl(host: &WorkerHost) -> Result<CallToolResult, McpError> {
    let report = host.activate().await?;
    json_result(&report)
}

pub async fn upgrade_impl(host: &WorkerHost, params: SwUpgradeParams) -> Result<CallToolResult, McpError> {
    let version = params.version.trim();
    if version.is_empty() {
        return Err(Error::InvalidInput("version cannot be empty".into()).into());
    }
    let report = host.upgrade(version.to_string()).await?;
    json_result(&report)
}

pub async fn status_impl(host: &WorkerHost) -> Result<CallToolResult, McpError> {
    json_result(&host.status().await)
}

pub async fn set_online_impl(host: &WorkerHost, params: SwSetOnlineParams) -> Result<CallToolResult, McpError> {
    host.set_online(params.online);
    json_result(&host.status().await)
}
