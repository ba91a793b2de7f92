//! sw_script tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::host::WorkerHost;

/// Output from the sw_script tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwScriptOutput {
    /// Filename the worker is served under.
    pub filename: String,
    /// Browser worker script.
    pub script: String,
    /// Web app manifest.
    pub manifest: serde_json::Value,
}

pub async fn script_impl(host: &WorkerHost) -> Result<CallToolResult, McpError> {
    let worker = host.script().await?;
    let manifest = host.manifest().await?;
    json_result(&SwScriptOutput { filename: worker.filename, script: worker.script, manifest })
}
