//! sw_fetch tool implementation.
//!
//! Issues a request from the simulated page and reports where the response
//! came from.

use http::Method;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use pwa_core::urls::parse_request_url;
use pwa_core::worker::{BypassReason, ResponseSource};
use pwa_core::{Error, Request, RequestMode};

use super::json_result;
use crate::host::WorkerHost;

/// Parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// The URL to request.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request mode: "navigate" (default), "same-origin", "no-cors" or "cors".
    #[serde(default)]
    pub mode: Option<String>,

    /// Request body, for non-GET methods.
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    /// The final URL of the response.
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    /// Body decoded as UTF-8, lossily.
    pub body: String,
    /// Where the worker got the response; absent when it did not intercept.
    pub source: Option<ResponseSource>,
    /// Why the worker did not intercept.
    pub bypass: Option<BypassReason>,
}

fn build_request(params: SwFetchParams) -> Result<Request, Error> {
    let url = parse_request_url(&params.url)?;
    let method = Method::from_bytes(params.method.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| Error::InvalidInput(format!("invalid method: {}", params.method)))?;
    let mode = match params.mode.as_deref() {
        Some(mode) => mode.parse::<RequestMode>()?,
        None => RequestMode::Navigate,
    };

    let request = Request::new(method, url, mode);
    Ok(match params.body {
        Some(body) => request.with_body(body),
        None => request,
    })
}

pub async fn fetch_impl(host: &WorkerHost, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    let request = build_request(params)?;
    tracing::debug!(method = %request.method, url = %request.url, mode = %request.mode, "page request");

    let delivered = host.fetch(request).await?;
    let response = delivered.response;

    let output = SwFetchOutput {
        url: response.url.to_string(),
        status: response.status.as_u16(),
        content_type: response.content_type().map(str::to_string),
        body: String::from_utf8_lossy(&response.body).into_owned(),
        source: delivered.source,
        bypass: delivered.bypass,
    };
    json_result(&output)
}
