//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::host::WorkerHost;
use crate::tools::cache::{CacheEntriesParams, entries_impl, keys_impl};
use crate::tools::fetch::{SwFetchParams, fetch_impl};
use crate::tools::lifecycle::{
    SwSetOnlineParams, SwUpgradeParams, activate_impl, install_impl, set_online_impl, status_impl, upgrade_impl,
};
use crate::tools::script::script_impl;

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for pwa-sw.
#[derive(Clone)]
pub struct PwaServer {
    host: Arc<WorkerHost>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl PwaServer {
    /// Create a new server handler around a worker host.
    pub fn new(host: Arc<WorkerHost>) -> Self {
        Self { host, tool_router: Self::tool_router() }
    }

    #[tool(description = "Run the install handler of the incoming worker: cache the start and offline pages.")]
    async fn sw_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.host).await
    }

    #[tool(
        description = "Run the activate handler of the incoming worker: delete stale cache stores, claim clients, replace the active worker."
    )]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.host).await
    }

    /// Issue a page request through the active worker.
    ///
    /// Requests the worker does not intercept go straight to the network.
    #[tool(
        description = "Request a URL from the page. Returns the response and whether it came from network, cache or the offline page."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.host, params.0).await
    }

    #[tool(description = "Show active and incoming workers, connectivity and client counts.")]
    async fn sw_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.host).await
    }

    #[tool(description = "Switch simulated connectivity on or off.")]
    async fn sw_set_online(&self, params: Parameters<SwSetOnlineParams>) -> Result<CallToolResult, McpError> {
        set_online_impl(&self.host, params.0).await
    }

    #[tool(
        description = "Register and install a worker for a new version. It waits beside the active worker until sw_activate."
    )]
    async fn sw_upgrade(&self, params: Parameters<SwUpgradeParams>) -> Result<CallToolResult, McpError> {
        upgrade_impl(&self.host, params.0).await
    }

    #[tool(description = "List cache store names, oldest first.")]
    async fn cache_keys(&self) -> Result<CallToolResult, McpError> {
        keys_impl(&self.host).await
    }

    #[tool(description = "List the URLs stored in one cache store.")]
    async fn cache_entries(&self, params: Parameters<CacheEntriesParams>) -> Result<CallToolResult, McpError> {
        entries_impl(&self.host, params.0).await
    }

    #[tool(description = "Generate the browser worker script and web app manifest for the newest worker.")]
    async fn sw_script(&self) -> Result<CallToolResult, McpError> {
        script_impl(&self.host).await
    }
}

impl ServerHandler for PwaServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "pwa-sw".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
