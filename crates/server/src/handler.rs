//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the agent.
use std::sync::Arc;

use crate::agent::ServiceWorker;
use crate::tools::{
    FetchParams, OpenClientParams, activate_impl,
    cache::{CacheGetParams, get_impl, list_impl},
    fetch_impl, install_impl, open_client_impl,
};

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

/// The main MCP server handler for appshell.
#[derive(Clone)]
pub struct AppShellServer {
    worker: Arc<ServiceWorker>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl AppShellServer {
    /// Create a new server handler around a worker.
    pub fn new(worker: Arc<ServiceWorker>) -> Self {
        Self { worker, tool_router: Self::tool_router() }
    }

    /// Fire the install event.
    #[tool(
        description = "Install the current version: create its store and fetch every pinned asset. All-or-nothing; a failed install can be retried."
    )]
    async fn sw_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.worker).await
    }

    /// Fire the activate event.
    #[tool(
        description = "Activate the installed version: delete every other store and take control of open clients."
    )]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.worker).await
    }

    /// Dispatch a fetch event.
    #[tool(
        description = "Route a request through the agent. Reports the policy used (network_first, cache_first, pass_through) and the response the page would receive."
    )]
    async fn sw_fetch(&self, params: Parameters<FetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    /// Open, reload or close a client page.
    #[tool(description = "Open or reload a page (client), or close it with close=true. Returns whether the agent controls it.")]
    async fn sw_open_client(&self, params: Parameters<OpenClientParams>) -> Result<CallToolResult, McpError> {
        open_client_impl(&self.worker, params.0).await
    }

    /// List all stores.
    #[tool(description = "List every response store with its entries, marking the current version.")]
    async fn cache_list(&self) -> Result<CallToolResult, McpError> {
        list_impl(self.worker.storage().as_ref(), self.worker.cache_name()).await
    }

    /// Read one stored response.
    #[tool(description = "Read a stored response by URL without touching the network. Defaults to the current store.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(
            self.worker.storage().as_ref(),
            self.worker.routing().origin(),
            self.worker.cache_name(),
            params.0,
        )
        .await
    }
}

impl ServerHandler for AppShellServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "appshell".into(),
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
