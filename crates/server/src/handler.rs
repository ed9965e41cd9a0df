//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the cache manager.
use crate::tools::{
    SwFetchParams,
    cache::{CacheDeleteParams, CacheGetParams, delete_impl, get_impl, list_impl},
    fetch_impl,
    lifecycle::{SwMessageParams, activate_impl, install_impl, message_impl},
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
use swcache_worker::{CacheManager, HttpFetcher};

/// The main MCP server handler for sw-cache.
#[derive(Clone)]
pub struct SwCacheServer {
    manager: CacheManager<HttpFetcher>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
#[tool_router]
impl SwCacheServer {
    /// Create a new server handler around a cache manager.
    pub fn new(manager: CacheManager<HttpFetcher>) -> Self {
        Self { manager, tool_router: Self::tool_router() }
    }

    #[tool(description = "Run the install event: cache the static asset manifest into the current generation.")]
    async fn sw_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.manager).await
    }

    #[tool(description = "Run the activate event: delete every cache generation except the current one and claim clients.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.manager).await
    }

    /// Run one request through the fetch handler.
    ///
    /// Reports either that the request passes through untouched, or the
    /// response served from cache, network or the offline page.
    #[tool(description = "Fetch a URL or origin-relative path through the offline cache. Returns passthrough or the response with its source.")]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.manager, params.0).await
    }

    #[tool(description = "Post a page message to the cache manager. Only {\"type\": \"SKIP_WAITING\"} is recognized.")]
    async fn sw_message(&self, params: Parameters<SwMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.manager, params.0).await
    }

    #[tool(description = "List stored cache generations with entry counts and the current generation name.")]
    async fn cache_list(&self) -> Result<CallToolResult, McpError> {
        list_impl(&self.manager).await
    }

    #[tool(description = "Get metadata of the entry stored for a URL in the current cache generation.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.manager, params.0).await
    }

    #[tool(description = "Delete one cache generation and all of its entries.")]
    async fn cache_delete(&self, params: Parameters<CacheDeleteParams>) -> Result<CallToolResult, McpError> {
        delete_impl(&self.manager, params.0).await
    }
}

impl ServerHandler for SwCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "sw-cache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(format!(
                "Offline cache for {} serving generation {}.",
                self.manager.settings().origin,
                self.manager.settings().cache_name
            )),
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
