//! MCP Server implementation and lifecycle management.
//!
//! This module contains the main server handler that implements the MCP
//! protocol by delegating to the tool service. The tool set is not fixed at
//! compile time: every listing reloads the route's tool file, so the
//! handler implements `list_tools` and `call_tool` directly instead of going
//! through a static tool router.

use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    model::*,
    service::RequestContext,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use super::config::Config;
use crate::domains::tools::{InvocationResult, RouteContext, ToolError, ToolService};

const INSTRUCTIONS: &str = "Tools on this server are configured declaratively and proxy to HTTP \
endpoints. The tool list is reloaded on every tools/list request.";

/// The main MCP server handler.
///
/// Cheap to clone; clones share the tool registry.
#[derive(Clone)]
pub struct McpServer {
    /// Server configuration.
    config: Arc<Config>,

    /// Service for listing and invoking tools.
    tools: Arc<ToolService>,
}

impl McpServer {
    /// Create a new MCP server with the given configuration.
    pub fn new(config: Config) -> Self {
        let tools = Arc::new(ToolService::new(&config.tools));
        Self::with_tool_service(config, tools)
    }

    /// Create a server around an already built tool service.
    pub fn with_tool_service(config: Config, tools: Arc<ToolService>) -> Self {
        Self {
            config: Arc::new(config),
            tools,
        }
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.config.server.name
    }

    /// Get the server version.
    pub fn version(&self) -> &str {
        &self.config.server.version
    }

    /// Get the server configuration.
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Route addressed by an inbound request path (`None` for stdio).
    pub fn route_for_path(&self, path: Option<&str>) -> RouteContext {
        RouteContext::from_path(
            path,
            &self.config.tools.mount_prefix(),
            &self.config.tools.default_route,
        )
    }

    /// Reload and describe the tools of `route`.
    pub async fn list_tools_for(
        &self,
        route: &RouteContext,
        cancel: &CancellationToken,
    ) -> Result<Vec<Tool>, ToolError> {
        self.tools.list_tools(route, cancel).await
    }

    /// Invoke a tool of `route`.
    pub async fn call_tool_for(
        &self,
        route: &RouteContext,
        name: Option<&str>,
        arguments: Option<JsonObject>,
        cancel: &CancellationToken,
    ) -> InvocationResult {
        self.tools.call_tool(route, name, arguments, cancel).await
    }
}

impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    #[instrument(skip(self, context))]
    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        let route = self.route_for_path(None);
        info!("Listing tools for route '{}'", route);
        let tools = self
            .list_tools_for(&route, &context.ct)
            .await
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;
        Ok(ListToolsResult {
            tools,
            next_cursor: None,
            meta: None,
        })
    }

    #[instrument(skip(self, request, context), fields(tool = %request.name))]
    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let route = self.route_for_path(None);
        info!("Calling tool '{}' on route '{}'", request.name, route);
        let result = self
            .call_tool_for(&route, Some(request.name.as_ref()), request.arguments, &context.ct)
            .await;
        Ok(result.into_call_tool_result())
    }
}
