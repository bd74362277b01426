//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use anvil_client::AnvilClient;
use anvil_core::{AppConfig, Error};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListResourcesResult, ListToolsResult,
        PaginatedRequestParam, ProtocolVersion, ReadResourceRequestParam, ReadResourceResult, ServerCapabilities,
        ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

use crate::resources;
use crate::tools::{
    CacheInvalidateParams, GetWorldParams, GranularityParams, UpdateWorldParams, cache, status, user, world,
};

/// The main MCP server handler for world-anvil-mcp.
#[derive(Clone)]
pub struct WorldAnvilServer {
    tool_router: ToolRouter<Self>,
    config: Arc<AppConfig>,
    client: Option<AnvilClient>,
}

impl WorldAnvilServer {
    /// The API session, or a NOT_CONFIGURED error when credentials are missing.
    fn session(&self) -> Result<&AnvilClient, McpError> {
        self.client.as_ref().ok_or_else(|| {
            Error::NotConfigured(
                "Set WORLD_ANVIL_APP_KEY and WORLD_ANVIL_USER_TOKEN to call the World Anvil API".into(),
            )
            .into()
        })
    }
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl WorldAnvilServer {
    /// Create a new server handler.
    ///
    /// `client` is `None` when credentials are absent; only get_api_status works then.
    pub fn new(config: AppConfig, client: Option<AnvilClient>) -> Self {
        Self { tool_router: Self::tool_router(), config: Arc::new(config), client }
    }

    #[tool(description = "Check whether World Anvil credentials are configured and report session cache usage.")]
    async fn get_api_status(&self) -> Result<CallToolResult, McpError> {
        status::status_impl(&self.config, self.client.as_ref()).await
    }

    #[tool(description = "Get the identity of the authenticated World Anvil user. Cached for one hour.")]
    async fn get_identity(&self) -> Result<CallToolResult, McpError> {
        user::identity_impl(self.session()?).await
    }

    #[tool(description = "Get the authenticated user's profile at the requested granularity (0-3).")]
    async fn get_current_user(&self, params: Parameters<GranularityParams>) -> Result<CallToolResult, McpError> {
        user::current_user_impl(self.session()?, params.0).await
    }

    #[tool(description = "List the worlds owned by the authenticated user.")]
    async fn list_worlds(&self, params: Parameters<GranularityParams>) -> Result<CallToolResult, McpError> {
        world::list_impl(self.session()?, params.0).await
    }

    #[tool(description = "Get a world by id. Responses are cached for five minutes.")]
    async fn get_world(&self, params: Parameters<GetWorldParams>) -> Result<CallToolResult, McpError> {
        world::get_impl(self.session()?, params.0).await
    }

    /// Update a world.
    ///
    /// Only the supplied fields are sent. Cached world entries are dropped on success.
    #[tool(description = "Update a world's name, description, genre, or locale. Invalidates cached world data.")]
    async fn update_world(&self, params: Parameters<UpdateWorldParams>) -> Result<CallToolResult, McpError> {
        world::update_impl(self.session()?, params.0).await
    }

    #[tool(description = "Report session cache occupancy: live entries, expired entries, and capacity.")]
    async fn cache_stats(&self) -> Result<CallToolResult, McpError> {
        cache::stats_impl(self.session()?).await
    }

    #[tool(description = "Remove cached responses whose key matches a regular expression anchored at the start.")]
    async fn cache_invalidate(&self, params: Parameters<CacheInvalidateParams>) -> Result<CallToolResult, McpError> {
        cache::invalidate_impl(self.session()?, params.0).await
    }

    #[tool(description = "Remove every cached response.")]
    async fn cache_clear(&self) -> Result<CallToolResult, McpError> {
        cache::clear_impl(self.session()?).await
    }
}

impl ServerHandler for WorldAnvilServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "world-anvil-mcp".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_resources().enable_tools().build(),
            instructions: Some(
                "Tools for reading and editing World Anvil worlds. Reads are cached per session; \
                 writes invalidate the affected resource type."
                    .into(),
            ),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn list_resources(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, rmcp::model::ErrorData> {
        Ok(ListResourcesResult { meta: None, resources: resources::list(), next_cursor: None })
    }

    async fn read_resource(
        &self, request: ReadResourceRequestParam, _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, rmcp::model::ErrorData> {
        resources::read(&self.config, &request.uri)
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{FakeTransport, client, ok, output};
    use serde_json::{Value, json};

    #[test]
    fn test_registers_all_tools() {
        let server = WorldAnvilServer::new(AppConfig::default(), None);
        let mut names: Vec<String> = server
            .tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();
        names.sort();

        assert_eq!(
            names,
            [
                "cache_clear",
                "cache_invalidate",
                "cache_stats",
                "get_api_status",
                "get_current_user",
                "get_identity",
                "get_world",
                "list_worlds",
                "update_world",
            ]
        );
    }

    #[test]
    fn test_server_info() {
        let server = WorldAnvilServer::new(AppConfig::default(), None);
        let info = server.get_info();
        assert_eq!(info.server_info.name, "world-anvil-mcp");
        assert!(info.capabilities.tools.is_some());
        assert!(info.capabilities.resources.is_some());
    }

    #[test]
    fn test_config_status_resource_without_credentials() {
        let server = WorldAnvilServer::new(AppConfig::default(), None);
        let result = resources::read(&server.config, resources::CONFIG_STATUS_URI).unwrap();
        let text = match &result.contents[0] {
            rmcp::model::ResourceContents::TextResourceContents { text, .. } => text.clone(),
            other => panic!("Expected text contents, got {other:?}"),
        };
        let status: Value = serde_json::from_str(&text).unwrap();

        assert_eq!(status["configured"], false);
        assert_eq!(status["server"], "world-anvil-mcp");
    }

    #[tokio::test]
    async fn test_tools_require_credentials() {
        let server = WorldAnvilServer::new(AppConfig::default(), None);
        let err = server.get_identity().await.unwrap_err();
        assert_eq!(err.code.0, -32000);

        let result = server.get_api_status().await.unwrap();
        let status: Value = output(&result);
        assert_eq!(status["status"], "not_configured");
    }

    #[tokio::test]
    async fn test_tools_use_session() {
        let transport = FakeTransport::new([ok(json!({"id": "user-1", "username": "tester"}))]);
        let server = WorldAnvilServer::new(AppConfig::default(), Some(client(transport.clone())));

        server.get_identity().await.unwrap();
        server.get_identity().await.unwrap();
        assert_eq!(transport.calls(), 1);

        let result = server.cache_stats().await.unwrap();
        let stats: Value = output(&result);
        assert_eq!(stats["current"], 1);
    }
}
