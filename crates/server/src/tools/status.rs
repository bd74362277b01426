//! get_api_status tool implementation.
//!
//! Reports whether credentials are configured. Works without them.

use anvil_client::AnvilClient;
use anvil_core::{AppConfig, CacheStats};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Output from the get_api_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ApiStatusOutput {
    /// "ready" when both credentials are set, otherwise "not_configured".
    pub status: String,
    pub has_app_key: bool,
    pub has_user_token: bool,
    /// API base URL in use.
    pub api_base: String,
    /// Server version.
    pub version: String,
    /// Session cache occupancy, when a session is open.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheStats>,
}

/// Implementation of the get_api_status tool.
pub async fn status_impl(config: &AppConfig, client: Option<&AnvilClient>) -> Result<CallToolResult, McpError> {
    let cache = match client {
        Some(client) => Some(client.cache_stats().await),
        None => None,
    };

    let output = ApiStatusOutput {
        status: if config.has_credentials() { "ready" } else { "not_configured" }.into(),
        has_app_key: config.app_key.is_some(),
        has_user_token: config.user_token.is_some(),
        api_base: config.api_base.clone(),
        version: env!("CARGO_PKG_VERSION").into(),
        cache,
    };

    json_result(&output)
}
