//! cache_invalidate and cache_clear tool implementations.

use anvil_client::AnvilClient;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::{api_error, json_result};

/// Parameters for the cache_invalidate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheInvalidateParams {
    /// Regular expression matched from the start of each cache key,
    /// e.g. `world:abc:.*` or `.*world.*`.
    pub pattern: String,
}

/// Output from the cache_invalidate and cache_clear tools.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheInvalidateOutput {
    /// Number of entries removed.
    pub removed: usize,
}

/// Implementation of the cache_invalidate tool.
pub async fn invalidate_impl(client: &AnvilClient, params: CacheInvalidateParams) -> Result<CallToolResult, McpError> {
    let removed = client
        .invalidate_cache(&params.pattern)
        .await
        .map_err(api_error)?;
    json_result(&CacheInvalidateOutput { removed })
}

/// Implementation of the cache_clear tool.
pub async fn clear_impl(client: &AnvilClient) -> Result<CallToolResult, McpError> {
    let removed = client.cache_stats().await.current;
    client.clear_cache().await;
    json_result(&CacheInvalidateOutput { removed })
}
