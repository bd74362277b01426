//! cache_stats tool implementation.

use anvil_client::AnvilClient;
use anvil_core::CacheStats;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Output from the cache_stats tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheStatsOutput {
    #[serde(flatten)]
    pub stats: CacheStats,
}

/// Implementation of the cache_stats tool.
pub async fn stats_impl(client: &AnvilClient) -> Result<CallToolResult, McpError> {
    let output = CacheStatsOutput { stats: client.cache_stats().await };
    json_result(&output)
}
