//! MCP tool implementations.
//!
//! This module contains all tools exposed by the world-anvil-mcp server.
//! Every tool returns pretty-printed JSON text.

pub mod cache;
pub mod status;
pub mod user;
pub mod world;

use anvil_client::AnvilError;
use anvil_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

pub use cache::CacheInvalidateParams;
pub use user::GranularityParams;
pub use world::{GetWorldParams, UpdateWorldParams};

/// Serialize a tool output as a single JSON text block.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(Error::from)?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Route a client failure through the unified error codes.
pub(crate) fn api_error(err: AnvilError) -> McpError {
    Error::from(err).into()
}
