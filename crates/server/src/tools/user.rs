//! get_identity and get_current_user tool implementations.

use anvil_client::{AnvilClient, Granularity};
use anvil_core::Error;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{api_error, json_result};

/// Parameters for tools that only take a detail level.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GranularityParams {
    /// Detail level: 0 (minimal), 1 (standard, default), 2 (full), 3.
    #[serde(default = "default_granularity")]
    pub granularity: u8,
}

impl Default for GranularityParams {
    fn default() -> Self {
        Self { granularity: default_granularity() }
    }
}

pub(crate) fn default_granularity() -> u8 {
    1
}

pub(crate) fn granularity(level: u8) -> Result<Granularity, McpError> {
    Granularity::new(level).map_err(|e| Error::InvalidInput(e.to_string()).into())
}

/// Implementation of the get_identity tool.
pub async fn identity_impl(client: &AnvilClient) -> Result<CallToolResult, McpError> {
    let identity = client.get_identity().await.map_err(api_error)?;
    json_result(&identity)
}

/// Implementation of the get_current_user tool.
pub async fn current_user_impl(client: &AnvilClient, params: GranularityParams) -> Result<CallToolResult, McpError> {
    let user = client
        .get_current_user(granularity(params.granularity)?)
        .await
        .map_err(api_error)?;
    json_result(&user)
}
