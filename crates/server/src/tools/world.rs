//! list_worlds, get_world and update_world tool implementations.

use anvil_client::{AnvilClient, WorldUpdate};
use anvil_core::Error;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::user::{GranularityParams, default_granularity, granularity};
use super::{api_error, json_result};

/// Parameters for the get_world tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GetWorldParams {
    /// The unique identifier of the world.
    pub world_id: String,

    /// Detail level: 0 (minimal), 1 (standard, default), 2 (full), 3.
    #[serde(default = "default_granularity")]
    pub granularity: u8,
}

/// Parameters for the update_world tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UpdateWorldParams {
    /// The unique identifier of the world.
    pub world_id: String,

    /// New world name.
    #[serde(default)]
    pub name: Option<String>,

    /// New world description.
    #[serde(default)]
    pub description: Option<String>,

    /// New world genre.
    #[serde(default)]
    pub genre: Option<String>,

    /// New locale, e.g. `en`.
    #[serde(default)]
    pub locale: Option<String>,
}

/// World ids end up in request paths.
fn validate_world_id(world_id: &str) -> Result<(), McpError> {
    if world_id.trim().is_empty() {
        return Err(Error::InvalidInput("world_id cannot be empty".into()).into());
    }
    if world_id.contains(['/', '?', '#']) {
        return Err(Error::InvalidInput(format!("invalid world_id: {world_id}")).into());
    }
    Ok(())
}

/// Implementation of the list_worlds tool.
pub async fn list_impl(client: &AnvilClient, params: GranularityParams) -> Result<CallToolResult, McpError> {
    let worlds = client
        .list_worlds(granularity(params.granularity)?)
        .await
        .map_err(api_error)?;
    json_result(&worlds)
}

/// Implementation of the get_world tool.
pub async fn get_impl(client: &AnvilClient, params: GetWorldParams) -> Result<CallToolResult, McpError> {
    validate_world_id(&params.world_id)?;
    let world = client
        .get_world(&params.world_id, granularity(params.granularity)?)
        .await
        .map_err(api_error)?;
    json_result(&world)
}

/// Implementation of the update_world tool.
pub async fn update_impl(client: &AnvilClient, params: UpdateWorldParams) -> Result<CallToolResult, McpError> {
    validate_world_id(&params.world_id)?;

    let update = WorldUpdate {
        name: params.name,
        description: params.description,
        genre: params.genre,
        locale: params.locale,
    };
    if update.is_empty() {
        return Err(Error::InvalidInput(
            "No updates specified. Provide at least one field to update.".to_string(),
        )
        .into());
    }

    let world = client
        .update_world(&params.world_id, &update)
        .await
        .map_err(api_error)?;
    json_result(&world)
}
