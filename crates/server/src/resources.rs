//! MCP resources.
//!
//! `config://status` exposes the server configuration state as JSON.

use anvil_core::{AppConfig, Error};
use rmcp::{
    ErrorData as McpError,
    model::{AnnotateAble, RawResource, ReadResourceResult, Resource, ResourceContents},
};
use serde::{Deserialize, Serialize};

pub const CONFIG_STATUS_URI: &str = "config://status";

/// Body of the `config://status` resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigStatus {
    pub server: String,
    pub version: String,
    /// Both credentials are set.
    pub configured: bool,
    pub api_base: String,
}

impl ConfigStatus {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            server: "world-anvil-mcp".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            configured: config.has_credentials(),
            api_base: config.api_base.clone(),
        }
    }
}

pub fn list() -> Vec<Resource> {
    let mut resource = RawResource::new(CONFIG_STATUS_URI, "config-status");
    resource.description = Some("Server configuration status: version, credentials, API base URL".into());
    resource.mime_type = Some("application/json".into());
    vec![resource.no_annotation()]
}

pub fn read(config: &AppConfig, uri: &str) -> Result<ReadResourceResult, McpError> {
    if uri != CONFIG_STATUS_URI {
        return Err(McpError::resource_not_found(
            format!("unknown resource: {uri}"),
            Some(serde_json::json!({ "uri": uri })),
        ));
    }

    let json = serde_json::to_string_pretty(&ConfigStatus::from_config(config)).map_err(Error::from)?;
    Ok(ReadResourceResult {
        contents: vec![ResourceContents::TextResourceContents {
            uri: uri.to_string(),
            mime_type: Some("application/json".into()),
            text: json,
            meta: None,
        }],
    })
}
