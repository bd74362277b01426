//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (WORLD_ANVIL_*)
//! 2. TOML config file (if WORLD_ANVIL_CONFIG_FILE set)
//! 3. Built-in defaults

use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Production endpoint of the Boromir API.
pub const DEFAULT_API_BASE: &str = "https://www.worldanvil.com/api/external/boromir";

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (WORLD_ANVIL_*)
/// 2. TOML config file (if WORLD_ANVIL_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application key from the World Anvil API settings.
    ///
    /// Set via WORLD_ANVIL_APP_KEY environment variable.
    /// Required only when an API tool is called.
    #[serde(default)]
    pub app_key: Option<String>,

    /// User token from the World Anvil API settings.
    ///
    /// Set via WORLD_ANVIL_USER_TOKEN environment variable.
    #[serde(default)]
    pub user_token: Option<String>,

    /// Base URL of the API.
    ///
    /// Set via WORLD_ANVIL_API_BASE environment variable.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via WORLD_ANVIL_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-attempt HTTP timeout in milliseconds.
    ///
    /// Set via WORLD_ANVIL_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum attempts for a request that keeps failing at the transport level.
    ///
    /// Set via WORLD_ANVIL_MAX_RETRIES environment variable.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// TTL applied to cached reads without an explicit override.
    ///
    /// Set via WORLD_ANVIL_CACHE_TTL_SECS environment variable.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Capacity of the session response cache.
    ///
    /// Set via WORLD_ANVIL_CACHE_MAX_ENTRIES environment variable.
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.into()
}

fn default_user_agent() -> String {
    "world-anvil-mcp/0.1".into()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_cache_max_entries() -> usize {
    1000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_key: None,
            user_token: None,
            api_base: default_api_base(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_max_entries: default_cache_max_entries(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Default cache TTL as Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `WORLD_ANVIL_`
    /// 2. TOML file from `WORLD_ANVIL_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("WORLD_ANVIL_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("WORLD_ANVIL_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into()),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Whether both credentials are present.
    pub fn has_credentials(&self) -> bool {
        self.app_key.is_some() && self.user_token.is_some()
    }

    /// Return `(app_key, user_token)` for deferred validation.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` naming the first absent credential.
    pub fn require_credentials(&self) -> Result<(&str, &str), ConfigError> {
        let app_key = self.app_key.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "app_key".into(),
            hint: "Set WORLD_ANVIL_APP_KEY environment variable".into(),
        })?;
        let user_token = self.user_token.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "user_token".into(),
            hint: "Set WORLD_ANVIL_USER_TOKEN environment variable".into(),
        })?;
        Ok((app_key, user_token))
    }
}
