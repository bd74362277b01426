//! Typed wrappers for the user and world endpoints.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

use super::response::unwrap_worlds;
use super::{AnvilClient, AnvilError, ApiRequest, Granularity, Identity, User, World, WorldSummary, WorldUpdate};

/// Identity and profile rarely change during a session.
const USER_TTL: Duration = Duration::from_secs(3600);
const WORLD_TTL: Duration = Duration::from_secs(300);

fn decode<T: DeserializeOwned>(data: Value) -> Result<T, AnvilError> {
    serde_json::from_value(data).map_err(|e| AnvilError::Parse(e.to_string()))
}

impl AnvilClient {
    /// `GET /identity`
    pub async fn get_identity(&self) -> Result<Identity, AnvilError> {
        let data = self
            .execute(ApiRequest::get("/identity").cached("identity", Some(USER_TTL)))
            .await?;
        decode(data)
    }

    /// `GET /user`
    pub async fn get_current_user(&self, granularity: Granularity) -> Result<User, AnvilError> {
        let req = ApiRequest::get("/user")
            .granularity(granularity)
            .cached(format!("user:self:{granularity}"), Some(USER_TTL));
        decode(self.execute(req).await?)
    }

    /// `GET /user/worlds`, accepting either a bare list or `{"worlds": [...]}`.
    pub async fn list_worlds(&self, granularity: Granularity) -> Result<Vec<WorldSummary>, AnvilError> {
        let req = ApiRequest::get("/user/worlds")
            .granularity(granularity)
            .cached(format!("worlds:list:{granularity}"), Some(WORLD_TTL));
        decode(unwrap_worlds(self.execute(req).await?))
    }

    /// `GET /world/{id}`
    pub async fn get_world(&self, world_id: &str, granularity: Granularity) -> Result<World, AnvilError> {
        let req = ApiRequest::get(format!("/world/{world_id}"))
            .granularity(granularity)
            .cached(format!("world:{world_id}:{granularity}"), Some(WORLD_TTL));
        decode(self.execute(req).await?)
    }

    /// `PATCH /world/{id}` with only the supplied fields.
    ///
    /// Invalidates every cached read whose key contains `world`.
    pub async fn update_world(&self, world_id: &str, update: &WorldUpdate) -> Result<World, AnvilError> {
        let body = serde_json::to_value(update).map_err(|e| AnvilError::Parse(e.to_string()))?;
        let data = self
            .execute(ApiRequest::patch(format!("/world/{world_id}")).json(body))
            .await?;
        decode(data)
    }
}
