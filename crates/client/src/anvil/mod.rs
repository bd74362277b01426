//! World Anvil (Boromir) API client.
//!
//! Every tool call goes through [`AnvilClient::execute`], which layers a
//! session cache, retries and error classification over a [`Transport`].
//!
//! ### Protocol
//!
//! - **Endpoint**: `https://www.worldanvil.com/api/external/boromir`
//! - **Authentication**: lowercase `x-application-key` and `x-auth-token` headers.
//! - **Caching**: GET requests with a cache key are served from and stored in
//!   the session cache. Successful writes invalidate every cached key
//!   containing the resource type (first path segment).
//! - **Errors**: 401/403, 404, 429, 4xx/5xx and `{"success": false}` bodies
//!   are final. Timeouts and connection failures are retried with
//!   exponential backoff until the attempt budget is spent.

pub mod endpoints;
pub mod error;
pub mod request;
pub mod response;
pub mod retry;
pub mod transport;

pub use error::AnvilError;
pub use request::{ApiRequest, Granularity, Method};
pub use response::{Identity, User, World, WorldSummary, WorldUpdate};
pub use retry::RetryPolicy;
pub use transport::{HttpTransport, RawResponse, Transport};

use anvil_core::{AppConfig, CacheStats, ResponseCache};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Wait advised when a 429 carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER: u64 = 60;

/// World Anvil API client configuration.
#[derive(Debug, Clone)]
pub struct AnvilConfig {
    pub app_key: String,
    pub user_token: String,
    /// Base URL (default: production Boromir endpoint).
    pub base_url: String,
    /// Per-attempt timeout (default: 30s).
    pub timeout: Duration,
    pub user_agent: String,
    /// Attempts per request (default: 3).
    pub max_retries: u32,
    /// TTL for cached reads without an override (default: 300s).
    pub cache_ttl: Duration,
    /// Session cache capacity (default: 1000).
    pub cache_max_entries: usize,
}

impl Default for AnvilConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for AnvilConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            app_key: config.app_key.clone().unwrap_or_default(),
            user_token: config.user_token.clone().unwrap_or_default(),
            base_url: config.api_base.clone(),
            timeout: config.timeout(),
            user_agent: config.user_agent.clone(),
            max_retries: config.max_retries,
            cache_ttl: config.cache_ttl(),
            cache_max_entries: config.cache_max_entries,
        }
    }
}

/// Session-scoped World Anvil client.
///
/// Clones share the transport and the cache. The session ends when the last
/// clone is dropped or [`AnvilClient::shutdown`] is called.
#[derive(Debug, Clone)]
pub struct AnvilClient {
    transport: Arc<dyn Transport>,
    cache: Arc<Mutex<ResponseCache<Value>>>,
    retry: RetryPolicy,
}

impl AnvilClient {
    /// Create a client that talks HTTP to the configured endpoint.
    pub fn new(config: AnvilConfig) -> Result<Self, AnvilError> {
        if config.app_key.is_empty() {
            return Err(AnvilError::MissingCredentials("WORLD_ANVIL_APP_KEY not set".into()));
        }
        if config.user_token.is_empty() {
            return Err(AnvilError::MissingCredentials("WORLD_ANVIL_USER_TOKEN not set".into()));
        }

        let transport = HttpTransport::new(
            &config.base_url,
            &config.app_key,
            &config.user_token,
            &config.user_agent,
            config.timeout,
        )?;

        Ok(Self::with_transport(&config, Arc::new(transport)))
    }

    /// Create a client over any transport.
    pub fn with_transport(config: &AnvilConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            cache: Arc::new(Mutex::new(ResponseCache::new(config.cache_max_entries, config.cache_ttl))),
            retry: RetryPolicy::new(config.max_retries),
        }
    }

    /// Execute one API operation with caching, retry and error classification.
    pub async fn execute(&self, req: ApiRequest) -> Result<Value, AnvilError> {
        if let Some(key) = req.read_cache_key() {
            if let Some(cached) = self.cached(key).await {
                tracing::debug!(key, "cache hit");
                return Ok(cached);
            }
            tracing::debug!(key, "cache miss");
        }

        let mut last_error = None;

        for attempt in 0..self.retry.max_attempts {
            match self.transport.send(&req).await {
                Ok(raw) => {
                    tracing::debug!(method = %req.method, path = %req.path, status = raw.status, "API response");
                    let data = classify(&req, raw)?;
                    self.record_success(&req, &data).await?;
                    return Ok(data);
                }
                Err(err) if err.is_retryable() => {
                    tracing::warn!(
                        method = %req.method,
                        path = %req.path,
                        attempt = attempt + 1,
                        max_attempts = self.retry.max_attempts,
                        error = %err,
                        "transport failure"
                    );
                    if self.retry.has_next(attempt) {
                        tokio::time::sleep(self.retry.backoff(attempt)).await;
                    }
                    last_error = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(AnvilError::Exhausted {
            attempts: self.retry.max_attempts,
            last: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }

    async fn cached(&self, key: &str) -> Option<Value> {
        self.cache.lock().await.get(key).cloned()
    }

    /// Populate the cache for reads and invalidate the resource family for writes.
    async fn record_success(&self, req: &ApiRequest, data: &Value) -> Result<(), AnvilError> {
        let mut cache = self.cache.lock().await;

        if let Some(key) = req.read_cache_key() {
            cache.set(key, data.clone(), req.cache_ttl);
        }

        if req.method.is_write()
            && let Some(resource) = req.resource_type()
        {
            let removed = cache.invalidate_pattern(&format!(".*{}.*", regex::escape(resource)))?;
            tracing::debug!(resource, removed, "invalidated cached reads after write");
        }

        Ok(())
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.lock().await.stats()
    }

    /// Remove cached entries whose key matches `pattern` from the start.
    pub async fn invalidate_cache(&self, pattern: &str) -> Result<usize, AnvilError> {
        Ok(self.cache.lock().await.invalidate_pattern(pattern)?)
    }

    pub async fn clear_cache(&self) {
        self.cache.lock().await.clear();
    }

    /// End the session: drop cached data and release this handle's transport.
    pub async fn shutdown(self) {
        let stats = self.cache_stats().await;
        self.clear_cache().await;
        tracing::info!(cached = stats.current, "World Anvil session closed");
    }
}

/// Map a completed exchange to data or a final error.
fn classify(req: &ApiRequest, raw: RawResponse) -> Result<Value, AnvilError> {
    match raw.status {
        401 => {
            return Err(AnvilError::Auth(
                "Invalid API credentials. Check WORLD_ANVIL_APP_KEY and WORLD_ANVIL_USER_TOKEN".into(),
            ));
        }
        403 => {
            return Err(AnvilError::Auth(
                "Insufficient permissions. Ensure you have Grandmaster guild membership".into(),
            ));
        }
        404 => return Err(AnvilError::NotFound(req.path.clone())),
        429 => return Err(AnvilError::RateLimited { retry_after: parse_retry_after(raw.retry_after.as_deref()) }),
        status if status >= 500 => {
            return Err(AnvilError::Api {
                status: Some(status),
                message: format!("server error {status}: {}", raw.text()),
            });
        }
        status if status >= 400 => {
            return Err(AnvilError::Api {
                status: Some(status),
                message: format!("API error {status}: {}", raw.text()),
            });
        }
        _ => {}
    }

    if raw.body.iter().all(u8::is_ascii_whitespace) {
        if req.method.is_read() {
            return Err(AnvilError::Parse(format!("empty response body from {}", req.path)));
        }
        return Ok(Value::Null);
    }

    let data: Value = serde_json::from_slice(&raw.body).map_err(|e| AnvilError::Parse(e.to_string()))?;

    if let Some(map) = data.as_object()
        && !map.get("success").and_then(Value::as_bool).unwrap_or(true)
    {
        let error = map.get("error").and_then(Value::as_str).unwrap_or("Unknown error");
        return Err(AnvilError::Api {
            status: Some(raw.status),
            message: format!("API returned success=false: {error}"),
        });
    }

    Ok(data)
}

fn parse_retry_after(value: Option<&str>) -> u64 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(DEFAULT_RETRY_AFTER)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use tokio::time::Instant;

    /// What the scripted transport does for one attempt.
    #[derive(Debug, Clone)]
    pub(crate) enum Step {
        Reply(RawResponse),
        Timeout,
        Refused,
    }

    pub(crate) fn ok(body: Value) -> Step {
        Step::Reply(RawResponse::json(200, &body))
    }

    pub(crate) fn status(code: u16) -> Step {
        Step::Reply(RawResponse::new(code, "upstream says no"))
    }

    /// Replays a script of steps, repeating the last one once exhausted.
    #[derive(Debug, Default)]
    pub(crate) struct ScriptedTransport {
        script: StdMutex<VecDeque<Step>>,
        last: StdMutex<Option<Step>>,
        pub(crate) requests: StdMutex<Vec<ApiRequest>>,
    }

    impl ScriptedTransport {
        pub(crate) fn new(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
            Arc::new(Self { script: StdMutex::new(steps.into_iter().collect()), ..Default::default() })
        }

        pub(crate) fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub(crate) fn methods(&self) -> Vec<Method> {
            self.requests.lock().unwrap().iter().map(|r| r.method).collect()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, req: &ApiRequest) -> Result<RawResponse, AnvilError> {
            self.requests.lock().unwrap().push(req.clone());
            let step = {
                let mut script = self.script.lock().unwrap();
                let mut last = self.last.lock().unwrap();
                if let Some(next) = script.pop_front() {
                    *last = Some(next);
                }
                last.clone().expect("scripted transport has no steps")
            };
            match step {
                Step::Reply(raw) => Ok(raw),
                Step::Timeout => Err(AnvilError::Timeout),
                Step::Refused => Err(AnvilError::Transport("connection refused".into())),
            }
        }
    }

    pub(crate) fn client(transport: Arc<ScriptedTransport>) -> AnvilClient {
        AnvilClient::with_transport(&AnvilConfig::default(), transport)
    }

    fn world_read() -> ApiRequest {
        ApiRequest::get("/world/w1").granularity(Granularity::STANDARD).cached("world:w1:1", None)
    }

    #[test]
    fn test_new_requires_credentials() {
        let result = AnvilClient::new(AnvilConfig::default());
        assert!(matches!(result, Err(AnvilError::MissingCredentials(_))));

        let config = AnvilConfig { app_key: "app".into(), ..Default::default() };
        let result = AnvilClient::new(config);
        assert!(matches!(result, Err(AnvilError::MissingCredentials(msg)) if msg.contains("USER_TOKEN")));
    }

    #[test]
    fn test_new_with_credentials() {
        let config = AnvilConfig { app_key: "app".into(), user_token: "token".into(), ..Default::default() };
        assert!(AnvilClient::new(config).is_ok());
    }

    #[tokio::test]
    async fn test_read_miss_then_hit() {
        let transport = ScriptedTransport::new([ok(json!({"id": "w1", "name": "Eberron"}))]);
        let client = client(transport.clone());

        let first = client.execute(world_read()).await.unwrap();
        assert_eq!(transport.calls(), 1);
        assert_eq!(client.cache_stats().await.current, 1);

        let second = client.execute(world_read()).await.unwrap();
        assert_eq!(transport.calls(), 1);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_read_without_cache_key_always_hits_network() {
        let transport = ScriptedTransport::new([ok(json!({"id": "u1"}))]);
        let client = client(transport.clone());

        client.execute(ApiRequest::get("/identity")).await.unwrap();
        client.execute(ApiRequest::get("/identity")).await.unwrap();
        assert_eq!(transport.calls(), 2);
        assert_eq!(client.cache_stats().await.current, 0);
    }

    #[tokio::test]
    async fn test_write_invalidates_read_cache() {
        let transport = ScriptedTransport::new([
            ok(json!({"id": "w1", "name": "Old"})),
            ok(json!({"id": "w1", "name": "New"})),
            ok(json!({"id": "w1", "name": "New"})),
        ]);
        let client = client(transport.clone());

        client.execute(world_read()).await.unwrap();
        client
            .execute(ApiRequest::patch("/world/w1").json(json!({"name": "New"})))
            .await
            .unwrap();
        let after = client.execute(world_read()).await.unwrap();

        assert_eq!(transport.calls(), 3);
        assert_eq!(transport.methods(), vec![Method::Get, Method::Patch, Method::Get]);
        assert_eq!(after["name"], "New");
    }

    #[tokio::test]
    async fn test_write_invalidation_scope() {
        let transport = ScriptedTransport::new([
            ok(json!([])),
            ok(json!({"id": "u1"})),
            ok(json!({"id": "w1"})),
            ok(json!({"id": "w1"})),
        ]);
        let client = client(transport.clone());

        client
            .execute(ApiRequest::get("/user/worlds").cached("worlds:list:1", None))
            .await
            .unwrap();
        client.execute(ApiRequest::get("/identity").cached("identity", None)).await.unwrap();
        client.execute(world_read()).await.unwrap();
        client.execute(ApiRequest::patch("/world/w1").json(json!({}))).await.unwrap();

        let stats = client.cache_stats().await;
        assert_eq!(stats.current, 1);
        client.execute(ApiRequest::get("/identity").cached("identity", None)).await.unwrap();
        assert_eq!(transport.calls(), 4);
    }

    #[tokio::test]
    async fn test_writes_never_use_cache() {
        let transport = ScriptedTransport::new([ok(json!({"id": "w1"}))]);
        let client = client(transport.clone());

        let write = ApiRequest::patch("/world/w1").cached("world:w1:1", None);
        client.execute(write.clone()).await.unwrap();
        client.execute(write).await.unwrap();
        assert_eq!(transport.calls(), 2);
        assert_eq!(client.cache_stats().await.current, 0);
    }

    #[tokio::test]
    async fn test_cache_ttl_override() {
        tokio::time::pause();
        let transport = ScriptedTransport::new([ok(json!({"id": "u1"}))]);
        let client = client(transport.clone());
        let req = ApiRequest::get("/identity").cached("identity", Some(Duration::from_secs(3600)));

        client.execute(req.clone()).await.unwrap();
        tokio::time::advance(Duration::from_secs(3599)).await;
        client.execute(req.clone()).await.unwrap();
        assert_eq!(transport.calls(), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        client.execute(req).await.unwrap();
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_auth_failures_are_not_retried() {
        for code in [401, 403] {
            let transport = ScriptedTransport::new([status(code)]);
            let result = client(transport.clone()).execute(world_read()).await;
            assert!(matches!(result, Err(AnvilError::Auth(_))), "status {code}");
            assert_eq!(transport.calls(), 1);
        }
    }

    #[tokio::test]
    async fn test_not_found() {
        let transport = ScriptedTransport::new([status(404)]);
        let result = client(transport.clone()).execute(world_read()).await;
        assert!(matches!(result, Err(AnvilError::NotFound(path)) if path == "/world/w1"));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_retry_after() {
        let transport = ScriptedTransport::new([Step::Reply(RawResponse::new(429, "").with_retry_after("17"))]);
        let result = client(transport.clone()).execute(world_read()).await;
        assert!(matches!(result, Err(AnvilError::RateLimited { retry_after: 17 })));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_default_retry_after() {
        let transport = ScriptedTransport::new([status(429)]);
        let result = client(transport).execute(world_read()).await;
        assert!(matches!(result, Err(AnvilError::RateLimited { retry_after: 60 })));

        let transport = ScriptedTransport::new([Step::Reply(RawResponse::new(429, "").with_retry_after("soon"))]);
        let result = client(transport).execute(world_read()).await;
        assert!(matches!(result, Err(AnvilError::RateLimited { retry_after: 60 })));
    }

    #[tokio::test]
    async fn test_error_statuses_carry_code() {
        for code in [400, 422, 500, 503] {
            let transport = ScriptedTransport::new([status(code)]);
            let client = client(transport.clone());
            let result = client.execute(world_read()).await;
            assert!(matches!(result, Err(AnvilError::Api { status: Some(s), .. }) if s == code), "status {code}");
            assert_eq!(transport.calls(), 1);
            assert_eq!(client.cache_stats().await.current, 0);
        }
    }

    #[tokio::test]
    async fn test_success_false_body() {
        let transport = ScriptedTransport::new([ok(json!({"success": false, "error": "World is locked"}))]);
        let client = client(transport.clone());
        let result = client.execute(world_read()).await;

        assert!(
            matches!(result, Err(AnvilError::Api { status: Some(200), message }) if message.contains("World is locked"))
        );
        assert_eq!(transport.calls(), 1);
        assert_eq!(client.cache_stats().await.current, 0);
    }

    #[tokio::test]
    async fn test_success_false_without_message() {
        let transport = ScriptedTransport::new([ok(json!({"success": false}))]);
        let result = client(transport).execute(world_read()).await;
        assert!(matches!(result, Err(AnvilError::Api { message, .. }) if message.contains("Unknown error")));
    }

    #[tokio::test]
    async fn test_success_true_and_missing_flag_pass() {
        let transport = ScriptedTransport::new([ok(json!({"success": true, "id": "w1"})), ok(json!([1, 2]))]);
        let client = client(transport);
        assert_eq!(client.execute(ApiRequest::get("/a")).await.unwrap()["id"], "w1");
        assert_eq!(client.execute(ApiRequest::get("/b")).await.unwrap(), json!([1, 2]));
    }

    #[tokio::test]
    async fn test_invalid_json_is_not_retried() {
        let transport = ScriptedTransport::new([Step::Reply(RawResponse::new(200, "<html>"))]);
        let result = client(transport.clone()).execute(world_read()).await;
        assert!(matches!(result, Err(AnvilError::Parse(_))));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_body_is_null() {
        let transport = ScriptedTransport::new([Step::Reply(RawResponse::new(204, ""))]);
        let result = client(transport).execute(ApiRequest::new(Method::Delete, "/world/w1")).await;
        assert_eq!(result.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_empty_read_body_is_not_cached() {
        let transport = ScriptedTransport::new([
            Step::Reply(RawResponse::new(200, "")),
            ok(json!({"id": "w1", "name": "Eberron"})),
        ]);
        let client = client(transport.clone());

        let first = client.execute(world_read()).await;
        assert!(matches!(first, Err(AnvilError::Parse(_))));
        assert_eq!(client.cache_stats().await.current, 0);

        let second = client.execute(world_read()).await.unwrap();
        assert_eq!(second["name"], "Eberron");
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failures_exhaust_retries() {
        let transport = ScriptedTransport::new([Step::Refused]);
        let client = client(transport.clone());

        let start = Instant::now();
        let result = client.execute(world_read()).await;
        let elapsed = start.elapsed();

        assert!(matches!(
            result,
            Err(AnvilError::Exhausted { attempts: 3, ref last }) if last.contains("connection refused")
        ));
        assert_eq!(transport.calls(), 3);
        // 1s + 2s of backoff, no sleep after the last attempt
        assert!(elapsed >= Duration::from_secs(3));
        assert!(elapsed < Duration::from_millis(3_200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_budget_is_configurable() {
        let transport = ScriptedTransport::new([Step::Timeout]);
        let config = AnvilConfig { max_retries: 5, ..Default::default() };
        let client = AnvilClient::with_transport(&config, transport.clone());

        let start = Instant::now();
        let result = client.execute(world_read()).await;

        assert!(matches!(result, Err(AnvilError::Exhausted { attempts: 5, .. })));
        assert_eq!(transport.calls(), 5);
        assert!(start.elapsed() >= Duration::from_secs(1 + 2 + 4 + 8));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_then_success() {
        let transport = ScriptedTransport::new([Step::Timeout, Step::Refused, ok(json!({"id": "w1"}))]);
        let client = client(transport.clone());

        let data = client.execute(world_read()).await.unwrap();
        assert_eq!(data["id"], "w1");
        assert_eq!(transport.calls(), 3);
        assert_eq!(client.cache_stats().await.current, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_classified_error_after_transient_failure_stops() {
        let transport = ScriptedTransport::new([Step::Timeout, status(404), ok(json!({}))]);
        let result = client(transport.clone()).execute(world_read()).await;
        assert!(matches!(result, Err(AnvilError::NotFound(_))));
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_request_stops_retrying() {
        let transport = ScriptedTransport::new([Step::Refused, ok(json!({"id": "w1"}))]);
        let client = client(transport.clone());

        let abandoned = tokio::time::timeout(Duration::from_millis(500), client.execute(world_read())).await;
        assert!(abandoned.is_err());

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(transport.calls(), 1);
        assert_eq!(client.cache_stats().await.current, 0);
    }

    #[tokio::test]
    async fn test_cache_management() {
        let transport = ScriptedTransport::new([ok(json!({}))]);
        let client = client(transport);

        client.execute(ApiRequest::get("/a").cached("world:1:articles", None)).await.unwrap();
        client.execute(ApiRequest::get("/b").cached("world:1:categories", None)).await.unwrap();
        client.execute(ApiRequest::get("/c").cached("user:2", None)).await.unwrap();

        assert_eq!(client.invalidate_cache("world:1:.*").await.unwrap(), 2);
        assert!(matches!(client.invalidate_cache("(").await, Err(AnvilError::InvalidPattern(_))));

        client.clear_cache().await;
        assert_eq!(client.cache_stats().await.current, 0);
    }

    #[tokio::test]
    async fn test_clones_share_session_cache() {
        let transport = ScriptedTransport::new([ok(json!({"id": "w1"}))]);
        let client = client(transport.clone());
        let other = client.clone();

        client.execute(world_read()).await.unwrap();
        other.execute(world_read()).await.unwrap();
        assert_eq!(transport.calls(), 1);

        other.shutdown().await;
        assert_eq!(client.cache_stats().await.current, 0);
    }

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after(Some("5")), 5);
        assert_eq!(parse_retry_after(Some(" 12 ")), 12);
        assert_eq!(parse_retry_after(Some("Wed, 21 Oct 2015 07:28:00 GMT")), 60);
        assert_eq!(parse_retry_after(None), 60);
    }
}
