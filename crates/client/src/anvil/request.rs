//! World Anvil API request types.

use std::fmt;
use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::anvil::AnvilError;

/// HTTP verbs used against the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Only reads may be served from or stored in the cache.
    pub fn is_read(self) -> bool {
        matches!(self, Method::Get)
    }

    /// Mutating verbs invalidate cached reads on success.
    pub fn is_write(self) -> bool {
        !self.is_read()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Response detail level.
///
/// The API rejects numeric granularity, so this always serializes as a
/// string ("0".."3").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Granularity(u8);

impl Granularity {
    pub const MINIMAL: Granularity = Granularity(0);
    pub const STANDARD: Granularity = Granularity(1);
    pub const FULL: Granularity = Granularity(2);

    pub fn new(level: u8) -> Result<Self, AnvilError> {
        if level > 3 {
            return Err(AnvilError::InvalidGranularity(level));
        }
        Ok(Self(level))
    }

    pub fn level(self) -> u8 {
        self.0
    }
}

impl Default for Granularity {
    fn default() -> Self {
        Self::STANDARD
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Granularity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One logical API operation.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub cache_key: Option<String>,
    pub cache_ttl: Option<Duration>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), query: Vec::new(), body: None, cache_key: None, cache_ttl: None }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::Patch, path)
    }

    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    pub fn granularity(self, granularity: Granularity) -> Self {
        self.query("granularity", granularity)
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Cache a successful read under `key`, optionally overriding the default TTL.
    pub fn cached(mut self, key: impl Into<String>, ttl: Option<Duration>) -> Self {
        self.cache_key = Some(key.into());
        self.cache_ttl = ttl;
        self
    }

    /// Cache key for reads; writes never consult the cache.
    pub fn read_cache_key(&self) -> Option<&str> {
        if self.method.is_read() { self.cache_key.as_deref() } else { None }
    }

    /// Leading path segment, e.g. `world` for `/world/123`.
    pub fn resource_type(&self) -> Option<&str> {
        self.path
            .split('/')
            .find(|segment| !segment.is_empty())
            .map(|segment| segment.split(['?', '#']).next().unwrap_or(segment))
            .filter(|segment| !segment.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_classes() {
        assert!(Method::Get.is_read());
        for method in [Method::Post, Method::Put, Method::Patch, Method::Delete] {
            assert!(method.is_write(), "{method} should be a write");
        }
    }

    #[test]
    fn test_granularity_serializes_as_string() {
        let g = Granularity::new(2).unwrap();
        assert_eq!(serde_json::to_value(g).unwrap(), serde_json::json!("2"));
        assert_eq!(g.to_string(), "2");
    }

    #[test]
    fn test_granularity_query_is_string() {
        let req = ApiRequest::get("/user").granularity(Granularity::default());
        assert_eq!(req.query, vec![("granularity".to_string(), "1".to_string())]);
    }

    #[test]
    fn test_granularity_range() {
        assert!(Granularity::new(3).is_ok());
        assert!(matches!(Granularity::new(4), Err(AnvilError::InvalidGranularity(4))));
    }

    #[test]
    fn test_read_cache_key_ignored_for_writes() {
        let req = ApiRequest::patch("/world/1").cached("world:1:1", None);
        assert_eq!(req.read_cache_key(), None);

        let req = ApiRequest::get("/world/1").cached("world:1:1", None);
        assert_eq!(req.read_cache_key(), Some("world:1:1"));
    }

    #[test]
    fn test_resource_type() {
        assert_eq!(ApiRequest::patch("/world/123").resource_type(), Some("world"));
        assert_eq!(ApiRequest::patch("world/123").resource_type(), Some("world"));
        assert_eq!(ApiRequest::patch("/user/worlds").resource_type(), Some("user"));
        assert_eq!(ApiRequest::patch("/article?id=1").resource_type(), Some("article"));
        assert_eq!(ApiRequest::patch("/").resource_type(), None);
        assert_eq!(ApiRequest::patch("").resource_type(), None);
    }
}
