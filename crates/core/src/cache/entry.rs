//! Cache entry with absolute expiration.

use std::time::Duration;
use tokio::time::Instant;

/// Upper bound for TTLs so `Instant` arithmetic cannot overflow.
const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// A single cached value and the instant it stops being served.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub expires_at: Instant,
}

impl<V> CacheEntry<V> {
    /// Create an entry that expires `ttl` after `now`.
    pub fn new(value: V, now: Instant, ttl: Duration) -> Self {
        Self { value, expires_at: now + ttl.min(MAX_TTL) }
    }

    /// An entry is expired once `now` reaches its expiration instant.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}
