//! Session-scoped response cache.
//!
//! Bounded in-memory storage for API responses with:
//!
//! - TTL expiration with lazy cleanup on read
//! - LRU eviction once capacity is reached
//! - Regex-based bulk invalidation for write operations

pub mod entry;
pub mod store;

pub use crate::Error;

pub use entry::CacheEntry;
pub use store::{CacheStats, ResponseCache};
