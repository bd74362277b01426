//! Core types and shared functionality for world-anvil-mcp.
//!
//! This crate provides:
//! - In-memory response cache with TTL and LRU eviction
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheStats, ResponseCache};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
