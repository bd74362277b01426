//! Cache-related MCP tools.
//!
//! This module provides tools for inspecting and invalidating the session cache.

pub mod invalidate;
pub mod stats;

pub use invalidate::{CacheInvalidateParams, clear_impl, invalidate_impl};
pub use stats::stats_impl;
