//! Client code for world-anvil-mcp.
//!
//! This crate provides the World Anvil request pipeline (caching, retry,
//! error classification) and typed endpoint wrappers used by the server.

pub mod anvil;

pub use anvil::{
    AnvilClient, AnvilConfig, AnvilError, ApiRequest, Granularity, HttpTransport, Identity, Method, RawResponse,
    RetryPolicy, Transport, User, World, WorldSummary, WorldUpdate,
};
