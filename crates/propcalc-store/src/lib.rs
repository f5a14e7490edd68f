//! Key-value credential storage for PropCalc accounts.
//!
//! This crate provides the storage abstraction every account, session,
//! and profile record lives behind: a small async key-value interface
//! with GET / SET / SET-with-TTL / DELETE / key-scan and a best-effort
//! batched delete.
//!
//! Two backends are provided:
//! - [`RedisStore`] - production backend over a Redis server
//! - [`MemoryStore`] - in-memory backend for testing
//!
//! The batched delete is a latency optimization, not a transaction:
//! individual commands can still fail or land independently.

mod backend;
mod error;
mod redis_store;

pub use backend::{KvStore, MemoryStore};
pub use error::StoreError;
pub use redis_store::RedisStore;

/// A specialized Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
