//! Store backend trait and in-memory implementation.

use crate::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A trait for key-value store backends.
///
/// All cross-request state (accounts, sessions, profiles) lives behind
/// this interface. There are no transactions: every method is a single
/// round trip, and read-modify-write sequences built on top of it can
/// race. [`delete_many`](KvStore::delete_many) batches deletes for
/// latency only and must not be treated as atomic.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Reads the value stored at `key`.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes `value` at `key` with no expiry.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Writes `value` at `key`, expiring after `ttl_secs` seconds.
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()>;

    /// Deletes `key`. Returns whether a value was present.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Lists all keys matching a glob-style `pattern` (e.g. `user:*`).
    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>>;

    /// Deletes several keys in one batched round trip where the
    /// backend supports it. Best-effort: not atomic.
    async fn delete_many(&self, keys: &[String]) -> Result<()> {
        for key in keys {
            self.delete(key).await?;
        }
        Ok(())
    }
}

/// An in-memory store backend for testing.
///
/// Honors TTLs by checking the deadline on read, which also mirrors
/// the lazy-expiry behavior of the production backend closely enough
/// for session tests.
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, Entry>>,
}

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        self.data.read().values().filter(|e| !e.is_expired()).count()
    }

    /// Returns true if the store holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let data = self.data.read();
        Ok(data
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.data.write().insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        self.data.write().insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + Duration::from_secs(ttl_secs)),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let removed = self.data.write().remove(key);
        Ok(removed.is_some_and(|entry| !entry.is_expired()))
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>> {
        let data = self.data.read();
        Ok(data
            .iter()
            .filter(|(key, entry)| !entry.is_expired() && glob_match(pattern, key))
            .map(|(key, _)| key.clone())
            .collect())
    }
}

/// Matches the subset of Redis glob patterns the service uses:
/// literal text with `*` wildcards.
fn glob_match(pattern: &str, key: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == key;
    }

    let mut rest = key;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            match rest.strip_prefix(part) {
                Some(r) => rest = r,
                None => return false,
            }
        } else if i == parts.len() - 1 {
            return rest.ends_with(part);
        } else {
            match rest.find(part) {
                Some(pos) => rest = &rest[pos + part.len()..],
                None => return false,
            }
        }
    }
    true
}
