//! Counter cache trait, key namespace and error types.
//!
//! Two disjoint key families share one key-value space:
//!
//! - `short:<code>` → original URL string, TTL-bounded; advisory lookup
//!   entries written on creation and on cache-aside misses.
//! - `visits:<code>` → decimal counter, no TTL; incremented atomically on
//!   every visit and drained atomically (get-and-delete) only by the
//!   counter sync worker.
//!
//! Atomicity of `incr` and `get_and_delete` is delegated to the cache
//! server's native primitives; callers never take locks around them.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Prefix for code-to-URL lookup entries.
pub const LOOKUP_KEY_PREFIX: &str = "short:";

/// Prefix for ephemeral visit counters.
pub const COUNTER_KEY_PREFIX: &str = "visits:";

/// Default TTL for lookup entries (one day).
pub const DEFAULT_LOOKUP_TTL_SECS: u64 = 86_400;

/// Builds the lookup key for a short code.
pub fn lookup_key(short_code: &str) -> String {
    format!("{LOOKUP_KEY_PREFIX}{short_code}")
}

/// Builds the counter key for a short code.
pub fn counter_key(short_code: &str) -> String {
    format!("{COUNTER_KEY_PREFIX}{short_code}")
}

/// Match pattern covering the whole counter namespace.
pub fn counter_key_pattern() -> String {
    format!("{COUNTER_KEY_PREFIX}*")
}

/// Extracts the short code from a counter key, if it is one.
pub fn short_code_from_counter_key(key: &str) -> Option<&str> {
    key.strip_prefix(COUNTER_KEY_PREFIX)
}

/// Errors establishing the cache connection.
///
/// Per-operation failures never surface as errors: after bounded retries
/// every operation falls back to a safe default (miss, zero, empty).
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to connect to cache: {0}")]
    Connect(#[source] redis::RedisError),

    #[error("cache connection timed out after {0:?}")]
    Timeout(Duration),
}

/// Fast counter cache with retrying, fail-soft operations.
///
/// Every method retries transient failures a bounded number of times and
/// then returns a safe default instead of an error: the read path and the
/// visit recording path must never hard-fail because the cache is down.
///
/// # Implementations
///
/// - [`crate::infrastructure::cache::RedisCache`] - Redis-backed client
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CounterCache: Send + Sync {
    /// Reads a key. `None` on miss or on exhausted retries.
    async fn get(&self, key: &str) -> Option<String>;

    /// Writes a key with a TTL. `false` when the write did not land.
    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> bool;

    /// Atomically increments a counter, creating it at 1 when absent.
    /// Returns the new value, or `0` when the increment did not land
    /// (a successful increment never yields `0`).
    async fn incr(&self, key: &str) -> i64;

    /// Atomically reads and deletes a key in one server-side operation, so
    /// no concurrent increment can fall between the read and the delete.
    /// `None` on absent key or on exhausted retries.
    async fn get_and_delete(&self, key: &str) -> Option<String>;

    /// Enumerates keys matching a pattern. Empty on exhausted retries.
    async fn keys(&self, pattern: &str) -> Vec<String>;

    /// Connection liveness probe.
    async fn ping(&self) -> bool;
}
