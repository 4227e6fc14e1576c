//! Redis-backed counter cache with bounded retries and safe defaults.

use super::service::{CacheError, CounterCache};
use async_trait::async_trait;
use redis::{Client, aio::ConnectionManager};
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tokio_retry::{Retry, strategy::FixedInterval};
use tracing::{info, warn};

/// Connection and retry settings for the cache client.
///
/// The defaults are part of the observable behavior contract: 3 attempts,
/// 1 s between operation retries, 5 s connect and socket timeouts.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub url: String,
    pub retry_attempts: usize,
    pub retry_delay: Duration,
    pub connect_timeout: Duration,
    pub socket_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379/0".to_string(),
            retry_attempts: 3,
            retry_delay: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(5),
            socket_timeout: Duration::from_secs(5),
        }
    }
}

/// Redis client shared by the request path and both background workers.
///
/// Holds a single multiplexed [`ConnectionManager`] that reconnects on its
/// own; on top of it every operation runs with a socket timeout and a fixed
/// retry interval, falling back to a safe default once attempts are
/// exhausted. Failures are logged, never propagated.
pub struct RedisCache {
    manager: ConnectionManager,
    config: CacheConfig,
}

impl RedisCache {
    /// Connects to Redis, validating the connection with a PING.
    ///
    /// Connection establishment retries `retry_attempts` times with a
    /// linearly growing delay (`retry_delay` × attempt number).
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the URL is invalid or every attempt
    /// failed or timed out.
    pub async fn connect(config: CacheConfig) -> Result<Self, CacheError> {
        let client = Client::open(config.url.as_str()).map_err(CacheError::Connect)?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match timeout(config.connect_timeout, ConnectionManager::new(client.clone())).await {
                Ok(Ok(mut manager)) => {
                    let pong = redis::cmd("PING")
                        .query_async::<String>(&mut manager)
                        .await;
                    match pong {
                        Ok(_) => {
                            info!("cache connection established");
                            return Ok(Self { manager, config });
                        }
                        Err(e) if attempt >= config.retry_attempts => {
                            return Err(CacheError::Connect(e));
                        }
                        Err(e) => {
                            warn!(error = %e, attempt, "cache ping failed");
                        }
                    }
                }
                Ok(Err(e)) if attempt >= config.retry_attempts => {
                    return Err(CacheError::Connect(e));
                }
                Ok(Err(e)) => {
                    warn!(error = %e, attempt, "cache connection attempt failed");
                }
                Err(_) if attempt >= config.retry_attempts => {
                    return Err(CacheError::Timeout(config.connect_timeout));
                }
                Err(_) => {
                    warn!(attempt, "cache connection attempt timed out");
                }
            }

            sleep(config.retry_delay * attempt as u32).await;
        }
    }

    /// Runs one command with the per-operation retry policy and socket
    /// timeout. Used by every trait method below.
    async fn run<T: redis::FromRedisValue + Send>(&self, cmd: &redis::Cmd) -> redis::RedisResult<T> {
        let retries = self.config.retry_attempts.saturating_sub(1);
        let strategy =
            FixedInterval::from_millis(self.config.retry_delay.as_millis() as u64).take(retries);

        Retry::spawn(strategy, || async {
            let mut conn = self.manager.clone();
            match timeout(self.config.socket_timeout, cmd.query_async::<T>(&mut conn)).await {
                Ok(result) => result,
                Err(_) => Err(redis::RedisError::from((
                    redis::ErrorKind::IoError,
                    "cache operation timed out",
                ))),
            }
        })
        .await
    }
}

#[async_trait]
impl CounterCache for RedisCache {
    async fn get(&self, key: &str) -> Option<String> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);

        match self.run::<Option<String>>(&cmd).await {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, key, "cache GET failed, treating as miss");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> bool {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("EX").arg(ttl_seconds);

        match self.run::<()>(&cmd).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, key, "cache SET failed");
                false
            }
        }
    }

    async fn incr(&self, key: &str) -> i64 {
        let mut cmd = redis::cmd("INCRBY");
        cmd.arg(key).arg(1);

        match self.run::<i64>(&cmd).await {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, key, "cache INCRBY failed");
                0
            }
        }
    }

    async fn get_and_delete(&self, key: &str) -> Option<String> {
        let mut cmd = redis::cmd("GETDEL");
        cmd.arg(key);

        match self.run::<Option<String>>(&cmd).await {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, key, "cache GETDEL failed, counter left in place");
                None
            }
        }
    }

    async fn keys(&self, pattern: &str) -> Vec<String> {
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;

        loop {
            let mut cmd = redis::cmd("SCAN");
            cmd.arg(cursor).arg("MATCH").arg(pattern).arg("COUNT").arg(100);

            match self.run::<(u64, Vec<String>)>(&cmd).await {
                Ok((next, batch)) => {
                    keys.extend(batch);
                    cursor = next;
                    if cursor == 0 {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, pattern, "cache SCAN failed");
                    return Vec::new();
                }
            }
        }

        keys
    }

    async fn ping(&self) -> bool {
        let cmd = redis::cmd("PING");
        self.run::<String>(&cmd).await.is_ok()
    }
}
