//! Redis Streams implementation of the visit-event queue.
//!
//! `XADD` appends one entry per visit to the durable `visits` stream; the
//! batch worker reads through a consumer group (`XREADGROUP` with a `COUNT`
//! prefetch limit) and acknowledges entries with `XACK`. Unacknowledged
//! entries stay in the group's pending list, giving at-least-once delivery.

use super::service::{Delivery, QueueError, VISITS_QUEUE, VisitQueue};
use crate::domain::visit_message::VisitMessage;
use async_trait::async_trait;
use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Consumer group shared by all batch worker instances.
const CONSUMER_GROUP: &str = "visit-workers";

/// Stream entry field carrying the JSON-encoded message.
const PAYLOAD_FIELD: &str = "payload";

/// How long a fetch blocks waiting for new entries before returning empty.
/// Short enough that the worker's periodic flush timer stays responsive.
const BLOCK_MILLIS: usize = 200;

/// Connection and consumption settings for the queue client.
///
/// The defaults are part of the observable behavior contract: 3 connection
/// attempts, 5 s between them, prefetch of 10 messages.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub url: String,
    pub max_retries: usize,
    pub retry_delay: Duration,
    pub prefetch_count: usize,
    pub consumer_name: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379/0".to_string(),
            max_retries: 3,
            retry_delay: Duration::from_secs(5),
            prefetch_count: 10,
            consumer_name: "visit-worker-1".to_string(),
        }
    }
}

/// Shared queue client.
///
/// Publishing and acknowledging go through one multiplexed connection;
/// blocking group reads get their own, so a consumer waiting on `XREADGROUP
/// BLOCK` never stalls a publish from the request path.
pub struct RedisStreamQueue {
    manager: ConnectionManager,
    read_manager: ConnectionManager,
    config: QueueConfig,
}

impl RedisStreamQueue {
    /// Connects to the stream server and ensures the consumer group exists.
    ///
    /// Retries `max_retries` times with a linearly growing delay
    /// (`retry_delay` × attempt number); exhausting the attempts is fatal to
    /// the caller, matching the worker's startup contract.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Connect`] after the final failed attempt.
    pub async fn connect(config: QueueConfig) -> Result<Self, QueueError> {
        let client = Client::open(config.url.as_str()).map_err(|source| QueueError::Connect {
            attempts: 0,
            source,
        })?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match Self::try_connect(&client).await {
                Ok((manager, read_manager)) => {
                    info!(
                        queue = VISITS_QUEUE,
                        group = CONSUMER_GROUP,
                        "queue connection established"
                    );
                    return Ok(Self {
                        manager,
                        read_manager,
                        config,
                    });
                }
                Err(source) if attempt >= config.max_retries => {
                    return Err(QueueError::Connect {
                        attempts: attempt,
                        source,
                    });
                }
                Err(e) => {
                    warn!(error = %e, attempt, "queue connection attempt failed");
                    sleep(config.retry_delay * attempt as u32).await;
                }
            }
        }
    }

    async fn try_connect(
        client: &Client,
    ) -> Result<(ConnectionManager, ConnectionManager), redis::RedisError> {
        let mut manager = ConnectionManager::new(client.clone()).await?;
        let read_manager = ConnectionManager::new(client.clone()).await?;
        Self::ensure_group(&mut manager).await?;
        Ok((manager, read_manager))
    }

    /// Creates the durable stream and consumer group if missing.
    async fn ensure_group(conn: &mut ConnectionManager) -> Result<(), redis::RedisError> {
        let created = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(VISITS_QUEUE)
            .arg(CONSUMER_GROUP)
            .arg("0")
            .arg("MKSTREAM")
            .query_async::<()>(conn)
            .await;

        match created {
            Ok(()) => Ok(()),
            // the group surviving a reconnect is the normal case
            Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl VisitQueue for RedisStreamQueue {
    async fn publish(&self, message: &VisitMessage) -> Result<(), QueueError> {
        let body = serde_json::to_string(message)?;
        let mut conn = self.manager.clone();

        let entry_id: String = conn
            .xadd(VISITS_QUEUE, "*", &[(PAYLOAD_FIELD, body.as_str())])
            .await?;

        debug!(entry_id = %entry_id, short_code = %message.short_code, "visit message published");
        Ok(())
    }

    async fn fetch(&self) -> Result<Vec<Delivery>, QueueError> {
        let options = StreamReadOptions::default()
            .group(CONSUMER_GROUP, &self.config.consumer_name)
            .count(self.config.prefetch_count)
            .block(BLOCK_MILLIS);

        let mut conn = self.read_manager.clone();
        let reply: StreamReadReply = conn
            .xread_options(&[VISITS_QUEUE], &[">"], &options)
            .await?;

        let mut deliveries = Vec::new();
        for stream in reply.keys {
            for entry in stream.ids {
                // entries without a payload field still get delivered; the
                // consumer discards and acknowledges them as malformed
                let payload = entry.get::<String>(PAYLOAD_FIELD).unwrap_or_default();
                deliveries.push(Delivery {
                    id: entry.id,
                    payload,
                });
            }
        }

        Ok(deliveries)
    }

    async fn ack(&self, delivery_id: &str) -> Result<(), QueueError> {
        let mut conn = self.manager.clone();
        let _acked: i64 = conn
            .xack(VISITS_QUEUE, CONSUMER_GROUP, &[delivery_id])
            .await?;
        Ok(())
    }

    async fn ping(&self) -> bool {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .is_ok()
    }
}
