//! Message channel trait and error types for visit events.
//!
//! The channel decouples "visit happened" from "visit persisted": request
//! handlers publish one message per visit, the batch worker consumes them
//! with a prefetch limit and acknowledges each delivery. Delivery is
//! at-least-once; consumer-side validation may still discard a message.

use crate::domain::visit_message::VisitMessage;
use async_trait::async_trait;
use thiserror::Error;

/// Name of the durable visit-event queue.
pub const VISITS_QUEUE: &str = "visits";

/// One undecoded message pulled from the queue.
///
/// The payload stays raw here; schema validation happens per message in the
/// consumer so a single malformed payload never poisons a fetch.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub id: String,
    pub payload: String,
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue connection failed after {attempts} attempts: {source}")]
    Connect {
        attempts: usize,
        #[source]
        source: redis::RedisError,
    },

    #[error("queue i/o error: {0}")]
    Io(#[from] redis::RedisError),

    #[error("failed to encode visit message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Durable queue client for visit events.
///
/// # Implementations
///
/// - [`crate::infrastructure::queue::RedisStreamQueue`] - Redis Streams client
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VisitQueue: Send + Sync {
    /// Publishes one visit event to the durable queue.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError`] when the message cannot be encoded or the
    /// channel is unreachable. Callers on the recording path log and
    /// swallow this; the cache counter has already captured the visit.
    async fn publish(&self, message: &VisitMessage) -> Result<(), QueueError>;

    /// Pulls the next pending deliveries, bounded by the client's prefetch
    /// limit. Blocks briefly when the queue is empty, then returns an empty
    /// batch.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError`] when the channel is unreachable.
    async fn fetch(&self) -> Result<Vec<Delivery>, QueueError>;

    /// Acknowledges a delivery, removing it from the pending set.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError`] when the channel is unreachable; the delivery
    /// then stays pending and may be seen again (at-least-once).
    async fn ack(&self, delivery_id: &str) -> Result<(), QueueError>;

    /// Connection liveness probe.
    async fn ping(&self) -> bool;
}
