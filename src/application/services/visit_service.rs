//! Fire-and-forget visit recording.

use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use crate::domain::visit_message::VisitMessage;
use crate::infrastructure::cache::{CounterCache, counter_key};
use crate::infrastructure::queue::VisitQueue;

/// Records visits without ever blocking on the durable store.
///
/// Each visit takes two independently fault-tolerant steps: an atomic
/// increment of the ephemeral `visits:<code>` counter, then a publish of the
/// per-visit detail message. The asymmetry is deliberate and preserved: the
/// aggregate counter has two independent paths to durability (the counter
/// sync worker drains it even when the queue is down), while the per-visit
/// detail record has exactly one and is dropped when the publish fails.
pub struct VisitService<C: CounterCache, Q: VisitQueue> {
    cache: Arc<C>,
    queue: Arc<Q>,
}

impl<C: CounterCache, Q: VisitQueue> VisitService<C, Q> {
    /// Creates a new visit service.
    pub fn new(cache: Arc<C>, queue: Arc<Q>) -> Self {
        Self { cache, queue }
    }

    /// Records one visit to `short_code`. Never fails the caller.
    pub async fn record_visit(&self, short_code: &str, client_ip: Option<String>) {
        let count = self.cache.incr(&counter_key(short_code)).await;
        // a successful INCRBY never returns 0, so 0 means the increment was
        // dropped and the message below is this visit's only record
        if count == 0 {
            warn!(short_code, "visit counter increment did not land");
        }

        let message = VisitMessage {
            short_code: short_code.to_string(),
            ip: client_ip,
            timestamp: Utc::now(),
        };

        if let Err(e) = self.queue.publish(&message).await {
            warn!(
                error = %e,
                short_code,
                "visit message not published; aggregate counter still recorded"
            );
        }
    }
}
