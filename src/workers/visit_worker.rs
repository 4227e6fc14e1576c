//! Batch worker draining the visit-event queue into the durable store.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::application::services::UrlService;
use crate::domain::entities::NewVisit;
use crate::domain::repositories::{ShortUrlRepository, VisitRepository};
use crate::domain::visit_message::VisitMessage;
use crate::infrastructure::cache::CounterCache;
use crate::infrastructure::queue::{Delivery, VisitQueue};

/// Flush when the buffer reaches this many messages.
pub const BATCH_SIZE: usize = 200;

/// Flush a non-empty buffer at least this often.
pub const BATCH_INTERVAL: Duration = Duration::from_millis(800);

/// Hard cap forcing an immediate flush before accepting more messages.
pub const MAX_BUFFER_SIZE: usize = 1000;

/// Pause after a failed queue fetch before trying again.
const FETCH_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Buffering and flush thresholds for the visit batch worker.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub batch_size: usize,
    pub batch_interval: Duration,
    pub max_buffer_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: BATCH_SIZE,
            batch_interval: BATCH_INTERVAL,
            max_buffer_size: MAX_BUFFER_SIZE,
        }
    }
}

/// Consumes `VisitMessage`s from the queue, buffers them in memory and
/// flushes them as bulk inserts.
///
/// Flush triggers: buffer reaches `batch_size`, the periodic interval
/// elapses with a non-empty buffer, or the buffer hits `max_buffer_size`
/// (backpressure valve). Messages whose short code no longer resolves are
/// dropped; a failed bulk insert pushes the whole snapshot back onto the
/// buffer for the next cycle, so persistence is at-least-once and may
/// duplicate rows after repeated failures.
pub struct VisitWorker<Q, R, C, V>
where
    Q: VisitQueue,
    R: ShortUrlRepository,
    C: CounterCache,
    V: VisitRepository,
{
    queue: Arc<Q>,
    urls: Arc<UrlService<R, C>>,
    visits: Arc<V>,
    config: BatchConfig,
    buffer: Vec<VisitMessage>,
}

impl<Q, R, C, V> VisitWorker<Q, R, C, V>
where
    Q: VisitQueue,
    R: ShortUrlRepository,
    C: CounterCache,
    V: VisitRepository,
{
    /// Creates a new batch worker. The buffer starts empty and is owned by
    /// this worker exclusively.
    pub fn new(
        queue: Arc<Q>,
        urls: Arc<UrlService<R, C>>,
        visits: Arc<V>,
        config: BatchConfig,
    ) -> Self {
        Self {
            queue,
            urls,
            visits,
            config,
            buffer: Vec::new(),
        }
    }

    /// Runs the consume/flush loop until the stop signal flips.
    ///
    /// On stop the worker finishes the in-flight fetch, drains the buffer
    /// with one final flush and returns.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            batch_size = self.config.batch_size,
            interval_ms = self.config.batch_interval.as_millis() as u64,
            "visit worker started, consuming visit messages"
        );

        let mut last_flush = Instant::now();

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.queue.fetch().await {
                Ok(deliveries) => {
                    for delivery in deliveries {
                        self.accept(delivery).await;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "queue fetch failed");
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        _ = tokio::time::sleep(FETCH_RETRY_DELAY) => {}
                    }
                }
            }

            if !self.buffer.is_empty() && last_flush.elapsed() >= self.config.batch_interval {
                self.flush().await;
                last_flush = Instant::now();
            }
        }

        if !self.buffer.is_empty() {
            info!(buffered = self.buffer.len(), "visit worker draining buffer");
        }
        self.flush().await;
        info!("visit worker stopped");
    }

    /// Decodes, buffers and acknowledges one delivery.
    ///
    /// A decode failure discards only that message. The acknowledgement is
    /// sent either way: a malformed payload must not stay pending forever.
    pub async fn accept(&mut self, delivery: Delivery) {
        if self.buffer.len() >= self.config.max_buffer_size {
            warn!(buffered = self.buffer.len(), "buffer full, forcing flush");
            self.flush().await;
        }

        match serde_json::from_str::<VisitMessage>(&delivery.payload) {
            Ok(message) => self.buffer.push(message),
            Err(e) => {
                warn!(error = %e, raw = %delivery.payload, "discarding undecodable visit message");
            }
        }

        if let Err(e) = self.queue.ack(&delivery.id).await {
            warn!(error = %e, delivery_id = %delivery.id, "failed to acknowledge visit message");
        }

        if self.buffer.len() >= self.config.batch_size {
            self.flush().await;
        }
    }

    /// Flushes the buffered messages as one bulk insert.
    ///
    /// The buffer is snapshotted and cleared up front; on a failed insert
    /// the snapshot goes back onto the buffer for the next cycle.
    pub async fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }

        let snapshot = std::mem::take(&mut self.buffer);
        let mut records = Vec::with_capacity(snapshot.len());
        let mut dropped = 0usize;

        for message in &snapshot {
            match self.urls.resolve(&message.short_code).await {
                Some(url) => records.push(NewVisit {
                    url_id: url.id,
                    ip_address: message.ip.clone(),
                    visited_at: message.timestamp,
                }),
                None => {
                    warn!(
                        short_code = %message.short_code,
                        "visit references unknown short code, dropping"
                    );
                    dropped += 1;
                }
            }
        }

        if records.is_empty() {
            if dropped > 0 {
                warn!(dropped, total = snapshot.len(), "no valid visits in batch");
            }
            return;
        }

        match self.visits.insert_batch(records).await {
            Ok(inserted) => {
                info!(
                    inserted,
                    dropped,
                    total = snapshot.len(),
                    "flushed visit batch"
                );
            }
            Err(e) => {
                error!(error = %e, "visit batch insert failed, requeueing snapshot");
                self.buffer.extend(snapshot);
            }
        }
    }
}
