//! Worker merging drained ephemeral counters into the durable store.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::application::services::UrlService;
use crate::domain::repositories::ShortUrlRepository;
use crate::error::AppError;
use crate::infrastructure::cache::{CounterCache, counter_key_pattern, short_code_from_counter_key};

/// How often counters are drained.
pub const SYNC_INTERVAL: Duration = Duration::from_millis(800);

/// Consecutive cycle failures tolerated before the worker stops.
pub const MAX_RETRIES: u32 = 3;

/// Base delay between failed cycles; multiplied by the failure count.
pub const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Timing and failure budget for the counter sync worker.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub interval: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval: SYNC_INTERVAL,
            max_retries: MAX_RETRIES,
            retry_delay: RETRY_DELAY,
        }
    }
}

/// Counters drained and merged in one cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncOutcome {
    pub synced: usize,
    pub skipped: usize,
    pub failed: usize,
    pub total_visits: i64,
}

/// Periodically drains every `visits:*` counter into `ShortUrl.visit_count`.
///
/// Each key is removed with a single atomic get-and-delete, so a concurrent
/// increment lands either in the drained value or in a fresh key for the
/// next cycle, never in both and never lost. Per-key failures are logged
/// and skipped; only a whole-cycle failure (cache unreachable) counts
/// against the consecutive-failure budget that eventually stops the worker.
pub struct CounterSyncWorker<C, R>
where
    C: CounterCache,
    R: ShortUrlRepository,
{
    cache: Arc<C>,
    urls: Arc<UrlService<R, C>>,
    repository: Arc<R>,
    config: SyncConfig,
}

impl<C, R> CounterSyncWorker<C, R>
where
    C: CounterCache,
    R: ShortUrlRepository,
{
    /// Creates a new counter sync worker.
    pub fn new(
        cache: Arc<C>,
        urls: Arc<UrlService<R, C>>,
        repository: Arc<R>,
        config: SyncConfig,
    ) -> Self {
        Self {
            cache,
            urls,
            repository,
            config,
        }
    }

    /// Runs the sleep/flush loop until the stop signal flips or the
    /// consecutive-failure budget is exhausted.
    ///
    /// A successful cycle resets the failure count; each failure escalates
    /// the backoff (`retry_delay` × failure count). The retry sleeps watch
    /// the stop signal so shutdown is never blocked by a hung dependency.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_ms = self.config.interval.as_millis() as u64,
            "counter sync worker started"
        );

        let mut consecutive_failures = 0u32;

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = sleep(self.config.interval) => {}
            }
            if *shutdown.borrow() {
                break;
            }

            match self.sync_counters().await {
                Ok(_) => consecutive_failures = 0,
                Err(e) => {
                    consecutive_failures += 1;
                    error!(
                        error = %e,
                        attempt = consecutive_failures,
                        "counter sync cycle failed"
                    );

                    if consecutive_failures >= self.config.max_retries {
                        error!("max retries exceeded, stopping counter sync worker");
                        break;
                    }

                    let backoff = self.config.retry_delay * consecutive_failures;
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        _ = sleep(backoff) => {}
                    }
                }
            }
        }

        info!("counter sync worker stopped");
    }

    /// Drains every counter key once and merges the deltas.
    ///
    /// Skips malformed and non-positive values, discards counters whose
    /// short code no longer resolves, and isolates per-key merge failures so
    /// the remaining keys in the cycle still get processed.
    ///
    /// # Errors
    ///
    /// Returns an error only when the cache itself is unreachable, which
    /// feeds the run loop's consecutive-failure escalation.
    pub async fn sync_counters(&self) -> Result<SyncOutcome, AppError> {
        if !self.cache.ping().await {
            return Err(AppError::internal("counter cache unreachable", json!({})));
        }

        let keys = self.cache.keys(&counter_key_pattern()).await;
        if keys.is_empty() {
            debug!("no visit counters to sync");
            return Ok(SyncOutcome::default());
        }

        let mut outcome = SyncOutcome::default();

        for key in &keys {
            let Some(short_code) = short_code_from_counter_key(key) else {
                continue;
            };

            let Some(raw) = self.cache.get_and_delete(key).await else {
                continue;
            };

            let delta: i64 = match raw.parse() {
                Ok(value) => value,
                Err(_) => {
                    warn!(key = %key, value = %raw, "malformed counter value, skipping");
                    outcome.skipped += 1;
                    continue;
                }
            };
            if delta <= 0 {
                outcome.skipped += 1;
                continue;
            }

            let Some(url) = self.urls.resolve(short_code).await else {
                warn!(short_code, delta, "short url not found, discarding drained counter");
                outcome.skipped += 1;
                continue;
            };

            match self.repository.increment_visit_count(url.id, delta).await {
                Ok(()) => {
                    outcome.synced += 1;
                    outcome.total_visits += delta;
                    info!(short_code, delta, "merged drained visit counter");
                }
                Err(e) => {
                    error!(error = %e, short_code, delta, "failed to merge counter, delta lost");
                    outcome.failed += 1;
                }
            }
        }

        if outcome.synced > 0 {
            info!(
                synced = outcome.synced,
                keys = keys.len(),
                visits = outcome.total_visits,
                "counter sync cycle completed"
            );
        }

        Ok(outcome)
    }
}
