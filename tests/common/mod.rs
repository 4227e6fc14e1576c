#![allow(dead_code)]

//! In-memory fakes for the cache, queue and repositories.
//!
//! Unlike the mockall mocks used in unit tests, these hold real state so a
//! test can drive the whole pipeline end to end: record visits, drain the
//! queue through the batch worker, run sync cycles, and observe the durable
//! counters converge.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use uuid::Uuid;

use shortloop::domain::entities::{NewShortUrl, NewVisit, ShortUrl};
use shortloop::domain::repositories::{ShortUrlRepository, VisitRepository};
use shortloop::domain::visit_message::VisitMessage;
use shortloop::error::AppError;
use shortloop::infrastructure::cache::CounterCache;
use shortloop::infrastructure::queue::{Delivery, QueueError, VisitQueue};

fn io_error(message: &'static str) -> QueueError {
    QueueError::Io(redis::RedisError::from((redis::ErrorKind::IoError, message)))
}

/// Key-value fake with atomic increment and get-and-delete.
#[derive(Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, String>>,
    /// When set, every operation behaves like an unreachable cache.
    pub unavailable: AtomicBool,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }

    fn down(&self) -> bool {
        self.unavailable.load(Ordering::SeqCst)
    }

    pub fn raw_insert(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }
}

#[async_trait]
impl CounterCache for InMemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        if self.down() {
            return None;
        }
        self.entries.lock().unwrap().get(key).cloned()
    }

    async fn set(&self, key: &str, value: &str, _ttl_seconds: u64) -> bool {
        if self.down() {
            return false;
        }
        self.raw_insert(key, value);
        true
    }

    async fn incr(&self, key: &str) -> i64 {
        if self.down() {
            return 0;
        }
        let mut entries = self.entries.lock().unwrap();
        let next = entries
            .get(key)
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(0)
            + 1;
        entries.insert(key.to_string(), next.to_string());
        next
    }

    async fn get_and_delete(&self, key: &str) -> Option<String> {
        if self.down() {
            return None;
        }
        self.entries.lock().unwrap().remove(key)
    }

    async fn keys(&self, pattern: &str) -> Vec<String> {
        if self.down() {
            return Vec::new();
        }
        let prefix = pattern.trim_end_matches('*');
        self.entries
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect()
    }

    async fn ping(&self) -> bool {
        !self.down()
    }
}

/// Durable-queue fake: fetched entries stay unacknowledged until acked.
#[derive(Default)]
pub struct InMemoryQueue {
    pending: Mutex<VecDeque<Delivery>>,
    unacked: Mutex<HashMap<String, Delivery>>,
    next_id: AtomicU64,
    prefetch: usize,
    /// When set, publishing fails like an unreachable channel.
    pub fail_publish: AtomicBool,
}

impl InMemoryQueue {
    pub fn new(prefetch: usize) -> Self {
        Self {
            prefetch,
            ..Self::default()
        }
    }

    pub fn set_publish_failure(&self, down: bool) {
        self.fail_publish.store(down, Ordering::SeqCst);
    }

    /// Enqueues a raw payload, bypassing message encoding.
    pub fn push_raw(&self, payload: &str) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.pending.lock().unwrap().push_back(Delivery {
            id: format!("{id}-0"),
            payload: payload.to_string(),
        });
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    pub fn unacked_len(&self) -> usize {
        self.unacked.lock().unwrap().len()
    }
}

#[async_trait]
impl VisitQueue for InMemoryQueue {
    async fn publish(&self, message: &VisitMessage) -> Result<(), QueueError> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(io_error("channel unreachable"));
        }
        let payload = serde_json::to_string(message)?;
        self.push_raw(&payload);
        Ok(())
    }

    async fn fetch(&self) -> Result<Vec<Delivery>, QueueError> {
        let batch: Vec<Delivery> = {
            let mut pending = self.pending.lock().unwrap();
            let take = self.prefetch.max(1).min(pending.len());
            pending.drain(..take).collect()
        };

        if batch.is_empty() {
            // emulate the short blocking read of the real consumer
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        } else {
            let mut unacked = self.unacked.lock().unwrap();
            for delivery in &batch {
                unacked.insert(delivery.id.clone(), delivery.clone());
            }
        }

        Ok(batch)
    }

    async fn ack(&self, delivery_id: &str) -> Result<(), QueueError> {
        self.unacked.lock().unwrap().remove(delivery_id);
        Ok(())
    }

    async fn ping(&self) -> bool {
        !self.fail_publish.load(Ordering::SeqCst)
    }
}

/// Store fake enforcing short-code uniqueness among non-deleted rows.
#[derive(Default)]
pub struct InMemoryShortUrlRepository {
    rows: Mutex<Vec<ShortUrl>>,
    next_id: AtomicI64,
}

impl InMemoryShortUrlRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visit_count(&self, short_code: &str) -> Option<i64> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.short_code == short_code)
            .map(|r| r.visit_count)
    }
}

#[async_trait]
impl ShortUrlRepository for InMemoryShortUrlRepository {
    async fn create(&self, new_url: NewShortUrl) -> Result<ShortUrl, AppError> {
        let mut rows = self.rows.lock().unwrap();
        if rows
            .iter()
            .any(|r| r.short_code == new_url.short_code && r.deleted_at.is_none())
        {
            return Err(AppError::conflict(
                "Unique constraint violation",
                json!({ "short_code": new_url.short_code }),
            ));
        }

        let now = Utc::now();
        let row = ShortUrl {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            uuid: Uuid::now_v7(),
            original_url: new_url.original_url,
            short_code: new_url.short_code,
            visit_count: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn find_by_code(&self, short_code: &str) -> Result<Option<ShortUrl>, AppError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.short_code == short_code && r.deleted_at.is_none())
            .cloned())
    }

    async fn find_by_original_url(
        &self,
        original_url: &str,
    ) -> Result<Option<ShortUrl>, AppError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.original_url == original_url && r.deleted_at.is_none())
            .cloned())
    }

    async fn increment_visit_count(&self, id: i64, delta: i64) -> Result<(), AppError> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|r| r.id == id) {
            row.visit_count += delta;
            row.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn soft_delete(&self, short_code: &str) -> Result<bool, AppError> {
        let mut rows = self.rows.lock().unwrap();
        match rows
            .iter_mut()
            .find(|r| r.short_code == short_code && r.deleted_at.is_none())
        {
            Some(row) => {
                row.deleted_at = Some(Utc::now());
                row.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn restore(&self, short_code: &str) -> Result<bool, AppError> {
        let mut rows = self.rows.lock().unwrap();
        match rows
            .iter_mut()
            .find(|r| r.short_code == short_code && r.deleted_at.is_some())
        {
            Some(row) => {
                row.deleted_at = None;
                row.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Visit-row fake with an all-or-nothing batch insert.
#[derive(Default)]
pub struct InMemoryVisitRepository {
    rows: Mutex<Vec<NewVisit>>,
    /// When set, the next insert fails once (transaction rollback).
    pub fail_next_insert: AtomicBool,
}

impl InMemoryVisitRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_insert(&self) {
        self.fail_next_insert.store(true, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn count_for_url(&self, url_id: i64) -> usize {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|v| v.url_id == url_id)
            .count()
    }
}

#[async_trait]
impl VisitRepository for InMemoryVisitRepository {
    async fn insert_batch(&self, visits: Vec<NewVisit>) -> Result<u64, AppError> {
        if self.fail_next_insert.swap(false, Ordering::SeqCst) {
            return Err(AppError::internal("transaction failed", json!({})));
        }
        let inserted = visits.len() as u64;
        self.rows.lock().unwrap().extend(visits);
        Ok(inserted)
    }
}
