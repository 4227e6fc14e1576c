//! Short URL entity representing a code-to-URL mapping with its visit counter.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A shortened URL row.
///
/// `visit_count` is the authoritative aggregate counter, advanced only by the
/// counter sync worker merging drained cache deltas. `deleted_at` implements
/// soft deletion: a non-null value makes the row invisible to every lookup
/// while the row itself is never removed physically.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ShortUrl {
    pub id: i64,
    pub uuid: Uuid,
    pub original_url: String,
    pub short_code: String,
    pub visit_count: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ShortUrl {
    /// Returns true if the row has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Input data for inserting a new short URL.
///
/// The surrogate key, uuid and timestamps are assigned by the repository.
#[derive(Debug, Clone)]
pub struct NewShortUrl {
    pub original_url: String,
    pub short_code: String,
}
