//! Visit entity representing one observed redirect through a short code.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A persisted visit record.
///
/// Rows are created in bulk by the visit batch worker and are immutable
/// afterwards. `visited_at` carries the timestamp from the originating
/// event, not the time of persistence.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Visit {
    pub id: i64,
    pub uuid: Uuid,
    pub url_id: i64,
    pub ip_address: Option<String>,
    pub visited_at: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Input data for one visit row in a batch insert.
#[derive(Debug, Clone)]
pub struct NewVisit {
    pub url_id: i64,
    pub ip_address: Option<String>,
    pub visited_at: DateTime<Utc>,
}
