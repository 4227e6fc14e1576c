//! DTOs for the visit statistics endpoint.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::entities::ShortUrl;

/// Visit statistics for one short link.
///
/// `visit_count` reflects the durable aggregate; counters still sitting in
/// the cache or messages still in flight are not included until the
/// reconciliation workers catch up.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub original_url: String,
    pub short_code: String,
    pub visit_count: i64,
    pub created_at: DateTime<Utc>,
}

impl StatsResponse {
    pub fn from_entity(url: &ShortUrl) -> Self {
        Self {
            original_url: url.original_url.clone(),
            short_code: url.short_code.clone(),
            visit_count: url.visit_count,
            created_at: url.created_at,
        }
    }
}
