//! DTOs for the shorten endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::entities::ShortUrl;

/// Request to shorten one URL.
#[derive(Debug, Deserialize, Validate)]
pub struct ShortenRequest {
    /// The original URL to shorten (must be a valid HTTP/HTTPS URL).
    #[validate(url(message = "Invalid URL format"))]
    pub url: String,
}

/// Response for a created (or re-used) short link.
#[derive(Debug, Serialize)]
pub struct ShortenResponse {
    pub short_code: String,
    pub original_url: String,
    pub short_url: String,
    pub created_at: DateTime<Utc>,
}

impl ShortenResponse {
    /// Builds the response from an entity, composing the public short URL
    /// from the configured base URL.
    pub fn from_entity(url: &ShortUrl, base_url: &str) -> Self {
        Self {
            short_code: url.short_code.clone(),
            original_url: url.original_url.clone(),
            short_url: format!("{}/{}", base_url.trim_end_matches('/'), url.short_code),
            created_at: url.created_at,
        }
    }
}
