//! Handler for the shorten endpoint.

use axum::{Json, extract::State};
use validator::Validate;

use crate::api::dto::shorten::{ShortenRequest, ShortenResponse};
use crate::error::AppError;
use crate::state::AppState;

/// Creates a short link for a URL.
///
/// # Endpoint
///
/// `POST /api/v1/shorten`
///
/// Shortening the same URL twice returns the existing mapping instead of
/// allocating a second code.
///
/// # Errors
///
/// Returns 400 Bad Request for an invalid URL and 500 when the allocator
/// exhausted its collision retries.
pub async fn shorten_handler(
    State(state): State<AppState>,
    Json(payload): Json<ShortenRequest>,
) -> Result<Json<ShortenResponse>, AppError> {
    payload.validate()?;

    let url = state.urls.shorten(&payload.url).await?;

    Ok(Json(ShortenResponse::from_entity(&url, &state.base_url)))
}
