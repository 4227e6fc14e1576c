//! Handler for visit statistics.

use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::json;

use crate::api::dto::stats::StatsResponse;
use crate::error::AppError;
use crate::state::AppState;

/// Returns the durable visit statistics for a short link.
///
/// # Endpoint
///
/// `GET /api/v1/stats/{code}`
///
/// # Errors
///
/// Returns 404 Not Found when the code is unknown or soft-deleted.
pub async fn stats_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<StatsResponse>, AppError> {
    let Some(url) = state.urls.resolve(&code).await else {
        return Err(AppError::not_found(
            "Short link not found",
            json!({ "code": code }),
        ));
    };

    Ok(Json(StatsResponse::from_entity(&url)))
}
