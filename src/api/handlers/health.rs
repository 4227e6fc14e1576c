//! Handler for the health check endpoint.

use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;

use crate::api::dto::health::{CheckStatus, HealthChecks, HealthResponse};
use crate::infrastructure::cache::CounterCache;
use crate::infrastructure::queue::VisitQueue;
use crate::state::AppState;

/// Returns service health with per-dependency checks.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response Codes
///
/// - **200 OK**: database, cache and queue all reachable
/// - **503 Service Unavailable**: at least one dependency degraded
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let database = check_database(&state).await;
    let cache = check_cache(&state).await;
    let queue = check_queue(&state).await;

    let all_healthy = database.is_ok() && cache.is_ok() && queue.is_ok();

    let response = HealthResponse {
        status: if all_healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
        checks: HealthChecks {
            database,
            cache,
            queue,
        },
    };

    if all_healthy {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

async fn check_database(state: &AppState) -> CheckStatus {
    match sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.db)
        .await
    {
        Ok(_) => CheckStatus::ok(),
        Err(e) => CheckStatus::error(format!("Database error: {}", e)),
    }
}

async fn check_cache(state: &AppState) -> CheckStatus {
    if state.cache.ping().await {
        CheckStatus::ok()
    } else {
        CheckStatus::error("Cache unreachable")
    }
}

async fn check_queue(state: &AppState) -> CheckStatus {
    if state.queue.ping().await {
        CheckStatus::ok()
    } else {
        CheckStatus::error("Queue unreachable")
    }
}
