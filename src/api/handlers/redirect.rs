//! Handler for the short URL redirect.

use axum::{
    extract::{ConnectInfo, Path, State},
    http::HeaderMap,
    response::Redirect,
};
use serde_json::json;
use std::net::SocketAddr;

use crate::error::AppError;
use crate::state::AppState;
use crate::utils::client_ip::extract_client_ip;

/// Redirects a short code to its original URL.
///
/// # Endpoint
///
/// `GET /{code}`
///
/// Resolution and visit recording are two explicit sequential steps: first
/// the code resolves through the cache-aside path, then the visit is
/// recorded fire-and-forget (cache increment plus queue publish). Recording
/// never delays or fails the redirect beyond its own bounded retries; a
/// degraded cache or queue costs analytics, not the redirect.
///
/// # Errors
///
/// Returns 404 Not Found when the code is unknown, soft-deleted or
/// malformed.
pub async fn redirect_handler(
    Path(code): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Result<Redirect, AppError> {
    let Some(url) = state.urls.resolve(&code).await else {
        return Err(AppError::not_found(
            "Short link not found",
            json!({ "code": code }),
        ));
    };

    let client_ip = extract_client_ip(&headers, Some(addr), state.behind_proxy);
    state.visits.record_visit(&url.short_code, client_ip).await;

    Ok(Redirect::temporary(&url.original_url))
}
