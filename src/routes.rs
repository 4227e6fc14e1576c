//! Router assembly.
//!
//! # Route structure
//!
//! - `GET  /{code}`             - short link redirect (public)
//! - `GET  /health`             - health check: database, cache, queue
//! - `POST /api/v1/shorten`     - create a short link (rate limited)
//! - `GET  /api/v1/stats/{code}`- visit statistics (rate limited)

use axum::routing::{get, post};
use axum::Router;
use tower::Layer;
use tower_http::LatencyUnit;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::api::handlers::{health_handler, redirect_handler, shorten_handler, stats_handler};
use crate::api::middleware::rate_limit;
use crate::config::Config;
use crate::state::AppState;

/// Constructs the application router with all routes and middleware.
pub fn app_router(state: AppState, config: &Config) -> NormalizePath<Router> {
    let api = Router::new()
        .route("/shorten", post(shorten_handler))
        .route("/stats/{code}", get(stats_handler))
        .layer(rate_limit::layer(
            config.rate_limit_requests,
            config.rate_limit_window_secs,
        ));

    let router = Router::new()
        .route("/{code}", get(redirect_handler))
        .route("/health", get(health_handler))
        .nest("/api/v1", api)
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Millis),
                ),
        );

    NormalizePathLayer::trim_trailing_slash().layer(router)
}
