//! Shared application state with explicitly constructed, injected clients.
//!
//! Every client is built once at startup and owned here; nothing reaches for
//! an ambient global. Handlers receive the state through Axum's `State`
//! extractor, workers receive their dependencies at construction.

use sqlx::PgPool;
use std::sync::Arc;

use crate::application::services::{UrlService, VisitService};
use crate::infrastructure::cache::RedisCache;
use crate::infrastructure::persistence::PgShortUrlRepository;
use crate::infrastructure::queue::RedisStreamQueue;

/// Concrete URL service wired to Postgres and Redis.
pub type AppUrlService = UrlService<PgShortUrlRepository, RedisCache>;

/// Concrete visit service wired to Redis cache and stream queue.
pub type AppVisitService = VisitService<RedisCache, RedisStreamQueue>;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub urls: Arc<AppUrlService>,
    pub visits: Arc<AppVisitService>,
    pub cache: Arc<RedisCache>,
    pub queue: Arc<RedisStreamQueue>,
    pub base_url: String,
    pub behind_proxy: bool,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: PgPool,
        urls: Arc<AppUrlService>,
        visits: Arc<AppVisitService>,
        cache: Arc<RedisCache>,
        queue: Arc<RedisStreamQueue>,
        base_url: String,
        behind_proxy: bool,
    ) -> Self {
        Self {
            db,
            urls,
            visits,
            cache,
            queue,
            base_url,
            behind_proxy,
        }
    }
}
