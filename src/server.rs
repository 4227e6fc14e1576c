//! Server bootstrap: clients, workers and graceful shutdown.

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::Config;
use crate::infrastructure::cache::RedisCache;
use crate::infrastructure::persistence::{PgShortUrlRepository, PgVisitRepository};
use crate::infrastructure::queue::RedisStreamQueue;
use crate::routes::app_router;
use crate::state::AppState;
use crate::utils::code_generator::generator_from_name;
use crate::workers::{CounterSyncWorker, VisitWorker};
use crate::application::services::{UrlService, VisitService};

/// Upper bound on the total wait for workers during shutdown, so a hung
/// external dependency cannot block process exit indefinitely.
const WORKER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs the HTTP server with both background workers in-process.
///
/// Initializes, in order: the Postgres pool (with migrations), the counter
/// cache client, the visit-event queue client, the services, the visit batch
/// worker and the counter sync worker, then serves until SIGINT/SIGTERM.
/// On shutdown the workers get a stop signal, finish their in-flight work,
/// flush, and are waited on within a bounded timeout.
///
/// # Errors
///
/// Returns an error when a connection cannot be established after its retry
/// budget, or when binding/serving fails.
pub async fn run(config: Config) -> Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;
    info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run database migrations")?;

    let cache = Arc::new(
        RedisCache::connect(config.cache_config())
            .await
            .context("failed to connect to counter cache")?,
    );
    let queue = Arc::new(
        RedisStreamQueue::connect(config.queue_config())
            .await
            .context("failed to connect to visit queue")?,
    );

    let pool_arc = Arc::new(pool.clone());
    let short_urls = Arc::new(PgShortUrlRepository::new(pool_arc.clone()));
    let visit_rows = Arc::new(PgVisitRepository::new(pool_arc));

    let urls = Arc::new(UrlService::new(
        short_urls.clone(),
        cache.clone(),
        generator_from_name(&config.code_generator),
        config.code_length,
        config.code_max_attempts,
        config.cache_ttl_seconds,
    ));
    let visits = Arc::new(VisitService::new(cache.clone(), queue.clone()));

    let (stop_tx, stop_rx) = watch::channel(false);

    let visit_worker = VisitWorker::new(
        queue.clone(),
        urls.clone(),
        visit_rows,
        config.batch_config(),
    );
    let visit_handle = tokio::spawn(visit_worker.run(stop_rx.clone()));

    let sync_worker = CounterSyncWorker::new(
        cache.clone(),
        urls.clone(),
        short_urls,
        config.sync_config(),
    );
    let sync_handle = tokio::spawn(sync_worker.run(stop_rx));
    info!("Background workers started");

    let state = AppState::new(
        pool,
        urls,
        visits,
        cache,
        queue,
        config.base_url.clone(),
        config.behind_proxy,
    );

    let app = app_router(state, &config);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Shutting down, stopping background workers");
    let _ = stop_tx.send(true);
    join_workers(vec![
        ("visit worker", visit_handle),
        ("counter sync worker", sync_handle),
    ])
    .await;

    Ok(())
}

/// Waits for worker tasks, bounded by [`WORKER_SHUTDOWN_TIMEOUT`].
pub async fn join_workers(handles: Vec<(&str, JoinHandle<()>)>) {
    for (name, handle) in handles {
        match tokio::time::timeout(WORKER_SHUTDOWN_TIMEOUT, handle).await {
            Ok(_) => info!("{name} stopped"),
            Err(_) => warn!("{name} did not stop within {WORKER_SHUTDOWN_TIMEOUT:?}, detaching"),
        }
    }
}

/// Completes on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
