//! Standalone background worker runner.
//!
//! Runs the visit batch worker and the counter sync worker outside the HTTP
//! process, for deployments that scale request handling and reconciliation
//! independently. Both workers connect through the same resilient clients as
//! the server and honour the same graceful-shutdown contract.
//!
//! # Usage
//!
//! ```bash
//! # run both workers
//! cargo run --bin worker
//!
//! # run only one of them
//! cargo run --bin worker -- --only visits
//! cargo run --bin worker -- --only counters
//! ```
//!
//! # Environment
//!
//! Same variables as the server; see the `config` module docs.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use shortloop::application::services::UrlService;
use shortloop::config;
use shortloop::infrastructure::cache::RedisCache;
use shortloop::infrastructure::persistence::{PgShortUrlRepository, PgVisitRepository};
use shortloop::infrastructure::queue::RedisStreamQueue;
use shortloop::server::{join_workers, shutdown_signal};
use shortloop::utils::code_generator::generator_from_name;
use shortloop::workers::{CounterSyncWorker, VisitWorker};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum WorkerKind {
    /// Visit batch worker only
    Visits,
    /// Counter sync worker only
    Counters,
}

#[derive(Debug, Parser)]
#[command(version, about = "Run shortloop background workers without the HTTP server")]
struct Args {
    /// Restrict to a single worker instead of running both.
    #[arg(long, value_enum)]
    only: Option<WorkerKind>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = config::load_from_env()?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    if config.log_format == "json" {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;

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

    let pool = Arc::new(pool);
    let short_urls = Arc::new(PgShortUrlRepository::new(pool.clone()));
    let visit_rows = Arc::new(PgVisitRepository::new(pool));

    let urls = Arc::new(UrlService::new(
        short_urls.clone(),
        cache.clone(),
        generator_from_name(&config.code_generator),
        config.code_length,
        config.code_max_attempts,
        config.cache_ttl_seconds,
    ));

    let (stop_tx, stop_rx) = watch::channel(false);
    let mut handles = Vec::new();

    if args.only != Some(WorkerKind::Counters) {
        let worker = VisitWorker::new(
            queue.clone(),
            urls.clone(),
            visit_rows,
            config.batch_config(),
        );
        handles.push(("visit worker", tokio::spawn(worker.run(stop_rx.clone()))));
    }

    if args.only != Some(WorkerKind::Visits) {
        let worker = CounterSyncWorker::new(
            cache.clone(),
            urls.clone(),
            short_urls,
            config.sync_config(),
        );
        handles.push(("counter sync worker", tokio::spawn(worker.run(stop_rx))));
    }

    info!("Workers running, waiting for shutdown signal");
    shutdown_signal().await;

    info!("Stop signal received, draining workers");
    let _ = stop_tx.send(true);
    join_workers(handles).await;

    Ok(())
}
