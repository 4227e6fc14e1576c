//! Long-lived background reconciliation tasks.
//!
//! Both workers run as independently spawned tokio tasks and communicate
//! with the request path only through the shared cache and the message
//! channel, never through direct calls. Each owns its buffered state
//! exclusively and honours a cooperative stop signal: finish the in-flight
//! operation, flush what is buffered, release connections.

pub mod counter_sync_worker;
pub mod visit_worker;

pub use counter_sync_worker::{CounterSyncWorker, SyncConfig, SyncOutcome};
pub use visit_worker::{BatchConfig, VisitWorker};
