//! Repository trait for persisted visit records.

use crate::domain::entities::NewVisit;
use crate::error::AppError;
use async_trait::async_trait;

/// Repository interface for visit rows.
///
/// The only write path is the bulk insert used by the visit batch worker;
/// visit rows are immutable once persisted.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VisitRepository: Send + Sync {
    /// Inserts a batch of visit rows in a single transaction.
    ///
    /// Either every row in the batch is persisted or none is; the caller
    /// requeues the batch on failure. Returns the number of inserted rows.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] when the transaction fails.
    async fn insert_batch(&self, visits: Vec<NewVisit>) -> Result<u64, AppError>;
}
