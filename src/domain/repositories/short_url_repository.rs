//! Repository trait for short URL data access.

use crate::domain::entities::{NewShortUrl, ShortUrl};
use crate::error::AppError;
use async_trait::async_trait;

/// Repository interface for short URL rows.
///
/// Soft-deleted rows are invisible to every lookup; only `restore` can bring
/// them back. All operations run in their own short-lived store session.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgShortUrlRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ShortUrlRepository: Send + Sync {
    /// Inserts a new short URL row.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Conflict`] when the short code is already taken
    /// (the allocator treats this as a collision and retries).
    /// Returns [`AppError::Internal`] on other database errors.
    async fn create(&self, new_url: NewShortUrl) -> Result<ShortUrl, AppError>;

    /// Finds a non-deleted row by its short code.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn find_by_code(&self, short_code: &str) -> Result<Option<ShortUrl>, AppError>;

    /// Finds a non-deleted row by its exact original URL.
    ///
    /// Used for idempotent re-shortening of an already-mapped URL.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn find_by_original_url(&self, original_url: &str)
    -> Result<Option<ShortUrl>, AppError>;

    /// Adds a drained counter delta to `visit_count` and touches `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn increment_visit_count(&self, id: i64, delta: i64) -> Result<(), AppError>;

    /// Soft-deletes a row by setting `deleted_at = now()`.
    ///
    /// Returns `Ok(true)` if a non-deleted row was found and marked,
    /// `Ok(false)` otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn soft_delete(&self, short_code: &str) -> Result<bool, AppError>;

    /// Clears `deleted_at` on a soft-deleted row.
    ///
    /// Returns `Ok(true)` if a deleted row was found and restored,
    /// `Ok(false)` otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn restore(&self, short_code: &str) -> Result<bool, AppError>;
}
