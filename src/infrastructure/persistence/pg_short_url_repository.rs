//! PostgreSQL implementation of the short URL repository.

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::entities::{NewShortUrl, ShortUrl};
use crate::domain::repositories::ShortUrlRepository;
use crate::error::AppError;

/// PostgreSQL repository for short URL rows.
///
/// Each operation runs in its own short-lived pool session; nothing here
/// holds a connection across calls. Soft-deleted rows are filtered out of
/// every lookup.
pub struct PgShortUrlRepository {
    pool: Arc<PgPool>,
}

impl PgShortUrlRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ShortUrlRepository for PgShortUrlRepository {
    async fn create(&self, new_url: NewShortUrl) -> Result<ShortUrl, AppError> {
        let row = sqlx::query_as::<_, ShortUrl>(
            r#"
            INSERT INTO short_urls (uuid, original_url, short_code)
            VALUES ($1, $2, $3)
            RETURNING id, uuid, original_url, short_code, visit_count,
                      is_active, created_at, updated_at, deleted_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(&new_url.original_url)
        .bind(&new_url.short_code)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(row)
    }

    async fn find_by_code(&self, short_code: &str) -> Result<Option<ShortUrl>, AppError> {
        let row = sqlx::query_as::<_, ShortUrl>(
            r#"
            SELECT id, uuid, original_url, short_code, visit_count,
                   is_active, created_at, updated_at, deleted_at
            FROM short_urls
            WHERE short_code = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(short_code)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row)
    }

    async fn find_by_original_url(
        &self,
        original_url: &str,
    ) -> Result<Option<ShortUrl>, AppError> {
        let row = sqlx::query_as::<_, ShortUrl>(
            r#"
            SELECT id, uuid, original_url, short_code, visit_count,
                   is_active, created_at, updated_at, deleted_at
            FROM short_urls
            WHERE original_url = $1 AND deleted_at IS NULL
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(original_url)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row)
    }

    async fn increment_visit_count(&self, id: i64, delta: i64) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE short_urls
            SET visit_count = visit_count + $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(delta)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn soft_delete(&self, short_code: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE short_urls
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE short_code = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(short_code)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn restore(&self, short_code: &str) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE short_urls
            SET deleted_at = NULL, updated_at = NOW()
            WHERE short_code = $1 AND deleted_at IS NOT NULL
            "#,
        )
        .bind(short_code)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
