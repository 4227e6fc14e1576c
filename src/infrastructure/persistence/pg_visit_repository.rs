//! PostgreSQL implementation of the visit repository.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::entities::NewVisit;
use crate::domain::repositories::VisitRepository;
use crate::error::AppError;

/// PostgreSQL repository for visit rows.
pub struct PgVisitRepository {
    pool: Arc<PgPool>,
}

impl PgVisitRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VisitRepository for PgVisitRepository {
    async fn insert_batch(&self, visits: Vec<NewVisit>) -> Result<u64, AppError> {
        if visits.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO visits (uuid, url_id, ip_address, visited_at) ");
        builder.push_values(visits.iter(), |mut row, visit| {
            row.push_bind(Uuid::now_v7())
                .push_bind(visit.url_id)
                .push_bind(visit.ip_address.as_deref())
                .push_bind(visit.visited_at);
        });

        let result = builder.build().execute(&mut *tx).await?;
        tx.commit().await?;

        Ok(result.rows_affected())
    }
}
