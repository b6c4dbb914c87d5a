//! Durable mirror of progress records, used when the fast cache is unavailable.

use sqlx::PgPool;
use sqlx::types::Json;
use tracing::instrument;

use crate::error::{DataError, Result};
use crate::model::{JobId, ProgressRecord};

/// Database-backed mirror of the [`ProgressRecord`] keyed by job id.
#[derive(Clone)]
pub struct ProgressFallbackStore {
    pool: PgPool,
}

impl ProgressFallbackStore {
    /// Wrap an already-migrated pool. Migrations are driven by [`crate::JobStore`].
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upsert the fallback mirror for a job.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    #[instrument(skip(self, record))]
    pub async fn set(&self, record: &ProgressRecord) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO audiocore_progress_fallback (job_id, payload, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (job_id)
            DO UPDATE SET payload = EXCLUDED.payload, updated_at = EXCLUDED.updated_at
            ",
        )
        .bind(&record.job_id)
        .bind(Json(record))
        .execute(&self.pool)
        .await
        .map_err(|source| DataError::QueryFailed {
            operation: "progress_fallback_set",
            source,
        })?;
        Ok(())
    }

    /// Read the fallback mirror for a job, if one exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    #[instrument(skip(self))]
    pub async fn get(&self, job_id: &JobId) -> Result<Option<ProgressRecord>> {
        let row: Option<(Json<ProgressRecord>,)> = sqlx::query_as("SELECT payload FROM audiocore_progress_fallback WHERE job_id = $1")
            .bind(job_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|source| DataError::QueryFailed {
                operation: "progress_fallback_get",
                source,
            })?;
        Ok(row.map(|(Json(record),)| record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_fallback_store_is_clonable() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<ProgressFallbackStore>();
    }
}
