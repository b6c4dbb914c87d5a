//! Durable CRUD and status-transition enforcement for conversion jobs.

use chrono::{Duration as ChronoDuration, Utc};
use sqlx::PgPool;
use tracing::instrument;

use crate::error::{DataError, Result};
use crate::model::{Job, JobId, JobStatus, NewJob, JOB_TTL_SECS};

/// Filter used by [`JobStore::scan`] to select candidate jobs for recovery.
#[derive(Debug, Clone)]
pub struct ScanFilter {
    /// Only return jobs in this status.
    pub status: JobStatus,
    /// Only return jobs whose `updated_at` is older than this timestamp.
    pub updated_before: chrono::DateTime<Utc>,
}

/// Database-backed repository for conversion jobs.
#[derive(Clone)]
pub struct JobStore {
    pool: PgPool,
}

impl JobStore {
    /// Initialise the job store, applying pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if migrations fail or the database is unreachable.
    pub async fn new(pool: PgPool) -> Result<Self> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|source| DataError::MigrationFailed { source })?;
        Ok(Self { pool })
    }

    /// Access the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create a new job in the `created` state with a 24-hour TTL.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    #[instrument(skip(self, new_job))]
    pub async fn create_job(&self, new_job: NewJob) -> Result<Job> {
        let job_id = JobId::generate();
        let now = Utc::now();
        let ttl = now + ChronoDuration::seconds(JOB_TTL_SECS);
        let input_size = i64::try_from(new_job.input_ref.size).unwrap_or(i64::MAX);

        let job = sqlx::query_as::<_, Job>(
            r"
            INSERT INTO audiocore_jobs (
                job_id, status, input_bucket, input_key, input_size,
                output_bucket, output_key, output_size,
                format, quality, error, created_at, updated_at, ttl
            )
            VALUES ($1, 'created', $2, $3, $4, NULL, NULL, NULL, $5, $6, NULL, $7, $7, $8)
            RETURNING *
            ",
        )
        .bind(job_id.as_str())
        .bind(&new_job.input_ref.bucket)
        .bind(&new_job.input_ref.key)
        .bind(input_size)
        .bind(&new_job.format)
        .bind(&new_job.quality)
        .bind(now)
        .bind(ttl)
        .fetch_one(&self.pool)
        .await
        .map_err(|source| DataError::QueryFailed {
            operation: "create_job",
            source,
        })?;

        Ok(job)
    }

    /// Fetch a job by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails for a reason other than the row
    /// being absent.
    #[instrument(skip(self))]
    pub async fn get_job(&self, job_id: &JobId) -> Result<Option<Job>> {
        let job = sqlx::query_as::<_, Job>("SELECT * FROM audiocore_jobs WHERE job_id = $1")
            .bind(job_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|source| DataError::QueryFailed {
                operation: "get_job",
                source,
            })?;
        Ok(job)
    }

    /// Transition a job to a new status, validating the move server-side.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::JobNotFound`] if the job does not exist,
    /// [`DataError::InvalidTransition`] if the move is illegal, or a query
    /// error if the update fails.
    #[instrument(skip(self, output_ref, error))]
    pub async fn update_status(
        &self,
        job_id: &JobId,
        next: JobStatus,
        output_ref: Option<crate::model::BlobRef>,
        error: Option<String>,
    ) -> Result<Job> {
        let current = self.get_job(job_id).await?.ok_or_else(|| DataError::JobNotFound {
            job_id: job_id.as_str().to_string(),
        })?;

        let current_status = current.status();
        if !current_status.can_transition_to(next) {
            return Err(DataError::InvalidTransition {
                job_id: job_id.as_str().to_string(),
                from: current_status,
                to: next,
            });
        }

        let now = Utc::now();
        let (output_bucket, output_key, output_size) = match output_ref {
            Some(blob) => (Some(blob.bucket), Some(blob.key), Some(i64::try_from(blob.size).unwrap_or(i64::MAX))),
            None => (None, None, None),
        };

        let job = sqlx::query_as::<_, Job>(
            r"
            UPDATE audiocore_jobs
            SET status = $2,
                output_bucket = COALESCE($3, output_bucket),
                output_key = COALESCE($4, output_key),
                output_size = COALESCE($5, output_size),
                error = COALESCE($6, error),
                updated_at = $7
            WHERE job_id = $1
            RETURNING *
            ",
        )
        .bind(job_id.as_str())
        .bind(next.as_db_str())
        .bind(output_bucket)
        .bind(output_key)
        .bind(output_size)
        .bind(error)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|source| DataError::QueryFailed {
            operation: "update_status",
            source,
        })?;

        Ok(job)
    }

    /// Scan for jobs matching a recovery filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    #[instrument(skip(self))]
    pub async fn scan(&self, filter: &ScanFilter, limit: i64) -> Result<Vec<Job>> {
        let jobs = sqlx::query_as::<_, Job>(
            "SELECT * FROM audiocore_jobs WHERE status = $1 AND updated_at < $2 ORDER BY updated_at ASC LIMIT $3",
        )
        .bind(filter.status.as_db_str())
        .bind(filter.updated_before)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|source| DataError::QueryFailed {
            operation: "scan",
            source,
        })?;
        Ok(jobs)
    }

    /// Delete all jobs whose TTL has elapsed.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    #[instrument(skip(self))]
    pub async fn reap_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM audiocore_jobs WHERE ttl < now()")
            .execute(&self.pool)
            .await
            .map_err(|source| DataError::QueryFailed {
                operation: "reap_expired",
                source,
            })?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_filter_is_constructible() {
        let filter = ScanFilter {
            status: JobStatus::Processing,
            updated_before: Utc::now(),
        };
        assert_eq!(filter.status, JobStatus::Processing);
    }
}
