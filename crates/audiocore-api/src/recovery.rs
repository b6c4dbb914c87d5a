//! Cleanup and recovery: startup orphan reaping, periodic stuck-job sweeps,
//! and the manual `/cleanup` endpoint, all funnelled through one service so
//! the failure-marking logic is written once.

use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use audiocore_data::{Job, JobId, JobStatus, JobStore, ScanFilter};
use audiocore_media::Supervisor;
use audiocore_progress::ProgressChannel;
use audiocore_telemetry::Metrics;

use crate::error::AppError;

/// Jobs stuck `PROCESSING` longer than this are always reaped, regardless of
/// their size-derived pipeline timeout.
pub const MIN_ORPHAN_AGE: Duration = Duration::from_secs(15 * 60);

/// A job that hasn't moved in this long while `PROCESSING` is considered stuck.
pub const STUCK_JOB_AGE: Duration = Duration::from_secs(5 * 60);

const SCAN_LIMIT: i64 = 500;

/// Shared cleanup/recovery logic, used by the manual endpoint and by the
/// application crate's background sweeps.
#[derive(Clone)]
pub struct RecoveryService {
    job_store: JobStore,
    progress: ProgressChannel,
    supervisor: Supervisor,
    metrics: Metrics,
}

impl RecoveryService {
    /// Compose the service from its collaborators.
    #[must_use]
    pub const fn new(job_store: JobStore, progress: ProgressChannel, supervisor: Supervisor, metrics: Metrics) -> Self {
        Self {
            job_store,
            progress,
            supervisor,
            metrics,
        }
    }

    /// Fail every `PROCESSING` job whose `updated_at` is older than
    /// `max(per-job size-derived timeout, 15 minutes)`. Run once at startup.
    ///
    /// Since the per-job timeout is not retained on the row, the conservative
    /// floor of 15 minutes is applied uniformly; any job whose own pipeline
    /// timeout would have fired later than that has already had its own
    /// timeout path run and is no longer `PROCESSING`.
    pub async fn recover_orphaned_on_startup(&self) -> usize {
        self.fail_stale_processing_jobs(MIN_ORPHAN_AGE, "orphaned on restart", "startup").await
    }

    /// Scan for jobs that have made no progress-channel updates in over
    /// [`STUCK_JOB_AGE`] while `PROCESSING`. Run periodically.
    ///
    /// Unlike [`Self::recover_orphaned_on_startup`], this cannot key off the
    /// job row's `updated_at` — that column is only touched at the
    /// `Processing` and terminal transitions, so a conversion in the middle
    /// of a long streaming run would look exactly as stale as one that
    /// actually hung. Staleness is instead measured from the Progress
    /// Channel's own `updated_at`, which the pipeline refreshes throughout
    /// streaming.
    pub async fn sweep_stuck_jobs(&self) -> usize {
        const TRIGGER: &str = "periodic";
        let reason = "no progress reported, presumed stuck";

        let filter = ScanFilter {
            status: JobStatus::Processing,
            updated_before: Utc::now(),
        };
        let candidates = match self.job_store.scan(&filter, SCAN_LIMIT).await {
            Ok(jobs) => jobs,
            Err(err) => {
                warn!(error = %err, trigger = TRIGGER, "recovery scan failed");
                return 0;
            }
        };

        let mut reaped = 0usize;
        for job in candidates {
            let job_id = JobId::from_string(job.job_id.clone());
            if !self.is_stuck(&job, &job_id).await {
                continue;
            }
            if let Err(err) = self.fail_job(&job_id, reason).await {
                warn!(job_id = %job_id, error = ?err, trigger = TRIGGER, "failed to reap stale job");
                continue;
            }
            self.metrics.inc_cleanup_reaped(TRIGGER);
            reaped += 1;
        }
        if reaped > 0 {
            info!(reaped, trigger = TRIGGER, "recovery swept stale jobs");
        }
        reaped
    }

    /// Determine whether a `PROCESSING` job has gone longer than
    /// [`STUCK_JOB_AGE`] without a Progress Channel update. Falls back to the
    /// job row's own `updated_at` (the time it entered `Processing`) when no
    /// progress record has ever been published for it.
    async fn is_stuck(&self, job: &Job, job_id: &JobId) -> bool {
        let last_update_millis = match self.progress.get(job_id).await {
            Ok(Some(record)) => record.updated_at,
            Ok(None) => job.updated_at.timestamp_millis(),
            Err(err) => {
                warn!(job_id = %job_id, error = %err, "progress read failed during stuck-job sweep, skipping");
                return false;
            }
        };
        let age_millis = Utc::now().timestamp_millis() - last_update_millis;
        age_millis > i64::try_from(STUCK_JOB_AGE.as_millis()).unwrap_or(i64::MAX)
    }

    async fn fail_stale_processing_jobs(&self, max_age: Duration, reason: &str, trigger: &'static str) -> usize {
        let updated_before = Utc::now() - chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::zero());
        let filter = ScanFilter {
            status: JobStatus::Processing,
            updated_before,
        };

        let candidates = match self.job_store.scan(&filter, SCAN_LIMIT).await {
            Ok(jobs) => jobs,
            Err(err) => {
                warn!(error = %err, trigger, "recovery scan failed");
                return 0;
            }
        };

        let mut reaped = 0usize;
        for job in candidates {
            let job_id = JobId::from_string(job.job_id.clone());
            if let Err(err) = self.fail_job(&job_id, reason).await {
                warn!(job_id = %job_id, error = ?err, trigger, "failed to reap stale job");
                continue;
            }
            self.metrics.inc_cleanup_reaped(trigger);
            reaped += 1;
        }
        if reaped > 0 {
            info!(reaped, trigger, "recovery swept stale jobs");
        }
        reaped
    }

    /// Manually clean up a job: terminate any supervised subprocess and mark
    /// the job and progress record failed with the given reason. Idempotent —
    /// cleaning up a job already in a terminal state succeeds without effect.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the job does not exist.
    pub async fn cleanup_job(&self, job_id: &JobId, reason: &str) -> Result<bool, AppError> {
        let job = self.job_store.get_job(job_id).await?.ok_or_else(|| AppError::not_found(format!("Job '{job_id}' was not found")))?;

        if job.status().is_terminal() {
            return Ok(false);
        }

        self.supervisor.terminate(job_id).await.ok();
        self.fail_job(job_id, reason).await?;
        Ok(true)
    }

    async fn fail_job(&self, job_id: &JobId, reason: &str) -> Result<(), AppError> {
        self.progress.mark_failed(job_id, reason).await.ok();
        self.job_store.update_status(job_id, JobStatus::Failed, None, Some(reason.to_string())).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stuck_job_age_is_shorter_than_the_orphan_floor() {
        assert!(STUCK_JOB_AGE < MIN_ORPHAN_AGE);
    }
}
