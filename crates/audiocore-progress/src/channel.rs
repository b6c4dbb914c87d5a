//! The composed, two-tier progress channel used by the conversion pipeline.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use audiocore_data::{JobId, ProgressFallbackStore, ProgressRecord};
use tracing::warn;

use crate::cache::RedisProgressCache;
use crate::error::Result;

/// Publishes and reads per-job progress through a fast primary cache with a
/// durable fallback mirror.
///
/// Reads try the primary cache first and fall back to the durable mirror on
/// a miss or a primary-cache error. Writes attempt the primary cache first;
/// if that fails, the write goes to the fallback store synchronously and the
/// primary failure is logged, never surfaced to the caller — a progress
/// write can never fail the pipeline that produced it.
#[derive(Clone)]
pub struct ProgressChannel {
    primary: RedisProgressCache,
    fallback: ProgressFallbackStore,
    last_published: Arc<Mutex<HashMap<String, i8>>>,
}

impl ProgressChannel {
    /// Compose a channel from its two storage tiers.
    #[must_use]
    pub fn new(primary: RedisProgressCache, fallback: ProgressFallbackStore) -> Self {
        Self {
            primary,
            fallback,
            last_published: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Initialise a job's progress record to `{progress:0, stage:"queued"}`.
    ///
    /// Failures are logged and swallowed per the Orchestrator's creation
    /// step, which treats progress initialisation as best-effort.
    pub async fn init(&self, job_id: &JobId) {
        let record = ProgressRecord::queued(job_id);
        if let Err(err) = self.set(&record).await {
            warn!(job_id = %job_id, error = %err, "failed to initialise progress record");
        }
    }

    /// Write a progress record, debouncing repeats of the same value.
    ///
    /// # Errors
    ///
    /// This only returns an error if both the primary and fallback writes
    /// fail; a primary-only failure is absorbed internally.
    pub async fn set(&self, record: &ProgressRecord) -> Result<()> {
        if self.is_duplicate(record) {
            return Ok(());
        }

        if let Err(err) = self.primary.set(record).await {
            warn!(job_id = %record.job_id, error = %err, "primary progress write failed, using fallback");
            self.fallback.set(record).await?;
        }

        self.remember(record);
        Ok(())
    }

    /// Read a job's progress record, primary first, durable fallback on miss or error.
    ///
    /// # Errors
    ///
    /// Returns an error only if the fallback lookup itself fails after a
    /// primary miss or error.
    pub async fn get(&self, job_id: &JobId) -> Result<Option<ProgressRecord>> {
        match self.primary.get(job_id).await {
            Ok(Some(record)) => Ok(Some(record)),
            Ok(None) => Ok(self.fallback.get(job_id).await?),
            Err(err) => {
                warn!(job_id = %job_id, error = %err, "primary progress read failed, using fallback");
                Ok(self.fallback.get(job_id).await?)
            }
        }
    }

    /// Publish the sole terminal-success marker external observers must rely on.
    ///
    /// # Errors
    ///
    /// See [`ProgressChannel::set`].
    pub async fn mark_complete(&self, job_id: &JobId) -> Result<()> {
        self.set(&ProgressRecord::completed(job_id)).await
    }

    /// Publish the terminal-failure marker.
    ///
    /// # Errors
    ///
    /// See [`ProgressChannel::set`].
    pub async fn mark_failed(&self, job_id: &JobId, error: impl Into<String>) -> Result<()> {
        self.set(&ProgressRecord::failed(job_id, error)).await
    }

    fn is_duplicate(&self, record: &ProgressRecord) -> bool {
        let last_published = self.last_published.lock().expect("last_published mutex poisoned");
        last_published.get(&record.job_id) == Some(&record.progress) && record.progress != -1
    }

    fn remember(&self, record: &ProgressRecord) {
        let mut last_published = self.last_published.lock().expect("last_published mutex poisoned");
        last_published.insert(record.job_id.clone(), record.progress);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_detection_ignores_repeated_failure_sentinel() {
        let last_published = Arc::new(Mutex::new(HashMap::from([("job-1".to_string(), -1i8)])));
        let record = ProgressRecord {
            job_id: "job-1".to_string(),
            progress: -1,
            stage: "failed".to_string(),
            current_time: None,
            total_duration: None,
            estimated_remaining_sec: None,
            updated_at: 0,
            error: Some("boom".to_string()),
        };
        let is_dup = last_published.lock().unwrap().get(&record.job_id) == Some(&record.progress) && record.progress != -1;
        assert!(!is_dup, "the -1 sentinel must never be treated as a debounced duplicate");
    }
}
