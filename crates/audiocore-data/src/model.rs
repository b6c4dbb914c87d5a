//! Data types for the job store: identifiers, status, and the job record.

use std::fmt::{self, Display, Formatter};

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// How long a job record is retained before the reaper deletes it.
pub const JOB_TTL_SECS: i64 = 24 * 60 * 60;

/// Opaque, monotonically-increasing job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(String);

impl JobId {
    /// Generate a new id from the current wall-clock time plus randomness.
    #[must_use]
    pub fn generate() -> Self {
        let millis = Utc::now().timestamp_millis();
        let suffix: u64 = rand::thread_rng().r#gen();
        Self(format!("{millis}-{suffix:016x}"))
    }

    /// Wrap an existing id string, e.g. one read back from storage or a request.
    #[must_use]
    pub fn from_string(value: String) -> Self {
        Self(value)
    }

    /// Borrow the id as a plain string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for JobId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

/// Lifecycle state of a conversion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Job record created, pipeline not yet started.
    Created,
    /// Pipeline is actively running.
    Processing,
    /// Pipeline finished successfully.
    Completed,
    /// Pipeline finished unsuccessfully.
    Failed,
}

impl JobStatus {
    /// The database text representation of this status.
    #[must_use]
    pub const fn as_db_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parse the database text representation back into a status.
    #[must_use]
    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "created" => Some(Self::Created),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// A status is terminal once it is `Completed` or `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Check whether moving from `self` to `next` is a legal transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::Processing)
                | (Self::Created, Self::Failed)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Failed)
        )
    }
}

impl Display for JobStatus {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_db_str())
    }
}

/// A reference to an immutable object in the storage gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobRef {
    /// Bucket the object lives in.
    pub bucket: String,
    /// Object key within the bucket.
    pub key: String,
    /// Size in bytes, stamped after upload if unknown up front.
    pub size: u64,
}

/// A persisted conversion job.
#[derive(Debug, Clone, FromRow)]
pub struct Job {
    /// Primary key.
    #[sqlx(rename = "job_id")]
    pub job_id: String,
    /// Current lifecycle state, stored as text.
    #[sqlx(rename = "status")]
    pub status_raw: String,
    /// Bucket the input object lives in.
    pub input_bucket: String,
    /// Key of the input object.
    pub input_key: String,
    /// Size of the input object in bytes.
    pub input_size: i64,
    /// Bucket the output object will land in, once known.
    pub output_bucket: Option<String>,
    /// Key of the output object, once known.
    pub output_key: Option<String>,
    /// Size of the output object, once known.
    pub output_size: Option<i64>,
    /// Requested output format (file extension).
    pub format: String,
    /// Requested quality string, e.g. `192k`.
    pub quality: String,
    /// Failure message, set only when `status = failed`.
    pub error: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last-modified timestamp; non-decreasing.
    pub updated_at: DateTime<Utc>,
    /// Expiry timestamp; rows past this are reaped.
    pub ttl: DateTime<Utc>,
}

impl Job {
    /// Decode the stored status text into a [`JobStatus`].
    ///
    /// # Panics
    ///
    /// Panics if the stored value is not one of the four recognised
    /// statuses; this can only happen if the database was written to by
    /// something other than this crate.
    #[must_use]
    pub fn status(&self) -> JobStatus {
        JobStatus::from_db_str(&self.status_raw).expect("status column holds an unrecognised value")
    }

    /// Reconstruct the typed input reference.
    #[must_use]
    pub fn input_ref(&self) -> BlobRef {
        BlobRef {
            bucket: self.input_bucket.clone(),
            key: self.input_key.clone(),
            size: u64::try_from(self.input_size).unwrap_or_default(),
        }
    }

    /// Reconstruct the typed output reference, if one has been set.
    #[must_use]
    pub fn output_ref(&self) -> Option<BlobRef> {
        let key = self.output_key.clone()?;
        let bucket = self.output_bucket.clone().unwrap_or_default();
        let size = self.output_size.and_then(|value| u64::try_from(value).ok()).unwrap_or_default();
        Some(BlobRef { bucket, key, size })
    }
}

/// Snapshot of a job's progress, shared between the primary cache and the
/// durable fallback mirror.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// Job this record describes.
    pub job_id: String,
    /// Progress percentage, `-1` on failure, `0..=100` otherwise.
    pub progress: i8,
    /// Human-readable stage label.
    pub stage: String,
    /// Current position in the source, if known.
    pub current_time: Option<String>,
    /// Total duration of the source, if known.
    pub total_duration: Option<String>,
    /// Estimated seconds remaining, if known.
    pub estimated_remaining_sec: Option<i64>,
    /// Epoch milliseconds this record was produced.
    pub updated_at: i64,
    /// Failure message, set only when `progress == -1`.
    pub error: Option<String>,
}

impl ProgressRecord {
    /// Build the initial `queued` record written at job creation.
    #[must_use]
    pub fn queued(job_id: &JobId) -> Self {
        Self {
            job_id: job_id.as_str().to_string(),
            progress: 0,
            stage: "queued".to_string(),
            current_time: None,
            total_duration: None,
            estimated_remaining_sec: None,
            updated_at: Utc::now().timestamp_millis(),
            error: None,
        }
    }

    /// Build the sole terminal-success record external observers must rely on.
    #[must_use]
    pub fn completed(job_id: &JobId) -> Self {
        Self {
            job_id: job_id.as_str().to_string(),
            progress: 100,
            stage: "completed".to_string(),
            current_time: None,
            total_duration: None,
            estimated_remaining_sec: None,
            updated_at: Utc::now().timestamp_millis(),
            error: None,
        }
    }

    /// Build the terminal-failure record.
    #[must_use]
    pub fn failed(job_id: &JobId, error: impl Into<String>) -> Self {
        Self {
            job_id: job_id.as_str().to_string(),
            progress: -1,
            stage: "failed".to_string(),
            current_time: None,
            total_duration: None,
            estimated_remaining_sec: None,
            updated_at: Utc::now().timestamp_millis(),
            error: Some(error.into()),
        }
    }

    /// A record is terminal once it reports `completed` or the `-1` failure sentinel.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.progress == -1 || (self.progress == 100 && self.stage == "completed")
    }
}

/// Parameters used to create a new job.
#[derive(Debug, Clone)]
pub struct NewJob {
    /// Reference to the already-uploaded input object.
    pub input_ref: BlobRef,
    /// Requested output format.
    pub format: String,
    /// Requested quality string.
    pub quality: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_ids_are_unique_and_ordered_by_time() {
        let first = JobId::generate();
        let second = JobId::generate();
        assert_ne!(first, second);
    }

    #[test]
    fn status_transitions_follow_the_state_machine() {
        assert!(JobStatus::Created.can_transition_to(JobStatus::Processing));
        assert!(JobStatus::Created.can_transition_to(JobStatus::Failed));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Failed));

        assert!(!JobStatus::Created.can_transition_to(JobStatus::Completed));
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Processing));
        assert!(!JobStatus::Failed.can_transition_to(JobStatus::Processing));
    }

    #[test]
    fn terminal_statuses_are_completed_and_failed() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Created.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }

    #[test]
    fn db_str_round_trips() {
        for status in [JobStatus::Created, JobStatus::Processing, JobStatus::Completed, JobStatus::Failed] {
            assert_eq!(JobStatus::from_db_str(status.as_db_str()), Some(status));
        }
    }

    #[test]
    fn only_the_completed_stage_at_100_is_terminal_success() {
        let job_id = JobId::from_string("1-abc".to_string());
        let completed = ProgressRecord::completed(&job_id);
        assert!(completed.is_terminal());

        let mut almost = completed.clone();
        almost.stage = "uploading to object store".to_string();
        assert!(!almost.is_terminal());

        let failed = ProgressRecord::failed(&job_id, "boom");
        assert!(failed.is_terminal());
        assert_eq!(failed.progress, -1);
    }
}
