//! Request and response bodies for the five HTTP endpoints.

use serde::{Deserialize, Serialize};

/// `POST /convert` request body.
#[derive(Debug, Clone, Deserialize)]
pub struct ConvertRequest {
    /// Identifier of the already-uploaded input object.
    pub file_id: String,
    /// Requested output format, e.g. `mp3`.
    pub format: String,
    /// Requested quality string, e.g. `192k`.
    pub quality: String,
    /// Bucket override; falls back to the configured default bucket.
    pub bucket: Option<String>,
}

/// `POST /convert` success response.
#[derive(Debug, Clone, Serialize)]
pub struct ConvertResponse {
    /// The newly-created job's id.
    pub job_id: String,
    /// Always `"created"` on this response.
    pub status: &'static str,
    /// Human-readable confirmation message.
    pub message: String,
}

/// `GET /progress` query parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct ProgressQuery {
    /// The job to report progress for.
    pub job_id: String,
}

/// `GET /download` query parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct DownloadQuery {
    /// The job whose output should be downloaded.
    pub job_id: String,
    /// When `true`, respond with a presigned URL instead of streaming bytes.
    #[serde(default)]
    pub presigned: bool,
    /// When `true`, the presigned URL omits the attachment disposition.
    #[serde(default)]
    pub preview: bool,
    /// Filename override used in `Content-Disposition`.
    pub filename: Option<String>,
}

/// `GET /download&presigned=true` success response.
#[derive(Debug, Clone, Serialize)]
pub struct PresignedDownloadResponse {
    /// The time-limited URL clients should fetch the artifact from.
    pub presigned_url: String,
    /// Filename the client should save the artifact as.
    pub filename: String,
    /// MIME type of the artifact.
    pub content_type: String,
    /// Size of the artifact in bytes.
    pub size: u64,
}

/// `POST /cleanup` request body.
#[derive(Debug, Clone, Deserialize)]
pub struct CleanupRequest {
    /// The job to clean up.
    pub job_id: String,
    /// Reason recorded on the job's failure message.
    pub reason: Option<String>,
}

/// `POST /cleanup` response.
#[derive(Debug, Clone, Serialize)]
pub struct CleanupResponse {
    /// Always `true`; cleanup is idempotent and never reports failure once
    /// the job is known.
    pub success: bool,
    /// Human-readable description of what happened.
    pub message: String,
}

/// A single entry in the `GET /converted-files` aggregated view.
#[derive(Debug, Clone, Serialize)]
pub struct ConvertedFileEntry {
    /// The job that produced this file.
    pub job_id: String,
    /// Display name derived from the output key.
    pub name: String,
    /// Output format (file extension).
    pub format: String,
    /// Quality string the conversion was requested with.
    pub quality: String,
    /// Size of the output object in bytes.
    pub size: u64,
    /// Completion timestamp, RFC 3339.
    pub timestamp: String,
    /// Storage key of the output object.
    pub output_ref: String,
}

/// `GET /converted-files` response.
#[derive(Debug, Clone, Serialize)]
pub struct ConvertedFilesResponse {
    /// Every completed job's output.
    pub files: Vec<ConvertedFileEntry>,
    /// Number of entries in `files`.
    pub count: usize,
}

/// `GET /health` response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"`; liveness only, no dependency checks.
    pub status: &'static str,
}
