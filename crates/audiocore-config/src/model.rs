//! Typed configuration model.
//!
//! # Design
//! - Pure data carrier; IO and parsing live in `loader`.

/// Fully resolved application configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// TCP address the HTTP server binds to.
    pub http_bind_addr: String,
    /// Postgres connection string backing the Job Store and progress fallback.
    pub database_url: String,
    /// Default object storage bucket used when a request omits one.
    pub storage_bucket: String,
    /// Optional custom S3-compatible endpoint (e.g. MinIO).
    pub storage_endpoint: Option<String>,
    /// Region passed to the storage SDK.
    pub storage_region: String,
    /// Redis connection URL for the progress channel's primary cache.
    pub progress_primary_url: String,
    /// Name of the durable job table.
    pub job_table_name: String,
    /// Path to (or bare name of) the external transcoder executable.
    pub transcoder_path: String,
    /// Timeout for the transcoder `--version` readiness probe.
    pub transcoder_ready_timeout_ms: u64,
    /// Interval between periodic stuck-job sweeps.
    pub cleanup_sweep_interval_secs: u64,
    /// Whether to use real cloud-backed collaborators versus local doubles.
    pub use_real_cloud: bool,
}

impl AppConfig {
    /// Default bucket name used when `STORAGE_BUCKET` is unset.
    pub const DEFAULT_STORAGE_BUCKET: &'static str = "audio-conversion-bucket";
    /// Default job table name used when `JOB_TABLE_NAME` is unset.
    pub const DEFAULT_JOB_TABLE_NAME: &'static str = "audio-conversion-jobs";
    /// Default transcoder executable name when `TRANSCODER_PATH` is unset.
    pub const DEFAULT_TRANSCODER_PATH: &'static str = "ffmpeg";
    /// Default HTTP bind address.
    pub const DEFAULT_HTTP_BIND_ADDR: &'static str = "0.0.0.0:8080";
    /// Default readiness-probe timeout, in milliseconds.
    pub const DEFAULT_TRANSCODER_READY_TIMEOUT_MS: u64 = 5_000;
    /// Default periodic cleanup sweep interval, in seconds.
    pub const DEFAULT_CLEANUP_SWEEP_INTERVAL_SECS: u64 = 300;
    /// Default storage region.
    pub const DEFAULT_STORAGE_REGION: &'static str = "us-east-1";
}
