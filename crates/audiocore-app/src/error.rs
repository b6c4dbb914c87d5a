//! Bootstrap-level errors: everything that can go wrong before the HTTP
//! server starts accepting requests.

use thiserror::Error;

/// Result alias for bootstrap operations.
pub type AppResult<T> = Result<T, AppError>;

/// Errors that can abort application startup.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded from the environment.
    #[error("configuration error")]
    Config(#[from] audiocore_config::ConfigError),
    /// The Postgres connection pool could not be established.
    #[error("database connection failed")]
    Database(#[from] sqlx::Error),
    /// The job store could not apply its migrations.
    #[error("job store initialisation failed")]
    JobStore(#[from] audiocore_data::DataError),
    /// The primary progress cache could not be reached.
    #[error("progress cache connection failed")]
    Progress(#[from] audiocore_progress::ProgressError),
    /// The metrics registry could not be constructed.
    #[error("telemetry initialisation failed")]
    Telemetry(#[source] anyhow::Error),
    /// The tracing subscriber could not be installed.
    #[error("logging initialisation failed")]
    Logging(#[source] anyhow::Error),
    /// The HTTP listener could not be bound or failed while serving.
    #[error("http server failed")]
    Server(#[source] anyhow::Error),
}
