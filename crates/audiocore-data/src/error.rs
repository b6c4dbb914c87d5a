//! Error types for the job store and progress fallback persistence.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

use crate::model::JobStatus;

/// Result alias for data layer operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors raised by the data access layer.
#[derive(Debug)]
pub enum DataError {
    /// Migration execution failed.
    MigrationFailed {
        /// Underlying migration error.
        source: sqlx::migrate::MigrateError,
    },
    /// A database operation failed.
    QueryFailed {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying SQL error.
        source: sqlx::Error,
    },
    /// The requested job does not exist.
    JobNotFound {
        /// The job id that was looked up.
        job_id: String,
    },
    /// An attempted status transition is not permitted by the state machine.
    InvalidTransition {
        /// The job id the transition was attempted on.
        job_id: String,
        /// Status the job was in.
        from: JobStatus,
        /// Status the caller attempted to move to.
        to: JobStatus,
    },
}

impl Display for DataError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::MigrationFailed { .. } => formatter.write_str("migration failed"),
            Self::QueryFailed { operation, .. } => write!(formatter, "database operation '{operation}' failed"),
            Self::JobNotFound { job_id } => write!(formatter, "job '{job_id}' was not found"),
            Self::InvalidTransition { job_id, from, to } => {
                write!(formatter, "job '{job_id}' cannot transition from {from} to {to}")
            }
        }
    }
}

impl Error for DataError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::MigrationFailed { source } => Some(source),
            Self::QueryFailed { source, .. } => Some(source),
            Self::JobNotFound { .. } | Self::InvalidTransition { .. } => None,
        }
    }
}

impl From<sqlx::Error> for DataError {
    fn from(source: sqlx::Error) -> Self {
        Self::QueryFailed {
            operation: "sqlx operation",
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_name_the_job() {
        let not_found = DataError::JobNotFound {
            job_id: "123-abc".to_string(),
        };
        assert!(not_found.to_string().contains("123-abc"));
        assert!(not_found.source().is_none());

        let invalid = DataError::InvalidTransition {
            job_id: "123-abc".to_string(),
            from: JobStatus::Completed,
            to: JobStatus::Processing,
        };
        assert!(invalid.to_string().contains("completed"));
        assert!(invalid.to_string().contains("processing"));
    }
}
