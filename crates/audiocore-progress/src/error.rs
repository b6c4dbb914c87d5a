//! Error types for the progress channel.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

use audiocore_data::DataError;

/// Result alias for progress channel operations.
pub type Result<T> = std::result::Result<T, ProgressError>;

/// Errors raised by the progress channel.
#[derive(Debug)]
pub enum ProgressError {
    /// The primary (Redis) cache failed.
    Primary {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying Redis error.
        source: redis::RedisError,
    },
    /// The durable fallback store failed.
    Fallback {
        /// Underlying data-layer error.
        source: DataError,
    },
    /// A stored record could not be decoded as JSON.
    Corrupt {
        /// Job the corrupt record belongs to.
        job_id: String,
    },
}

impl Display for ProgressError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary { operation, .. } => write!(formatter, "primary progress cache operation '{operation}' failed"),
            Self::Fallback { .. } => formatter.write_str("fallback progress store failed"),
            Self::Corrupt { job_id } => write!(formatter, "progress record for job '{job_id}' was corrupt"),
        }
    }
}

impl Error for ProgressError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Primary { source, .. } => Some(source),
            Self::Fallback { source } => Some(source),
            Self::Corrupt { .. } => None,
        }
    }
}

impl From<DataError> for ProgressError {
    fn from(source: DataError) -> Self {
        Self::Fallback { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupt_display_names_the_job() {
        let err = ProgressError::Corrupt {
            job_id: "42-beef".to_string(),
        };
        assert!(err.to_string().contains("42-beef"));
        assert!(err.source().is_none());
    }
}
