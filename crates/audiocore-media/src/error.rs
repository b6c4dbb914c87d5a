//! Error types for the transcoder process supervisor.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

/// Result alias for media subprocess operations.
pub type Result<T> = std::result::Result<T, MediaError>;

/// Errors raised by the process supervisor.
#[derive(Debug)]
pub enum MediaError {
    /// The transcoder process could not be spawned.
    SpawnFailed {
        /// Path or command name that was invoked.
        tool: String,
        /// Underlying OS error.
        source: std::io::Error,
    },
    /// The transcoder exited with a non-zero code or was killed by a signal.
    AbnormalExit {
        /// Job the process belonged to.
        job_id: String,
        /// Numeric exit code, if the process exited normally.
        code: Option<i32>,
    },
    /// The readiness probe (`tool --version`) failed or timed out.
    ToolNotReady {
        /// Path or command name that was probed.
        tool: String,
    },
    /// An I/O error occurred while reading or writing process stdio.
    Io {
        /// Operation being performed.
        operation: &'static str,
        /// Underlying OS error.
        source: std::io::Error,
    },
    /// No process is currently tracked for the given job.
    NotTracked {
        /// Job id that was looked up.
        job_id: String,
    },
}

impl Display for MediaError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::SpawnFailed { tool, .. } => write!(formatter, "failed to spawn transcoder '{tool}'"),
            Self::AbnormalExit { job_id, code } => {
                write!(formatter, "transcoder for job '{job_id}' exited abnormally (code={code:?})")
            }
            Self::ToolNotReady { tool } => write!(formatter, "transcoder '{tool}' failed its readiness probe"),
            Self::Io { operation, .. } => write!(formatter, "I/O error during '{operation}'"),
            Self::NotTracked { job_id } => write!(formatter, "no tracked process for job '{job_id}'"),
        }
    }
}

impl Error for MediaError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::SpawnFailed { source, .. } | Self::Io { source, .. } => Some(source),
            Self::AbnormalExit { .. } | Self::ToolNotReady { .. } | Self::NotTracked { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abnormal_exit_mentions_job_and_code() {
        let err = MediaError::AbnormalExit {
            job_id: "1-ab".to_string(),
            code: Some(1),
        };
        assert!(err.to_string().contains("1-ab"));
        assert!(err.source().is_none());
    }
}
