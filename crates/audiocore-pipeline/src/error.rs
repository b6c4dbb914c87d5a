//! Error types for the conversion pipeline.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

use audiocore_data::DataError;
use audiocore_media::MediaError;
use audiocore_storage::StorageError;

/// Result alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors raised while running a conversion pipeline.
#[derive(Debug)]
pub enum PipelineError {
    /// A storage gateway operation failed.
    Storage(StorageError),
    /// A subprocess/media-tool operation failed.
    Media(MediaError),
    /// A job-store or progress-fallback operation failed.
    Data(DataError),
    /// The pipeline exceeded its size-derived timeout.
    TimedOut {
        /// The timeout that was exceeded, in milliseconds.
        after_ms: u64,
    },
    /// An I/O error occurred in the fallback path's temp-file handling.
    Io {
        /// Operation being performed.
        operation: &'static str,
        /// Underlying OS error.
        source: std::io::Error,
    },
    /// The transcoder reported a fatal error keyword on its stderr stream.
    Transcode {
        /// The message surfaced by the progress parser.
        message: String,
    },
}

impl Display for PipelineError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(source) => write!(formatter, "storage error: {source}"),
            Self::Media(source) => write!(formatter, "media error: {source}"),
            Self::Data(source) => write!(formatter, "data error: {source}"),
            Self::TimedOut { after_ms } => write!(formatter, "timed out after {after_ms} ms"),
            Self::Io { operation, .. } => write!(formatter, "I/O error during '{operation}'"),
            Self::Transcode { message } => write!(formatter, "transcoder reported a fatal error: {message}"),
        }
    }
}

impl Error for PipelineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage(source) => Some(source),
            Self::Media(source) => Some(source),
            Self::Data(source) => Some(source),
            Self::Io { source, .. } => Some(source),
            Self::TimedOut { .. } | Self::Transcode { .. } => None,
        }
    }
}

impl From<StorageError> for PipelineError {
    fn from(source: StorageError) -> Self {
        Self::Storage(source)
    }
}

impl From<MediaError> for PipelineError {
    fn from(source: MediaError) -> Self {
        Self::Media(source)
    }
}

impl From<DataError> for PipelineError {
    fn from(source: DataError) -> Self {
        Self::Data(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timed_out_message_includes_the_duration() {
        let err = PipelineError::TimedOut { after_ms: 120_000 };
        assert!(err.to_string().contains("120000"));
        assert!(err.source().is_none());
    }
}
