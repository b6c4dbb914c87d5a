//! Error types for the object storage gateway.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

/// Result alias for storage gateway operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// A boxed, type-erased source error from the underlying SDK.
pub type BoxedSource = Box<dyn Error + Send + Sync + 'static>;

/// Errors raised by the object storage gateway.
#[derive(Debug)]
pub enum StorageError {
    /// The requested object does not exist.
    NotFound {
        /// Object key that was requested.
        key: String,
    },
    /// A single-shot or multipart upload failed.
    Upload {
        /// Object key being uploaded.
        key: String,
        /// Underlying SDK error.
        source: BoxedSource,
    },
    /// A download (head or get) failed for a reason other than not-found.
    Download {
        /// Object key being downloaded.
        key: String,
        /// Underlying SDK error.
        source: BoxedSource,
    },
    /// Presigning a URL failed.
    Presign {
        /// Object key the URL would have pointed to.
        key: String,
        /// Underlying SDK error.
        source: BoxedSource,
    },
    /// Listing objects under a prefix failed.
    List {
        /// Prefix that was being listed.
        prefix: String,
        /// Underlying SDK error.
        source: BoxedSource,
    },
    /// A multipart upload could not be aborted after a failure.
    MultipartAbortFailed {
        /// Object key the multipart upload targeted.
        key: String,
        /// Multipart upload identifier.
        upload_id: String,
        /// Underlying SDK error.
        source: BoxedSource,
    },
    /// An operation exhausted its bounded retry budget.
    RetriesExhausted {
        /// Name of the operation that was retried.
        operation: &'static str,
        /// Number of attempts made before giving up.
        attempts: u32,
    },
}

impl Display for StorageError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { key } => write!(formatter, "object '{key}' was not found"),
            Self::Upload { key, .. } => write!(formatter, "failed to upload object '{key}'"),
            Self::Download { key, .. } => write!(formatter, "failed to download object '{key}'"),
            Self::Presign { key, .. } => write!(formatter, "failed to presign object '{key}'"),
            Self::List { prefix, .. } => write!(formatter, "failed to list objects under '{prefix}'"),
            Self::MultipartAbortFailed { key, upload_id, .. } => write!(
                formatter,
                "failed to abort multipart upload {upload_id} for object '{key}'"
            ),
            Self::RetriesExhausted { operation, attempts } => {
                write!(formatter, "{operation} exhausted {attempts} retry attempts")
            }
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Upload { source, .. }
            | Self::Download { source, .. }
            | Self::Presign { source, .. }
            | Self::List { source, .. }
            | Self::MultipartAbortFailed { source, .. } => Some(source.as_ref()),
            Self::NotFound { .. } | Self::RetriesExhausted { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_name_the_key() {
        let not_found = StorageError::NotFound {
            key: "jobs/a/out.wav".to_string(),
        };
        assert!(not_found.to_string().contains("jobs/a/out.wav"));

        let retries = StorageError::RetriesExhausted {
            operation: "put_object",
            attempts: 3,
        };
        assert!(retries.to_string().contains("put_object"));
        assert!(retries.source().is_none());
    }
}
