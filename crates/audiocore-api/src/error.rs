//! The service's HTTP error taxonomy and its wire representation.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use audiocore_data::DataError;
use audiocore_media::MediaError;
use audiocore_pipeline::PipelineError;
use audiocore_storage::StorageError;

/// The service's error kinds, each mapped to a fixed HTTP status per the
/// error handling design.
#[derive(Debug)]
pub enum AppError {
    /// Malformed or semantically invalid request input.
    Validation(String),
    /// A referenced resource (input object, job, output object) is absent.
    NotFound(String),
    /// The storage backend refused the operation.
    Permission(String),
    /// A rate limit or quota was exceeded.
    Throttled(String),
    /// A gateway or pipeline operation timed out.
    Timeout(String),
    /// The job has reached a terminal failed state.
    Gone(String),
    /// Anything else.
    Internal(String),
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Permission(_) => StatusCode::FORBIDDEN,
            Self::Throttled(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            Self::Gone(_) => StatusCode::GONE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::Validation(message)
            | Self::NotFound(message)
            | Self::Permission(message)
            | Self::Throttled(message)
            | Self::Timeout(message)
            | Self::Gone(message)
            | Self::Internal(message) => message,
        }
    }

    /// Build an [`AppError::Internal`] variant from a message.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Build an [`AppError::Validation`] variant from a message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Build an [`AppError::NotFound`] variant from a message.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Classify a bare `anyhow` error by matching known substrings against
    /// its message, for the boundaries that have not been fully typed. The
    /// typed `From` impls below are preferred wherever the origin crate's
    /// error type is known.
    #[must_use]
    pub fn from_anyhow_message(err: &anyhow::Error) -> Self {
        classify_message(&err.to_string())
    }
}

fn classify_message(message: &str) -> AppError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("not found") || lower.contains("missing") {
        AppError::NotFound(message.to_string())
    } else if lower.contains("invalid") || lower.contains("unsupported") {
        AppError::Validation(message.to_string())
    } else if lower.contains("quota") || lower.contains("limit") || lower.contains("throttl") {
        AppError::Throttled(message.to_string())
    } else if lower.contains("timeout") {
        AppError::Timeout(message.to_string())
    } else if lower.contains("permission") || lower.contains("access denied") {
        AppError::Permission(message.to_string())
    } else {
        AppError::Internal(message.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(source: StorageError) -> Self {
        match source {
            StorageError::NotFound { .. } => Self::NotFound(source.to_string()),
            StorageError::RetriesExhausted { .. } => Self::Timeout(source.to_string()),
            StorageError::Upload { .. } | StorageError::Download { .. } | StorageError::Presign { .. } | StorageError::List { .. } | StorageError::MultipartAbortFailed { .. } => {
                Self::Internal(source.to_string())
            }
        }
    }
}

impl From<DataError> for AppError {
    fn from(source: DataError) -> Self {
        match source {
            DataError::JobNotFound { .. } => Self::NotFound(source.to_string()),
            DataError::InvalidTransition { .. } => Self::Validation(source.to_string()),
            DataError::MigrationFailed { .. } | DataError::QueryFailed { .. } => Self::Internal(source.to_string()),
        }
    }
}

impl From<MediaError> for AppError {
    fn from(source: MediaError) -> Self {
        match source {
            MediaError::NotTracked { .. } => Self::NotFound(source.to_string()),
            MediaError::ToolNotReady { .. } => Self::Timeout(source.to_string()),
            MediaError::SpawnFailed { .. } | MediaError::AbnormalExit { .. } | MediaError::Io { .. } => Self::Internal(source.to_string()),
        }
    }
}

impl From<PipelineError> for AppError {
    fn from(source: PipelineError) -> Self {
        match source {
            PipelineError::Storage(inner) => inner.into(),
            PipelineError::Media(inner) => inner.into(),
            PipelineError::Data(inner) => inner.into(),
            PipelineError::TimedOut { .. } => Self::Timeout(source.to_string()),
            PipelineError::Io { .. } | PipelineError::Transcode { .. } => Self::Internal(source.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.message().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_bad_request() {
        let err = AppError::validation("Unsupported format: xyz");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn gone_maps_to_410() {
        let err = AppError::Gone("transcode failed".to_string());
        assert_eq!(err.status(), StatusCode::GONE);
    }

    #[test]
    fn anyhow_fallback_classifies_by_substring() {
        assert!(matches!(
            AppError::from_anyhow_message(&anyhow::anyhow!("Input file not found")),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            AppError::from_anyhow_message(&anyhow::anyhow!("quota exceeded")),
            AppError::Throttled(_)
        ));
        assert!(matches!(
            AppError::from_anyhow_message(&anyhow::anyhow!("request timeout")),
            AppError::Timeout(_)
        ));
        assert!(matches!(
            AppError::from_anyhow_message(&anyhow::anyhow!("permission denied")),
            AppError::Permission(_)
        ));
        assert!(matches!(
            AppError::from_anyhow_message(&anyhow::anyhow!("something broke")),
            AppError::Internal(_)
        ));
    }

    #[test]
    fn storage_not_found_maps_to_app_not_found() {
        let err: AppError = StorageError::NotFound { key: "uploads/abc.wav".to_string() }.into();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
