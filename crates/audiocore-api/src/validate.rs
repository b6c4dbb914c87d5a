//! The orchestrator's validation pipeline, kept as a pure function so its
//! ordering and messages are unit-testable without a router.

use std::sync::LazyLock;

use regex::Regex;

use audiocore_pipeline::is_supported;

use crate::dto::ConvertRequest;
use crate::error::AppError;

static QUALITY_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^\d+k?$").expect("quality pattern compiles"));

/// A validated, normalised conversion request, ready for object lookup.
#[derive(Debug, Clone)]
pub(crate) struct ValidatedConvert {
    /// Non-empty input file id.
    pub file_id: String,
    /// Lower-cased, supported output format.
    pub format: String,
    /// Quality string, validated against the bitrate pattern.
    pub quality: String,
    /// Resolved bucket, from the request or the configured default.
    pub bucket: String,
}

/// Validate a parsed `POST /convert` body, steps 2-5 of the orchestrator's
/// validation pipeline (step 1, JSON parsing, happens at the Axum extractor
/// boundary; steps 6-11 require the storage gateway and job store).
///
/// # Errors
///
/// Returns [`AppError::Validation`] for any failed check, in the order the
/// checks are listed.
pub(crate) fn validate_convert_request(request: &ConvertRequest, default_bucket: &str) -> Result<ValidatedConvert, AppError> {
    if request.file_id.trim().is_empty() {
        return Err(AppError::validation("Missing required field: fileId"));
    }
    if request.format.trim().is_empty() {
        return Err(AppError::validation("Missing required field: format"));
    }
    if request.quality.trim().is_empty() {
        return Err(AppError::validation("Missing required field: quality"));
    }

    let format = request.format.trim().to_ascii_lowercase();
    if !is_supported(&format) {
        return Err(AppError::validation(format!("Unsupported format: {}", request.format)));
    }

    let quality = request.quality.trim().to_string();
    if !QUALITY_PATTERN.is_match(&quality) {
        return Err(AppError::validation(format!("Invalid quality: {quality}")));
    }

    let bucket = request.bucket.clone().filter(|value| !value.trim().is_empty()).unwrap_or_else(|| default_bucket.to_string());

    Ok(ValidatedConvert {
        file_id: request.file_id.trim().to_string(),
        format,
        quality,
        bucket,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(file_id: &str, format: &str, quality: &str) -> ConvertRequest {
        ConvertRequest {
            file_id: file_id.to_string(),
            format: format.to_string(),
            quality: quality.to_string(),
            bucket: None,
        }
    }

    #[test]
    fn missing_file_id_is_rejected_first() {
        let err = validate_convert_request(&request("", "wav", "192k"), "bucket").unwrap_err();
        assert!(matches!(err, AppError::Validation(message) if message.contains("fileId")));
    }

    #[test]
    fn unsupported_format_is_rejected() {
        let err = validate_convert_request(&request("abc", "xyz", "192k"), "bucket").unwrap_err();
        assert!(matches!(err, AppError::Validation(message) if message == "Unsupported format: xyz"));
    }

    #[test]
    fn quality_must_match_the_bitrate_pattern() {
        assert!(validate_convert_request(&request("abc", "wav", "192k"), "bucket").is_ok());
        assert!(validate_convert_request(&request("abc", "wav", "192"), "bucket").is_ok());
        assert!(validate_convert_request(&request("abc", "wav", "192K"), "bucket").is_ok());
        assert!(validate_convert_request(&request("abc", "wav", "high"), "bucket").is_err());
        assert!(validate_convert_request(&request("abc", "wav", "192kbps"), "bucket").is_err());
    }

    #[test]
    fn bucket_falls_back_to_the_configured_default() {
        let validated = validate_convert_request(&request("abc", "wav", "192k"), "default-bucket").unwrap();
        assert_eq!(validated.bucket, "default-bucket");
    }

    #[test]
    fn bucket_override_is_honoured() {
        let mut req = request("abc", "wav", "192k");
        req.bucket = Some("custom-bucket".to_string());
        let validated = validate_convert_request(&req, "default-bucket").unwrap();
        assert_eq!(validated.bucket, "custom-bucket");
    }

    #[test]
    fn format_is_normalised_to_lowercase() {
        let validated = validate_convert_request(&request("abc", "WAV", "192k"), "bucket").unwrap();
        assert_eq!(validated.format, "wav");
    }
}
