//! `POST /convert` — the Orchestrator.

use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use regex::Regex;
use tracing::warn;

use audiocore_data::{BlobRef, JobId, NewJob};
use audiocore_pipeline::{ConvertOptions, compute_timeout};

use crate::dto::{ConvertRequest, ConvertResponse};
use crate::error::AppError;
use crate::state::ApiState;
use crate::validate::validate_convert_request;

fn input_key_pattern(file_id: &str) -> Regex {
    Regex::new(&format!("^uploads/{}\\.[A-Za-z0-9]+$", regex::escape(file_id))).expect("input key pattern compiles")
}

/// Accept a conversion request: validate it, locate and verify the input
/// object, create the job record, and launch the pipeline asynchronously.
pub(crate) async fn convert(State(state): State<Arc<ApiState>>, body: Result<Json<ConvertRequest>, axum::extract::rejection::JsonRejection>) -> Result<Response, AppError> {
    let started_at = Instant::now();

    let Json(request) = body.map_err(|_| AppError::validation("Invalid JSON in request body"))?;
    let validated = validate_convert_request(&request, &state.config.storage_bucket)?;

    let prefix = format!("uploads/{}", validated.file_id);
    let pattern = input_key_pattern(&validated.file_id);
    let listing = state.storage.list(&prefix).await?;
    let input_object = listing
        .iter()
        .find(|object| pattern.is_match(&object.key))
        .ok_or_else(|| AppError::not_found(format!("Input file not found: {}", validated.file_id)))?
        .clone();

    let meta = state.storage.head(&input_object.key).await?;
    if meta.size_bytes == 0 {
        return Err(AppError::not_found(format!("Input file not found: {}", validated.file_id)));
    }

    let input_ref = BlobRef {
        bucket: validated.bucket.clone(),
        key: input_object.key,
        size: meta.size_bytes,
    };

    let job = state
        .job_store
        .create_job(NewJob {
            input_ref,
            format: validated.format.clone(),
            quality: validated.quality.clone(),
        })
        .await?;

    let job_id = JobId::from_string(job.job_id.clone());
    state.progress.init(&job_id).await;

    let pipeline = state.pipeline.clone();
    let options = ConvertOptions {
        format: validated.format,
        quality: validated.quality,
        timeout: compute_timeout(meta.size_bytes),
    };
    let spawned_job = job.clone();
    tokio::spawn(async move {
        pipeline.run(spawned_job, options).await;
    });

    let body = ConvertResponse {
        job_id: job.job_id.clone(),
        status: "created",
        message: format!("Conversion job {} created", job.job_id),
    };

    let latency_ms = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX);
    let mut response = (StatusCode::ACCEPTED, Json(body)).into_response();
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&job.job_id) {
        headers.insert("x-job-id", value);
    }
    if let Ok(value) = HeaderValue::from_str(&latency_ms.to_string()) {
        headers.insert("x-response-time", value);
    } else {
        warn!("failed to encode X-Response-Time header");
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_key_pattern_matches_only_the_requested_file_id() {
        let pattern = input_key_pattern("abc");
        assert!(pattern.is_match("uploads/abc.mp3"));
        assert!(pattern.is_match("uploads/abc.WAV"));
        assert!(!pattern.is_match("uploads/abcdef.mp3"));
        assert!(!pattern.is_match("uploads/abc/nested.mp3"));
    }

    #[test]
    fn input_key_pattern_escapes_regex_metacharacters_in_file_id() {
        let pattern = input_key_pattern("a.b+c");
        assert!(pattern.is_match("uploads/a.b+c.wav"));
        assert!(!pattern.is_match("uploads/aXbXc.wav"));
    }
}
