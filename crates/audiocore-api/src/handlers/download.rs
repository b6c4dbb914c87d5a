//! `GET /download` — the Download Streamer.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use audiocore_data::{JobId, JobStatus};
use audiocore_pipeline::lookup;

use crate::dto::{DownloadQuery, PresignedDownloadResponse};
use crate::error::AppError;
use crate::state::ApiState;

/// Presigned URLs handed out by this endpoint are valid for 15 minutes.
const PRESIGN_EXPIRY: Duration = Duration::from_secs(15 * 60);

/// Serve a completed job's output, either as a presigned URL or by proxying
/// the bytes directly through this process.
pub(crate) async fn download(State(state): State<Arc<ApiState>>, Query(query): Query<DownloadQuery>) -> Result<Response, AppError> {
    let job_id = JobId::from_string(query.job_id.clone());
    let job = state.job_store.get_job(&job_id).await?.ok_or_else(|| AppError::not_found(format!("Job '{}' was not found", query.job_id)))?;

    match job.status() {
        JobStatus::Completed => {}
        JobStatus::Failed => {
            let message = job.error.clone().unwrap_or_else(|| "conversion failed".to_string());
            return Err(AppError::Gone(message));
        }
        JobStatus::Processing => return Err(AppError::validation("Conversion is still in progress, please wait")),
        JobStatus::Created => return Err(AppError::validation(format!("Job '{}' has not started processing", query.job_id))),
    }

    let output_ref = job.output_ref().ok_or_else(|| AppError::internal(format!("Job '{}' is completed but has no output reference", query.job_id)))?;

    let descriptor = lookup(&job.format);
    let content_type = descriptor.map_or("application/octet-stream", |d| d.mime_type);
    let filename = query.filename.clone().unwrap_or_else(|| format!("{}.{}", job.job_id, job.format));

    let meta = state.storage.head(&output_ref.key).await?;

    if query.presigned {
        let presigned_url = state.storage.presign_get(&output_ref.key, PRESIGN_EXPIRY).await?;
        let body = PresignedDownloadResponse {
            presigned_url,
            filename,
            content_type: content_type.to_string(),
            size: meta.size_bytes,
        };
        return Ok(axum::Json(body).into_response());
    }

    let stream = state.storage.get_stream(&output_ref.key).await?;
    let body = Body::from_stream(stream);

    let mut response = Response::builder().status(StatusCode::OK).body(body).map_err(|err| AppError::internal(format!("failed to build download response: {err}")))?;
    let headers = response.headers_mut();

    if let Ok(value) = HeaderValue::from_str(content_type) {
        headers.insert(axum::http::header::CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&meta.size_bytes.to_string()) {
        headers.insert(axum::http::header::CONTENT_LENGTH, value);
    }
    let disposition = if query.preview { format!("inline; filename=\"{filename}\"") } else { format!("attachment; filename=\"{filename}\"") };
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(axum::http::header::CONTENT_DISPOSITION, value);
    }
    headers.insert(axum::http::header::CACHE_CONTROL, HeaderValue::from_static("no-cache, no-store, must-revalidate"));
    headers.insert(axum::http::header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    if let Some(etag) = meta.etag.as_deref() {
        if let Ok(value) = HeaderValue::from_str(etag) {
            headers.insert(axum::http::header::ETAG, value);
        }
    }
    if let Some(last_modified) = meta.last_modified {
        if let Ok(value) = HeaderValue::from_str(&last_modified.to_rfc2822()) {
            headers.insert(axum::http::header::LAST_MODIFIED, value);
        }
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presign_expiry_matches_the_documented_window() {
        assert_eq!(PRESIGN_EXPIRY, Duration::from_secs(900));
    }
}
