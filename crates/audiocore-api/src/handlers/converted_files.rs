//! `GET /converted-files` — aggregated view over completed jobs' outputs.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use chrono::Utc;

use audiocore_data::{JobStatus, ScanFilter};

use crate::dto::{ConvertedFileEntry, ConvertedFilesResponse};
use crate::error::AppError;
use crate::state::ApiState;

/// Maximum number of completed jobs returned in one response.
const LIST_LIMIT: i64 = 500;

/// List every completed job's output as a flat, storage-agnostic view.
///
/// # Errors
///
/// Returns [`AppError::Internal`] if the underlying scan fails.
pub(crate) async fn converted_files(State(state): State<Arc<ApiState>>) -> Result<Json<ConvertedFilesResponse>, AppError> {
    let filter = ScanFilter {
        status: JobStatus::Completed,
        updated_before: Utc::now(),
    };
    let jobs = state.job_store.scan(&filter, LIST_LIMIT).await?;

    let files: Vec<ConvertedFileEntry> = jobs
        .iter()
        .filter_map(|job| {
            let output_ref = job.output_ref()?;
            Some(ConvertedFileEntry {
                job_id: job.job_id.clone(),
                name: format!("{}.{}", job.job_id, job.format),
                format: job.format.clone(),
                quality: job.quality.clone(),
                size: output_ref.size,
                timestamp: job.updated_at.to_rfc3339(),
                output_ref: output_ref.key,
            })
        })
        .collect();

    let count = files.len();
    Ok(Json(ConvertedFilesResponse { files, count }))
}
