//! `POST /cleanup` — manual job termination and cleanup.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;

use audiocore_data::JobId;

use crate::dto::{CleanupRequest, CleanupResponse};
use crate::error::AppError;
use crate::state::ApiState;

const DEFAULT_REASON: &str = "cancelled by client";

/// Terminate a job's subprocess if still running and mark it failed.
/// Idempotent: cleaning up an already-terminal job succeeds without effect.
///
/// # Errors
///
/// Returns [`AppError::NotFound`] if the job does not exist.
pub(crate) async fn cleanup(State(state): State<Arc<ApiState>>, Json(request): Json<CleanupRequest>) -> Result<Json<CleanupResponse>, AppError> {
    let job_id = JobId::from_string(request.job_id.clone());
    let reason = request.reason.clone().unwrap_or_else(|| DEFAULT_REASON.to_string());

    let reaped = state.recovery.cleanup_job(&job_id, &reason).await?;
    let message = if reaped {
        format!("Job '{}' was terminated and marked failed", request.job_id)
    } else {
        format!("Job '{}' was already in a terminal state", request.job_id)
    };

    Ok(Json(CleanupResponse { success: true, message }))
}
