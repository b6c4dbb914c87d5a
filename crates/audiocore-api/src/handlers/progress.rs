//! `GET /progress` — read a job's latest progress snapshot.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};

use audiocore_data::{JobId, ProgressRecord};

use crate::dto::ProgressQuery;
use crate::error::AppError;
use crate::state::ApiState;

/// Return a job's current progress record.
///
/// # Errors
///
/// Returns [`AppError::NotFound`] if no progress record has been published
/// for the job, which also covers unknown job ids.
pub(crate) async fn progress(State(state): State<Arc<ApiState>>, Query(query): Query<ProgressQuery>) -> Result<Json<ProgressRecord>, AppError> {
    let job_id = JobId::from_string(query.job_id.clone());
    let record = state.progress.get(&job_id).await?.ok_or_else(|| AppError::not_found(format!("No progress found for job '{}'", query.job_id)))?;
    Ok(Json(record))
}
