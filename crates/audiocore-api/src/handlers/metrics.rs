//! `GET /metrics` — Prometheus text exposition.

use std::sync::Arc;

use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::error::AppError;
use crate::state::ApiState;

/// Render the service's Prometheus metrics registry.
///
/// # Errors
///
/// Returns [`AppError::Internal`] if the registry cannot be encoded.
pub(crate) async fn metrics(axum::extract::State(state): axum::extract::State<Arc<ApiState>>) -> Result<Response, AppError> {
    let rendered = state.metrics.render().map_err(|err| AppError::internal(format!("failed to render metrics: {err}")))?;
    Ok(([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], rendered).into_response())
}
