//! `GET /health` — liveness only, no dependency checks.

use axum::Json;

use crate::dto::HealthResponse;

/// Report that the process is alive and accepting requests.
pub(crate) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
