//! Router construction and server host for the API.

use std::sync::Arc;
use std::time::Duration;

use audiocore_config::AppConfig;
use audiocore_data::JobStore;
use audiocore_media::Supervisor;
use audiocore_pipeline::ConversionPipeline;
use audiocore_progress::ProgressChannel;
use audiocore_storage::StorageGateway;
use audiocore_telemetry::{build_sha, propagate_request_id_layer, set_request_id_layer, Metrics};
use axum::Router;
use axum::http::{Method, Request, header::CONTENT_TYPE};
use axum::routing::{get, post};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::RequestId;
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::handlers::{cleanup, convert, converted_files, download, health, metrics, progress};
use crate::state::ApiState;

/// Axum router wrapper that hosts the conversion service's HTTP surface.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    /// Construct a new API server with shared dependencies wired through application state.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: AppConfig,
        storage: StorageGateway,
        job_store: JobStore,
        progress_channel: ProgressChannel,
        supervisor: Supervisor,
        pipeline: ConversionPipeline,
        telemetry: Metrics,
    ) -> Self {
        let state = ApiState::new(config, storage, job_store, progress_channel, supervisor, pipeline, telemetry);
        Self::with_state(state)
    }

    /// Build a server directly from already-composed state, primarily for tests.
    #[must_use]
    pub fn with_state(state: Arc<ApiState>) -> Self {
        let cors_layer = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([CONTENT_TYPE]);

        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let method = request.method().clone();
                let uri_path = request.uri().path().to_string();
                let request_id = request
                    .extensions()
                    .get::<RequestId>()
                    .and_then(|id| id.header_value().to_str().ok())
                    .unwrap_or("")
                    .to_string();

                tracing::info_span!(
                    "http.request",
                    method = %method,
                    route = %uri_path,
                    request_id = %request_id,
                    build_sha = %build_sha(),
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty
                )
            })
            .on_response(|response: &axum::response::Response, latency: Duration, span: &Span| {
                span.record("status_code", response.status().as_u16());
                let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                span.record("latency_ms", latency_ms);
            });

        let layered = ServiceBuilder::new()
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
            .layer(trace_layer);

        let router = Self::build_router()
            .layer(cors_layer)
            .layer(layered)
            .with_state(state);

        Self { router }
    }

    fn build_router() -> Router<Arc<ApiState>> {
        Router::new()
            .route("/health", get(health::health))
            .route("/metrics", get(metrics::metrics))
            .route("/convert", post(convert::convert))
            .route("/progress", get(progress::progress))
            .route("/download", get(download::download))
            .route("/cleanup", post(cleanup::cleanup))
            .route("/converted-files", get(converted_files::converted_files))
    }

    /// Consume the server and return its inner router, ready to be served.
    #[must_use]
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Bind and serve the router until the process is signalled to stop.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound or the server fails.
    pub async fn serve(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(addr, "listening");
        axum::serve(listener, self.router).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_router_mounts_every_endpoint() {
        let router = ApiServer::build_router();
        let _: Router<Arc<ApiState>> = router;
    }
}
