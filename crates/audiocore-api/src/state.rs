//! Shared application state threaded through every handler.

use std::sync::Arc;

use audiocore_config::AppConfig;
use audiocore_data::JobStore;
use audiocore_media::Supervisor;
use audiocore_pipeline::ConversionPipeline;
use audiocore_progress::ProgressChannel;
use audiocore_storage::StorageGateway;
use audiocore_telemetry::Metrics;

use crate::recovery::RecoveryService;

/// Collaborators shared by every Axum handler, held behind an `Arc` so
/// cloning the state for each request is cheap.
pub struct ApiState {
    /// Resolved process configuration.
    pub config: AppConfig,
    /// Object storage gateway.
    pub storage: StorageGateway,
    /// Durable job repository.
    pub job_store: JobStore,
    /// Two-tier progress channel.
    pub progress: ProgressChannel,
    /// Transcoder subprocess supervisor.
    pub supervisor: Supervisor,
    /// The end-to-end conversion pipeline, spawned fire-and-forget per job.
    pub pipeline: ConversionPipeline,
    /// Prometheus metrics registry.
    pub metrics: Metrics,
    /// Cleanup/recovery logic shared between the manual endpoint and the
    /// background sweeps run by the application crate.
    pub recovery: RecoveryService,
}

impl ApiState {
    /// Compose the shared state from its collaborators.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: AppConfig,
        storage: StorageGateway,
        job_store: JobStore,
        progress: ProgressChannel,
        supervisor: Supervisor,
        pipeline: ConversionPipeline,
        metrics: Metrics,
    ) -> Arc<Self> {
        let recovery = RecoveryService::new(job_store.clone(), progress.clone(), supervisor.clone(), metrics.clone());
        Arc::new(Self {
            config,
            storage,
            job_store,
            progress,
            supervisor,
            pipeline,
            metrics,
            recovery,
        })
    }
}
