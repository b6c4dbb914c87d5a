//! Service wiring: loads configuration, builds every collaborator, and
//! launches the HTTP listener alongside the background recovery sweep.

use std::time::Duration;

use audiocore_api::{ApiServer, ApiState};
use audiocore_config::AppConfig;
use audiocore_data::{JobStore, ProgressFallbackStore};
use audiocore_media::Supervisor;
use audiocore_pipeline::ConversionPipeline;
use audiocore_progress::{ProgressChannel, RedisProgressCache};
use audiocore_storage::StorageGateway;
use audiocore_telemetry::{init_logging, LoggingConfig, Metrics};
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::recovery_task::spawn_recovery_sweep;

/// Maximum number of pooled Postgres connections held by this process.
const DATABASE_POOL_SIZE: u32 = 10;

/// Collaborators required to start serving requests, assembled once at boot.
pub(crate) struct BootstrapDependencies {
    config: AppConfig,
    state: std::sync::Arc<ApiState>,
}

impl BootstrapDependencies {
    /// Build every collaborator from the process environment.
    pub(crate) async fn from_env() -> AppResult<Self> {
        let config = audiocore_config::load_from_env()?;
        let metrics = Metrics::new().map_err(AppError::Telemetry)?;

        let pool = PgPoolOptions::new().max_connections(DATABASE_POOL_SIZE).connect(&config.database_url).await?;

        let job_store = JobStore::new(pool.clone()).await?;
        let fallback = ProgressFallbackStore::new(pool);
        let primary = RedisProgressCache::connect(&config.progress_primary_url).await?;
        let progress = ProgressChannel::new(primary, fallback);

        let supervisor = Supervisor::new();
        let storage = StorageGateway::from_env(config.storage_bucket.clone(), config.storage_region.clone(), config.storage_endpoint.clone()).await;
        let pipeline = ConversionPipeline::new(storage.clone(), job_store.clone(), progress.clone(), supervisor.clone(), config.transcoder_path.clone(), metrics.clone());

        let state = ApiState::new(config.clone(), storage, job_store, progress, supervisor, pipeline, metrics);

        Ok(Self { config, state })
    }
}

/// Entry point: load dependencies from the environment and serve until shutdown.
///
/// # Errors
///
/// Returns an error if dependency construction or serving fails.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env().await?;
    run_app_with(dependencies).await
}

pub(crate) async fn run_app_with(dependencies: BootstrapDependencies) -> AppResult<()> {
    let logging = LoggingConfig::default();
    init_logging(&logging).map_err(AppError::Logging)?;

    info!("audiocore bootstrap starting");

    let BootstrapDependencies { config, state } = dependencies;

    let reaped = state.recovery.recover_orphaned_on_startup().await;
    if reaped > 0 {
        info!(reaped, "reaped jobs left processing by a previous run");
    }

    let sweep_interval = Duration::from_secs(config.cleanup_sweep_interval_secs);
    let sweep_task = spawn_recovery_sweep(state.recovery.clone(), sweep_interval);

    let addr = config.http_bind_addr.clone();
    let api = ApiServer::with_state(state);
    let serve_result = api.serve(&addr).await;

    sweep_task.abort();

    serve_result.map_err(AppError::Server)?;
    info!("audiocore server shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_pool_size_is_positive() {
        assert!(DATABASE_POOL_SIZE > 0);
    }
}
