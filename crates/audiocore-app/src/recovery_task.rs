//! Background task that periodically sweeps stuck jobs.

use std::time::Duration;

use audiocore_api::RecoveryService;
use tokio::task::JoinHandle;
use tracing::info;

/// Spawn a loop that calls [`RecoveryService::sweep_stuck_jobs`] on a fixed
/// interval for as long as the process runs.
pub(crate) fn spawn_recovery_sweep(recovery: RecoveryService, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let reaped = recovery.sweep_stuck_jobs().await;
            if reaped > 0 {
                info!(reaped, "periodic sweep reaped stuck jobs");
            }
        }
    })
}
