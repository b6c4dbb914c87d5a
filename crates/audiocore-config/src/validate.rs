//! Cross-field validation applied after loading.

use crate::error::{ConfigError, Result};
use crate::model::AppConfig;

/// Validate invariants that span multiple fields of [`AppConfig`].
pub(crate) fn validate(config: &AppConfig) -> Result<()> {
    if config.http_bind_addr.parse::<std::net::SocketAddr>().is_err() {
        return Err(ConfigError::InvalidValue {
            name: "HTTP_BIND_ADDR",
            value: config.http_bind_addr.clone(),
            reason: "expected a host:port socket address".to_string(),
        });
    }

    if config.transcoder_ready_timeout_ms == 0 {
        return Err(ConfigError::InvalidValue {
            name: "TRANSCODER_READY_TIMEOUT_MS",
            value: "0".to_string(),
            reason: "readiness timeout must be positive".to_string(),
        });
    }

    if config.cleanup_sweep_interval_secs == 0 {
        return Err(ConfigError::InvalidValue {
            name: "CLEANUP_SWEEP_INTERVAL_SECS",
            value: "0".to_string(),
            reason: "sweep interval must be positive".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AppConfig {
        AppConfig {
            http_bind_addr: AppConfig::DEFAULT_HTTP_BIND_ADDR.to_string(),
            database_url: "postgres://localhost/audiocore".to_string(),
            storage_bucket: AppConfig::DEFAULT_STORAGE_BUCKET.to_string(),
            storage_endpoint: None,
            storage_region: AppConfig::DEFAULT_STORAGE_REGION.to_string(),
            progress_primary_url: "redis://localhost:6379".to_string(),
            job_table_name: AppConfig::DEFAULT_JOB_TABLE_NAME.to_string(),
            transcoder_path: AppConfig::DEFAULT_TRANSCODER_PATH.to_string(),
            transcoder_ready_timeout_ms: AppConfig::DEFAULT_TRANSCODER_READY_TIMEOUT_MS,
            cleanup_sweep_interval_secs: AppConfig::DEFAULT_CLEANUP_SWEEP_INTERVAL_SECS,
            use_real_cloud: false,
        }
    }

    #[test]
    fn rejects_unparsable_bind_addr() {
        let mut config = sample();
        config.http_bind_addr = "not-an-addr".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_zero_durations() {
        let mut config = sample();
        config.transcoder_ready_timeout_ms = 0;
        assert!(validate(&config).is_err());

        let mut config = sample();
        config.cleanup_sweep_interval_secs = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn accepts_well_formed_config() {
        assert!(validate(&sample()).is_ok());
    }
}
