//! Environment-variable loading for [`AppConfig`].

use std::env::VarError;

use crate::error::{ConfigError, Result};
use crate::model::AppConfig;
use crate::validate::validate;

/// Load configuration from the process environment.
///
/// # Errors
///
/// Returns [`ConfigError`] if a required variable is absent or a present
/// variable cannot be parsed into its expected type.
pub fn load_from_env() -> Result<AppConfig> {
    let database_url = require("DATABASE_URL")?;
    let progress_primary_url = require("PROGRESS_PRIMARY_URL")?;

    let config = AppConfig {
        http_bind_addr: optional("HTTP_BIND_ADDR", AppConfig::DEFAULT_HTTP_BIND_ADDR),
        database_url,
        storage_bucket: optional("STORAGE_BUCKET", AppConfig::DEFAULT_STORAGE_BUCKET),
        storage_endpoint: optional_opt("STORAGE_ENDPOINT"),
        storage_region: optional("REGION", AppConfig::DEFAULT_STORAGE_REGION),
        progress_primary_url,
        job_table_name: optional("JOB_TABLE_NAME", AppConfig::DEFAULT_JOB_TABLE_NAME),
        transcoder_path: optional("TRANSCODER_PATH", AppConfig::DEFAULT_TRANSCODER_PATH),
        transcoder_ready_timeout_ms: optional_parsed(
            "TRANSCODER_READY_TIMEOUT_MS",
            AppConfig::DEFAULT_TRANSCODER_READY_TIMEOUT_MS,
        )?,
        cleanup_sweep_interval_secs: optional_parsed(
            "CLEANUP_SWEEP_INTERVAL_SECS",
            AppConfig::DEFAULT_CLEANUP_SWEEP_INTERVAL_SECS,
        )?,
        use_real_cloud: optional_bool("USE_REAL_CLOUD", false),
    };

    validate(&config)?;
    Ok(config)
}

fn require(name: &'static str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        Ok(_) | Err(VarError::NotPresent) => Err(ConfigError::MissingEnv { name }),
        Err(VarError::NotUnicode(_)) => Err(ConfigError::InvalidValue {
            name,
            value: String::from("<non-utf8>"),
            reason: "value is not valid UTF-8".to_string(),
        }),
    }
}

fn optional(name: &'static str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn optional_opt(name: &'static str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

fn optional_bool(name: &'static str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(value) => matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
        Err(_) => default,
    }
}

fn optional_parsed(name: &'static str, default: u64) -> Result<u64> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => {
            value.parse::<u64>().map_err(|err| ConfigError::InvalidValue {
                name,
                value,
                reason: err.to_string(),
            })
        }
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_all() {
        for var in [
            "DATABASE_URL",
            "PROGRESS_PRIMARY_URL",
            "HTTP_BIND_ADDR",
            "STORAGE_BUCKET",
            "STORAGE_ENDPOINT",
            "REGION",
            "JOB_TABLE_NAME",
            "TRANSCODER_PATH",
            "TRANSCODER_READY_TIMEOUT_MS",
            "CLEANUP_SWEEP_INTERVAL_SECS",
            "USE_REAL_CLOUD",
        ] {
            unsafe { std::env::remove_var(var) };
        }
    }

    #[test]
    fn missing_database_url_is_reported() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        let err = load_from_env().expect_err("database url is required");
        assert!(matches!(
            err,
            ConfigError::MissingEnv { name: "DATABASE_URL" }
        ));
    }

    #[test]
    fn defaults_are_applied_when_optional_vars_absent() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        unsafe {
            std::env::set_var("DATABASE_URL", "postgres://localhost/audiocore");
            std::env::set_var("PROGRESS_PRIMARY_URL", "redis://localhost:6379");
        }
        let config = load_from_env().expect("config should load with defaults");
        assert_eq!(config.storage_bucket, AppConfig::DEFAULT_STORAGE_BUCKET);
        assert_eq!(config.job_table_name, AppConfig::DEFAULT_JOB_TABLE_NAME);
        assert_eq!(config.transcoder_path, AppConfig::DEFAULT_TRANSCODER_PATH);
        assert_eq!(
            config.transcoder_ready_timeout_ms,
            AppConfig::DEFAULT_TRANSCODER_READY_TIMEOUT_MS
        );
        assert!(!config.use_real_cloud);
        clear_all();
    }

    #[test]
    fn invalid_numeric_override_is_rejected() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        unsafe {
            std::env::set_var("DATABASE_URL", "postgres://localhost/audiocore");
            std::env::set_var("PROGRESS_PRIMARY_URL", "redis://localhost:6379");
            std::env::set_var("CLEANUP_SWEEP_INTERVAL_SECS", "not-a-number");
        }
        let err = load_from_env().expect_err("non-numeric override should fail");
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                name: "CLEANUP_SWEEP_INTERVAL_SECS",
                ..
            }
        ));
        clear_all();
    }
}
