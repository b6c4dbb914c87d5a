//! Error types for configuration loading.

use thiserror::Error;

/// Result alias for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable was not set.
    #[error("missing required environment variable {name}")]
    MissingEnv {
        /// Name of the missing variable.
        name: &'static str,
    },
    /// An environment variable held a value that could not be parsed.
    #[error("invalid value for {name} ({value:?}): {reason}")]
    InvalidValue {
        /// Name of the offending variable.
        name: &'static str,
        /// Raw value that failed to parse.
        value: String,
        /// Human-readable reason the value was rejected.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_name_the_variable() {
        let missing = ConfigError::MissingEnv { name: "DATABASE_URL" };
        assert!(missing.to_string().contains("DATABASE_URL"));

        let invalid = ConfigError::InvalidValue {
            name: "HTTP_BIND_ADDR",
            value: "not-an-addr".to_string(),
            reason: "expected host:port".to_string(),
        };
        assert!(invalid.to_string().contains("HTTP_BIND_ADDR"));
        assert!(invalid.to_string().contains("expected host:port"));
    }
}
