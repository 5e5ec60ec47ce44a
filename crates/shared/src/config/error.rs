//! Configuration error types
//!
//! This module defines all error types that can occur during configuration loading and validation.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration loading or validation
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A configuration variable has an invalid value
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: String, value: String },

    /// Failed to load .env file
    #[error("Failed to load .env file from {path}: {source}")]
    EnvFileLoad {
        path: PathBuf,
        #[source]
        source: dotenv::Error,
    },

    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    Validation(String),
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_value_display() {
        let err = ConfigError::InvalidValue {
            var: "RR_COMPENSATE_ON_FAILURE".to_string(),
            value: "must be 0 or 1".to_string(),
        };
        assert!(err.to_string().contains("RR_COMPENSATE_ON_FAILURE"));
        assert!(err.to_string().contains("must be 0 or 1"));
    }

    #[test]
    fn test_validation_display() {
        let err = ConfigError::Validation("template path must start with gs://".to_string());
        assert!(err.to_string().contains("gs://"));
    }
}
