//! Configuration loader
//!
//! This module provides the ConfigLoader which is responsible for loading
//! configuration from .env files and environment variables.

use std::path::{Path, PathBuf};

use super::dto::{
    AppConfig, LogFormat, LoggingConfig, SagaConfig, StagingConfig, TemplateConfig,
};
use super::error::{ConfigError, Result};
use super::validator::validate_app_config;

/// Configuration loader
///
/// This loader handles loading configuration from:
/// 1. .env file (optional)
/// 2. Environment variables
///
/// # Priority
///
/// `dotenv` never overrides a variable that is already set, so the process
/// environment wins over the .env file.
///
/// # Example
///
/// ```ignore
/// use reverse_repl_shared::config::ConfigLoader;
/// use std::path::PathBuf;
///
/// let loader = ConfigLoader::new(Some(PathBuf::from(".env")));
/// let config = loader.load_app_config()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    /// Optional path to .env file
    env_file_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new(env_file_path: Option<PathBuf>) -> Self {
        Self { env_file_path }
    }

    /// Load and validate the application configuration
    pub fn load_app_config(&self) -> Result<AppConfig> {
        if let Some(path) = &self.env_file_path {
            self.load_env_file(path)?;
        }

        let config = AppConfig::from_env()?;
        validate_app_config(&config)?;

        Ok(config)
    }

    fn load_env_file(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(ConfigError::EnvFileLoad {
                path: path.to_path_buf(),
                source: dotenv::Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path.display()),
                )),
            });
        }

        dotenv::from_path(path).map_err(|e| ConfigError::EnvFileLoad {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }
}

// ============================================================================
// Implementation: AppConfig::from_env
// ============================================================================

impl AppConfig {
    /// Build configuration from environment variables
    ///
    /// # Optional Environment Variables
    ///
    /// - `RR_LOG_LEVEL`: Log level or filter directive (default: `RUST_LOG`, then "info")
    /// - `RR_LOG_FORMAT`: "text" or "json" (default: "text")
    /// - `RR_COMPENSATE_ON_FAILURE`: "1"=roll back on failure (default: 1)
    /// - `RR_READER_TEMPLATE_PATH`: Reader flex template (default: public template)
    /// - `RR_WRITER_TEMPLATE_PATH`: Writer flex template (default: public template)
    /// - `RR_STAGING_BUCKET_TTL_DAYS`: Lifecycle TTL for staging objects (default: 0, disabled)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let level = lookup("RR_LOG_LEVEL")
            .or_else(|| lookup("RUST_LOG"))
            .unwrap_or_else(|| "info".to_string());

        let format = match lookup("RR_LOG_FORMAT").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    var: "RR_LOG_FORMAT".to_string(),
                    value: other.to_string(),
                });
            }
        };

        let compensate_on_failure = lookup("RR_COMPENSATE_ON_FAILURE")
            .unwrap_or_else(|| "1".to_string())
            .parse::<u8>()
            .map_err(|_| ConfigError::InvalidValue {
                var: "RR_COMPENSATE_ON_FAILURE".to_string(),
                value: "must be 0 or 1".to_string(),
            })?
            == 1;

        let defaults = TemplateConfig::default();
        let templates = TemplateConfig {
            reader_template_path: lookup("RR_READER_TEMPLATE_PATH")
                .unwrap_or(defaults.reader_template_path),
            writer_template_path: lookup("RR_WRITER_TEMPLATE_PATH")
                .unwrap_or(defaults.writer_template_path),
        };

        let bucket_ttl_days = parse_optional_var(&lookup, "RR_STAGING_BUCKET_TTL_DAYS", 0)?;

        Ok(Self {
            logging: LoggingConfig { level, format },
            saga: SagaConfig {
                compensate_on_failure,
            },
            templates,
            staging: StagingConfig { bucket_ttl_days },
        })
    }
}

fn parse_optional_var<F, T>(lookup: &F, var: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            var: var.to_string(),
            value: raw,
        }),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_is_set() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Text);
        assert!(config.saga.compensate_on_failure);
        assert_eq!(config.staging.bucket_ttl_days, 0);
        assert!(
            config
                .templates
                .reader_template_path
                .ends_with("Spanner_Change_Streams_to_Sharded_File_Sink")
        );
    }

    #[test]
    fn test_explicit_values_override_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("RR_LOG_LEVEL", "debug"),
            ("RUST_LOG", "trace"),
            ("RR_LOG_FORMAT", "json"),
            ("RR_COMPENSATE_ON_FAILURE", "0"),
            ("RR_WRITER_TEMPLATE_PATH", "gs://my-bucket/writer"),
            ("RR_STAGING_BUCKET_TTL_DAYS", "7"),
        ]))
        .unwrap();

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(!config.saga.compensate_on_failure);
        assert_eq!(config.templates.writer_template_path, "gs://my-bucket/writer");
        assert_eq!(config.staging.bucket_ttl_days, 7);
    }

    #[test]
    fn test_rust_log_is_the_fallback_level() {
        let config = AppConfig::from_lookup(lookup_from(&[("RUST_LOG", "warn")])).unwrap();
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[("RR_LOG_FORMAT", "xml")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref var, .. } if var == "RR_LOG_FORMAT"));

        let err = AppConfig::from_lookup(lookup_from(&[("RR_COMPENSATE_ON_FAILURE", "yes")]))
            .unwrap_err();
        assert!(err.to_string().contains("RR_COMPENSATE_ON_FAILURE"));

        let err = AppConfig::from_lookup(lookup_from(&[("RR_STAGING_BUCKET_TTL_DAYS", "-1")]))
            .unwrap_err();
        assert!(err.to_string().contains("RR_STAGING_BUCKET_TTL_DAYS"));
    }

    #[test]
    fn test_missing_env_file_is_an_error() {
        let loader = ConfigLoader::new(Some(PathBuf::from("/nonexistent/reverse-repl.env")));
        let err = loader.load_app_config().unwrap_err();
        assert!(matches!(err, ConfigError::EnvFileLoad { .. }));
    }

    #[test]
    fn test_env_file_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "RR_STAGING_BUCKET_TTL_DAYS=3").unwrap();

        let loader = ConfigLoader::new(Some(file.path().to_path_buf()));
        let config = loader.load_app_config().unwrap();
        assert_eq!(config.staging.bucket_ttl_days, 3);
    }
}
