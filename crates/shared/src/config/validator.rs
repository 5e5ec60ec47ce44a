//! Configuration validation
//!
//! This module provides validation logic for configuration DTOs.

use super::dto::AppConfig;
use super::error::{ConfigError, Result};

const GCS_PREFIX: &str = "gs://";
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a flex template location
///
/// Templates are always read from object storage, so the path must be a
/// `gs://` URI naming at least a bucket and an object.
pub fn validate_template_path(var: &str, path: &str) -> Result<()> {
    let Some(rest) = path.strip_prefix(GCS_PREFIX) else {
        return Err(ConfigError::Validation(format!(
            "{} must start with {}, got: {}",
            var, GCS_PREFIX, path
        )));
    };

    match rest.split_once('/') {
        Some((bucket, object)) if !bucket.is_empty() && !object.is_empty() => Ok(()),
        _ => Err(ConfigError::Validation(format!(
            "{} must name a bucket and an object, got: {}",
            var, path
        ))),
    }
}

/// Validate a log level
///
/// Plain levels are checked against the known set; anything containing
/// `=` or `,` is treated as a full filter directive and passed through.
pub fn validate_log_level(level: &str) -> Result<()> {
    if level.contains('=') || level.contains(',') {
        return Ok(());
    }
    if LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            var: "RR_LOG_LEVEL".to_string(),
            value: level.to_string(),
        })
    }
}

/// Validate a complete application configuration
pub fn validate_app_config(config: &AppConfig) -> Result<()> {
    validate_log_level(&config.logging.level)?;
    validate_template_path(
        "RR_READER_TEMPLATE_PATH",
        &config.templates.reader_template_path,
    )?;
    validate_template_path(
        "RR_WRITER_TEMPLATE_PATH",
        &config.templates.writer_template_path,
    )?;
    Ok(())
}
