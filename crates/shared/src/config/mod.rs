//! Configuration module
//!
//! Centralized configuration loading, validation, and DTOs for the reverse
//! replication control plane.
//!
//! # Architecture
//!
//! 1. **Single Source of Truth**: configuration is loaded once at startup
//! 2. **Fail Fast**: invalid values are reported immediately, no silent fallbacks
//! 3. **DTO Pattern**: configuration is immutable and passed via dependency injection
//!
//! # Usage
//!
//! ```ignore
//! use reverse_repl_shared::config::ConfigLoader;
//!
//! let config = ConfigLoader::new(None).load_app_config()?;
//! println!("Reader template: {}", config.templates.reader_template_path);
//! ```
//!
//! # Environment Variables
//!
//! All variables are optional:
//!
//! - `RR_LOG_LEVEL` / `RUST_LOG`: Log level (default: "info")
//! - `RR_LOG_FORMAT`: "text" or "json"
//! - `RR_COMPENSATE_ON_FAILURE`: Roll back on failure (default: 1)
//! - `RR_READER_TEMPLATE_PATH`, `RR_WRITER_TEMPLATE_PATH`: Flex template locations
//! - `RR_STAGING_BUCKET_TTL_DAYS`: Staging object lifecycle (default: 0, disabled)

pub mod dto;
pub mod error;
pub mod loader;
pub mod validator;

pub use dto::{
    AppConfig, DEFAULT_READER_TEMPLATE_PATH, DEFAULT_WRITER_TEMPLATE_PATH, LogFormat,
    LoggingConfig, SagaConfig, StagingConfig, TemplateConfig,
};
pub use error::{ConfigError, Result};
pub use loader::ConfigLoader;
pub use validator::{validate_app_config, validate_log_level, validate_template_path};
