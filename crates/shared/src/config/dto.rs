//! Configuration Data Transfer Objects (DTOs)
//!
//! Immutable configuration loaded once at startup and passed down to the
//! provisioning use case and the logging setup.

use serde::{Deserialize, Serialize};

/// Public flex template launching the change-feed reader pipeline.
pub const DEFAULT_READER_TEMPLATE_PATH: &str =
    "gs://dataflow-templates-us-central1/latest/flex/Spanner_Change_Streams_to_Sharded_File_Sink";

/// Public flex template launching the writer pipeline that applies changes to the source.
pub const DEFAULT_WRITER_TEMPLATE_PATH: &str =
    "gs://dataflow-templates-us-central1/latest/flex/GCS_to_Sourcedb";

// ============================================================================
// Application Configuration DTOs
// ============================================================================

/// Top-level configuration for the reverse replication control plane.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Saga execution behaviour
    pub saga: SagaConfig,

    /// Pipeline template locations
    pub templates: TemplateConfig,

    /// Staging bucket attributes
    pub staging: StagingConfig,
}

/// Output format of the log subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log filter directive (trace, debug, info, warn, error or a full EnvFilter string)
    pub level: String,

    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SagaConfig {
    /// Roll back already provisioned resources when a later step fails.
    pub compensate_on_failure: bool,
}

impl Default for SagaConfig {
    fn default() -> Self {
        Self {
            compensate_on_failure: true,
        }
    }
}

/// Default flex template locations, used when a tuning config leaves
/// `gcsTemplatePath` unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    pub reader_template_path: String,
    pub writer_template_path: String,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            reader_template_path: DEFAULT_READER_TEMPLATE_PATH.to_string(),
            writer_template_path: DEFAULT_WRITER_TEMPLATE_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StagingConfig {
    /// Objects older than this many days are deleted by a lifecycle rule.
    /// 0 = no lifecycle rule
    pub bucket_ttl_days: u32,
}
