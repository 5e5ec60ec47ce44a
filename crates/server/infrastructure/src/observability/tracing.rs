//! Tracing Module - subscriber setup
//!
//! Provides:
//! - `EnvFilter` driven level selection (`RUST_LOG` style directives)
//! - human readable or JSON output on stderr

use reverse_repl_shared::config::{LogFormat, LoggingConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;

/// Configuration for tracing
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Service name reported in the startup event
    pub service_name: String,
    /// Whether to install a subscriber at all
    pub log_enabled: bool,
    /// Log filter directive
    pub log_level: String,
    pub format: LogFormat,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: "reverse-replication".to_string(),
            log_enabled: true,
            log_level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl From<&LoggingConfig> for TracingConfig {
    fn from(logging: &LoggingConfig) -> Self {
        Self {
            log_level: logging.level.clone(),
            format: logging.format,
            ..Default::default()
        }
    }
}

/// Result of tracing initialization
#[derive(Debug, Default)]
pub struct TracingResult {
    pub initialized: bool,
    pub errors: Vec<String>,
}

impl TracingResult {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Initialize tracing
///
/// Installing a second global subscriber is reported in `errors` rather
/// than failing, so tests and embedders may call this more than once.
pub fn init_tracing(config: &TracingConfig) -> TracingResult {
    let mut result = TracingResult::new();

    if !config.log_enabled {
        return result;
    }

    let env_filter = match EnvFilter::try_new(&config.log_level) {
        Ok(filter) => filter,
        Err(e) => {
            result
                .errors
                .push(format!("invalid log filter '{}': {}", config.log_level, e));
            EnvFilter::new("info")
        }
    };

    let logging_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_writer(std::io::stderr)
            .with_filter(env_filter)
            .boxed(),
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(true)
            .with_target(true)
            .with_writer(std::io::stderr)
            .with_filter(env_filter)
            .boxed(),
    };

    let subscriber = tracing_subscriber::Registry::default().with(logging_layer);
    match tracing::subscriber::set_global_default(subscriber) {
        Ok(()) => {
            result.initialized = true;
            info!("Tracing initialized for service: {}", config.service_name);
        }
        Err(e) => result.errors.push(e.to_string()),
    }

    result
}
