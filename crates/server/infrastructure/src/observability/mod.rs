//! Observability Module - structured logging for the provisioning flow
//!
//! Every activity and resource manager call logs through `tracing`; this
//! module installs the process-wide subscriber that renders those events.

pub mod tracing;

pub use self::tracing::{TracingConfig, TracingResult, init_tracing};
