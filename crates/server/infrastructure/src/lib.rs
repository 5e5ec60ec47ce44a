// Reverse Replication - Infrastructure Layer
// Adapters for the resource manager ports and process-wide observability setup.

pub mod in_memory;
pub mod observability;

pub use in_memory::*;
pub use observability::{TracingConfig, TracingResult, init_tracing};
