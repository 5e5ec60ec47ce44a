//! Reverse replication provisioning
//!
//! A "create reverse replication" request is normalized, bound into the
//! seven-step [`ReverseReplicationCatalog`] and run by the saga
//! orchestrator.

pub mod activities;
pub mod catalog;
pub mod create;
pub mod tuning_source;

pub use activities::*;
pub use catalog::*;
pub use create::*;
pub use tuning_source::*;

pub use reverse_repl_domain::ProvisioningPorts;
