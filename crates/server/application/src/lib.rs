// Reverse Replication - Application Layer
// Provisioning activities, the activity catalog and the use case driving them.

pub mod reverse_replication;

pub use reverse_replication::*;
