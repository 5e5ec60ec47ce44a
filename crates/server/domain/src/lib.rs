// Reverse Replication - Domain Layer
// Bounded contexts:
// - shared_kernel: ids and naming constants shared by every context
// - jobs: job request, normalization and the persisted job record
// - pipelines: tuning config resolution and launch requests
// - resources: ports to the external resource managers

pub mod shared_kernel;

pub mod jobs;
pub mod pipelines;
pub mod resources;

pub use shared_kernel::*;

pub use jobs::*;
pub use pipelines::*;
pub use resources::*;
