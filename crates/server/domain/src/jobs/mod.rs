//! Jobs Bounded Context
//!
//! The request a caller submits, its normalization into the fully resolved
//! form the provisioning steps consume, and the record kept in the job
//! registry.

pub mod normalizer;
pub mod record;
pub mod request;

pub use normalizer::*;
pub use record::*;
pub use request::*;
