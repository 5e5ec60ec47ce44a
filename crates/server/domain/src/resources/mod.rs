//! Resources Bounded Context
//!
//! Narrow capability ports onto the external resource managers the
//! provisioning saga drives. Concrete clients live in the infrastructure
//! layer; the domain only states what each step needs.

pub mod ports;

pub use ports::*;
