//! Pipelines Bounded Context
//!
//! Tuning resolution for the reader and writer streaming pipelines and the
//! launch requests handed to the pipeline launcher.

pub mod launch;
pub mod tuning;

pub use launch::*;
pub use tuning::*;
