//! # saga-engine-core
//!
//! Sequential saga orchestration with zero infrastructure dependencies.
//!
//! ## Modules
//!
//! - [`activity`]: [`Activity`] capability, [`ActivityContext`], [`ActivityError`]
//! - [`orchestrator`]: [`SagaOrchestrator`], stop-on-first-failure execution
//! - [`compensation`]: reverse-order rollback of completed activities
//! - [`error`]: [`SagaError`], [`CompensationFailure`]
//!
//! ## Usage
//!
//! ```rust
//! use async_trait::async_trait;
//! use saga_engine_core::{Activity, ActivityContext, ActivityError, SagaOrchestrator};
//!
//! struct Noop;
//!
//! #[async_trait]
//! impl Activity for Noop {
//!     fn name(&self) -> &'static str { "Noop" }
//!     async fn transaction(&mut self, _ctx: &ActivityContext) -> Result<(), ActivityError> { Ok(()) }
//!     async fn compensation(&mut self, _ctx: &ActivityContext) -> Result<(), ActivityError> { Ok(()) }
//! }
//!
//! let rt = tokio::runtime::Runtime::new().unwrap();
//! let mut first = Noop;
//! let mut second = Noop;
//! let outcome = rt
//!     .block_on(SagaOrchestrator::default().execute(
//!         &ActivityContext::new("run-1"),
//!         &mut [&mut first as &mut dyn Activity, &mut second],
//!     ))
//!     .unwrap();
//! assert_eq!(outcome.activities_executed, 2);
//! ```

pub mod activity;
pub mod compensation;
pub mod error;
pub mod orchestrator;

pub use activity::{Activity, ActivityContext, ActivityError, BoxError};
pub use compensation::compensate_in_reverse;
pub use error::{CompensationFailure, Result, SagaError};
pub use orchestrator::{SagaOrchestrator, SagaOrchestratorConfig, SagaOutcome};
