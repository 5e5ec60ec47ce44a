//! Saga Orchestrator
//!
//! Executes an ordered list of activities strictly in sequence. The first
//! failing transaction stops the saga; every activity that completed before
//! it is compensated in reverse order.

use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

use crate::activity::{Activity, ActivityContext, ActivityError};
use crate::compensation::compensate_in_reverse;
use crate::error::{Result, SagaError};

/// Configuration for the saga orchestrator
#[derive(Debug, Clone)]
pub struct SagaOrchestratorConfig {
    /// Roll back completed activities when a later one fails.
    pub compensate_on_failure: bool,
}

impl Default for SagaOrchestratorConfig {
    fn default() -> Self {
        Self {
            compensate_on_failure: true,
        }
    }
}

/// Summary of a saga that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SagaOutcome {
    pub activities_executed: usize,
    pub duration: Duration,
}

/// Sequential saga orchestrator.
///
/// Depends only on the [`Activity`] capability. It never retries: a caller
/// that wants another attempt re-runs the whole saga, relying on each
/// activity treating an already-provisioned resource as success.
#[derive(Debug, Clone, Default)]
pub struct SagaOrchestrator {
    config: SagaOrchestratorConfig,
}

impl SagaOrchestrator {
    pub fn new(config: SagaOrchestratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SagaOrchestratorConfig {
        &self.config
    }

    /// Runs `activities` in order.
    ///
    /// On failure at index `i`, activities `0..i` are compensated last-first
    /// under a detached context, and the returned error names `i` together
    /// with any compensation that could not complete.
    #[instrument(skip_all, fields(run_id = %ctx.run_id(), activities = activities.len()))]
    pub async fn execute(
        &self,
        ctx: &ActivityContext,
        activities: &mut [&mut dyn Activity],
    ) -> Result<SagaOutcome> {
        let start_time = Instant::now();

        for index in 0..activities.len() {
            let activity = &mut *activities[index];
            let name = activity.name();

            let result = if ctx.is_cancelled() {
                Err(ActivityError::Cancelled)
            } else {
                debug!(activity = name, index, "Starting activity transaction");
                activity.transaction(ctx).await
            };

            if let Err(source) = result {
                error!(activity = name, index, error = %source, "Activity transaction failed");

                let compensation_failures = if self.config.compensate_on_failure {
                    let rollback_ctx = ctx.detached();
                    compensate_in_reverse(&rollback_ctx, &mut activities[..index]).await
                } else {
                    warn!(
                        completed = index,
                        "Compensation disabled, leaving completed activities in place"
                    );
                    Vec::new()
                };

                return Err(SagaError::ActivityFailed {
                    index,
                    activity: name,
                    source,
                    compensation_failures,
                });
            }

            debug!(activity = name, index, "Activity transaction completed");
        }

        let duration = start_time.elapsed();
        info!(
            activities_executed = activities.len(),
            duration_ms = duration.as_millis() as u64,
            "Saga completed"
        );

        Ok(SagaOutcome {
            activities_executed: activities.len(),
            duration,
        })
    }
}
