use async_trait::async_trait;
use reverse_repl_domain::{JobId, JobRegistry, JobStatus};
use saga_engine_core::{Activity, ActivityContext, ActivityError};
use std::sync::Arc;
use tracing::{info, instrument};

use super::call_port;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizeJobStatusInput {
    pub job_id: JobId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalizeJobStatusOutput {
    pub updated: bool,
}

/// Marks the job record `RUNNING` once every resource is provisioned.
///
/// If this fails the resources stay provisioned and the record stays
/// `CREATED`.
pub struct FinalizeJobStatus {
    pub input: FinalizeJobStatusInput,
    pub output: FinalizeJobStatusOutput,
    registry: Arc<dyn JobRegistry>,
}

impl FinalizeJobStatus {
    pub fn new(input: FinalizeJobStatusInput, registry: Arc<dyn JobRegistry>) -> Self {
        Self {
            input,
            output: FinalizeJobStatusOutput::default(),
            registry,
        }
    }
}

#[async_trait]
impl Activity for FinalizeJobStatus {
    fn name(&self) -> &'static str {
        "FinalizeJobStatus"
    }

    #[instrument(skip_all, fields(activity = "FinalizeJobStatus", job_id = %self.input.job_id))]
    async fn transaction(&mut self, ctx: &ActivityContext) -> Result<(), ActivityError> {
        call_port(
            ctx,
            "marking job record running",
            self.registry
                .update_job_status(&self.input.job_id, JobStatus::Running),
        )
        .await?;
        self.output.updated = true;
        info!("Job record marked RUNNING");
        Ok(())
    }

    async fn compensation(&mut self, ctx: &ActivityContext) -> Result<(), ActivityError> {
        if !self.output.updated {
            return Ok(());
        }
        call_port(
            ctx,
            "restoring job record status",
            self.registry
                .update_job_status(&self.input.job_id, JobStatus::Created),
        )
        .await?;
        self.output.updated = false;
        Ok(())
    }
}
