use async_trait::async_trait;
use reverse_repl_domain::{JobId, JobRecord, JobRegistry, JobStatus, PortError};
use saga_engine_core::{Activity, ActivityContext, ActivityError};
use std::sync::Arc;
use tracing::{info, instrument};

use super::{call_port, port_failure};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterJobInput {
    pub job_id: JobId,
    pub job_name: String,
    pub project_id: String,
    pub instance_id: String,
    pub database_id: String,
    /// Normalized request serialized as JSON.
    pub job_data: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterJobOutput {
    /// The record was written by this run.
    pub registered: bool,
}

/// Writes the initial job record with status `CREATED`.
pub struct RegisterJob {
    pub input: RegisterJobInput,
    pub output: RegisterJobOutput,
    registry: Arc<dyn JobRegistry>,
}

impl RegisterJob {
    pub fn new(input: RegisterJobInput, registry: Arc<dyn JobRegistry>) -> Self {
        Self {
            input,
            output: RegisterJobOutput::default(),
            registry,
        }
    }
}

#[async_trait]
impl Activity for RegisterJob {
    fn name(&self) -> &'static str {
        "RegisterJob"
    }

    #[instrument(skip_all, fields(activity = "RegisterJob", job_id = %self.input.job_id))]
    async fn transaction(&mut self, ctx: &ActivityContext) -> Result<(), ActivityError> {
        let input = &self.input;
        let record = JobRecord::new(
            input.job_id.clone(),
            input.job_name.as_str(),
            input.project_id.as_str(),
            input.instance_id.as_str(),
            input.database_id.as_str(),
            input.job_data.as_str(),
        );

        match ctx.guard(self.registry.create_job(&record)).await? {
            Ok(()) => {
                self.output.registered = true;
                info!(job_name = %input.job_name, "Job record created");
            }
            Err(PortError::AlreadyExists(_)) => {
                info!("Job record already exists, skipping");
            }
            Err(err) => return Err(port_failure("creating job record", err)),
        }
        Ok(())
    }

    #[instrument(skip_all, fields(activity = "RegisterJob", job_id = %self.input.job_id))]
    async fn compensation(&mut self, ctx: &ActivityContext) -> Result<(), ActivityError> {
        if !self.output.registered {
            return Ok(());
        }
        call_port(
            ctx,
            "marking job record failed",
            self.registry
                .update_job_status(&self.input.job_id, JobStatus::Failed),
        )
        .await?;
        info!("Job record marked FAILED");
        Ok(())
    }
}
