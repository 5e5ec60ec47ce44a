// Reverse Replication Use Cases
// UC-001: Create Reverse Replication Pipeline
// UC-002: Validate Reverse Replication Request

use reverse_repl_domain::{
    JobRequest, NormalizeError, NormalizedJobRequest, ProvisioningPorts, RequestNormalizer, RunId,
};
use reverse_repl_shared::config::AppConfig;
use saga_engine_core::{
    ActivityContext, SagaError, SagaOrchestrator, SagaOrchestratorConfig,
};
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::catalog::{CatalogSettings, ReverseReplicationCatalog};
use super::activities::LaunchPipelineOutput;

#[derive(Debug, Error)]
pub enum CreateJobError {
    #[error("invalid job request: {0}")]
    Normalize(#[from] NormalizeError),

    #[error("error converting job data to JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Saga(#[from] SagaError),
}

/// A pipeline backing a successful run, launched by it or already running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchedPipeline {
    pub pipeline_job_id: String,
    pub job_name: String,
    pub location: String,
    pub gcloud_command: String,
}

impl From<&LaunchPipelineOutput> for LaunchedPipeline {
    fn from(output: &LaunchPipelineOutput) -> Self {
        Self {
            pipeline_job_id: output.pipeline_job_id.clone(),
            job_name: output.job_name.clone(),
            location: output.location.clone(),
            gcloud_command: output.gcloud_command.clone(),
        }
    }
}

/// Response DTO for a created reverse replication job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReverseReplicationResponse {
    pub job_id: String,
    pub run_id: String,
    pub job_name: String,
    pub location: String,
    /// `None` when the caller hosted every file already.
    pub staging_bucket: Option<String>,
    pub change_stream_name: String,
    pub metadata_database_uri: String,
    pub reader: LaunchedPipeline,
    pub writer: LaunchedPipeline,
    pub activities_executed: usize,
}

/// Use Case: Create Reverse Replication Pipeline (UC-001)
///
/// Normalizes the request, binds it into the activity catalog and runs the
/// catalog as a saga. A failure part-way rolls back whatever this run
/// created, unless compensation is disabled in configuration.
pub struct CreateReverseReplicationUseCase {
    ports: ProvisioningPorts,
    normalizer: RequestNormalizer,
    orchestrator: SagaOrchestrator,
    config: AppConfig,
}

impl CreateReverseReplicationUseCase {
    pub fn new(ports: ProvisioningPorts, config: AppConfig) -> Self {
        let normalizer = RequestNormalizer::new(ports.location_resolver.clone());
        let orchestrator = SagaOrchestrator::new(SagaOrchestratorConfig {
            compensate_on_failure: config.saga.compensate_on_failure,
        });
        Self {
            ports,
            normalizer,
            orchestrator,
            config,
        }
    }

    /// Use Case: Validate Reverse Replication Request (UC-002)
    ///
    /// Normalizes without provisioning anything.
    pub async fn validate(
        &self,
        request: JobRequest,
        run_id: &RunId,
    ) -> Result<NormalizedJobRequest, CreateJobError> {
        Ok(self.normalizer.normalize(request, run_id).await?)
    }

    /// Runs the full flow under a freshly generated run id.
    pub async fn execute(
        &self,
        request: JobRequest,
        cancellation: CancellationToken,
    ) -> Result<CreateReverseReplicationResponse, CreateJobError> {
        let settings = CatalogSettings::from_config(&self.config);
        self.execute_run(request, RunId::generate(), settings, cancellation)
            .await
    }

    #[instrument(skip(self, request, settings, cancellation), fields(run_id = %run_id))]
    pub async fn execute_run(
        &self,
        request: JobRequest,
        run_id: RunId,
        settings: CatalogSettings,
        cancellation: CancellationToken,
    ) -> Result<CreateReverseReplicationResponse, CreateJobError> {
        info!("Creating reverse replication pipeline");
        debug!(?request, "Received create reverse replication request");

        let normalized = self.normalizer.normalize(request, &run_id).await?;
        debug!(?normalized, "Normalized job request");

        let mut catalog = ReverseReplicationCatalog::build(&normalized, &settings, &self.ports)?;
        let ctx = ActivityContext::with_cancellation_token(run_id.as_str(), cancellation);
        let outcome = self
            .orchestrator
            .execute(&ctx, &mut catalog.activities_mut())
            .await?;

        info!(
            job_id = %normalized.job_id,
            duration_ms = outcome.duration.as_millis() as u64,
            "Successfully launched reverse replication pipeline"
        );

        Ok(CreateReverseReplicationResponse {
            job_id: normalized.job_id.to_string(),
            run_id: run_id.to_string(),
            job_name: normalized.request.job_name.clone(),
            location: normalized.location.clone(),
            staging_bucket: normalized
                .staging_required
                .then(|| normalized.staging_bucket_name.clone()),
            change_stream_name: normalized.request.change_stream_name.clone(),
            metadata_database_uri: normalized.metadata_database_uri(),
            reader: LaunchedPipeline::from(&catalog.launch_reader.output),
            writer: LaunchedPipeline::from(&catalog.launch_writer.output),
            activities_executed: outcome.activities_executed,
        })
    }
}
