//! Reader and writer pipeline launches
//!
//! Both activities follow the same path: load the caller's tuning file,
//! resolve it against the stage's defaults, build the launch request,
//! launch and record the returned pipeline job. They differ in template
//! parameters and defaults only.

use async_trait::async_trait;
use reverse_repl_domain::{
    JobId, JobRegistry, JobResource, LaunchParameters, LaunchRequest, PipelineLauncher, PortError,
    RUN_MODE_REGULAR, ResourceKind, StagingStore, TuningDefaults, resolve_tuning_config,
};
use saga_engine_core::{Activity, ActivityContext, ActivityError};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use super::{call_port, port_failure};
use crate::reverse_replication::tuning_source::load_tuning_config;

/// Placement and naming shared by both pipeline stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineTarget {
    pub job_id: JobId,
    pub project_id: String,
    pub location: String,
    /// Tuning file path, empty for defaults.
    pub tuning_config_path: String,
    pub template_path: String,
    /// Suffix of the generated pipeline job name.
    pub job_name_suffix: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchPipelineOutput {
    /// A pipeline job was started by this run.
    pub launched: bool,
    pub pipeline_job_id: String,
    pub job_name: String,
    pub project_id: String,
    pub location: String,
    pub gcloud_command: String,
}

/// Ports and launch logic shared by the reader and writer activities.
struct PipelineStage {
    kind: ResourceKind,
    launcher: Arc<dyn PipelineLauncher>,
    store: Arc<dyn StagingStore>,
    registry: Arc<dyn JobRegistry>,
}

impl PipelineStage {
    async fn launch(
        &self,
        ctx: &ActivityContext,
        target: &PipelineTarget,
        defaults: TuningDefaults,
        parameters: LaunchParameters,
        output: &mut LaunchPipelineOutput,
    ) -> Result<(), ActivityError> {
        let tuning =
            load_tuning_config(ctx, self.store.as_ref(), &target.tuning_config_path).await?;
        let tuning = resolve_tuning_config(
            tuning,
            &defaults,
            &target.project_id,
            &target.location,
            target.job_id.as_str(),
            &target.job_name_suffix,
        );
        debug!(?tuning, "Resolved tuning config");

        let request = LaunchRequest::new(parameters, &tuning)
            .map_err(|e| ActivityError::external("invalid tuning config", e))?;
        let launch_context = format!("launching pipeline {}", request.job_name);
        let pipeline_job_id = match ctx.guard(self.launcher.launch(&request)).await? {
            Ok(id) => id,
            Err(PortError::AlreadyExists(_)) => {
                let existing = call_port(
                    ctx,
                    &launch_context,
                    self.launcher.find_active(
                        &request.project_id,
                        &request.location,
                        &request.job_name,
                    ),
                )
                .await?;
                *output = LaunchPipelineOutput {
                    launched: false,
                    pipeline_job_id: existing.unwrap_or_default(),
                    job_name: request.job_name.clone(),
                    project_id: request.project_id.clone(),
                    location: request.location.clone(),
                    gcloud_command: request.to_gcloud_command(),
                };
                info!(
                    pipeline_job_id = %output.pipeline_job_id,
                    job_name = %output.job_name,
                    "Pipeline already running, reusing it"
                );
                return Ok(());
            }
            Err(err) => return Err(port_failure(launch_context, err)),
        };

        *output = LaunchPipelineOutput {
            launched: true,
            pipeline_job_id,
            job_name: request.job_name.clone(),
            project_id: request.project_id.clone(),
            location: request.location.clone(),
            gcloud_command: request.to_gcloud_command(),
        };
        info!(
            pipeline_job_id = %output.pipeline_job_id,
            job_name = %output.job_name,
            "Launched pipeline"
        );
        info!(
            "Equivalent gcloud command for job {}:\n{}",
            output.job_name, output.gcloud_command
        );

        let resource = JobResource {
            job_id: target.job_id.clone(),
            kind: self.kind,
            external_id: output.pipeline_job_id.clone(),
            project_id: output.project_id.clone(),
            location: output.location.clone(),
        };
        if let Err(err) = call_port(
            ctx,
            "recording pipeline job",
            self.registry.record_resource(&resource),
        )
        .await
        {
            warn!(error = %err, "Recording failed, cancelling the pipeline launched by this run");
            if let Err(undo) = self.cancel(&ctx.detached(), output).await {
                error!(error = %undo, "Could not cancel pipeline");
            }
            return Err(err);
        }
        Ok(())
    }

    async fn cancel(
        &self,
        ctx: &ActivityContext,
        output: &mut LaunchPipelineOutput,
    ) -> Result<(), ActivityError> {
        if !output.launched {
            return Ok(());
        }
        match ctx
            .guard(self.launcher.cancel(
                &output.project_id,
                &output.location,
                &output.pipeline_job_id,
            ))
            .await?
        {
            Ok(()) | Err(PortError::NotFound(_)) => {
                info!(pipeline_job_id = %output.pipeline_job_id, "Pipeline cancelled");
                output.launched = false;
                Ok(())
            }
            Err(err) => Err(port_failure(
                format!("cancelling pipeline {}", output.pipeline_job_id),
                err,
            )),
        }
    }
}

// ============================================================================
// LaunchReaderPipeline
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchReaderPipelineInput {
    pub target: PipelineTarget,
    pub change_stream_name: String,
    pub instance_id: String,
    pub database_id: String,
    pub metadata_instance: String,
    pub metadata_database: String,
    pub session_file_path: String,
    pub source_shards_file_path: String,
    pub gcs_output_directory: String,
    pub start_timestamp: String,
    pub end_timestamp: String,
    pub window_duration: String,
    pub filtration_mode: String,
    pub metadata_table_suffix: String,
    pub skip_directory_name: String,
    pub sharding_custom_jar_path: String,
    pub sharding_custom_class_name: String,
}

impl LaunchReaderPipelineInput {
    pub fn parameters(&self) -> LaunchParameters {
        let mut params = LaunchParameters::new();
        params
            .insert("changeStreamName", &self.change_stream_name)
            .insert("instanceId", &self.instance_id)
            .insert("databaseId", &self.database_id)
            .insert("spannerProjectId", &self.target.project_id)
            .insert("metadataInstance", &self.metadata_instance)
            .insert("metadataDatabase", &self.metadata_database)
            .insert("gcsOutputDirectory", &self.gcs_output_directory)
            .insert("sessionFilePath", &self.session_file_path)
            .insert("sourceShardsFilePath", &self.source_shards_file_path)
            .insert("startTimestamp", &self.start_timestamp)
            .insert("endTimestamp", &self.end_timestamp)
            .insert("windowDuration", &self.window_duration)
            .insert("filtrationMode", &self.filtration_mode)
            .insert("metadataTableSuffix", &self.metadata_table_suffix)
            .insert("skipDirectoryName", &self.skip_directory_name)
            .insert("runIdentifier", self.target.job_id.as_str())
            .insert("runMode", RUN_MODE_REGULAR)
            .insert_non_empty("shardingCustomJarPath", &self.sharding_custom_jar_path)
            .insert_non_empty("shardingCustomClassName", &self.sharding_custom_class_name);
        params
    }
}

/// Launches the pipeline reading the change stream into the data directory.
pub struct LaunchReaderPipeline {
    pub input: LaunchReaderPipelineInput,
    pub output: LaunchPipelineOutput,
    stage: PipelineStage,
}

impl LaunchReaderPipeline {
    pub fn new(
        input: LaunchReaderPipelineInput,
        launcher: Arc<dyn PipelineLauncher>,
        store: Arc<dyn StagingStore>,
        registry: Arc<dyn JobRegistry>,
    ) -> Self {
        Self {
            input,
            output: LaunchPipelineOutput::default(),
            stage: PipelineStage {
                kind: ResourceKind::ReaderPipeline,
                launcher,
                store,
                registry,
            },
        }
    }
}

#[async_trait]
impl Activity for LaunchReaderPipeline {
    fn name(&self) -> &'static str {
        "LaunchReaderPipeline"
    }

    #[instrument(skip_all, fields(activity = "LaunchReaderPipeline", job_id = %self.input.target.job_id))]
    async fn transaction(&mut self, ctx: &ActivityContext) -> Result<(), ActivityError> {
        let defaults = TuningDefaults::reader(self.input.target.template_path.as_str());
        self.stage
            .launch(
                ctx,
                &self.input.target,
                defaults,
                self.input.parameters(),
                &mut self.output,
            )
            .await
    }

    #[instrument(skip_all, fields(activity = "LaunchReaderPipeline", job_id = %self.input.target.job_id))]
    async fn compensation(&mut self, ctx: &ActivityContext) -> Result<(), ActivityError> {
        self.stage.cancel(ctx, &mut self.output).await
    }
}

// ============================================================================
// LaunchWriterPipeline
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchWriterPipelineInput {
    pub target: PipelineTarget,
    pub source_shards_file_path: String,
    pub session_file_path: String,
    pub source_type: String,
    pub source_db_timezone_offset: String,
    pub timer_interval: i64,
    pub start_timestamp: String,
    pub window_duration: String,
    pub gcs_input_directory: String,
    pub metadata_instance: String,
    pub metadata_database: String,
    pub metadata_table_suffix: String,
}

impl LaunchWriterPipelineInput {
    pub fn parameters(&self) -> LaunchParameters {
        let mut params = LaunchParameters::new();
        params
            .insert("sourceShardsFilePath", &self.source_shards_file_path)
            .insert("sessionFilePath", &self.session_file_path)
            .insert("sourceType", &self.source_type)
            .insert("sourceDbTimezoneOffset", &self.source_db_timezone_offset)
            .insert("timerIntervalInMilliseconds", self.timer_interval.to_string())
            .insert("startTimestamp", &self.start_timestamp)
            .insert("windowDuration", &self.window_duration)
            .insert("GCSInputDirectoryPath", &self.gcs_input_directory)
            .insert("spannerProjectId", &self.target.project_id)
            .insert("metadataInstance", &self.metadata_instance)
            .insert("metadataDatabase", &self.metadata_database)
            .insert("metadataTableSuffix", &self.metadata_table_suffix)
            .insert("runIdentifier", self.target.job_id.as_str())
            .insert("runMode", RUN_MODE_REGULAR);
        params
    }
}

/// Launches the pipeline applying staged changes to the source database.
pub struct LaunchWriterPipeline {
    pub input: LaunchWriterPipelineInput,
    pub output: LaunchPipelineOutput,
    stage: PipelineStage,
}

impl LaunchWriterPipeline {
    pub fn new(
        input: LaunchWriterPipelineInput,
        launcher: Arc<dyn PipelineLauncher>,
        store: Arc<dyn StagingStore>,
        registry: Arc<dyn JobRegistry>,
    ) -> Self {
        Self {
            input,
            output: LaunchPipelineOutput::default(),
            stage: PipelineStage {
                kind: ResourceKind::WriterPipeline,
                launcher,
                store,
                registry,
            },
        }
    }
}

#[async_trait]
impl Activity for LaunchWriterPipeline {
    fn name(&self) -> &'static str {
        "LaunchWriterPipeline"
    }

    #[instrument(skip_all, fields(activity = "LaunchWriterPipeline", job_id = %self.input.target.job_id))]
    async fn transaction(&mut self, ctx: &ActivityContext) -> Result<(), ActivityError> {
        let defaults = TuningDefaults::writer(self.input.target.template_path.as_str());
        self.stage
            .launch(
                ctx,
                &self.input.target,
                defaults,
                self.input.parameters(),
                &mut self.output,
            )
            .await
    }

    #[instrument(skip_all, fields(activity = "LaunchWriterPipeline", job_id = %self.input.target.job_id))]
    async fn compensation(&mut self, ctx: &ActivityContext) -> Result<(), ActivityError> {
        self.stage.cancel(ctx, &mut self.output).await
    }
}
