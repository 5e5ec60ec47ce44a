//! Activity catalog for the "create reverse replication" job

use reverse_repl_domain::{
    ChangeFeedOptions, NormalizedJobRequest, ProvisioningPorts, random_token,
};
use reverse_repl_shared::config::AppConfig;
use saga_engine_core::Activity;

use super::activities::*;

/// Values the catalog takes from configuration rather than the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSettings {
    pub reader_template_path: String,
    pub writer_template_path: String,
    pub staging_bucket_ttl_days: u32,
    pub reader_job_name_suffix: String,
    pub writer_job_name_suffix: String,
}

impl CatalogSettings {
    /// Settings from `config` with fresh random job-name suffixes.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            reader_template_path: config.templates.reader_template_path.clone(),
            writer_template_path: config.templates.writer_template_path.clone(),
            staging_bucket_ttl_days: config.staging.bucket_ttl_days,
            reader_job_name_suffix: random_token(),
            writer_job_name_suffix: random_token(),
        }
    }
}

/// The seven activities of one provisioning run, in execution order.
///
/// Fields stay accessible so callers can read each activity's output once
/// the saga has run.
pub struct ReverseReplicationCatalog {
    pub register_job: RegisterJob,
    pub prepare_staging_store: PrepareStagingStore,
    pub prepare_change_feed: PrepareChangeFeed,
    pub prepare_metadata_store: PrepareMetadataStore,
    pub launch_reader: LaunchReaderPipeline,
    pub launch_writer: LaunchWriterPipeline,
    pub finalize_job: FinalizeJobStatus,
}

impl ReverseReplicationCatalog {
    /// Binds `normalized` into each activity's input.
    pub fn build(
        normalized: &NormalizedJobRequest,
        settings: &CatalogSettings,
        ports: &ProvisioningPorts,
    ) -> Result<Self, serde_json::Error> {
        let request = &normalized.request;
        let job_id = &normalized.job_id;
        let job_data = serde_json::to_string(normalized)?;

        let target = |tuning_config_path: &str, template_path: &str, suffix: &str| PipelineTarget {
            job_id: job_id.clone(),
            project_id: request.project_id.clone(),
            location: normalized.location.clone(),
            tuning_config_path: tuning_config_path.to_string(),
            template_path: template_path.to_string(),
            job_name_suffix: suffix.to_string(),
        };

        Ok(Self {
            register_job: RegisterJob::new(
                RegisterJobInput {
                    job_id: job_id.clone(),
                    job_name: request.job_name.clone(),
                    project_id: request.project_id.clone(),
                    instance_id: request.instance_id.clone(),
                    database_id: request.database_id.clone(),
                    job_data,
                },
                ports.job_registry.clone(),
            ),
            prepare_staging_store: PrepareStagingStore::new(
                PrepareStagingStoreInput {
                    job_id: job_id.clone(),
                    staging_required: normalized.staging_required,
                    bucket_name: normalized.staging_bucket_name.clone(),
                    project_id: request.project_id.clone(),
                    location: normalized.location.clone(),
                    session_file_path: request.session_file_path.clone(),
                    source_connection_config: request.source_connection_config.clone(),
                    ttl_days: settings.staging_bucket_ttl_days,
                },
                ports.staging_store.clone(),
                ports.job_registry.clone(),
            ),
            prepare_change_feed: PrepareChangeFeed::new(
                PrepareChangeFeedInput {
                    job_id: job_id.clone(),
                    project_id: request.project_id.clone(),
                    location: normalized.location.clone(),
                    database_uri: normalized.target_database_uri(),
                    change_stream_name: request.change_stream_name.clone(),
                    options: ChangeFeedOptions::default(),
                },
                ports.change_feed_admin.clone(),
                ports.job_registry.clone(),
            ),
            prepare_metadata_store: PrepareMetadataStore::new(
                PrepareMetadataStoreInput {
                    job_id: job_id.clone(),
                    project_id: request.project_id.clone(),
                    location: normalized.location.clone(),
                    database_uri: normalized.metadata_database_uri(),
                },
                ports.metadata_store_admin.clone(),
                ports.job_registry.clone(),
            ),
            launch_reader: LaunchReaderPipeline::new(
                LaunchReaderPipelineInput {
                    target: target(
                        &request.reader_config,
                        &settings.reader_template_path,
                        &settings.reader_job_name_suffix,
                    ),
                    change_stream_name: request.change_stream_name.clone(),
                    instance_id: request.instance_id.clone(),
                    database_id: request.database_id.clone(),
                    metadata_instance: request.metadata_instance.clone(),
                    metadata_database: request.metadata_database.clone(),
                    session_file_path: normalized.session_file_gcs_path.clone(),
                    source_shards_file_path: normalized.source_connection_config_gcs_path.clone(),
                    gcs_output_directory: request.gcs_data_directory.clone(),
                    start_timestamp: request.start_timestamp.clone(),
                    end_timestamp: request.end_timestamp.clone(),
                    window_duration: request.window_duration.clone(),
                    filtration_mode: request.filtration_mode.clone(),
                    metadata_table_suffix: request.metadata_table_suffix.clone(),
                    skip_directory_name: request.skip_directory_name.clone(),
                    sharding_custom_jar_path: request.sharding_custom_jar_path.clone(),
                    sharding_custom_class_name: request.sharding_custom_class_name.clone(),
                },
                ports.pipeline_launcher.clone(),
                ports.staging_store.clone(),
                ports.job_registry.clone(),
            ),
            launch_writer: LaunchWriterPipeline::new(
                LaunchWriterPipelineInput {
                    target: target(
                        &request.writer_config,
                        &settings.writer_template_path,
                        &settings.writer_job_name_suffix,
                    ),
                    source_shards_file_path: normalized.source_connection_config_gcs_path.clone(),
                    session_file_path: normalized.session_file_gcs_path.clone(),
                    source_type: request.source_type.clone(),
                    source_db_timezone_offset: request.source_db_timezone_offset.clone(),
                    timer_interval: request.timer_interval,
                    start_timestamp: request.start_timestamp.clone(),
                    window_duration: request.window_duration.clone(),
                    gcs_input_directory: request.gcs_data_directory.clone(),
                    metadata_instance: request.metadata_instance.clone(),
                    metadata_database: request.metadata_database.clone(),
                    metadata_table_suffix: request.metadata_table_suffix.clone(),
                },
                ports.pipeline_launcher.clone(),
                ports.staging_store.clone(),
                ports.job_registry.clone(),
            ),
            finalize_job: FinalizeJobStatus::new(
                FinalizeJobStatusInput {
                    job_id: job_id.clone(),
                },
                ports.job_registry.clone(),
            ),
        })
    }

    /// The activities in execution order, as the orchestrator consumes them.
    pub fn activities_mut(&mut self) -> [&mut dyn Activity; 7] {
        [
            &mut self.register_job,
            &mut self.prepare_staging_store,
            &mut self.prepare_change_feed,
            &mut self.prepare_metadata_store,
            &mut self.launch_reader,
            &mut self.launch_writer,
            &mut self.finalize_job,
        ]
    }
}
