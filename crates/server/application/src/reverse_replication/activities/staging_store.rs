use async_trait::async_trait;
use reverse_repl_domain::{
    BucketSpec, JobId, JobRegistry, JobResource, PortError, ResourceKind, STAGED_SESSION_OBJECT,
    STAGED_SOURCE_CONFIG_OBJECT, StagingStore, is_gcs_path,
};
use saga_engine_core::{Activity, ActivityContext, ActivityError};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use super::{call_port, port_failure};

/// Bucket label carrying the owning job id.
pub const JOB_ID_LABEL: &str = "smt-job-id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareStagingStoreInput {
    pub job_id: JobId,
    pub staging_required: bool,
    pub bucket_name: String,
    pub project_id: String,
    pub location: String,
    /// Caller's session path; uploaded when it is a local file.
    pub session_file_path: String,
    /// Caller's source connection path; uploaded when it is a local file.
    pub source_connection_config: String,
    /// Zero disables the lifecycle rule.
    pub ttl_days: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrepareStagingStoreOutput {
    /// The bucket was created by this run.
    pub bucket_created: bool,
    /// Object names uploaded into the bucket.
    pub staged_objects: Vec<String>,
}

/// Creates the staging bucket and uploads local description files into it.
pub struct PrepareStagingStore {
    pub input: PrepareStagingStoreInput,
    pub output: PrepareStagingStoreOutput,
    store: Arc<dyn StagingStore>,
    registry: Arc<dyn JobRegistry>,
}

impl PrepareStagingStore {
    pub fn new(
        input: PrepareStagingStoreInput,
        store: Arc<dyn StagingStore>,
        registry: Arc<dyn JobRegistry>,
    ) -> Self {
        Self {
            input,
            output: PrepareStagingStoreOutput::default(),
            store,
            registry,
        }
    }

    fn bucket_spec(&self) -> BucketSpec {
        BucketSpec {
            name: self.input.bucket_name.clone(),
            location: self.input.location.clone(),
            ttl_days: (self.input.ttl_days > 0).then_some(self.input.ttl_days),
            labels: BTreeMap::from([(
                JOB_ID_LABEL.to_string(),
                self.input.job_id.to_string(),
            )]),
        }
    }

    async fn ensure_bucket(&mut self, ctx: &ActivityContext) -> Result<(), ActivityError> {
        let spec = self.bucket_spec();
        match ctx
            .guard(self.store.create_bucket(&self.input.project_id, &spec))
            .await?
        {
            Ok(()) => {
                self.output.bucket_created = true;
                info!(bucket = %spec.name, location = %spec.location, "Staging bucket created");
            }
            Err(PortError::AlreadyExists(_)) => {
                info!(bucket = %spec.name, "Staging bucket already exists");
                return Ok(());
            }
            Err(err) => return Err(port_failure("creating staging bucket", err)),
        }

        let resource = JobResource {
            job_id: self.input.job_id.clone(),
            kind: ResourceKind::StagingBucket,
            external_id: spec.name,
            project_id: self.input.project_id.clone(),
            location: self.input.location.clone(),
        };
        call_port(
            ctx,
            "recording staging bucket",
            self.registry.record_resource(&resource),
        )
        .await
    }

    async fn upload_local_file(
        &mut self,
        ctx: &ActivityContext,
        path: &str,
        object: &str,
    ) -> Result<(), ActivityError> {
        if is_gcs_path(path) {
            debug!(path, "File already hosted, nothing to stage");
            return Ok(());
        }

        let contents = ctx
            .guard(tokio::fs::read(path))
            .await?
            .map_err(|e| ActivityError::external(format!("reading {}", path), e))?;
        call_port(
            ctx,
            &format!("uploading {} to {}", path, self.input.bucket_name),
            self.store
                .write_object(&self.input.bucket_name, object, contents),
        )
        .await?;

        info!(path, bucket = %self.input.bucket_name, object, "Staged local file");
        self.output.staged_objects.push(object.to_string());
        Ok(())
    }

    async fn stage(&mut self, ctx: &ActivityContext) -> Result<(), ActivityError> {
        self.ensure_bucket(ctx).await?;

        let session = self.input.session_file_path.clone();
        self.upload_local_file(ctx, &session, STAGED_SESSION_OBJECT)
            .await?;
        let source_config = self.input.source_connection_config.clone();
        self.upload_local_file(ctx, &source_config, STAGED_SOURCE_CONFIG_OBJECT)
            .await
    }
}

#[async_trait]
impl Activity for PrepareStagingStore {
    fn name(&self) -> &'static str {
        "PrepareStagingStore"
    }

    #[instrument(skip_all, fields(activity = "PrepareStagingStore", job_id = %self.input.job_id))]
    async fn transaction(&mut self, ctx: &ActivityContext) -> Result<(), ActivityError> {
        if !self.input.staging_required {
            debug!("Staging not required, skipping");
            return Ok(());
        }

        if let Err(err) = self.stage(ctx).await {
            if self.output.bucket_created {
                warn!(error = %err, "Staging failed, deleting the bucket created by this run");
                if let Err(undo) = self.compensation(&ctx.detached()).await {
                    error!(error = %undo, "Could not delete staging bucket");
                }
            }
            return Err(err);
        }
        Ok(())
    }

    #[instrument(skip_all, fields(activity = "PrepareStagingStore", job_id = %self.input.job_id))]
    async fn compensation(&mut self, ctx: &ActivityContext) -> Result<(), ActivityError> {
        if !self.output.bucket_created {
            return Ok(());
        }
        match ctx
            .guard(self.store.delete_bucket(&self.input.bucket_name))
            .await?
        {
            Ok(()) | Err(PortError::NotFound(_)) => {
                info!(bucket = %self.input.bucket_name, "Staging bucket deleted");
                self.output = PrepareStagingStoreOutput::default();
                Ok(())
            }
            Err(err) => Err(port_failure("deleting staging bucket", err)),
        }
    }
}
