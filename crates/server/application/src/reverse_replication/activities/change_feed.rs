use async_trait::async_trait;
use reverse_repl_domain::{
    ChangeFeedAdmin, ChangeFeedOptions, JobId, JobRegistry, JobResource, PortError, ResourceKind,
};
use saga_engine_core::{Activity, ActivityContext, ActivityError};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use super::{call_port, port_failure};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareChangeFeedInput {
    pub job_id: JobId,
    pub project_id: String,
    pub location: String,
    pub database_uri: String,
    pub change_stream_name: String,
    pub options: ChangeFeedOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrepareChangeFeedOutput {
    /// The change stream was created by this run.
    pub created: bool,
}

/// Ensures the change stream the reader consumes exists with the right options.
///
/// An existing stream with matching options is reused. One with different
/// options is a hard failure; it is never altered.
pub struct PrepareChangeFeed {
    pub input: PrepareChangeFeedInput,
    pub output: PrepareChangeFeedOutput,
    admin: Arc<dyn ChangeFeedAdmin>,
    registry: Arc<dyn JobRegistry>,
}

impl PrepareChangeFeed {
    pub fn new(
        input: PrepareChangeFeedInput,
        admin: Arc<dyn ChangeFeedAdmin>,
        registry: Arc<dyn JobRegistry>,
    ) -> Self {
        Self {
            input,
            output: PrepareChangeFeedOutput::default(),
            admin,
            registry,
        }
    }

    async fn validate_existing(&self, ctx: &ActivityContext) -> Result<(), ActivityError> {
        let input = &self.input;
        match ctx
            .guard(self.admin.validate_feed_options(
                &input.database_uri,
                &input.change_stream_name,
                &input.options,
            ))
            .await?
        {
            Ok(()) => {
                info!(change_stream = %input.change_stream_name, "Change stream already exists with the required options");
                Ok(())
            }
            Err(PortError::InvalidState(detail)) => Err(ActivityError::invalid_state(format!(
                "change stream {} exists on {} with incorrect options: {}",
                input.change_stream_name, input.database_uri, detail
            ))),
            Err(err) => Err(port_failure("validating change stream options", err)),
        }
    }
}

#[async_trait]
impl Activity for PrepareChangeFeed {
    fn name(&self) -> &'static str {
        "PrepareChangeFeed"
    }

    #[instrument(skip_all, fields(
        activity = "PrepareChangeFeed",
        job_id = %self.input.job_id,
        change_stream = %self.input.change_stream_name
    ))]
    async fn transaction(&mut self, ctx: &ActivityContext) -> Result<(), ActivityError> {
        let exists = call_port(
            ctx,
            "checking change stream",
            self.admin
                .feed_exists(&self.input.database_uri, &self.input.change_stream_name),
        )
        .await?;
        if exists {
            return self.validate_existing(ctx).await;
        }

        match ctx
            .guard(self.admin.create_feed(
                &self.input.database_uri,
                &self.input.change_stream_name,
                &self.input.options,
            ))
            .await?
        {
            Ok(()) => {}
            // Created concurrently; same rules as a pre-existing stream.
            Err(PortError::AlreadyExists(_)) => return self.validate_existing(ctx).await,
            Err(err) => return Err(port_failure("creating change stream", err)),
        }
        self.output.created = true;
        info!(
            retention = %self.input.options.retention_period,
            value_capture_type = %self.input.options.value_capture_type,
            "Change stream created"
        );

        let resource = JobResource {
            job_id: self.input.job_id.clone(),
            kind: ResourceKind::ChangeFeed,
            external_id: format!(
                "{}/changeStreams/{}",
                self.input.database_uri, self.input.change_stream_name
            ),
            project_id: self.input.project_id.clone(),
            location: self.input.location.clone(),
        };
        if let Err(err) = call_port(
            ctx,
            "recording change stream",
            self.registry.record_resource(&resource),
        )
        .await
        {
            warn!(error = %err, "Recording failed, dropping the change stream created by this run");
            if let Err(undo) = self.compensation(&ctx.detached()).await {
                error!(error = %undo, "Could not drop change stream");
            }
            return Err(err);
        }
        Ok(())
    }

    #[instrument(skip_all, fields(
        activity = "PrepareChangeFeed",
        job_id = %self.input.job_id,
        change_stream = %self.input.change_stream_name
    ))]
    async fn compensation(&mut self, ctx: &ActivityContext) -> Result<(), ActivityError> {
        if !self.output.created {
            return Ok(());
        }
        match ctx
            .guard(
                self.admin
                    .drop_feed(&self.input.database_uri, &self.input.change_stream_name),
            )
            .await?
        {
            Ok(()) | Err(PortError::NotFound(_)) => {
                self.output.created = false;
                info!("Change stream dropped");
                Ok(())
            }
            Err(err) => Err(port_failure("dropping change stream", err)),
        }
    }
}
