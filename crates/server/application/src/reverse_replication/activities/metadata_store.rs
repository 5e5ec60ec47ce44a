use async_trait::async_trait;
use reverse_repl_domain::{
    JobId, JobRegistry, JobResource, MetadataStoreAdmin, PortError, ResourceKind,
};
use saga_engine_core::{Activity, ActivityContext, ActivityError};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use super::{call_port, port_failure};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareMetadataStoreInput {
    pub job_id: JobId,
    pub project_id: String,
    pub location: String,
    pub database_uri: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrepareMetadataStoreOutput {
    /// The database was created by this run.
    pub created: bool,
}

/// Ensures the database the pipelines keep their bookkeeping tables in exists.
pub struct PrepareMetadataStore {
    pub input: PrepareMetadataStoreInput,
    pub output: PrepareMetadataStoreOutput,
    admin: Arc<dyn MetadataStoreAdmin>,
    registry: Arc<dyn JobRegistry>,
}

impl PrepareMetadataStore {
    pub fn new(
        input: PrepareMetadataStoreInput,
        admin: Arc<dyn MetadataStoreAdmin>,
        registry: Arc<dyn JobRegistry>,
    ) -> Self {
        Self {
            input,
            output: PrepareMetadataStoreOutput::default(),
            admin,
            registry,
        }
    }
}

#[async_trait]
impl Activity for PrepareMetadataStore {
    fn name(&self) -> &'static str {
        "PrepareMetadataStore"
    }

    #[instrument(skip_all, fields(activity = "PrepareMetadataStore", database = %self.input.database_uri))]
    async fn transaction(&mut self, ctx: &ActivityContext) -> Result<(), ActivityError> {
        let exists = call_port(
            ctx,
            "checking metadata database",
            self.admin.database_exists(&self.input.database_uri),
        )
        .await?;
        if exists {
            info!("Metadata database already exists");
            return Ok(());
        }

        match ctx
            .guard(self.admin.create_database(&self.input.database_uri))
            .await?
        {
            Ok(()) => {}
            Err(PortError::AlreadyExists(_)) => {
                info!("Metadata database created concurrently, reusing it");
                return Ok(());
            }
            Err(err) => return Err(port_failure("creating metadata database", err)),
        }
        self.output.created = true;
        info!("Metadata database created");

        let resource = JobResource {
            job_id: self.input.job_id.clone(),
            kind: ResourceKind::MetadataDatabase,
            external_id: self.input.database_uri.clone(),
            project_id: self.input.project_id.clone(),
            location: self.input.location.clone(),
        };
        if let Err(err) = call_port(
            ctx,
            "recording metadata database",
            self.registry.record_resource(&resource),
        )
        .await
        {
            warn!(error = %err, "Recording failed, dropping the database created by this run");
            if let Err(undo) = self.compensation(&ctx.detached()).await {
                error!(error = %undo, "Could not drop metadata database");
            }
            return Err(err);
        }
        Ok(())
    }

    #[instrument(skip_all, fields(activity = "PrepareMetadataStore", database = %self.input.database_uri))]
    async fn compensation(&mut self, ctx: &ActivityContext) -> Result<(), ActivityError> {
        if !self.output.created {
            return Ok(());
        }
        match ctx
            .guard(self.admin.drop_database(&self.input.database_uri))
            .await?
        {
            Ok(()) | Err(PortError::NotFound(_)) => {
                self.output.created = false;
                info!("Metadata database dropped");
                Ok(())
            }
            Err(err) => Err(port_failure("dropping metadata database", err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reverse_repl_infrastructure::{InMemoryJobRegistry, InMemoryMetadataStoreAdmin};

    const DB: &str = "projects/p1/instances/inst/databases/smt-rr-metadata-abc";

    fn activity(admin: &Arc<InMemoryMetadataStoreAdmin>) -> PrepareMetadataStore {
        PrepareMetadataStore::new(
            PrepareMetadataStoreInput {
                job_id: JobId::from_string("smt-job-abc"),
                project_id: "p1".into(),
                location: "us-central1".into(),
                database_uri: DB.into(),
            },
            admin.clone(),
            Arc::new(InMemoryJobRegistry::new()),
        )
    }

    #[tokio::test]
    async fn test_creates_and_drops_database() {
        let admin = Arc::new(InMemoryMetadataStoreAdmin::new());
        let mut activity = activity(&admin);
        let ctx = ActivityContext::new("abc");

        activity.transaction(&ctx).await.unwrap();
        assert!(activity.output.created);
        assert!(admin.contains(DB));

        activity.compensation(&ctx).await.unwrap();
        assert!(!admin.contains(DB));
    }

    #[tokio::test]
    async fn test_existing_database_is_a_noop() {
        let admin = Arc::new(InMemoryMetadataStoreAdmin::new());
        admin.insert_database(DB);
        let mut activity = activity(&admin);
        let ctx = ActivityContext::new("abc");

        activity.transaction(&ctx).await.unwrap();
        assert!(!activity.output.created);
        assert_eq!(admin.probe().call_count("create_database"), 0);

        activity.compensation(&ctx).await.unwrap();
        assert!(admin.contains(DB));
    }

    #[tokio::test]
    async fn test_failed_drop_is_reported() {
        let admin = Arc::new(InMemoryMetadataStoreAdmin::new());
        let mut activity = activity(&admin);
        let ctx = ActivityContext::new("abc");
        activity.transaction(&ctx).await.unwrap();

        admin
            .probe()
            .fail_on("drop_database", PortError::Unavailable("locked".into()));
        let err = activity.compensation(&ctx).await.unwrap_err();

        assert!(err.to_string().contains("locked"));
        assert!(activity.output.created);
    }
}
