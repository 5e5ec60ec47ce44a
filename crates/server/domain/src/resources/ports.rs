//! Resource manager ports
//!
//! Every port reports failures through [`PortError`]. Adapters must map a
//! "resource already exists" response to [`PortError::AlreadyExists`] so
//! callers can treat a repeated run as a no-op.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::jobs::{JobRecord, JobResource, JobStatus};
use crate::pipelines::LaunchRequest;
use crate::shared_kernel::JobId;

/// Errors reported by resource manager adapters
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PortError {
    #[error("resource already exists: {0}")]
    AlreadyExists(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("invalid resource state: {0}")]
    InvalidState(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl PortError {
    pub fn is_already_exists(&self) -> bool {
        matches!(self, PortError::AlreadyExists(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PortError::NotFound(_))
    }
}

pub type PortResult<T> = Result<T, PortError>;

// ============================================================================
// Location lookup
// ============================================================================

/// Resolves where the target instance keeps its leader replicas.
#[async_trait]
pub trait LocationResolver: Send + Sync {
    /// `instance_uri` has the form `projects/<p>/instances/<i>`.
    async fn leader_location(&self, instance_uri: &str) -> PortResult<String>;
}

// ============================================================================
// Job registry
// ============================================================================

/// Durable store of job records and the resources each job created.
#[async_trait]
pub trait JobRegistry: Send + Sync {
    /// Fails with [`PortError::AlreadyExists`] when the id is taken.
    async fn create_job(&self, record: &JobRecord) -> PortResult<()>;

    async fn update_job_status(&self, job_id: &JobId, status: JobStatus) -> PortResult<()>;

    async fn record_resource(&self, resource: &JobResource) -> PortResult<()>;
}

// ============================================================================
// Staging object store
// ============================================================================

/// Attributes of a staging bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketSpec {
    pub name: String,
    pub location: String,
    /// Lifecycle rule deleting objects after this many days.
    pub ttl_days: Option<u32>,
    pub labels: BTreeMap<String, String>,
}

#[async_trait]
pub trait StagingStore: Send + Sync {
    async fn create_bucket(&self, project_id: &str, spec: &BucketSpec) -> PortResult<()>;

    async fn delete_bucket(&self, bucket: &str) -> PortResult<()>;

    async fn write_object(&self, bucket: &str, object: &str, contents: Vec<u8>) -> PortResult<()>;

    /// Reads `gs://bucket/object`.
    async fn read_object(&self, gcs_path: &str) -> PortResult<Vec<u8>>;
}

// ============================================================================
// Change feed admin
// ============================================================================

/// Options the reader pipeline requires on its change feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeFeedOptions {
    pub retention_period: String,
    pub value_capture_type: String,
}

impl Default for ChangeFeedOptions {
    fn default() -> Self {
        Self {
            retention_period: "7d".to_string(),
            value_capture_type: "NEW_ROW".to_string(),
        }
    }
}

#[async_trait]
pub trait ChangeFeedAdmin: Send + Sync {
    async fn feed_exists(&self, database_uri: &str, name: &str) -> PortResult<bool>;

    /// Fails with [`PortError::InvalidState`] when the existing feed's
    /// options differ from `expected`.
    async fn validate_feed_options(
        &self,
        database_uri: &str,
        name: &str,
        expected: &ChangeFeedOptions,
    ) -> PortResult<()>;

    async fn create_feed(
        &self,
        database_uri: &str,
        name: &str,
        options: &ChangeFeedOptions,
    ) -> PortResult<()>;

    async fn drop_feed(&self, database_uri: &str, name: &str) -> PortResult<()>;
}

// ============================================================================
// Metadata database admin
// ============================================================================

#[async_trait]
pub trait MetadataStoreAdmin: Send + Sync {
    async fn database_exists(&self, database_uri: &str) -> PortResult<bool>;

    async fn create_database(&self, database_uri: &str) -> PortResult<()>;

    async fn drop_database(&self, database_uri: &str) -> PortResult<()>;
}

// ============================================================================
// Pipeline launcher
// ============================================================================

#[async_trait]
pub trait PipelineLauncher: Send + Sync {
    /// Launches a flex template and returns the pipeline job id.
    ///
    /// Fails with [`PortError::AlreadyExists`] when an active job already
    /// carries the requested name.
    async fn launch(&self, request: &LaunchRequest) -> PortResult<String>;

    /// Id of the active job named `job_name`, if any.
    async fn find_active(
        &self,
        project_id: &str,
        location: &str,
        job_name: &str,
    ) -> PortResult<Option<String>>;

    async fn cancel(&self, project_id: &str, location: &str, job_id: &str) -> PortResult<()>;
}

// ============================================================================
// Bundle
// ============================================================================

/// Handles to every resource manager the provisioning flow uses.
#[derive(Clone)]
pub struct ProvisioningPorts {
    pub location_resolver: Arc<dyn LocationResolver>,
    pub job_registry: Arc<dyn JobRegistry>,
    pub staging_store: Arc<dyn StagingStore>,
    pub change_feed_admin: Arc<dyn ChangeFeedAdmin>,
    pub metadata_store_admin: Arc<dyn MetadataStoreAdmin>,
    pub pipeline_launcher: Arc<dyn PipelineLauncher>,
}
