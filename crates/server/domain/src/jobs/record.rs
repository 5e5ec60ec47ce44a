use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::shared_kernel::JobId;

/// Lifecycle status stored on a job record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Created,
    Running,
    Failed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Created => write!(f, "CREATED"),
            JobStatus::Running => write!(f, "RUNNING"),
            JobStatus::Failed => write!(f, "FAILED"),
        }
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(JobStatus::Created),
            "RUNNING" => Ok(JobStatus::Running),
            "FAILED" => Ok(JobStatus::Failed),
            _ => Err(format!("Invalid JobStatus: {}", s)),
        }
    }
}

/// Durable summary of one reverse replication job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub job_id: JobId,
    pub job_name: String,
    pub project_id: String,
    pub instance_id: String,
    pub database_id: String,
    /// The normalized request as an opaque JSON document.
    pub job_data: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn new(
        job_id: JobId,
        job_name: impl Into<String>,
        project_id: impl Into<String>,
        instance_id: impl Into<String>,
        database_id: impl Into<String>,
        job_data: impl Into<String>,
    ) -> Self {
        Self {
            job_id,
            job_name: job_name.into(),
            project_id: project_id.into(),
            instance_id: instance_id.into(),
            database_id: database_id.into(),
            job_data: job_data.into(),
            status: JobStatus::Created,
            created_at: Utc::now(),
        }
    }
}

/// Kind of external resource a job owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceKind {
    StagingBucket,
    ChangeFeed,
    MetadataDatabase,
    ReaderPipeline,
    WriterPipeline,
}

/// A resource created on behalf of a job, recorded for later cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResource {
    pub job_id: JobId,
    pub kind: ResourceKind,
    /// Provider-side identifier (bucket name, feed URI, pipeline job id).
    pub external_id: String,
    pub project_id: String,
    pub location: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(JobStatus::Created, "CREATED")]
    #[case(JobStatus::Running, "RUNNING")]
    #[case(JobStatus::Failed, "FAILED")]
    fn test_job_status_text(#[case] status: JobStatus, #[case] text: &str) {
        assert_eq!(status.to_string(), text);
        assert_eq!(text.parse::<JobStatus>().unwrap(), status);
        assert_eq!(serde_json::to_value(status).unwrap(), text);
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        assert!("PENDING".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_new_record_starts_created() {
        let record = JobRecord::new(
            JobId::from_string("smt-job-abc"),
            "nightly",
            "p1",
            "inst",
            "db",
            "{}",
        );
        assert_eq!(record.status, JobStatus::Created);
        assert_eq!(record.job_name, "nightly");
    }
}
