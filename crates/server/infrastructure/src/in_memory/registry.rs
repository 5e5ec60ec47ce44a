use async_trait::async_trait;
use dashmap::DashMap;
use reverse_repl_domain::{
    JobId, JobRecord, JobRegistry, JobResource, JobStatus, PortError, PortResult,
};
use tracing::debug;

use super::PortProbe;

/// Job registry kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryJobRegistry {
    jobs: DashMap<JobId, JobRecord>,
    resources: DashMap<JobId, Vec<JobResource>>,
    probe: PortProbe,
}

impl InMemoryJobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn probe(&self) -> &PortProbe {
        &self.probe
    }

    /// Seeds a record without going through the port.
    pub fn insert_job(&self, record: JobRecord) {
        self.jobs.insert(record.job_id.clone(), record);
    }

    pub fn job(&self, job_id: &JobId) -> Option<JobRecord> {
        self.jobs.get(job_id).map(|r| r.clone())
    }

    /// Resources recorded for `job_id`, in recording order.
    pub fn resources(&self, job_id: &JobId) -> Vec<JobResource> {
        self.resources
            .get(job_id)
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[async_trait]
impl JobRegistry for InMemoryJobRegistry {
    async fn create_job(&self, record: &JobRecord) -> PortResult<()> {
        self.probe.enter("create_job")?;
        match self.jobs.entry(record.job_id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(PortError::AlreadyExists(record.job_id.to_string()))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(record.clone());
                debug!(job_id = %record.job_id, "Job record stored");
                Ok(())
            }
        }
    }

    async fn update_job_status(&self, job_id: &JobId, status: JobStatus) -> PortResult<()> {
        self.probe.enter("update_job_status")?;
        let mut record = self
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| PortError::NotFound(job_id.to_string()))?;
        record.status = status;
        Ok(())
    }

    async fn record_resource(&self, resource: &JobResource) -> PortResult<()> {
        self.probe.enter("record_resource")?;
        self.resources
            .entry(resource.job_id.clone())
            .or_default()
            .push(resource.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reverse_repl_domain::ResourceKind;

    fn record() -> JobRecord {
        JobRecord::new(JobId::from_string("smt-job-abc"), "n", "p", "i", "d", "{}")
    }

    #[tokio::test]
    async fn test_create_is_exclusive() {
        let registry = InMemoryJobRegistry::new();
        registry.create_job(&record()).await.unwrap();

        let err = registry.create_job(&record()).await.unwrap_err();
        assert!(err.is_already_exists());
    }

    #[tokio::test]
    async fn test_status_updates_and_resources() {
        let registry = InMemoryJobRegistry::new();
        let job_id = JobId::from_string("smt-job-abc");

        assert!(
            registry
                .update_job_status(&job_id, JobStatus::Running)
                .await
                .unwrap_err()
                .is_not_found()
        );

        registry.create_job(&record()).await.unwrap();
        registry
            .update_job_status(&job_id, JobStatus::Running)
            .await
            .unwrap();
        assert_eq!(registry.job(&job_id).unwrap().status, JobStatus::Running);

        registry
            .record_resource(&JobResource {
                job_id: job_id.clone(),
                kind: ResourceKind::ChangeFeed,
                external_id: "feed".into(),
                project_id: "p".into(),
                location: "l".into(),
            })
            .await
            .unwrap();
        assert_eq!(registry.resources(&job_id).len(), 1);
    }
}
