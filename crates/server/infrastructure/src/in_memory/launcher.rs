use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use reverse_repl_domain::{LaunchRequest, PipelineLauncher, PortError, PortResult};
use tokio::sync::Mutex;
use tracing::info;

use super::PortProbe;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelineState {
    Running,
    Cancelled,
}

#[derive(Debug, Clone)]
struct PipelineJob {
    name: String,
    state: PipelineState,
}

/// Records launch requests instead of submitting them.
///
/// Job names are unique among running jobs, as with the real launcher.
#[derive(Debug, Default)]
pub struct InMemoryPipelineLauncher {
    launched: Mutex<Vec<LaunchRequest>>,
    jobs: DashMap<String, PipelineJob>,
    /// Running job name to job id.
    active: DashMap<String, String>,
    sequence: AtomicU64,
    probe: PortProbe,
}

impl InMemoryPipelineLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn probe(&self) -> &PortProbe {
        &self.probe
    }

    /// Requests accepted so far, in launch order.
    pub async fn launched(&self) -> Vec<LaunchRequest> {
        self.launched.lock().await.clone()
    }

    pub fn is_cancelled(&self, job_id: &str) -> bool {
        self.jobs
            .get(job_id)
            .is_some_and(|j| j.state == PipelineState::Cancelled)
    }

    /// Dataflow-style job id: `<date>_<time>-<sequence>`.
    fn next_job_id(&self) -> String {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{}", Utc::now().format("%Y-%m-%d_%H_%M_%S"), seq)
    }
}

#[async_trait]
impl PipelineLauncher for InMemoryPipelineLauncher {
    async fn launch(&self, request: &LaunchRequest) -> PortResult<String> {
        self.probe.enter("launch")?;
        let job_id = match self.active.entry(request.job_name.clone()) {
            Entry::Occupied(_) => {
                return Err(PortError::AlreadyExists(request.job_name.clone()));
            }
            Entry::Vacant(slot) => {
                let job_id = self.next_job_id();
                slot.insert(job_id.clone());
                job_id
            }
        };
        self.jobs.insert(
            job_id.clone(),
            PipelineJob {
                name: request.job_name.clone(),
                state: PipelineState::Running,
            },
        );
        self.launched.lock().await.push(request.clone());
        info!(
            job_id = %job_id,
            job_name = %request.job_name,
            location = %request.location,
            "Pipeline launched"
        );
        Ok(job_id)
    }

    async fn find_active(
        &self,
        _project_id: &str,
        _location: &str,
        job_name: &str,
    ) -> PortResult<Option<String>> {
        self.probe.enter("find_active")?;
        Ok(self.active.get(job_name).map(|id| id.clone()))
    }

    async fn cancel(&self, project_id: &str, location: &str, job_id: &str) -> PortResult<()> {
        self.probe.enter("cancel")?;
        let name = {
            let mut job = self
                .jobs
                .get_mut(job_id)
                .ok_or_else(|| PortError::NotFound(job_id.to_string()))?;
            job.state = PipelineState::Cancelled;
            job.name.clone()
        };
        self.active.remove_if(&name, |_, id| id == job_id);
        info!(project_id, location, job_id, "Pipeline cancelled");
        Ok(())
    }
}
