//! In-memory resource managers
//!
//! Process-local implementations of every provisioning port. They back the
//! CLI's dry-run mode and the test suites, and expose a [`PortProbe`] per
//! adapter for call counting and failure injection.

pub mod change_feed;
pub mod launcher;
pub mod location;
pub mod metadata;
pub mod probe;
pub mod registry;
pub mod staging;

use std::sync::Arc;

use reverse_repl_domain::ProvisioningPorts;

pub use change_feed::InMemoryChangeFeedAdmin;
pub use launcher::InMemoryPipelineLauncher;
pub use location::InMemoryLocationResolver;
pub use metadata::InMemoryMetadataStoreAdmin;
pub use probe::PortProbe;
pub use registry::InMemoryJobRegistry;
pub use staging::InMemoryStagingStore;

/// One in-memory adapter per port, kept concrete so callers can inspect state.
#[derive(Debug, Clone)]
pub struct InMemoryResourceManagers {
    pub location_resolver: Arc<InMemoryLocationResolver>,
    pub job_registry: Arc<InMemoryJobRegistry>,
    pub staging_store: Arc<InMemoryStagingStore>,
    pub change_feed_admin: Arc<InMemoryChangeFeedAdmin>,
    pub metadata_store_admin: Arc<InMemoryMetadataStoreAdmin>,
    pub pipeline_launcher: Arc<InMemoryPipelineLauncher>,
}

impl InMemoryResourceManagers {
    /// Every instance resolves to `default_location`.
    pub fn new(default_location: impl Into<String>) -> Self {
        Self {
            location_resolver: Arc::new(InMemoryLocationResolver::new(default_location)),
            job_registry: Arc::new(InMemoryJobRegistry::new()),
            staging_store: Arc::new(InMemoryStagingStore::new()),
            change_feed_admin: Arc::new(InMemoryChangeFeedAdmin::new()),
            metadata_store_admin: Arc::new(InMemoryMetadataStoreAdmin::new()),
            pipeline_launcher: Arc::new(InMemoryPipelineLauncher::new()),
        }
    }

    pub fn ports(&self) -> ProvisioningPorts {
        ProvisioningPorts {
            location_resolver: self.location_resolver.clone(),
            job_registry: self.job_registry.clone(),
            staging_store: self.staging_store.clone(),
            change_feed_admin: self.change_feed_admin.clone(),
            metadata_store_admin: self.metadata_store_admin.clone(),
            pipeline_launcher: self.pipeline_launcher.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reverse_repl_domain::{LocationResolver, MetadataStoreAdmin};

    #[tokio::test]
    async fn test_ports_share_state_with_managers() {
        let managers = InMemoryResourceManagers::new("us-east1");
        let ports = managers.ports();

        let location = ports
            .location_resolver
            .leader_location("projects/p/instances/i")
            .await
            .unwrap();
        assert_eq!(location, "us-east1");
        assert_eq!(
            managers.location_resolver.probe().call_count("leader_location"),
            1
        );

        ports
            .metadata_store_admin
            .create_database("projects/p/instances/i/databases/m")
            .await
            .unwrap();
        assert!(
            managers
                .metadata_store_admin
                .contains("projects/p/instances/i/databases/m")
        );
    }
}
