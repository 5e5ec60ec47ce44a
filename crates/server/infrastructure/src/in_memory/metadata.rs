use async_trait::async_trait;
use dashmap::DashSet;
use reverse_repl_domain::{MetadataStoreAdmin, PortError, PortResult};

use super::PortProbe;

#[derive(Debug, Default)]
pub struct InMemoryMetadataStoreAdmin {
    databases: DashSet<String>,
    probe: PortProbe,
}

impl InMemoryMetadataStoreAdmin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn probe(&self) -> &PortProbe {
        &self.probe
    }

    pub fn insert_database(&self, database_uri: &str) {
        self.databases.insert(database_uri.to_string());
    }

    pub fn contains(&self, database_uri: &str) -> bool {
        self.databases.contains(database_uri)
    }
}

#[async_trait]
impl MetadataStoreAdmin for InMemoryMetadataStoreAdmin {
    async fn database_exists(&self, database_uri: &str) -> PortResult<bool> {
        self.probe.enter("database_exists")?;
        Ok(self.contains(database_uri))
    }

    async fn create_database(&self, database_uri: &str) -> PortResult<()> {
        self.probe.enter("create_database")?;
        if self.databases.insert(database_uri.to_string()) {
            Ok(())
        } else {
            Err(PortError::AlreadyExists(database_uri.to_string()))
        }
    }

    async fn drop_database(&self, database_uri: &str) -> PortResult<()> {
        self.probe.enter("drop_database")?;
        self.databases
            .remove(database_uri)
            .map(|_| ())
            .ok_or_else(|| PortError::NotFound(database_uri.to_string()))
    }
}
