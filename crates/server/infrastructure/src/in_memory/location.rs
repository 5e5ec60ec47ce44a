use async_trait::async_trait;
use dashmap::DashMap;
use reverse_repl_domain::{LocationResolver, PortError, PortResult};

use super::PortProbe;

/// Resolves every instance to a fixed location unless overridden per instance.
#[derive(Debug, Default)]
pub struct InMemoryLocationResolver {
    default_location: Option<String>,
    locations: DashMap<String, String>,
    probe: PortProbe,
}

impl InMemoryLocationResolver {
    pub fn new(default_location: impl Into<String>) -> Self {
        Self {
            default_location: Some(default_location.into()),
            ..Default::default()
        }
    }

    /// A resolver that knows no instance until [`Self::insert`] is called.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn insert(&self, instance_uri: impl Into<String>, location: impl Into<String>) {
        self.locations.insert(instance_uri.into(), location.into());
    }

    pub fn probe(&self) -> &PortProbe {
        &self.probe
    }
}

#[async_trait]
impl LocationResolver for InMemoryLocationResolver {
    async fn leader_location(&self, instance_uri: &str) -> PortResult<String> {
        self.probe.enter("leader_location")?;
        self.locations
            .get(instance_uri)
            .map(|l| l.clone())
            .or_else(|| self.default_location.clone())
            .ok_or_else(|| PortError::NotFound(instance_uri.to_string()))
    }
}
