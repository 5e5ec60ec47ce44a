use async_trait::async_trait;
use dashmap::DashMap;
use reverse_repl_domain::{BucketSpec, PortError, PortResult, StagingStore, split_gcs_path};
use tracing::debug;

use super::PortProbe;

/// Object store kept in process memory. Objects are keyed by `(bucket, object)`.
#[derive(Debug, Default)]
pub struct InMemoryStagingStore {
    buckets: DashMap<String, BucketSpec>,
    objects: DashMap<(String, String), Vec<u8>>,
    probe: PortProbe,
}

impl InMemoryStagingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn probe(&self) -> &PortProbe {
        &self.probe
    }

    pub fn insert_bucket(&self, spec: BucketSpec) {
        self.buckets.insert(spec.name.clone(), spec);
    }

    /// Seeds `gs://bucket/object`, creating the bucket when it is unknown.
    ///
    /// Paths that are not valid object paths are ignored.
    pub fn put_object(&self, gcs_path: &str, contents: Vec<u8>) {
        let Some((bucket, object)) = split_gcs_path(gcs_path) else {
            return;
        };
        self.buckets
            .entry(bucket.to_string())
            .or_insert_with(|| BucketSpec {
                name: bucket.to_string(),
                location: String::new(),
                ttl_days: None,
                labels: Default::default(),
            });
        self.objects
            .insert((bucket.to_string(), object.to_string()), contents);
    }

    pub fn bucket(&self, name: &str) -> Option<BucketSpec> {
        self.buckets.get(name).map(|b| b.clone())
    }

    pub fn object(&self, bucket: &str, object: &str) -> Option<Vec<u8>> {
        self.objects
            .get(&(bucket.to_string(), object.to_string()))
            .map(|o| o.clone())
    }
}

#[async_trait]
impl StagingStore for InMemoryStagingStore {
    async fn create_bucket(&self, project_id: &str, spec: &BucketSpec) -> PortResult<()> {
        self.probe.enter("create_bucket")?;
        if self.buckets.contains_key(&spec.name) {
            return Err(PortError::AlreadyExists(spec.name.clone()));
        }
        self.buckets.insert(spec.name.clone(), spec.clone());
        debug!(project_id, bucket = %spec.name, "Bucket created");
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> PortResult<()> {
        self.probe.enter("delete_bucket")?;
        self.buckets
            .remove(bucket)
            .ok_or_else(|| PortError::NotFound(bucket.to_string()))?;
        self.objects.retain(|(b, _), _| b != bucket);
        Ok(())
    }

    async fn write_object(&self, bucket: &str, object: &str, contents: Vec<u8>) -> PortResult<()> {
        self.probe.enter("write_object")?;
        if !self.buckets.contains_key(bucket) {
            return Err(PortError::NotFound(bucket.to_string()));
        }
        self.objects
            .insert((bucket.to_string(), object.to_string()), contents);
        Ok(())
    }

    async fn read_object(&self, gcs_path: &str) -> PortResult<Vec<u8>> {
        self.probe.enter("read_object")?;
        let (bucket, object) = split_gcs_path(gcs_path)
            .ok_or_else(|| PortError::InvalidState(format!("not an object path: {}", gcs_path)))?;
        self.object(bucket, object)
            .ok_or_else(|| PortError::NotFound(gcs_path.to_string()))
    }
}
