use serde::{Deserialize, Serialize};

use crate::shared_kernel::{JobId, RunId, database_uri, instance_uri};

/// Raw parameters of a "create reverse replication" request.
///
/// Every field is optional on the wire; the normalizer decides which are
/// required and fills the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobRequest {
    pub project_id: String,
    pub instance_id: String,
    pub database_id: String,

    /// Local path or `gs://` URI of the migration session file.
    pub session_file_path: String,
    /// Local path or `gs://` URI of the source shard connection file.
    pub source_connection_config: String,
    pub gcs_data_directory: String,

    pub change_stream_name: String,
    pub start_timestamp: String,
    pub end_timestamp: String,
    pub window_duration: String,
    pub timer_interval: i64,
    pub filtration_mode: String,
    pub source_type: String,
    pub source_db_timezone_offset: String,

    pub metadata_instance: String,
    pub metadata_database: String,
    pub metadata_table_suffix: String,
    pub skip_directory_name: String,

    pub sharding_custom_jar_path: String,
    pub sharding_custom_class_name: String,

    /// Path to the reader tuning JSON, empty for defaults.
    pub reader_config: String,
    /// Path to the writer tuning JSON, empty for defaults.
    pub writer_config: String,

    pub job_name: String,
}

/// A request after validation, with every default and derived value filled.
///
/// `request` keeps the caller's original file paths so the staging step can
/// upload local files; pipelines consume the resolved `*_gcs_path` fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedJobRequest {
    #[serde(flatten)]
    pub request: JobRequest,
    pub run_id: RunId,
    pub job_id: JobId,
    pub staging_required: bool,
    /// Empty when `staging_required` is false.
    pub staging_bucket_name: String,
    pub session_file_gcs_path: String,
    pub source_connection_config_gcs_path: String,
    /// Leader location of the target instance.
    pub location: String,
}

impl NormalizedJobRequest {
    pub fn target_instance_uri(&self) -> String {
        instance_uri(&self.request.project_id, &self.request.instance_id)
    }

    pub fn target_database_uri(&self) -> String {
        database_uri(
            &self.request.project_id,
            &self.request.instance_id,
            &self.request.database_id,
        )
    }

    pub fn metadata_database_uri(&self) -> String {
        database_uri(
            &self.request.project_id,
            &self.request.metadata_instance,
            &self.request.metadata_database,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_deserializes_camel_case_with_defaults() {
        let json = r#"{
            "projectId": "p1",
            "instanceId": "inst",
            "databaseId": "db",
            "sessionFilePath": "/tmp/session.json",
            "timerInterval": 5
        }"#;

        let request: JobRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.project_id, "p1");
        assert_eq!(request.session_file_path, "/tmp/session.json");
        assert_eq!(request.timer_interval, 5);
        assert!(request.filtration_mode.is_empty());
        assert!(request.reader_config.is_empty());
    }

    #[test]
    fn test_normalized_request_flattens_request_fields() {
        let normalized = NormalizedJobRequest {
            request: JobRequest {
                project_id: "p1".into(),
                instance_id: "inst".into(),
                database_id: "db".into(),
                metadata_instance: "meta".into(),
                metadata_database: "md".into(),
                ..Default::default()
            },
            run_id: RunId::from_string("abc"),
            job_id: JobId::from_string("smt-job-abc"),
            staging_required: false,
            staging_bucket_name: String::new(),
            session_file_gcs_path: "gs://b/session.json".into(),
            source_connection_config_gcs_path: "gs://b/source.json".into(),
            location: "us-central1".into(),
        };

        let value = serde_json::to_value(&normalized).unwrap();
        assert_eq!(value["projectId"], "p1");
        assert_eq!(value["runId"], "abc");
        assert_eq!(value["jobId"], "smt-job-abc");

        assert_eq!(normalized.target_instance_uri(), "projects/p1/instances/inst");
        assert_eq!(
            normalized.target_database_uri(),
            "projects/p1/instances/inst/databases/db"
        );
        assert_eq!(
            normalized.metadata_database_uri(),
            "projects/p1/instances/meta/databases/md"
        );
    }
}
