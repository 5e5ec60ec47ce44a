//! Request normalization
//!
//! Validates a [`JobRequest`] and fills every derived value the provisioning
//! steps rely on. The request is taken by value and a normalized copy is
//! only returned once all checks pass, so a failure never leaves a
//! half-filled request behind.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};

use super::request::{JobRequest, NormalizedJobRequest};
use crate::resources::{LocationResolver, PortError};
use crate::shared_kernel::{
    CHANGE_STREAM_PREFIX, DEFAULT_WINDOW_DURATION, FILTER_FORWARD_MIGRATION, FILTER_NONE,
    GCS_FILE_PREFIX, JOB_NAME_PREFIX, JobId, METADATA_DATABASE_PREFIX, RunId,
    SOURCE_TYPE_MYSQL, STAGING_BUCKET_PREFIX, instance_uri, is_gcs_path,
};

/// Object name of the staged session file inside the staging bucket.
pub const STAGED_SESSION_OBJECT: &str = "session.json";
/// Object name of the staged source connection file inside the staging bucket.
pub const STAGED_SOURCE_CONFIG_OBJECT: &str = "source-connection-config.json";

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("failed to resolve leader location of {instance_uri}: {source}")]
    Lookup {
        instance_uri: String,
        #[source]
        source: PortError,
    },
}

impl NormalizeError {
    fn missing(field: &'static str) -> Self {
        NormalizeError::Validation {
            field,
            message: "found empty value for a required parameter".to_string(),
        }
    }

    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        NormalizeError::Validation {
            field,
            message: message.into(),
        }
    }

    /// Name of the offending request field, for validation failures.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            NormalizeError::Validation { field, .. } => Some(*field),
            NormalizeError::Lookup { .. } => None,
        }
    }
}

/// Replaces every hyphen with an underscore; change feed identifiers reject hyphens.
pub fn sanitize_change_stream_name(name: &str) -> String {
    name.replace('-', "_")
}

/// Validates `request` and fills defaults and derived fields.
///
/// Everything except the leader location is computed here; the returned
/// value carries an empty `location` until [`RequestNormalizer::normalize`]
/// resolves it.
pub fn validate_and_fill(
    mut request: JobRequest,
    run_id: &RunId,
) -> Result<NormalizedJobRequest, NormalizeError> {
    let staging_required = !(is_gcs_path(&request.session_file_path)
        && is_gcs_path(&request.source_connection_config)
        && !request.gcs_data_directory.is_empty());
    let staging_bucket_name = if staging_required {
        format!("{}-{}", STAGING_BUCKET_PREFIX, run_id)
    } else {
        String::new()
    };

    if request.instance_id.is_empty() {
        return Err(NormalizeError::missing("instanceId"));
    }
    if request.database_id.is_empty() {
        return Err(NormalizeError::missing("databaseId"));
    }
    if request.session_file_path.is_empty() {
        return Err(NormalizeError::missing("sessionFilePath"));
    }
    let session_file_gcs_path = if is_gcs_path(&request.session_file_path) {
        request.session_file_path.clone()
    } else {
        format!(
            "{}{}/{}",
            GCS_FILE_PREFIX, staging_bucket_name, STAGED_SESSION_OBJECT
        )
    };
    if request.source_connection_config.is_empty() {
        return Err(NormalizeError::missing("sourceConnectionConfig"));
    }
    let source_connection_config_gcs_path = if is_gcs_path(&request.source_connection_config) {
        request.source_connection_config.clone()
    } else {
        format!(
            "{}{}/{}",
            GCS_FILE_PREFIX, staging_bucket_name, STAGED_SOURCE_CONFIG_OBJECT
        )
    };
    if request.project_id.is_empty() {
        return Err(NormalizeError::missing("projectId"));
    }

    if request.job_name.is_empty() {
        request.job_name = format!("{}-{}", JOB_NAME_PREFIX, run_id);
    }

    if request.source_type.is_empty() {
        request.source_type = SOURCE_TYPE_MYSQL.to_string();
    }
    if request.source_type != SOURCE_TYPE_MYSQL {
        return Err(NormalizeError::invalid(
            "sourceType",
            format!(
                "{} is not supported for reverse replication, only {} is",
                request.source_type, SOURCE_TYPE_MYSQL
            ),
        ));
    }

    if request.metadata_instance.is_empty() {
        request.metadata_instance = request.instance_id.clone();
    }
    if request.metadata_database.is_empty() {
        request.metadata_database = format!("{}-{}", METADATA_DATABASE_PREFIX, run_id);
    }

    if request.gcs_data_directory.is_empty() {
        request.gcs_data_directory = format!(
            "{}{}-{}/reverse-replication/data",
            GCS_FILE_PREFIX, STAGING_BUCKET_PREFIX, run_id
        );
    } else if !is_gcs_path(&request.gcs_data_directory) {
        return Err(NormalizeError::invalid(
            "gcsDataDirectory",
            format!("{} must start with {}", request.gcs_data_directory, GCS_FILE_PREFIX),
        ));
    }

    if request.change_stream_name.is_empty() {
        request.change_stream_name = format!("{}-{}", CHANGE_STREAM_PREFIX, run_id);
    }

    if request.filtration_mode.is_empty() {
        request.filtration_mode = FILTER_FORWARD_MIGRATION.to_string();
    } else if request.filtration_mode != FILTER_FORWARD_MIGRATION
        && request.filtration_mode != FILTER_NONE
    {
        return Err(NormalizeError::invalid(
            "filtrationMode",
            format!(
                "found {}, only allowed values are [{}, {}]",
                request.filtration_mode, FILTER_FORWARD_MIGRATION, FILTER_NONE
            ),
        ));
    }

    if request.timer_interval < 1 {
        request.timer_interval = 1;
    }
    if request.window_duration.is_empty() {
        request.window_duration = DEFAULT_WINDOW_DURATION.to_string();
    }

    match (
        request.sharding_custom_jar_path.is_empty(),
        request.sharding_custom_class_name.is_empty(),
    ) {
        (false, true) => {
            return Err(NormalizeError::invalid(
                "shardingCustomClassName",
                "must be set when shardingCustomJarPath is set",
            ));
        }
        (true, false) => {
            return Err(NormalizeError::invalid(
                "shardingCustomJarPath",
                "must be set when shardingCustomClassName is set",
            ));
        }
        _ => {}
    }
    if !request.sharding_custom_jar_path.is_empty()
        && !is_gcs_path(&request.sharding_custom_jar_path)
    {
        return Err(NormalizeError::invalid(
            "shardingCustomJarPath",
            format!("must start with {}", GCS_FILE_PREFIX),
        ));
    }

    request.change_stream_name = sanitize_change_stream_name(&request.change_stream_name);

    Ok(NormalizedJobRequest {
        request,
        run_id: run_id.clone(),
        job_id: JobId::for_run(run_id),
        staging_required,
        staging_bucket_name,
        session_file_gcs_path,
        source_connection_config_gcs_path,
        location: String::new(),
    })
}

/// Normalizes requests, resolving the target's leader location.
pub struct RequestNormalizer {
    location_resolver: Arc<dyn LocationResolver>,
}

impl RequestNormalizer {
    pub fn new(location_resolver: Arc<dyn LocationResolver>) -> Self {
        Self { location_resolver }
    }

    #[instrument(skip(self, request), fields(run_id = %run_id))]
    pub async fn normalize(
        &self,
        request: JobRequest,
        run_id: &RunId,
    ) -> Result<NormalizedJobRequest, NormalizeError> {
        let mut normalized = validate_and_fill(request, run_id)?;

        let instance_uri = instance_uri(
            &normalized.request.project_id,
            &normalized.request.instance_id,
        );
        let location = self
            .location_resolver
            .leader_location(&instance_uri)
            .await
            .and_then(|location| {
                if location.trim().is_empty() {
                    Err(PortError::InvalidState(format!(
                        "instance {instance_uri} reported no leader location"
                    )))
                } else {
                    Ok(location)
                }
            })
            .map_err(|source| NormalizeError::Lookup {
                instance_uri: instance_uri.clone(),
                source,
            })?;
        normalized.location = location;

        debug!(
            job_id = %normalized.job_id,
            location = %normalized.location,
            staging_required = normalized.staging_required,
            "Job request normalized"
        );
        Ok(normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::PortResult;
    use async_trait::async_trait;
    use rstest::rstest;
    use std::sync::Mutex;

    fn valid_request() -> JobRequest {
        JobRequest {
            project_id: "p1".into(),
            instance_id: "inst".into(),
            database_id: "db".into(),
            session_file_path: "/tmp/session.json".into(),
            source_connection_config: "/tmp/source.json".into(),
            ..Default::default()
        }
    }

    fn run() -> RunId {
        RunId::from_string("abc")
    }

    #[rstest]
    #[case::instance("instanceId")]
    #[case::database("databaseId")]
    #[case::session("sessionFilePath")]
    #[case::source_connection("sourceConnectionConfig")]
    #[case::project("projectId")]
    fn test_missing_required_field_is_rejected(#[case] field: &str) {
        let mut request = valid_request();
        match field {
            "instanceId" => request.instance_id.clear(),
            "databaseId" => request.database_id.clear(),
            "sessionFilePath" => request.session_file_path.clear(),
            "sourceConnectionConfig" => request.source_connection_config.clear(),
            _ => request.project_id.clear(),
        }

        let err = validate_and_fill(request, &run()).unwrap_err();
        assert_eq!(err.field(), Some(field));
    }

    #[test]
    fn test_required_fields_are_checked_in_order() {
        let err = validate_and_fill(JobRequest::default(), &run()).unwrap_err();
        assert_eq!(err.field(), Some("instanceId"));
    }

    #[test]
    fn test_defaults_are_derived_from_run_id() {
        let normalized = validate_and_fill(valid_request(), &run()).unwrap();

        assert!(normalized.staging_required);
        assert_eq!(normalized.staging_bucket_name, "smt-rr-gcs-abc");
        assert_eq!(normalized.session_file_gcs_path, "gs://smt-rr-gcs-abc/session.json");
        assert_eq!(
            normalized.source_connection_config_gcs_path,
            "gs://smt-rr-gcs-abc/source-connection-config.json"
        );
        assert_eq!(normalized.job_id.as_str(), "smt-job-abc");

        let request = &normalized.request;
        assert_eq!(request.job_name, "smt-job-abc");
        assert_eq!(request.change_stream_name, "smt_rr_cs_abc");
        assert_eq!(request.metadata_instance, "inst");
        assert_eq!(request.metadata_database, "smt-rr-metadata-abc");
        assert_eq!(
            request.gcs_data_directory,
            "gs://smt-rr-gcs-abc/reverse-replication/data"
        );
        assert_eq!(request.source_type, "mysql");
        assert_eq!(request.filtration_mode, "forward_migration");
        assert_eq!(request.window_duration, "10s");
        assert_eq!(request.timer_interval, 1);
        assert_eq!(request.session_file_path, "/tmp/session.json");
        assert!(normalized.location.is_empty());
    }

    #[test]
    fn test_staging_not_required_when_everything_is_hosted() {
        let request = JobRequest {
            session_file_path: "gs://mine/session.json".into(),
            source_connection_config: "gs://mine/source.json".into(),
            gcs_data_directory: "gs://mine/data".into(),
            ..valid_request()
        };

        let normalized = validate_and_fill(request, &run()).unwrap();
        assert!(!normalized.staging_required);
        assert!(normalized.staging_bucket_name.is_empty());
        assert_eq!(normalized.session_file_gcs_path, "gs://mine/session.json");
        assert_eq!(normalized.source_connection_config_gcs_path, "gs://mine/source.json");
        assert_eq!(normalized.request.gcs_data_directory, "gs://mine/data");
    }

    #[test]
    fn test_staging_required_without_explicit_data_directory() {
        let request = JobRequest {
            session_file_path: "gs://mine/session.json".into(),
            source_connection_config: "gs://mine/source.json".into(),
            ..valid_request()
        };

        let normalized = validate_and_fill(request, &run()).unwrap();
        assert!(normalized.staging_required);
        assert_eq!(normalized.staging_bucket_name, "smt-rr-gcs-abc");
        assert_eq!(normalized.session_file_gcs_path, "gs://mine/session.json");
    }

    #[test]
    fn test_data_directory_must_be_gcs() {
        let request = JobRequest {
            gcs_data_directory: "/data".into(),
            ..valid_request()
        };
        let err = validate_and_fill(request, &run()).unwrap_err();
        assert_eq!(err.field(), Some("gcsDataDirectory"));
    }

    #[rstest]
    #[case("a-b-c", "a_b_c")]
    #[case("already_clean", "already_clean")]
    #[case("--", "__")]
    fn test_change_stream_name_sanitization(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(sanitize_change_stream_name(name), expected);
        assert_eq!(sanitize_change_stream_name(expected), expected);

        let request = JobRequest {
            change_stream_name: name.into(),
            ..valid_request()
        };
        let normalized = validate_and_fill(request, &run()).unwrap();
        assert_eq!(normalized.request.change_stream_name, expected);
    }

    #[rstest]
    #[case("forward_migration")]
    #[case("none")]
    fn test_allowed_filtration_modes(#[case] mode: &str) {
        let request = JobRequest {
            filtration_mode: mode.into(),
            ..valid_request()
        };
        let normalized = validate_and_fill(request, &run()).unwrap();
        assert_eq!(normalized.request.filtration_mode, mode);
    }

    #[test]
    fn test_unknown_filtration_mode_is_rejected() {
        let request = JobRequest {
            filtration_mode: "reverse".into(),
            ..valid_request()
        };
        let err = validate_and_fill(request, &run()).unwrap_err();
        assert_eq!(err.field(), Some("filtrationMode"));
    }

    #[test]
    fn test_unsupported_source_type_is_rejected() {
        let request = JobRequest {
            source_type: "postgresql".into(),
            ..valid_request()
        };
        let err = validate_and_fill(request, &run()).unwrap_err();
        assert_eq!(err.field(), Some("sourceType"));
    }

    #[rstest]
    #[case("gs://jars/shard.jar", "", "shardingCustomClassName")]
    #[case("", "com.example.Sharder", "shardingCustomJarPath")]
    #[case("/local/shard.jar", "com.example.Sharder", "shardingCustomJarPath")]
    fn test_invalid_sharding_plugin(
        #[case] jar: &str,
        #[case] class: &str,
        #[case] field: &str,
    ) {
        let request = JobRequest {
            sharding_custom_jar_path: jar.into(),
            sharding_custom_class_name: class.into(),
            ..valid_request()
        };
        let err = validate_and_fill(request, &run()).unwrap_err();
        assert_eq!(err.field(), Some(field));
    }

    #[test]
    fn test_sharding_plugin_pair_is_accepted() {
        let request = JobRequest {
            sharding_custom_jar_path: "gs://jars/shard.jar".into(),
            sharding_custom_class_name: "com.example.Sharder".into(),
            ..valid_request()
        };
        assert!(validate_and_fill(request, &run()).is_ok());
    }

    #[rstest]
    #[case(-3, 1)]
    #[case(0, 1)]
    #[case(1, 1)]
    #[case(5, 5)]
    fn test_timer_interval_clamping(#[case] interval: i64, #[case] expected: i64) {
        let request = JobRequest {
            timer_interval: interval,
            ..valid_request()
        };
        let normalized = validate_and_fill(request, &run()).unwrap();
        assert_eq!(normalized.request.timer_interval, expected);
    }

    #[test]
    fn test_explicit_values_are_kept() {
        let request = JobRequest {
            job_name: "nightly".into(),
            metadata_instance: "meta-inst".into(),
            metadata_database: "meta-db".into(),
            window_duration: "30s".into(),
            ..valid_request()
        };
        let normalized = validate_and_fill(request, &run()).unwrap();
        assert_eq!(normalized.request.job_name, "nightly");
        assert_eq!(normalized.request.metadata_instance, "meta-inst");
        assert_eq!(normalized.request.metadata_database, "meta-db");
        assert_eq!(normalized.request.window_duration, "30s");
    }

    // ------------------------------------------------------------------
    // Location lookup
    // ------------------------------------------------------------------

    struct MockResolver {
        result: PortResult<String>,
        calls: Mutex<Vec<String>>,
    }

    impl MockResolver {
        fn new(result: PortResult<String>) -> Self {
            Self {
                result,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LocationResolver for MockResolver {
        async fn leader_location(&self, instance_uri: &str) -> PortResult<String> {
            self.calls.lock().unwrap().push(instance_uri.to_string());
            self.result.clone()
        }
    }

    #[tokio::test]
    async fn test_normalize_resolves_location() {
        let resolver = Arc::new(MockResolver::new(Ok("us-central1".into())));
        let normalizer = RequestNormalizer::new(resolver.clone());

        let normalized = normalizer.normalize(valid_request(), &run()).await.unwrap();

        assert_eq!(normalized.location, "us-central1");
        assert_eq!(
            *resolver.calls.lock().unwrap(),
            vec!["projects/p1/instances/inst".to_string()]
        );
    }

    #[tokio::test]
    async fn test_lookup_failure_fails_normalization() {
        let resolver = Arc::new(MockResolver::new(Err(PortError::NotFound("inst".into()))));
        let normalizer = RequestNormalizer::new(resolver);

        let err = normalizer.normalize(valid_request(), &run()).await.unwrap_err();
        assert!(matches!(err, NormalizeError::Lookup { .. }));
        assert_eq!(err.field(), None);
    }

    #[tokio::test]
    async fn test_empty_leader_location_fails_normalization() {
        let resolver = Arc::new(MockResolver::new(Ok(String::new())));
        let normalizer = RequestNormalizer::new(resolver);

        let err = normalizer.normalize(valid_request(), &run()).await.unwrap_err();
        assert!(matches!(
            err,
            NormalizeError::Lookup {
                source: PortError::InvalidState(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_validation_failure_skips_lookup() {
        let resolver = Arc::new(MockResolver::new(Ok("us-central1".into())));
        let normalizer = RequestNormalizer::new(resolver.clone());

        let err = normalizer
            .normalize(JobRequest::default(), &run())
            .await
            .unwrap_err();
        assert!(matches!(err, NormalizeError::Validation { .. }));
        assert!(resolver.calls.lock().unwrap().is_empty());
    }
}
