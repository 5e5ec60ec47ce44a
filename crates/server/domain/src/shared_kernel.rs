pub use reverse_repl_shared::*;

/// URI scheme of externally hosted object storage.
pub const GCS_FILE_PREFIX: &str = "gs://";

/// The only source database supported for reverse replication.
pub const SOURCE_TYPE_MYSQL: &str = "mysql";

/// Reader filtration: drop records written by the forward migration.
pub const FILTER_FORWARD_MIGRATION: &str = "forward_migration";
/// Reader filtration: forward every change record.
pub const FILTER_NONE: &str = "none";

/// Run mode passed to both pipelines on a fresh launch.
pub const RUN_MODE_REGULAR: &str = "regular";

pub const DEFAULT_WINDOW_DURATION: &str = "10s";

// Prefixes of generated resource names, always followed by `-<run-id>`.
pub const STAGING_BUCKET_PREFIX: &str = "smt-rr-gcs";
pub const JOB_NAME_PREFIX: &str = "smt-job";
pub const CHANGE_STREAM_PREFIX: &str = "smt-rr-cs";
pub const METADATA_DATABASE_PREFIX: &str = "smt-rr-metadata";

/// `projects/<project>/instances/<instance>`
pub fn instance_uri(project_id: &str, instance_id: &str) -> String {
    format!("projects/{}/instances/{}", project_id, instance_id)
}

/// `projects/<project>/instances/<instance>/databases/<database>`
pub fn database_uri(project_id: &str, instance_id: &str, database_id: &str) -> String {
    format!(
        "projects/{}/instances/{}/databases/{}",
        project_id, instance_id, database_id
    )
}

pub fn is_gcs_path(path: &str) -> bool {
    path.starts_with(GCS_FILE_PREFIX)
}

/// Splits `gs://bucket/object/path` into `("bucket", "object/path")`.
pub fn split_gcs_path(path: &str) -> Option<(&str, &str)> {
    let rest = path.strip_prefix(GCS_FILE_PREFIX)?;
    match rest.split_once('/') {
        Some((bucket, object)) if !bucket.is_empty() && !object.is_empty() => {
            Some((bucket, object))
        }
        _ => None,
    }
}
