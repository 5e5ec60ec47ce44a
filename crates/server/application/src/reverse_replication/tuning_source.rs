//! Loading of caller-supplied tuning files

use reverse_repl_domain::{StagingStore, TuningConfig, is_gcs_path, parse_tuning_config};
use saga_engine_core::{ActivityContext, ActivityError};

use crate::reverse_replication::activities::call_port;

/// Reads and parses the tuning file at `path`.
///
/// An empty path means "no tuning supplied". `gs://` paths are read through
/// the staging store, anything else from the local filesystem.
pub async fn load_tuning_config(
    ctx: &ActivityContext,
    store: &dyn StagingStore,
    path: &str,
) -> Result<TuningConfig, ActivityError> {
    if path.is_empty() {
        return Ok(TuningConfig::default());
    }

    let contents = if is_gcs_path(path) {
        call_port(
            ctx,
            &format!("reading tuning config {}", path),
            store.read_object(path),
        )
        .await?
    } else {
        ctx.guard(tokio::fs::read(path))
            .await?
            .map_err(|e| ActivityError::external(format!("reading tuning config {}", path), e))?
    };

    parse_tuning_config(&contents).map_err(|e| {
        ActivityError::Serialization(format!("parsing tuning config {}: {}", path, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reverse_repl_infrastructure::InMemoryStagingStore;
    use std::io::Write;

    #[tokio::test]
    async fn test_empty_path_yields_defaults() {
        let store = InMemoryStagingStore::new();
        let config = load_tuning_config(&ActivityContext::new("abc"), &store, "")
            .await
            .unwrap();
        assert_eq!(config, TuningConfig::default());
    }

    #[tokio::test]
    async fn test_reads_gcs_and_local_files() {
        let store = InMemoryStagingStore::new();
        store.put_object("gs://cfg/reader.json", br#"{"numWorkers": 7}"#.to_vec());
        let ctx = ActivityContext::new("abc");

        let remote = load_tuning_config(&ctx, &store, "gs://cfg/reader.json")
            .await
            .unwrap();
        assert_eq!(remote.num_workers, 7);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"machineType": "e2-small"}}"#).unwrap();
        let local = load_tuning_config(&ctx, &store, &file.path().display().to_string())
            .await
            .unwrap();
        assert_eq!(local.machine_type, "e2-small");
    }

    #[tokio::test]
    async fn test_malformed_or_missing_files_fail() {
        let store = InMemoryStagingStore::new();
        store.put_object("gs://cfg/bad.json", b"{".to_vec());
        let ctx = ActivityContext::new("abc");

        let err = load_tuning_config(&ctx, &store, "gs://cfg/bad.json")
            .await
            .unwrap_err();
        assert!(matches!(err, ActivityError::Serialization(_)));

        let err = load_tuning_config(&ctx, &store, "gs://cfg/missing.json")
            .await
            .unwrap_err();
        assert!(matches!(err, ActivityError::External { .. }));
    }
}
