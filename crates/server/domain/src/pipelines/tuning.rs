//! Pipeline tuning configuration
//!
//! Callers may supply a partial [`TuningConfig`] per pipeline. Before a
//! launch it is merged with a [`TuningDefaults`] table: scalar fields are
//! only filled when unset, the run label is always written and the required
//! experiment is added once.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Experiment every launched pipeline needs.
pub const RUNNER_V2_EXPERIMENT: &str = "use_runner_v2";

/// Scaling, placement and feature parameters of one launched pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TuningConfig {
    pub project_id: String,
    pub job_name: String,
    pub location: String,
    pub vpc_host_project_id: String,
    pub network: String,
    pub subnetwork: String,
    pub max_workers: i32,
    pub num_workers: i32,
    pub service_account_email: String,
    pub machine_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub additional_user_labels: BTreeMap<String, String>,
    pub kms_key_name: String,
    pub gcs_template_path: String,
    #[serde(deserialize_with = "null_as_default")]
    pub additional_experiments: BTreeSet<String>,
    pub enable_streaming_engine: bool,
}

// Accepts an explicit JSON `null` for a collection.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parses a tuning file. Blank contents yield the default config.
pub fn parse_tuning_config(contents: &[u8]) -> Result<TuningConfig, serde_json::Error> {
    if contents.iter().all(u8::is_ascii_whitespace) {
        return Ok(TuningConfig::default());
    }
    serde_json::from_slice(contents)
}

/// Per-pipeline default values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TuningDefaults {
    /// Generated job names are `<prefix>-<suffix>`.
    pub job_name_prefix: &'static str,
    /// Label key carrying the job id.
    pub label_key: &'static str,
    pub num_workers: i32,
    pub max_workers: i32,
    pub machine_type: &'static str,
    pub template_path: String,
}

impl TuningDefaults {
    pub fn reader(template_path: impl Into<String>) -> Self {
        Self {
            job_name_prefix: "smt-reverse-replication-reader",
            label_key: "smt-reverse-replication-reader",
            num_workers: 5,
            max_workers: 50,
            machine_type: "n1-standard-2",
            template_path: template_path.into(),
        }
    }

    pub fn writer(template_path: impl Into<String>) -> Self {
        Self {
            job_name_prefix: "smt-reverse-replication-writer",
            label_key: "smt-reverse-replication-writer",
            num_workers: 1,
            max_workers: 50,
            machine_type: "n2-standard-4",
            template_path: template_path.into(),
        }
    }
}

/// Merges `config` with `defaults` and the ambient values of this run.
///
/// `run_label` is written under `defaults.label_key`; `job_name_suffix` is
/// only used when the caller did not name the job.
pub fn resolve_tuning_config(
    mut config: TuningConfig,
    defaults: &TuningDefaults,
    project_id: &str,
    location: &str,
    run_label: &str,
    job_name_suffix: &str,
) -> TuningConfig {
    if config.project_id.is_empty() {
        config.project_id = project_id.to_string();
    }
    if config.job_name.is_empty() {
        config.job_name = format!("{}-{}", defaults.job_name_prefix, job_name_suffix);
    }
    if config.location.is_empty() {
        config.location = location.to_string();
    }
    if config.max_workers == 0 {
        config.max_workers = defaults.max_workers;
    }
    if config.num_workers == 0 {
        config.num_workers = defaults.num_workers;
    }
    if config.machine_type.is_empty() {
        config.machine_type = defaults.machine_type.to_string();
    }
    if config.gcs_template_path.is_empty() {
        config.gcs_template_path = defaults.template_path.clone();
    }

    config
        .additional_user_labels
        .insert(defaults.label_key.to_string(), run_label.to_string());
    config
        .additional_experiments
        .insert(RUNNER_V2_EXPERIMENT.to_string());
    config.enable_streaming_engine = true;

    config
}
