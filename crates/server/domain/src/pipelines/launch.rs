//! Flex template launch requests

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use super::tuning::TuningConfig;

const COMPUTE_API_PREFIX: &str = "https://www.googleapis.com/compute/v1/projects";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LaunchRequestError {
    #[error("tuning config is missing {0}")]
    MissingField(&'static str),

    #[error("numWorkers ({num}) exceeds maxWorkers ({max})")]
    WorkerBounds { num: i32, max: i32 },

    #[error("vpcHostProjectId is set but neither network nor subnetwork is")]
    DanglingVpcHost,
}

/// Flat string parameters passed to a pipeline template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LaunchParameters(BTreeMap<String, String>);

impl LaunchParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Inserts only when `value` is non-empty. Templates reject empty
    /// strings for parameters typed as storage URIs.
    pub fn insert_non_empty(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> &mut Self {
        let value = value.into();
        if !value.is_empty() {
            self.0.insert(key.into(), value);
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Runtime environment of a launched pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchEnvironment {
    pub num_workers: i32,
    pub max_workers: i32,
    pub machine_type: String,
    pub service_account_email: String,
    /// Full compute API URL, empty when unset.
    pub network: String,
    /// Full compute API URL, empty when unset.
    pub subnetwork: String,
    pub kms_key_name: String,
    pub additional_experiments: Vec<String>,
    pub additional_user_labels: BTreeMap<String, String>,
    pub enable_streaming_engine: bool,
}

/// Everything the pipeline launcher needs to start one flex template job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchRequest {
    pub project_id: String,
    pub location: String,
    pub job_name: String,
    pub template_path: String,
    pub parameters: LaunchParameters,
    pub environment: LaunchEnvironment,
}

impl LaunchRequest {
    /// Builds a request from template parameters and a resolved tuning config.
    pub fn new(
        parameters: LaunchParameters,
        tuning: &TuningConfig,
    ) -> Result<Self, LaunchRequestError> {
        for (field, value) in [
            ("projectId", &tuning.project_id),
            ("location", &tuning.location),
            ("jobName", &tuning.job_name),
            ("gcsTemplatePath", &tuning.gcs_template_path),
        ] {
            if value.is_empty() {
                return Err(LaunchRequestError::MissingField(field));
            }
        }
        if tuning.max_workers > 0 && tuning.num_workers > tuning.max_workers {
            return Err(LaunchRequestError::WorkerBounds {
                num: tuning.num_workers,
                max: tuning.max_workers,
            });
        }
        if !tuning.vpc_host_project_id.is_empty()
            && tuning.network.is_empty()
            && tuning.subnetwork.is_empty()
        {
            return Err(LaunchRequestError::DanglingVpcHost);
        }

        let vpc_host = if tuning.vpc_host_project_id.is_empty() {
            &tuning.project_id
        } else {
            &tuning.vpc_host_project_id
        };
        let network = if tuning.network.is_empty() {
            String::new()
        } else {
            format!(
                "{}/{}/global/networks/{}",
                COMPUTE_API_PREFIX, vpc_host, tuning.network
            )
        };
        let subnetwork = if tuning.subnetwork.is_empty() {
            String::new()
        } else {
            format!(
                "{}/{}/regions/{}/subnetworks/{}",
                COMPUTE_API_PREFIX, vpc_host, tuning.location, tuning.subnetwork
            )
        };

        Ok(Self {
            project_id: tuning.project_id.clone(),
            location: tuning.location.clone(),
            job_name: tuning.job_name.clone(),
            template_path: tuning.gcs_template_path.clone(),
            parameters,
            environment: LaunchEnvironment {
                num_workers: tuning.num_workers,
                max_workers: tuning.max_workers,
                machine_type: tuning.machine_type.clone(),
                service_account_email: tuning.service_account_email.clone(),
                network,
                subnetwork,
                kms_key_name: tuning.kms_key_name.clone(),
                additional_experiments: tuning.additional_experiments.iter().cloned().collect(),
                additional_user_labels: tuning.additional_user_labels.clone(),
                enable_streaming_engine: tuning.enable_streaming_engine,
            },
        })
    }

    /// Renders the equivalent `gcloud dataflow flex-template run` invocation.
    pub fn to_gcloud_command(&self) -> String {
        let env = &self.environment;
        let mut cmd = format!(
            "gcloud dataflow flex-template run {} --project={} --region={} --template-file-gcs-location={}",
            self.job_name, self.project_id, self.location, self.template_path
        );

        if env.num_workers > 0 {
            cmd.push_str(&format!(" --num-workers={}", env.num_workers));
        }
        if env.max_workers > 0 {
            cmd.push_str(&format!(" --max-workers={}", env.max_workers));
        }
        for (flag, value) in [
            ("--worker-machine-type", &env.machine_type),
            ("--service-account-email", &env.service_account_email),
            ("--network", &env.network),
            ("--subnetwork", &env.subnetwork),
            ("--dataflow-kms-key", &env.kms_key_name),
        ] {
            if !value.is_empty() {
                cmd.push_str(&format!(" {}={}", flag, value));
            }
        }
        if !env.additional_experiments.is_empty() {
            cmd.push_str(&format!(
                " --additional-experiments={}",
                env.additional_experiments.join(",")
            ));
        }
        if !env.additional_user_labels.is_empty() {
            let labels: Vec<String> = env
                .additional_user_labels
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            cmd.push_str(&format!(" --additional-user-labels={}", labels.join(",")));
        }
        if env.enable_streaming_engine {
            cmd.push_str(" --enable-streaming-engine");
        }
        if !self.parameters.is_empty() {
            let params: Vec<String> = self
                .parameters
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            cmd.push_str(&format!(" --parameters {}", params.join(",")));
        }

        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipelines::{TuningDefaults, resolve_tuning_config};

    fn tuning() -> TuningConfig {
        resolve_tuning_config(
            TuningConfig::default(),
            &TuningDefaults::reader("gs://templates/reader"),
            "p1",
            "us-central1",
            "smt-job-abc",
            "x1",
        )
    }

    #[test]
    fn test_empty_uri_parameters_are_omitted() {
        let mut params = LaunchParameters::new();
        params
            .insert("changeStreamName", "smt_rr_cs_abc")
            .insert_non_empty("shardingCustomJarPath", "")
            .insert_non_empty("shardingCustomClassName", "");

        assert_eq!(params.len(), 1);
        assert!(!params.contains_key("shardingCustomJarPath"));
        assert_eq!(params.get("changeStreamName"), Some("smt_rr_cs_abc"));
    }

    #[test]
    fn test_request_copies_resolved_tuning() {
        let request = LaunchRequest::new(LaunchParameters::new(), &tuning()).unwrap();

        assert_eq!(request.project_id, "p1");
        assert_eq!(request.job_name, "smt-reverse-replication-reader-x1");
        assert_eq!(request.template_path, "gs://templates/reader");
        assert_eq!(request.environment.num_workers, 5);
        assert_eq!(request.environment.additional_experiments, vec!["use_runner_v2"]);
        assert!(request.environment.enable_streaming_engine);
        assert!(request.environment.network.is_empty());
    }

    #[test]
    fn test_network_urls_use_vpc_host_project() {
        let config = TuningConfig {
            vpc_host_project_id: "host".into(),
            network: "vpc".into(),
            subnetwork: "sub".into(),
            ..tuning()
        };
        let request = LaunchRequest::new(LaunchParameters::new(), &config).unwrap();

        assert_eq!(
            request.environment.network,
            "https://www.googleapis.com/compute/v1/projects/host/global/networks/vpc"
        );
        assert_eq!(
            request.environment.subnetwork,
            "https://www.googleapis.com/compute/v1/projects/host/regions/us-central1/subnetworks/sub"
        );
    }

    #[test]
    fn test_invalid_tuning_is_rejected() {
        let missing = TuningConfig {
            job_name: String::new(),
            ..tuning()
        };
        assert_eq!(
            LaunchRequest::new(LaunchParameters::new(), &missing).unwrap_err(),
            LaunchRequestError::MissingField("jobName")
        );

        let bounds = TuningConfig {
            num_workers: 60,
            ..tuning()
        };
        assert!(matches!(
            LaunchRequest::new(LaunchParameters::new(), &bounds),
            Err(LaunchRequestError::WorkerBounds { num: 60, max: 50 })
        ));

        let dangling = TuningConfig {
            vpc_host_project_id: "host".into(),
            ..tuning()
        };
        assert_eq!(
            LaunchRequest::new(LaunchParameters::new(), &dangling).unwrap_err(),
            LaunchRequestError::DanglingVpcHost
        );
    }

    #[test]
    fn test_gcloud_command() {
        let mut params = LaunchParameters::new();
        params.insert("runMode", "regular").insert("instanceId", "inst");
        let request = LaunchRequest::new(params, &tuning()).unwrap();

        let cmd = request.to_gcloud_command();
        assert!(cmd.starts_with(
            "gcloud dataflow flex-template run smt-reverse-replication-reader-x1 --project=p1 --region=us-central1"
        ));
        assert!(cmd.contains("--template-file-gcs-location=gs://templates/reader"));
        assert!(cmd.contains("--num-workers=5 --max-workers=50"));
        assert!(cmd.contains("--worker-machine-type=n1-standard-2"));
        assert!(cmd.contains("--additional-experiments=use_runner_v2"));
        assert!(cmd.contains("--additional-user-labels=smt-reverse-replication-reader=smt-job-abc"));
        assert!(cmd.contains("--enable-streaming-engine"));
        assert!(cmd.ends_with("--parameters instanceId=inst,runMode=regular"));
        assert!(!cmd.contains("--network"));
    }
}
