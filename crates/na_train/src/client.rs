//! Minimal Ray Jobs HTTP API client: submit, status, logs, stop.

use na_core::{Error, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Stopped,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed | JobStatus::Stopped)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Succeeded => "SUCCEEDED",
            JobStatus::Failed => "FAILED",
            JobStatus::Stopped => "STOPPED",
        }
    }
}

#[derive(Debug, Serialize)]
struct RuntimeEnv {
    #[serde(skip_serializing_if = "Option::is_none")]
    working_dir: Option<String>,
    env_vars: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
struct SubmitJobRequest {
    entrypoint: String,
    runtime_env: RuntimeEnv,
    #[serde(skip_serializing_if = "Option::is_none")]
    entrypoint_num_gpus: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SubmitJobResponse {
    submission_id: String,
}

#[derive(Debug, Deserialize)]
pub struct JobDetails {
    pub status: JobStatus,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JobLogsResponse {
    logs: String,
}

#[derive(Debug, Deserialize)]
struct StopJobResponse {
    stopped: bool,
}

/// What to run on the cluster.
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub entrypoint: String,
    pub working_dir: Option<String>,
    pub env_vars: HashMap<String, String>,
    pub num_gpus: f64,
}

pub struct RayJobClient {
    client: Client,
    base_url: String,
}

impl RayJobClient {
    /// `address` is the Ray dashboard URL, e.g. `http://10.0.0.1:8265`.
    pub fn new(address: impl Into<String>) -> Self {
        let mut base_url = address.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: Client::new(),
            base_url,
        }
    }

    pub async fn submit(&self, spec: JobSpec) -> Result<String> {
        let request = SubmitJobRequest {
            entrypoint: spec.entrypoint,
            runtime_env: RuntimeEnv {
                working_dir: spec.working_dir,
                env_vars: spec.env_vars,
            },
            entrypoint_num_gpus: (spec.num_gpus > 0.0).then_some(spec.num_gpus),
        };
        let response: SubmitJobResponse = self
            .client
            .post(format!("{}/api/jobs/", self.base_url))
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.submission_id)
    }

    pub async fn status(&self, job_id: &str) -> Result<JobDetails> {
        let details: JobDetails = self
            .client
            .get(format!("{}/api/jobs/{}", self.base_url, job_id))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(details)
    }

    pub async fn logs(&self, job_id: &str) -> Result<String> {
        let response: JobLogsResponse = self
            .client
            .get(format!("{}/api/jobs/{}/logs", self.base_url, job_id))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.logs)
    }

    pub async fn stop(&self, job_id: &str) -> Result<()> {
        let response: StopJobResponse = self
            .client
            .post(format!("{}/api/jobs/{}/stop", self.base_url, job_id))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if !response.stopped {
            return Err(Error::Generation(format!("Job {} was not stopped", job_id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(JobStatus::Succeeded.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Stopped.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }

    #[test]
    fn status_deserializes_from_ray_names() {
        let details: JobDetails =
            serde_json::from_str(r#"{"status": "RUNNING", "message": "up"}"#).unwrap();
        assert_eq!(details.status, JobStatus::Running);
        assert_eq!(details.message.as_deref(), Some("up"));
    }

    #[test]
    fn submit_request_skips_empty_gpu_and_workdir() {
        let request = SubmitJobRequest {
            entrypoint: "python train.py".to_string(),
            runtime_env: RuntimeEnv {
                working_dir: None,
                env_vars: HashMap::new(),
            },
            entrypoint_num_gpus: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("entrypoint_num_gpus"));
        assert!(!json.contains("working_dir"));
    }

    #[test]
    fn trims_trailing_slash_from_address() {
        let client = RayJobClient::new("http://localhost:8265/");
        assert_eq!(client.base_url, "http://localhost:8265");
    }
}
