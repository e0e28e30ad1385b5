//! Training-job launcher: stage job files, submit to the cluster, and
//! optionally follow logs until the job reaches a terminal state.

use na_core::{Error, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use tracing::{info, warn};

use crate::client::{JobSpec, JobStatus, RayJobClient};
use crate::config::TrainConfig;

const POLL_INTERVAL: Duration = Duration::from_secs(2);

pub struct Launcher {
    config: TrainConfig,
    client: RayJobClient,
    /// Directory the job scripts are staged from
    script_dir: PathBuf,
}

impl Launcher {
    pub fn new(config: TrainConfig, script_dir: impl Into<PathBuf>) -> Self {
        let client = RayJobClient::new(config.ray_address.clone());
        Self {
            config,
            client,
            script_dir: script_dir.into(),
        }
    }

    /// Copy the job scripts into a fresh temp dir. Every file named in
    /// `job_files` must exist; `.env` and `data.yaml` ride along when
    /// present.
    pub fn stage_job_files(&self) -> Result<TempDir> {
        let staged = tempfile::Builder::new().prefix("ray_training_").tempdir()?;

        let mut missing = Vec::new();
        for name in &self.config.job_files {
            let source = self.script_dir.join(name);
            if source.exists() {
                std::fs::copy(&source, staged.path().join(name))?;
                info!("📦 Staged {}", name);
            } else {
                missing.push(name.clone());
            }
        }
        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "Essential job files missing: {}",
                missing.join(", ")
            )));
        }

        for optional in [".env", "data.yaml"] {
            let source = self.script_dir.join(optional);
            if source.exists() {
                std::fs::copy(&source, staged.path().join(optional))?;
                info!("📦 Staged {}", optional);
            }
        }
        Ok(staged)
    }

    /// Environment the job runs with. W&B credentials are forwarded from
    /// the launcher's own environment when set.
    fn job_env(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();
        env.insert("PYTHONUNBUFFERED".to_string(), "1".to_string());
        for key in ["WANDB_API_KEY", "WANDB_ENTITY"] {
            if let Ok(value) = std::env::var(key) {
                if !value.is_empty() {
                    env.insert(key.to_string(), value);
                }
            }
        }
        env
    }

    /// Submit the training job. Returns the job id; when `show_ray_logs`
    /// is set, streams logs until the job finishes.
    pub async fn launch(&self) -> Result<String> {
        let staged = self.stage_job_files()?;
        let entrypoint = format!(
            "{} {}",
            self.config.ray_python_path,
            self.config
                .job_files
                .last()
                .ok_or_else(|| Error::Config("No job files configured".to_string()))?
        );

        let env = self.job_env();
        let has_wandb = env.contains_key("WANDB_API_KEY");
        let job_id = self
            .client
            .submit(JobSpec {
                entrypoint,
                working_dir: Some(staged.path().display().to_string()),
                env_vars: env,
                num_gpus: 1.0,
            })
            .await?;
        info!("🚂 Submitted training job {}", job_id);
        info!(
            "   model={} data={} epochs={} batch={} imgsz={}",
            self.config.model_type,
            self.config.dataset,
            self.config.epochs,
            self.config.batch_size,
            self.config.img_size
        );

        match (&self.config.wandb_project, has_wandb) {
            (Some(project), true) => info!("📈 W&B tracking enabled for project {}", project),
            _ => warn!("W&B API key or project not set, run tracking will be limited"),
        }

        if self.config.show_ray_logs {
            let status = self.follow(&job_id).await?;
            info!("Job {} finished: {}", job_id, status.as_str());
        }
        Ok(job_id)
    }

    /// Poll status and print incremental log output until a terminal state.
    pub async fn follow(&self, job_id: &str) -> Result<JobStatus> {
        let mut seen = String::new();
        loop {
            let details = self.client.status(job_id).await?;
            let logs = self.client.logs(job_id).await.unwrap_or_default();
            let new = new_log_output(&seen, &logs);
            if !new.is_empty() {
                print!("{}", new);
            }
            seen = logs;

            if details.status.is_terminal() {
                return Ok(details.status);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    pub async fn status(&self, job_id: &str) -> Result<JobStatus> {
        Ok(self.client.status(job_id).await?.status)
    }

    pub async fn logs(&self, job_id: &str) -> Result<String> {
        self.client.logs(job_id).await
    }

    pub async fn stop(&self, job_id: &str) -> Result<()> {
        self.client.stop(job_id).await?;
        info!("🛑 Stopped job {}", job_id);
        Ok(())
    }
}

/// The portion of `current` not yet printed. Ray returns the full log
/// buffer each poll, so the diff is a suffix.
fn new_log_output<'a>(seen: &str, current: &'a str) -> &'a str {
    if current.len() > seen.len() && current.starts_with(seen) {
        &current[seen.len()..]
    } else if seen.is_empty() {
        current
    } else {
        ""
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> TrainConfig {
        TrainConfig::parse(
            "ray_address: http://localhost:8265\n\
             model_type: yolov8n.pt\n\
             dataset: data.yaml\n\
             job_files: [\"train_model.py\", \"gpu_trainer.py\"]\n",
        )
        .unwrap()
    }

    #[test]
    fn staging_fails_when_essentials_missing() {
        let scripts = tempfile::tempdir().unwrap();
        std::fs::write(scripts.path().join("train_model.py"), "print()").unwrap();

        let launcher = Launcher::new(sample_config(), scripts.path());
        let err = launcher.stage_job_files().unwrap_err();
        assert!(err.to_string().contains("gpu_trainer.py"));
    }

    #[test]
    fn staging_copies_required_and_optional_files() {
        let scripts = tempfile::tempdir().unwrap();
        for name in ["train_model.py", "gpu_trainer.py", "data.yaml"] {
            std::fs::write(scripts.path().join(name), "x").unwrap();
        }

        let launcher = Launcher::new(sample_config(), scripts.path());
        let staged = launcher.stage_job_files().unwrap();
        assert!(staged.path().join("train_model.py").exists());
        assert!(staged.path().join("gpu_trainer.py").exists());
        assert!(staged.path().join("data.yaml").exists());
        assert!(!staged.path().join(".env").exists());
    }

    #[test]
    fn log_diffing_returns_only_new_output() {
        assert_eq!(new_log_output("", "line1\n"), "line1\n");
        assert_eq!(new_log_output("line1\n", "line1\nline2\n"), "line2\n");
        assert_eq!(new_log_output("line1\n", "line1\n"), "");
        // Log buffer rotated; do not reprint
        assert_eq!(new_log_output("abc", "xyz"), "");
    }
}
