//! YAML launcher configuration.

use na_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_python_path() -> String {
    "python".to_string()
}

fn default_epochs() -> u32 {
    100
}

fn default_batch_size() -> u32 {
    16
}

fn default_img_size() -> u32 {
    640
}

fn default_job_files() -> Vec<String> {
    vec![
        "train_model.py".to_string(),
        "check_gpu.py".to_string(),
        "gpu_trainer.py".to_string(),
    ]
}

/// Everything the launcher needs to submit a training job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Ray dashboard address, e.g. `http://10.0.0.1:8265`
    pub ray_address: String,
    /// Python interpreter on the cluster nodes
    #[serde(default = "default_python_path")]
    pub ray_python_path: String,
    /// Weights & Biases project for run tracking
    #[serde(default)]
    pub wandb_project: Option<String>,
    /// Stream job logs to the terminal until the job finishes
    #[serde(default)]
    pub show_ray_logs: bool,
    /// Scripts shipped to the cluster; all of them must exist locally
    #[serde(default = "default_job_files")]
    pub job_files: Vec<String>,

    pub model_type: String,
    pub dataset: String,
    #[serde(default = "default_epochs")]
    pub epochs: u32,
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    #[serde(default = "default_img_size")]
    pub img_size: u32,
    #[serde(default)]
    pub device: Option<String>,
}

impl TrainConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        serde_yaml::from_str(raw).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let config = TrainConfig::parse(
            "ray_address: http://localhost:8265\n\
             ray_python_path: /opt/venv/bin/python\n\
             wandb_project: yolo-runs\n\
             show_ray_logs: true\n\
             model_type: yolov8n.pt\n\
             dataset: data.yaml\n\
             epochs: 5\n\
             batch_size: 8\n\
             img_size: 320\n\
             device: cuda:0\n",
        )
        .unwrap();
        assert_eq!(config.ray_address, "http://localhost:8265");
        assert_eq!(config.epochs, 5);
        assert_eq!(config.device.as_deref(), Some("cuda:0"));
        assert!(config.show_ray_logs);
    }

    #[test]
    fn fills_defaults_for_optional_fields() {
        let config = TrainConfig::parse(
            "ray_address: http://localhost:8265\n\
             model_type: yolov8n.pt\n\
             dataset: data.yaml\n",
        )
        .unwrap();
        assert_eq!(config.ray_python_path, "python");
        assert_eq!(config.epochs, 100);
        assert_eq!(config.batch_size, 16);
        assert_eq!(config.img_size, 640);
        assert_eq!(config.job_files.len(), 3);
        assert!(!config.show_ray_logs);
    }

    #[test]
    fn rejects_config_without_required_fields() {
        assert!(TrainConfig::parse("epochs: 3\n").is_err());
    }
}
