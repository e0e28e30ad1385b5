//! Launch GPU training jobs on a Ray cluster over its jobs HTTP API, with
//! optional Weights & Biases run tracking forwarded from the environment.

pub mod client;
pub mod config;
pub mod launcher;

pub use client::{JobSpec, JobStatus, RayJobClient};
pub use config::TrainConfig;
pub use launcher::Launcher;
