//! Sequential multi-agent article generation.
//!
//! The crew chains prompted chat-completion calls the way the original
//! newsroom pipeline did: research the source URLs, aggregate the findings,
//! write, edit, illustrate, draft social posts, then collect everything
//! into one JSON object.

pub mod models;
pub mod pipeline;
pub mod tools;

pub use models::create_model;
pub use pipeline::Crew;

/// Crew-wide configuration. Model credentials come from the environment in
/// the binaries; tests construct this directly.
#[derive(Debug, Clone)]
pub struct Config {
    /// Chat model identifier, e.g. `gpt-4o-mini`
    pub model_name: String,
    pub api_key: Option<String>,
    /// OpenAI-compatible endpoint base, e.g. `https://api.openai.com/v1`
    pub base_url: Option<String>,
    /// Directory generated images are saved under (`static` by default)
    pub image_dir: std::path::PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_name: "gpt-4o-mini".to_string(),
            api_key: None,
            base_url: None,
            image_dir: std::path::PathBuf::from("static"),
        }
    }
}

pub mod prelude {
    pub use super::{create_model, Config, Crew};
    pub use na_core::{LanguageModel, Result};
}
