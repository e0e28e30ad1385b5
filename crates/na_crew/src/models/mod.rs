use na_core::{LanguageModel, Result};
use std::sync::Arc;

use crate::Config;

pub mod dummy;
pub mod openai;

pub use dummy::DummyModel;
pub use openai::OpenAiModel;

/// Build a chat model by name. `dummy` answers with canned text and is
/// meant for tests and offline runs; anything else is treated as an
/// OpenAI-compatible model identifier.
pub fn create_model(config: &Config) -> Result<Arc<dyn LanguageModel>> {
    match config.model_name.as_str() {
        "dummy" => Ok(Arc::new(DummyModel::default())),
        _ => Ok(Arc::new(OpenAiModel::new(
            config.model_name.clone(),
            config.api_key.clone(),
            config.base_url.clone(),
        )?)),
    }
}
