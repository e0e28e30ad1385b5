use async_trait::async_trait;
use std::fmt;

use crate::Result;

/// Chat-completion backend the crew drives. Implementations wrap an
/// OpenAI-compatible API or a canned model for tests.
#[async_trait]
pub trait LanguageModel: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Run one chat turn with a system role and a user prompt
    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;

    /// Generate an image from a prompt and return its URL
    async fn generate_image(&self, _prompt: &str) -> Result<String> {
        Err(crate::Error::Generation(format!(
            "{} does not support image generation",
            self.name()
        )))
    }
}
