use async_trait::async_trait;
use na_core::{LanguageModel, Result};

/// Canned model for tests and offline runs. Every completion honors the
/// editor's TITLE/SUMMARY/ARTICLE contract so the whole pipeline can run
/// end to end without a network.
#[derive(Debug, Default)]
pub struct DummyModel {
    reply: Option<String>,
}

impl DummyModel {
    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
        }
    }
}

#[async_trait]
impl LanguageModel for DummyModel {
    fn name(&self) -> &str {
        "dummy"
    }

    async fn complete(&self, _system: &str, prompt: &str) -> Result<String> {
        if let Some(reply) = &self.reply {
            return Ok(reply.clone());
        }
        let first_line = prompt.lines().next().unwrap_or("").to_string();
        Ok(format!(
            "TITLE: Canned headline\n\nSUMMARY: Canned summary.\n\nARTICLE: Canned article for: {}",
            first_line
        ))
    }
}
