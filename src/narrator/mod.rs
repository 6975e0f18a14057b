// Narration capability: one interface ("generate text from prompt, with a
// bounded timeout"), one implementation per backend, selected by config.

mod ollama;
mod openai;

pub use ollama::OllamaNarrator;
pub use openai::OpenAiNarrator;

use crate::config::{NarrationBackend, NarrationConfig};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NarrationError {
    #[error("narration service not reachable: {0}")]
    NotAvailable(String),
    #[error("narration request timed out")]
    Timeout,
    #[error("narration service returned status {status}: {body}")]
    Http { status: u16, body: String },
    #[error("could not parse narration response: {0}")]
    Parse(String),
}

impl NarrationError {
    /// Classify a reqwest transport error.
    fn from_transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::NotAvailable(e.to_string())
        } else {
            Self::NotAvailable(e.to_string())
        }
    }
}

#[async_trait]
pub trait Narrator: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Generate narration text from a prompt. The call is bounded by the
    /// backend's configured timeout; it never blocks indefinitely.
    async fn generate(&self, prompt: &str) -> Result<String, NarrationError>;
}

/// Build the configured backend.
pub fn build(config: &NarrationConfig) -> anyhow::Result<Arc<dyn Narrator>> {
    let narrator: Arc<dyn Narrator> = match config.backend {
        NarrationBackend::Ollama => Arc::new(OllamaNarrator::new(config)?),
        NarrationBackend::OpenAi => Arc::new(OpenAiNarrator::new(config)?),
    };
    Ok(narrator)
}
