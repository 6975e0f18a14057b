// Ollama backend: POST /api/generate, non-streaming.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{NarrationError, Narrator};
use crate::config::NarrationConfig;

/// Keep sampling stable across report cycles.
const TEMPERATURE: f32 = 0.3;
/// Responses get truncated to a few sentences anyway; cap generation.
const NUM_PREDICT: i32 = 256;

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: i32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

pub struct OllamaNarrator {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaNarrator {
    pub fn new(config: &NarrationConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl Narrator for OllamaNarrator {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn generate(&self, prompt: &str) -> Result<String, NarrationError> {
        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
            options: GenerateOptions {
                temperature: TEMPERATURE,
                num_predict: NUM_PREDICT,
            },
        };

        let url = format!("{}/api/generate", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(NarrationError::from_transport)?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(NarrationError::Http { status, body });
        }

        let generated: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| NarrationError::Parse(e.to_string()))?;
        Ok(generated.response)
    }
}
