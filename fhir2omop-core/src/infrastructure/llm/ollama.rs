// fhir2omop-core/src/infrastructure/llm/ollama.rs

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::error::OmopError;
use crate::infrastructure::config::LlmConfig;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::llm::TextGenerator;

/// Client for a local Ollama server (`/api/generate`, non-streaming).
pub struct OllamaClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaClient {
    pub fn new(config: &LlmConfig) -> Result<Self, InfrastructureError> {
        let client = reqwest::Client::builder()
            // Local models can be slow on first load
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/generate", config.host.trim_end_matches('/')),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String, OmopError> {
        self.generate_with_model(&self.model, prompt).await
    }

    #[instrument(skip(self, prompt), fields(prompt.len = prompt.len()))]
    async fn generate_with_model(&self, model: &str, prompt: &str) -> Result<String, OmopError> {
        let body = json!({
            "model": model,
            "prompt": prompt,
            "stream": false,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    InfrastructureError::ConfigError(format!(
                        "Failed to connect to Ollama at {}. Is it running? Start with: ollama serve",
                        self.endpoint
                    ))
                } else {
                    InfrastructureError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if body.contains("not found") {
                return Err(InfrastructureError::ConfigError(format!(
                    "Model '{}' not found. Pull it with: ollama pull {}",
                    model, model
                ))
                .into());
            }
            return Err(InfrastructureError::HttpStatus {
                service: "Ollama".into(),
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let parsed: GenerateResponse = response.json().await?;
        debug!(chars = parsed.response.len(), "Ollama answered");
        Ok(parsed.response)
    }

    fn default_model(&self) -> &str {
        &self.model
    }
}
