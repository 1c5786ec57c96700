// fhir2omop-core/src/ports/llm.rs

use crate::error::OmopError;
use async_trait::async_trait;

/// Free-text generation service (a local Ollama server in practice).
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generates with the configured default model.
    async fn generate(&self, prompt: &str) -> Result<String, OmopError>;

    async fn generate_with_model(&self, model: &str, prompt: &str) -> Result<String, OmopError>;

    fn default_model(&self) -> &str;
}
