// fhir2omop-core/src/infrastructure/llm/mock.rs

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::OmopError;
use crate::ports::llm::TextGenerator;

/// Replays canned answers in order and records every prompt it receives.
/// Used for offline runs and tests.
#[derive(Default)]
pub struct ScriptedGenerator {
    answers: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<(String, String)>>,
}

impl ScriptedGenerator {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// `(model, prompt)` pairs seen so far.
    pub fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, OmopError> {
        self.generate_with_model("scripted", prompt).await
    }

    async fn generate_with_model(&self, model: &str, prompt: &str) -> Result<String, OmopError> {
        if let Ok(mut seen) = self.prompts.lock() {
            seen.push((model.to_string(), prompt.to_string()));
        }
        let next = self
            .answers
            .lock()
            .map_err(|_| OmopError::InternalError("scripted generator lock poisoned".into()))?
            .pop_front();
        next.ok_or_else(|| OmopError::InternalError("scripted generator has no answer left".into()))
    }

    fn default_model(&self) -> &str {
        "scripted"
    }
}
