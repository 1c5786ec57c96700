// fhir2omop/src/commands/prompt.rs
//
// USE CASE: Prompt playground.

use std::path::Path;

use fhir2omop_core::application::mapping::{DEFAULT_PLAYGROUND_PROMPT, DEFAULT_SAMPLE_DATA, prompt};
use fhir2omop_core::infrastructure::llm::OllamaClient;

pub async fn execute(
    config: Option<&Path>,
    custom_prompt: Option<&str>,
    sample: Option<&str>,
    model: Option<&str>,
) -> anyhow::Result<()> {
    let config = super::load(config)?;
    let llm = OllamaClient::new(&config.llm)?;

    println!("🧪 Running prompt...");
    let answer = prompt(
        &llm,
        custom_prompt.unwrap_or(DEFAULT_PLAYGROUND_PROMPT),
        sample.unwrap_or(DEFAULT_SAMPLE_DATA),
        model,
    )
    .await?;
    println!("\n{}", answer.trim());
    Ok(())
}
