// fhir2omop/src/commands/ask.rs
//
// USE CASE: Free question to the model.

use std::path::Path;

use fhir2omop_core::application::ask;
use fhir2omop_core::infrastructure::llm::OllamaClient;
use fhir2omop_core::ports::llm::TextGenerator;

pub async fn execute(config: Option<&Path>, question: &str, model: Option<&str>) -> anyhow::Result<()> {
    let config = super::load(config)?;
    let llm = OllamaClient::new(&config.llm)?;

    println!(
        "💬 Sending question to model: {} ...",
        model.unwrap_or(llm.default_model())
    );
    let answer = ask(&llm, question, model).await?;
    println!("\n{}", answer.trim());
    Ok(())
}
