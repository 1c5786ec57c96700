// fhir2omop/src/commands/pipeline.rs
//
// USE CASE: Run the pipeline steps in sequence.

use anyhow::Context;
use std::path::Path;

use fhir2omop_core::application::{Orchestrator, PipelineRequest};
use fhir2omop_core::domain::OmopTable;
use fhir2omop_core::domain::pipeline::PipelineStep;
use fhir2omop_core::infrastructure::llm::OllamaClient;

use crate::cli::PipelineArgs;

pub async fn execute(config: Option<&Path>, args: PipelineArgs) -> anyhow::Result<()> {
    let start = std::time::Instant::now();
    let config = super::load(config)?;

    // A. Request
    let steps = if args.steps.is_empty() {
        None
    } else {
        Some(
            args.steps
                .iter()
                .map(|s| s.parse::<PipelineStep>())
                .collect::<Result<Vec<_>, _>>()?,
        )
    };
    let resource = match &args.resource {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read FHIR document {:?}", path))?;
            Some(serde_json::from_str(&content).with_context(|| format!("{:?} is not valid JSON", path))?)
        }
        None => None,
    };
    let table = args.table.as_deref().map(str::parse::<OmopTable>).transpose()?;

    let requested = steps.clone().unwrap_or_else(|| PipelineStep::ALL.to_vec());
    let request = PipelineRequest {
        steps,
        resource,
        table,
        qa_csv: args.qa_csv,
        qa_html: args.qa_html,
    };

    // B. Run
    let llm = OllamaClient::new(&config.llm)?;
    let orchestrator = Orchestrator::new(config, Box::new(llm));

    println!("🚀 Starting pipeline...");
    match orchestrator.orchestrate(&request).await {
        Ok(results) => {
            for step in &requested {
                match results.get(step) {
                    Some(outcome) => println!("   ✅ {:<12} {}", step.as_str(), outcome),
                    None => println!("   ⏭️  {:<12} skipped (missing inputs)", step.as_str()),
                }
            }
            println!("\n✨ SUCCESS! Pipeline finished in {:.2?}", start.elapsed());
            Ok(())
        }
        Err(e) => {
            eprintln!("\n💥 PIPELINE ERROR: {}", e);
            std::process::exit(1);
        }
    }
}
