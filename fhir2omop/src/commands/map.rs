// fhir2omop/src/commands/map.rs
//
// USE CASE: Map one FHIR document onto an OMOP table (dry run, nothing stored).

use anyhow::Context;
use std::path::Path;

use fhir2omop_core::application::map_resource;
use fhir2omop_core::domain::OmopTable;
use fhir2omop_core::domain::fhir::unwrap_bundle;
use fhir2omop_core::infrastructure::llm::OllamaClient;

pub async fn execute(config: Option<&Path>, file: &Path, table: &str) -> anyhow::Result<()> {
    let config = super::load(config)?;
    let table: OmopTable = table.parse()?;

    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read FHIR document {:?}", file))?;
    let document: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("{:?} is not valid JSON", file))?;

    let llm = OllamaClient::new(&config.llm)?;
    for resource in unwrap_bundle(document) {
        let result = map_resource(&resource, table, &llm).await?;
        if let Some(reason) = &result.fallback_reason {
            println!("🤖 Mapped by the model ({})", reason);
        }
        for rejected in &result.rejected {
            println!("   ⚠️  {}", rejected);
        }
        println!("{}", result.row.to_insert_sql());
    }
    Ok(())
}
