// fhir2omop/src/commands/load.rs
//
// USE CASE: Map the resources of the last fetch and upsert them into the store.

use std::path::Path;

use fhir2omop_core::application::{SessionState, map_and_load};
use fhir2omop_core::domain::fhir::validate_resource_type;
use fhir2omop_core::infrastructure::adapters::connect;
use fhir2omop_core::infrastructure::llm::OllamaClient;

pub async fn execute(config: Option<&Path>, resource_type: Option<String>) -> anyhow::Result<()> {
    let config = super::load(config)?;
    let session = SessionState::load(&config.session_path())?;

    if session.resources.is_empty() {
        anyhow::bail!("❌ No resources in session.\n👉 Fetch some first: fhir2omop fetch Patient");
    }
    let resource_type = match resource_type.or_else(|| session.last_resource_type.clone()) {
        Some(rt) => validate_resource_type(&rt)?,
        None => anyhow::bail!("Unknown resource type, pass --resource-type"),
    };

    let connector = connect(&config).await?;
    let llm = OllamaClient::new(&config.llm)?;

    println!("💾 Loading {} {} resource(s)...", session.resources.len(), resource_type);
    let report = map_and_load(&session.resources, resource_type, connector.as_ref(), &llm).await?;

    println!(
        "✨ {} row(s) upserted into {} ({} skipped without primary key, {} mapped by the model).",
        report.loaded, report.table, report.skipped, report.fallbacks
    );
    Ok(())
}
