// fhir2omop/src/commands/analytics.rs
//
// USE CASE: Render the three analytics charts.

use std::path::Path;

use fhir2omop_core::application::run_analytics;
use fhir2omop_core::infrastructure::adapters::connect;

pub async fn execute(config: Option<&Path>) -> anyhow::Result<()> {
    let config = super::load(config)?;
    let connector = connect(&config).await?;
    let docs_dir = config.docs_dir();

    println!("📊 Rendering charts into {}...", docs_dir.display());
    let report = run_analytics(connector.as_ref(), &docs_dir).await?;

    for path in &report.written {
        println!("   ✅ {}", path.display());
    }
    for failure in &report.failed {
        println!("   ⚠️  {}", failure);
    }
    println!("✨ Analytics complete: charts saved to {}/", docs_dir.display());
    Ok(())
}
