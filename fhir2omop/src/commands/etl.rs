// fhir2omop/src/commands/etl.rs
//
// USE CASE: Load the OMOP sample datasets with data-quality checks.

use std::path::Path;

use fhir2omop_core::application::run_etl;
use fhir2omop_core::infrastructure::adapters::connect;

pub async fn execute(config: Option<&Path>) -> anyhow::Result<()> {
    let config = super::load(config)?;
    let connector = connect(&config).await?;

    println!("📥 Running ETL on {}...", config.data_dir().display());
    let report = run_etl(&config, connector.as_ref()).await?;

    println!(
        "✨ ETL complete: {} persons, {} observations loaded into {} ({} code mappings).",
        report.persons, report.observations, report.engine, report.code_mappings
    );
    Ok(())
}
