// fhir2omop/src/commands/tables.rs
//
// USE CASE: List the tables of the store.

use std::path::Path;

use fhir2omop_core::application::list_tables;
use fhir2omop_core::infrastructure::adapters::connect;

pub async fn execute(config: Option<&Path>) -> anyhow::Result<()> {
    let config = super::load(config)?;
    let connector = connect(&config).await?;

    let tables = list_tables(connector.as_ref()).await?;
    if tables.is_empty() {
        println!("   No tables yet. Run 'fhir2omop etl' or 'fhir2omop load'.");
    }
    for table in tables {
        println!("   📄 {}", table);
    }
    Ok(())
}
