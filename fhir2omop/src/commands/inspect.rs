// fhir2omop/src/commands/inspect.rs
//
// USE CASE: Inspect a table (schema + sample rows).

use std::path::Path;

use fhir2omop_core::application::preview_table;
use fhir2omop_core::infrastructure::adapters::connect;

use crate::output::print_query_result;

pub async fn execute(config: Option<&Path>, table: &str, limit: usize) -> anyhow::Result<()> {
    let config = super::load(config)?;
    let connector = connect(&config).await?;

    if !connector.list_tables().await?.iter().any(|t| t == table) {
        anyhow::bail!("❌ Table '{}' not found.\n👉 Have you run 'fhir2omop etl'?", table);
    }

    println!("\n🔍 Inspecting Table: '{}'", table);
    let columns = connector.fetch_columns(table).await?;
    let described: Vec<String> = columns
        .iter()
        .map(|c| format!("{} {}", c.name, c.data_type))
        .collect();
    println!("   Columns: [{}]", described.join(", "));
    println!("   --- Rows (Limit {}) ---", limit);

    let rows = preview_table(connector.as_ref(), table, limit).await?;
    print_query_result(&rows);
    Ok(())
}
