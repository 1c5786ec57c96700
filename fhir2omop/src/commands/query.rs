// fhir2omop/src/commands/query.rs
//
// USE CASE: Execute a raw SQL query (ad-hoc).

use std::path::Path;

use fhir2omop_core::application::run_query;
use fhir2omop_core::infrastructure::adapters::connect;

use crate::output::print_query_result;

pub async fn execute(config: Option<&Path>, query: &str) -> anyhow::Result<()> {
    let config = super::load(config)?;
    let connector = connect(&config).await?;

    let result = run_query(connector.as_ref(), query).await?;
    print_query_result(&result);
    Ok(())
}
