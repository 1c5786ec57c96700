// fhir2omop/src/commands/fetch.rs
//
// USE CASE: Fetch FHIR resources and keep them in the session for `load`.

use std::path::Path;

use fhir2omop_core::application::SessionState;
use fhir2omop_core::domain::fhir::validate_resource_type;
use fhir2omop_core::domain::table::DataTable;
use fhir2omop_core::infrastructure::http::FhirClient;

use crate::output::print_data_table;

pub async fn execute(config: Option<&Path>, resource_type: &str, count: u32) -> anyhow::Result<()> {
    let config = super::load(config)?;
    let client = FhirClient::new(&config.fhir)?;
    let resource_type = validate_resource_type(resource_type)?;

    println!("🔥 Fetching {} {} resources from {}...", count, resource_type, config.fhir.base_url);
    let resources = client.fetch_resources(resource_type, count).await?;

    if resources.is_empty() {
        println!("   No resources found.");
    } else {
        print_data_table(&DataTable::from_records(&resources), resources.len());
    }

    let session_path = config.session_path();
    let mut session = SessionState::load(&session_path)?;
    session.store_resources(resource_type, resources);
    session.save(&session_path)?;
    println!(
        "💾 {} resource(s) kept in session. Run 'fhir2omop load' to store them.",
        session.resources.len()
    );
    Ok(())
}
