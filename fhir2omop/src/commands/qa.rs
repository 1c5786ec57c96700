// fhir2omop/src/commands/qa.rs
//
// USE CASE: Profile a CSV file or a store table into an HTML report.

use std::path::{Path, PathBuf};

use fhir2omop_core::application::{profile_store_table, run_qa};
use fhir2omop_core::infrastructure::adapters::connect;

pub async fn execute(
    config: Option<&Path>,
    csv: Option<PathBuf>,
    table: Option<String>,
    html: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = super::load(config)?;
    let docs_dir = config.docs_dir();

    let report = match (csv, table) {
        // A. A file on disk
        (Some(csv), _) => {
            let name = csv
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "dataset".to_string());
            let html =
                html.unwrap_or_else(|| docs_dir.join(format!("{}_profile_report.html", name)));
            println!("🔎 Profiling {}...", csv.display());
            run_qa(&csv, &html)?
        }
        // B. A table of the store, exported next to the reports
        (None, Some(table)) => {
            let connector = connect(&config).await?;
            println!("🔎 Exporting and profiling table '{}'...", table);
            profile_store_table(connector.as_ref(), &table, &docs_dir, html.as_deref()).await?
        }
        (None, None) => anyhow::bail!("Give a CSV file or --table"),
    };

    println!("✨ QA report written to {}", report.display());
    Ok(())
}
