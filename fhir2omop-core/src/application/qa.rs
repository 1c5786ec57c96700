// fhir2omop-core/src/application/qa.rs

use std::path::{Path, PathBuf};
use tracing::{info, instrument};

use crate::application::engine::run_query;
use crate::domain::error::DomainError;
use crate::domain::profile::profile_table;
use crate::error::OmopError;
use crate::infrastructure::datasets::{read_table, write_table_csv};
use crate::infrastructure::fs::atomic_write;
use crate::infrastructure::render::ReportRenderer;
use crate::ports::connector::Connector;

/// Profiles a CSV/TSV file into an HTML report and returns the report path.
#[instrument]
pub fn run_qa(csv_path: &Path, output_html: &Path) -> Result<PathBuf, OmopError> {
    let table = read_table(csv_path)?;
    let profile = profile_table(&table);
    info!(
        rows = profile.rows,
        columns = profile.columns,
        missing = profile.missing_cells,
        "🔎 Dataset profiled"
    );

    let html = ReportRenderer::new().qa_report(csv_path, &profile)?;
    atomic_write(output_html, html)?;
    info!(path = ?output_html, "📝 QA report written");
    Ok(output_html.to_path_buf())
}

/// Dumps a whole table to CSV. Returns the number of rows written.
#[instrument(skip(connector))]
pub async fn export_table_csv(
    connector: &dyn Connector,
    table: &str,
    path: &Path,
) -> Result<usize, OmopError> {
    if !connector.list_tables().await?.iter().any(|t| t == table) {
        return Err(DomainError::UnknownTable(table.to_string()).into());
    }
    let result = run_query(connector, &format!("SELECT * FROM {}", table)).await?;
    let mut data = result.to_table();
    // Empty results carry no column names; take them from the catalog
    if data.headers.is_empty() {
        data.headers = connector
            .fetch_columns(table)
            .await?
            .into_iter()
            .map(|c| c.name)
            .collect();
    }
    write_table_csv(path, &data)?;
    Ok(data.row_count())
}

/// Export + profile in one go: `{docs}/{table}.csv`, then the report at
/// `output_html` or `{docs}/{table}_profile_report.html`.
pub async fn profile_store_table(
    connector: &dyn Connector,
    table: &str,
    docs_dir: &Path,
    output_html: Option<&Path>,
) -> Result<PathBuf, OmopError> {
    let csv_path = docs_dir.join(format!("{}.csv", table));
    let rows = export_table_csv(connector, table, &csv_path).await?;
    info!(table, rows, path = ?csv_path, "📤 Table exported");

    let html = output_html
        .map(Path::to_path_buf)
        .unwrap_or_else(|| docs_dir.join(format!("{}_profile_report.html", table)));
    run_qa(&csv_path, &html)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::duckdb::DuckDBConnector;
    use anyhow::Result;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_run_qa_writes_report() -> Result<()> {
        let dir = tempdir()?;
        let csv = dir.path().join("person.csv");
        fs::write(&csv, "person_id,year_of_birth\n1,1980\n2,\n2,\n")?;
        let html = dir.path().join("reports/person.html");

        let out = run_qa(&csv, &html)?;
        assert_eq!(out, html);
        let text = fs::read_to_string(&html)?;
        assert!(text.contains("<tr><th>Rows</th><td>3</td></tr>"));
        assert!(text.contains("year_of_birth"));
        Ok(())
    }

    #[test]
    fn test_run_qa_missing_csv() {
        let dir = tempdir().unwrap();
        let result = run_qa(&dir.path().join("nope.csv"), &dir.path().join("r.html"));
        assert!(result.is_err());
        assert!(!dir.path().join("r.html").exists());
    }

    #[tokio::test]
    async fn test_profile_store_table() -> Result<()> {
        let dir = tempdir()?;
        let connector = DuckDBConnector::new(":memory:")?;
        connector
            .execute("CREATE TABLE person (person_id BIGINT, year_of_birth BIGINT)")
            .await?;

        // Empty table still exports its header
        let csv = dir.path().join("empty.csv");
        assert_eq!(export_table_csv(&connector, "person", &csv).await?, 0);
        assert_eq!(fs::read_to_string(&csv)?.trim(), "person_id,year_of_birth");

        connector.execute("INSERT INTO person VALUES (1, 1980), (2, NULL)").await?;
        let report = profile_store_table(&connector, "person", dir.path(), None).await?;
        assert!(report.ends_with("person_profile_report.html"));
        assert_eq!(fs::read_to_string(dir.path().join("person.csv"))?, "person_id,year_of_birth\n1,1980\n2,\n");

        let custom = dir.path().join("out/custom.html");
        let report = profile_store_table(&connector, "person", dir.path(), Some(custom.as_path())).await?;
        assert_eq!(report, custom);
        assert!(fs::read_to_string(&custom)?.contains("year_of_birth"));

        let unknown = export_table_csv(&connector, "ghost", &csv).await;
        assert!(matches!(unknown, Err(OmopError::Domain(DomainError::UnknownTable(_)))));
        Ok(())
    }
}
