// fhir2omop-core/src/application/etl.rs

use chrono::Datelike;
use serde::Serialize;
use tracing::{error, info, instrument};

use crate::domain::error::DomainError;
use crate::domain::omop::OmopTable;
use crate::domain::quality::check_datasets;
use crate::domain::records::{ObservationRecord, PersonRecord};
use crate::error::OmopError;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::datasets::{read_code_mapping, read_observations, read_persons};
use crate::ports::connector::{Connector, TableLoad};

#[derive(Debug, Clone, Serialize)]
pub struct EtlReport {
    pub engine: String,
    pub persons: usize,
    pub observations: usize,
    pub code_mappings: usize,
}

/// Loads the person and observation samples. Any data-quality violation aborts
/// the run before the store is touched.
#[instrument(skip_all, fields(engine = connector.engine_name()))]
pub async fn run_etl(config: &AppConfig, connector: &dyn Connector) -> Result<EtlReport, OmopError> {
    // 1. Extract
    let persons: Vec<PersonRecord> = read_persons(&config.person_sample_path())?;
    let mapping = read_code_mapping(&config.code_mapping_path())?;
    let observations: Vec<ObservationRecord> = read_observations(&config.observation_sample_path())?
        .into_iter()
        .map(|o| o.resolve(&mapping))
        .collect();
    info!(
        persons = persons.len(),
        observations = observations.len(),
        code_mappings = mapping.len(),
        "📥 Sample datasets read"
    );

    // 2. Validate (all checks, then decide)
    let violations = check_datasets(&persons, &observations, i64::from(chrono::Utc::now().year()));
    if !violations.is_empty() {
        for v in &violations {
            error!("❌ DQ check failed: {}", v);
        }
        return Err(DomainError::DataQuality {
            violations: violations.iter().map(ToString::to_string).collect(),
        }
        .into());
    }

    // 3. Load: one transaction for both tables. The embedded store is owned
    // by this job and gets fresh tables inside that transaction.
    let person_rows: Vec<_> = persons.iter().map(PersonRecord::to_row).collect();
    let observation_rows: Vec<_> = observations.iter().map(ObservationRecord::to_row).collect();
    let counts = connector
        .load_tables(
            &[
                TableLoad {
                    table: OmopTable::Person,
                    rows: &person_rows,
                },
                TableLoad {
                    table: OmopTable::Observation,
                    rows: &observation_rows,
                },
            ],
            connector.is_embedded(),
        )
        .await?;
    let (loaded_persons, loaded_observations) = (counts[0], counts[1]);

    info!(
        persons = loaded_persons,
        observations = loaded_observations,
        "✅ ETL complete"
    );
    Ok(EtlReport {
        engine: connector.engine_name().to_string(),
        persons: loaded_persons,
        observations: loaded_observations,
        code_mappings: mapping.len(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::omop::SqlValue;
    use crate::infrastructure::adapters::duckdb::DuckDBConnector;
    use anyhow::Result;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    const PERSONS: &str = "person_id,gender_concept_id,year_of_birth,month_of_birth,day_of_birth,race_concept_id,ethnicity_concept_id\n\
        1,8507,1980,1,15,8527,38003564\n\
        2,8532,1992,6,2,8516,38003564\n";

    fn config_with(dir: &Path, persons: &str, observations: &str) -> Result<AppConfig> {
        let data = dir.join("data");
        fs::create_dir_all(&data)?;
        fs::write(data.join("person_sample.csv"), persons)?;
        fs::write(data.join("observation_sample.csv"), observations)?;
        fs::write(
            data.join("code_mapping_sample.csv"),
            "source_code,standard_concept_id\nLOINC:8480-6,3004249\n",
        )?;
        let mut config = AppConfig::default();
        config.root = dir.to_path_buf();
        Ok(config)
    }

    #[tokio::test]
    async fn test_etl_loads_and_maps_codes() -> Result<()> {
        let dir = tempdir()?;
        let config = config_with(
            dir.path(),
            PERSONS,
            "observation_id,person_id,observation_concept_id,observation_date,value_as_number,value_as_string\n\
             10,1,LOINC:8480-6,2020-03-01,120,\n\
             11,2,3025315,2021-07-04,70.5,kg\n",
        )?;
        let connector = DuckDBConnector::new(":memory:")?;

        let report = run_etl(&config, &connector).await?;
        assert_eq!((report.persons, report.observations), (2, 2));

        let concepts = connector
            .query("SELECT observation_concept_id FROM observation ORDER BY observation_id")
            .await?;
        assert_eq!(
            concepts.rows,
            vec![vec![SqlValue::Integer(3004249)], vec![SqlValue::Integer(3025315)]]
        );

        // Re-running replaces the embedded tables instead of failing on keys
        run_etl(&config, &connector).await?;
        let count = connector.query("SELECT COUNT(*) FROM person").await?;
        assert_eq!(count.rows[0][0], SqlValue::Integer(2));
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_person_aborts_before_writes() -> Result<()> {
        let dir = tempdir()?;
        let config = config_with(
            dir.path(),
            "person_id,year_of_birth\n1,1980\n1,1981\n",
            "observation_id,person_id,observation_concept_id\n10,1,3004249\n",
        )?;
        let connector = DuckDBConnector::new(":memory:")?;

        let err = run_etl(&config, &connector).await.unwrap_err();
        match err {
            OmopError::Domain(DomainError::DataQuality { violations }) => {
                assert_eq!(violations, vec!["Duplicate person_id found in person data"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(connector.list_tables().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_write_failure_keeps_previous_load() -> Result<()> {
        let dir = tempdir()?;
        let good = "observation_id,person_id,observation_concept_id\n10,1,3004249\n";
        let config = config_with(dir.path(), PERSONS, good)?;
        let connector = DuckDBConnector::new(":memory:")?;
        run_etl(&config, &connector).await?;

        // Passes the data-quality checks but breaks the observation primary key
        fs::write(
            dir.path().join("data/observation_sample.csv"),
            "observation_id,person_id,observation_concept_id\n10,1,3004249\n10,2,3004249\n",
        )?;
        fs::write(
            dir.path().join("data/person_sample.csv"),
            format!("{}3,8507,2001,,,,\n", PERSONS),
        )?;
        assert!(run_etl(&config, &connector).await.is_err());

        let persons = connector.query("SELECT COUNT(*) FROM person").await?;
        assert_eq!(persons.rows[0][0], SqlValue::Integer(2));
        let observations = connector.query("SELECT COUNT(*) FROM observation").await?;
        assert_eq!(observations.rows[0][0], SqlValue::Integer(1));
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_reference_and_unmapped_code_reported_together() -> Result<()> {
        let dir = tempdir()?;
        let config = config_with(
            dir.path(),
            PERSONS,
            "observation_id,person_id,observation_concept_id\n10,99,LOINC:0000-0\n",
        )?;
        let connector = DuckDBConnector::new(":memory:")?;
        connector.execute("CREATE TABLE person (person_id BIGINT)").await?;
        connector.execute("INSERT INTO person VALUES (42)").await?;

        let err = run_etl(&config, &connector).await.unwrap_err();
        let OmopError::Domain(DomainError::DataQuality { violations }) = err else {
            panic!("expected a data-quality error");
        };
        assert_eq!(
            violations,
            vec![
                "Observation references person_id not in person table",
                "Unmapped observation_concept_id found in observation data",
            ]
        );
        // Existing data untouched
        let rows = connector.query("SELECT person_id FROM person").await?;
        assert_eq!(rows.rows, vec![vec![SqlValue::Integer(42)]]);
        Ok(())
    }
}
