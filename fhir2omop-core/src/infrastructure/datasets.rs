// fhir2omop-core/src/infrastructure/datasets.rs

use serde::de::DeserializeOwned;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

use crate::domain::records::{CodeMapping, CodeMappingEntry, PersonRecord, RawObservation};
use crate::domain::table::DataTable;
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::fs::atomic_write;

/// Tab for `.tsv`/`.tab` files, comma otherwise.
pub fn delimiter_for(path: &Path) -> u8 {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("tsv") | Some("tab") => b'\t',
        _ => b',',
    }
}

fn open(path: &Path) -> Result<std::fs::File, InfrastructureError> {
    std::fs::File::open(path).map_err(|e| {
        InfrastructureError::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {}", path.display(), e),
        ))
    })
}

/// Typed rows of a CSV file with a header line. Empty cells read as `None`.
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, InfrastructureError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .delimiter(delimiter_for(path))
        .from_reader(open(path)?);

    let mut records = Vec::new();
    for row in reader.deserialize() {
        records.push(row?);
    }
    debug!(path = ?path, rows = records.len(), "Dataset read");
    Ok(records)
}

pub fn read_persons(path: &Path) -> Result<Vec<PersonRecord>, InfrastructureError> {
    read_records(path)
}

pub fn read_observations(path: &Path) -> Result<Vec<RawObservation>, InfrastructureError> {
    read_records(path)
}

/// The code mapping is optional: a missing file yields an empty mapping.
pub fn read_code_mapping(path: &Path) -> Result<CodeMapping, InfrastructureError> {
    if !path.exists() {
        warn!(path = ?path, "No code mapping file, source codes stay unmapped");
        return Ok(CodeMapping::default());
    }
    let entries: Vec<CodeMappingEntry> = read_records(path)?;
    Ok(CodeMapping::new(entries))
}

/// Untyped table from any reader. Ragged rows are accepted.
pub fn parse_table<R: Read>(input: R, delimiter: u8) -> Result<DataTable, InfrastructureError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(input);

    let headers = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(str::to_string).collect());
    }
    Ok(DataTable::new(headers, rows))
}

/// CSV or TSV file (COSMIC exports, uploads) as a generic table.
pub fn read_table(path: &Path) -> Result<DataTable, InfrastructureError> {
    parse_table(open(path)?, delimiter_for(path))
}

pub fn write_table_csv(path: &Path, table: &DataTable) -> Result<(), InfrastructureError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| InfrastructureError::Io(e.into_error()))?;
    atomic_write(path, bytes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_read_persons_with_blanks() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("person.csv");
        fs::write(
            &path,
            "person_id,gender_concept_id,year_of_birth\n1,8507,1980\n,8532, 1975\n",
        )?;

        let persons = read_persons(&path)?;
        assert_eq!(persons.len(), 2);
        assert_eq!(persons[0].person_id, Some(1));
        assert_eq!(persons[1].person_id, None);
        assert_eq!(persons[1].year_of_birth, Some(1975));
        // Columns absent from the file default to None
        assert_eq!(persons[0].race_concept_id, None);
        Ok(())
    }

    #[test]
    fn test_observation_codes_and_mapping() -> Result<()> {
        let dir = tempdir()?;
        let obs = dir.path().join("obs.csv");
        fs::write(
            &obs,
            "observation_id,person_id,observation_concept_id,observation_date,value_as_number\n\
             10,1,LOINC:8480-6,2020-03-01,120.5\n",
        )?;
        let map = dir.path().join("map.csv");
        fs::write(&map, "source_code,standard_concept_id\nLOINC:8480-6,3004249\n")?;

        let mapping = read_code_mapping(&map)?;
        let resolved: Vec<_> = read_observations(&obs)?
            .into_iter()
            .map(|o| o.resolve(&mapping))
            .collect();
        assert_eq!(resolved[0].observation_concept_id, Some(3004249));
        assert_eq!(resolved[0].value_as_number, Some(120.5));

        assert!(read_code_mapping(&dir.path().join("absent.csv"))?.is_empty());
        Ok(())
    }

    #[test]
    fn test_tsv_table_round_trip_to_csv() -> Result<()> {
        let dir = tempdir()?;
        let tsv = dir.path().join("cosmic.tsv");
        fs::write(&tsv, "GENE_NAME\tMUTATION_AA\nTP53\tp.R175H\nBRAF\tp.V600E, p.V600K\n")?;

        let table = read_table(&tsv)?;
        assert_eq!(table.headers, vec!["GENE_NAME", "MUTATION_AA"]);
        assert_eq!(table.cell(1, 1), "p.V600E, p.V600K");

        let out = dir.path().join("out/cosmic.csv");
        write_table_csv(&out, &table)?;
        let text = fs::read_to_string(out)?;
        assert!(text.contains("BRAF,\"p.V600E, p.V600K\""));
        Ok(())
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = read_persons(Path::new("/nonexistent/person.csv")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/person.csv"));
    }
}
