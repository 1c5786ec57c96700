// fhir2omop-core/src/domain/table.rs

use serde::Serialize;
use serde_json::Value;

use crate::domain::fhir::{flatten, flattened_columns};

/// Untyped tabular data: CSV/TSV files, COSMIC exports, API payloads flattened for preview.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DataTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl DataTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Cell or empty string when the row is short.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn column(&self, col: usize) -> impl Iterator<Item = &str> + '_ {
        (0..self.rows.len()).map(move |r| self.cell(r, col))
    }

    /// One row per JSON record, columns are the union of flattened keys.
    pub fn from_records(records: &[Value]) -> DataTable {
        let flat: Vec<_> = records.iter().map(flatten).collect();
        let headers = flattened_columns(&flat);
        let rows = flat
            .iter()
            .map(|record| {
                headers
                    .iter()
                    .map(|h| record.get(h).map(render_cell).unwrap_or_default())
                    .collect()
            })
            .collect();
        DataTable { headers, rows }
    }
}

fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Empty strings and the usual textual null markers.
pub fn is_missing(value: &str) -> bool {
    let t = value.trim();
    t.is_empty()
        || t.eq_ignore_ascii_case("na")
        || t.eq_ignore_ascii_case("n/a")
        || t.eq_ignore_ascii_case("nan")
        || t.eq_ignore_ascii_case("null")
        || t.eq_ignore_ascii_case("none")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_records_unions_columns() {
        let table = DataTable::from_records(&[
            json!({"sampleId": "S1", "value": 2}),
            json!({"sampleId": "S2", "gene": {"hugoGeneSymbol": "TP53"}}),
        ]);
        assert_eq!(table.headers, vec!["sampleId", "value", "gene.hugoGeneSymbol"]);
        assert_eq!(table.rows[0], vec!["S1", "2", ""]);
        assert_eq!(table.cell(1, 2), "TP53");
    }

    #[test]
    fn test_missing_markers() {
        assert!(is_missing("  "));
        assert!(is_missing("NaN"));
        assert!(is_missing("None"));
        assert!(!is_missing("0"));
    }
}
