// fhir2omop-core/src/domain/profile.rs

use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashSet;

use crate::domain::table::{DataTable, is_missing};

const TOP_VALUES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Integer,
    Float,
    Boolean,
    Date,
    Text,
    /// Every cell is missing.
    Empty,
}

#[derive(Debug, Clone, Serialize)]
pub struct NumericSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub kind: ColumnKind,
    pub missing: usize,
    pub missing_percent: f64,
    pub distinct: usize,
    pub top_values: Vec<(String, usize)>,
    pub numeric: Option<NumericSummary>,
    /// Shortest and longest value, for text columns.
    pub length_range: Option<(usize, usize)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetProfile {
    pub rows: usize,
    pub columns: usize,
    pub missing_cells: usize,
    pub missing_percent: f64,
    pub duplicate_rows: usize,
    pub column_profiles: Vec<ColumnProfile>,
}

pub fn profile_table(table: &DataTable) -> DatasetProfile {
    let column_profiles: Vec<ColumnProfile> = table
        .headers
        .iter()
        .enumerate()
        .map(|(i, name)| profile_column(name, table.column(i)))
        .collect();

    let missing_cells: usize = column_profiles.iter().map(|c| c.missing).sum();
    let total_cells = table.row_count() * table.column_count();

    let mut seen = HashSet::new();
    let duplicate_rows = table.rows.iter().filter(|r| !seen.insert(*r)).count();

    DatasetProfile {
        rows: table.row_count(),
        columns: table.column_count(),
        missing_cells,
        missing_percent: percent(missing_cells, total_cells),
        duplicate_rows,
        column_profiles,
    }
}

fn profile_column<'a>(name: &str, cells: impl Iterator<Item = &'a str>) -> ColumnProfile {
    let cells: Vec<&str> = cells.collect();
    let present: Vec<&str> = cells.iter().copied().filter(|c| !is_missing(c)).collect();
    let missing = cells.len() - present.len();

    let mut counts: IndexMap<&str, usize> = IndexMap::new();
    for v in &present {
        *counts.entry(v.trim()).or_insert(0) += 1;
    }
    let distinct = counts.len();
    let mut top: Vec<(String, usize)> = counts
        .iter()
        .map(|(v, c)| (v.to_string(), *c))
        .collect();
    // Stable sort keeps first-seen order among ties.
    top.sort_by(|a, b| b.1.cmp(&a.1));
    top.truncate(TOP_VALUES);

    let kind = infer_kind(&present);
    let numeric = match kind {
        ColumnKind::Integer | ColumnKind::Float => {
            let values: Vec<f64> = present
                .iter()
                .filter_map(|v| v.trim().parse::<f64>().ok())
                .collect();
            summarize(values)
        }
        _ => None,
    };
    let length_range = match kind {
        ColumnKind::Text | ColumnKind::Date | ColumnKind::Boolean => {
            let lengths = present.iter().map(|v| v.chars().count());
            lengths
                .clone()
                .min()
                .zip(lengths.max())
        }
        _ => None,
    };

    ColumnProfile {
        name: name.to_string(),
        kind,
        missing,
        missing_percent: percent(missing, cells.len()),
        distinct,
        top_values: top,
        numeric,
        length_range,
    }
}

/// The narrowest kind every present value fits.
fn infer_kind(values: &[&str]) -> ColumnKind {
    if values.is_empty() {
        return ColumnKind::Empty;
    }
    let all = |f: fn(&str) -> bool| values.iter().all(|v| f(v.trim()));

    if all(|v| v.parse::<i64>().is_ok()) {
        ColumnKind::Integer
    } else if all(|v| v.parse::<f64>().is_ok()) {
        ColumnKind::Float
    } else if all(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "false" | "yes" | "no")) {
        ColumnKind::Boolean
    } else if all(looks_like_date) {
        ColumnKind::Date
    } else {
        ColumnKind::Text
    }
}

fn looks_like_date(v: &str) -> bool {
    let date = v.split('T').next().unwrap_or_default();
    chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok()
}

/// Welford for mean/variance, sorted copy for quartiles.
fn summarize(mut values: Vec<f64>) -> Option<NumericSummary> {
    if values.is_empty() {
        return None;
    }

    let mut count = 0usize;
    let mut mean = 0.0;
    let mut m2 = 0.0;
    for &x in &values {
        count += 1;
        let delta = x - mean;
        mean += delta / count as f64;
        m2 += delta * (x - mean);
    }
    // Sample standard deviation, 0 for a single value
    let std = if count > 1 {
        (m2 / (count - 1) as f64).sqrt()
    } else {
        0.0
    };

    values.sort_by(|a, b| a.total_cmp(b));
    Some(NumericSummary {
        min: values[0],
        max: values[values.len() - 1],
        mean,
        std,
        q1: quantile(&values, 0.25),
        median: quantile(&values, 0.5),
        q3: quantile(&values, 0.75),
    })
}

/// Linear interpolation between closest ranks. `sorted` must be non-empty.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let weight = pos - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> DataTable {
        DataTable::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_numeric_column_profile() {
        let t = table(&["age"], &[&["10"], &["20"], &["30"], &["40"], &[""]]);
        let profile = profile_table(&t);
        let age = &profile.column_profiles[0];
        assert_eq!(age.kind, ColumnKind::Integer);
        assert_eq!(age.missing, 1);
        assert_eq!(age.missing_percent, 20.0);
        let n = age.numeric.as_ref().unwrap();
        assert_eq!(n.min, 10.0);
        assert_eq!(n.max, 40.0);
        assert_eq!(n.mean, 25.0);
        assert_eq!(n.median, 25.0);
        assert_eq!(n.q1, 17.5);
        assert!((n.std - 12.909944).abs() < 1e-5);
    }

    #[test]
    fn test_text_and_date_columns() {
        let t = table(
            &["gender", "date"],
            &[&["female", "2020-01-01"], &["male", "2021-05-03T10:00:00"], &["female", "2022-12-31"]],
        );
        let profile = profile_table(&t);
        let gender = &profile.column_profiles[0];
        assert_eq!(gender.kind, ColumnKind::Text);
        assert_eq!(gender.distinct, 2);
        assert_eq!(gender.top_values[0], ("female".to_string(), 2));
        assert_eq!(gender.length_range, Some((4, 6)));
        assert_eq!(profile.column_profiles[1].kind, ColumnKind::Date);
    }

    #[test]
    fn test_dataset_overview() {
        let t = table(&["a", "b"], &[&["1", "x"], &["1", "x"], &["2", "NA"]]);
        let profile = profile_table(&t);
        assert_eq!(profile.rows, 3);
        assert_eq!(profile.columns, 2);
        assert_eq!(profile.duplicate_rows, 1);
        assert_eq!(profile.missing_cells, 1);
    }

    #[test]
    fn test_empty_column() {
        let t = table(&["blank"], &[&[""], &["null"]]);
        let col = &profile_table(&t).column_profiles[0];
        assert_eq!(col.kind, ColumnKind::Empty);
        assert!(col.numeric.is_none());
        assert_eq!(col.missing_percent, 100.0);
    }
}
