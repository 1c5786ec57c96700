// fhir2omop-core/src/application/analytics.rs

use chrono::Datelike;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

use crate::application::engine::run_query;
use crate::domain::omop::SqlValue;
use crate::error::OmopError;
use crate::infrastructure::fs::atomic_write;
use crate::infrastructure::render::{Bar, BarChart, ReportRenderer};
use crate::ports::connector::Connector;

const AGE_BINS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chart {
    PersonsByGender,
    AgeDistribution,
    ObservationsPerYear,
}

impl Chart {
    pub const ALL: [Chart; 3] = [
        Chart::PersonsByGender,
        Chart::AgeDistribution,
        Chart::ObservationsPerYear,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            Chart::PersonsByGender => "persons_by_gender.svg",
            Chart::AgeDistribution => "age_distribution.svg",
            Chart::ObservationsPerYear => "observations_per_year.svg",
        }
    }

    fn sql(&self) -> &'static str {
        match self {
            Chart::PersonsByGender => {
                "SELECT gender_concept_id, COUNT(*) AS n FROM person \
                 GROUP BY gender_concept_id ORDER BY gender_concept_id"
            }
            Chart::AgeDistribution => {
                "SELECT year_of_birth FROM person WHERE year_of_birth IS NOT NULL"
            }
            Chart::ObservationsPerYear => {
                "SELECT substr(observation_date, 1, 4) AS obs_year, COUNT(*) AS n FROM observation \
                 WHERE observation_date IS NOT NULL GROUP BY obs_year ORDER BY obs_year"
            }
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalyticsReport {
    pub written: Vec<PathBuf>,
    /// `file: error` for every chart that could not be produced.
    pub failed: Vec<String>,
}

/// Renders the three charts into `output_dir`. Charts are independent; the run
/// fails only when none of them could be written.
#[instrument(skip(connector), fields(engine = connector.engine_name()))]
pub async fn run_analytics(
    connector: &dyn Connector,
    output_dir: &Path,
) -> Result<AnalyticsReport, OmopError> {
    let renderer = ReportRenderer::new();
    let current_year = i64::from(chrono::Utc::now().year());
    let mut report = AnalyticsReport::default();

    for chart in Chart::ALL {
        let path = output_dir.join(chart.file_name());
        match render_chart(connector, &renderer, chart, current_year, &path).await {
            Ok(()) => {
                info!(path = ?path, "📊 Chart written");
                report.written.push(path);
            }
            Err(e) => {
                warn!(chart = chart.file_name(), error = %e, "⚠️ Chart skipped");
                report.failed.push(format!("{}: {}", chart.file_name(), e));
            }
        }
    }

    if report.written.is_empty() {
        return Err(OmopError::InternalError(format!(
            "No chart could be produced: {}",
            report.failed.join("; ")
        )));
    }
    Ok(report)
}

async fn render_chart(
    connector: &dyn Connector,
    renderer: &ReportRenderer,
    chart: Chart,
    current_year: i64,
    path: &Path,
) -> Result<(), OmopError> {
    let result = run_query(connector, chart.sql()).await?;

    let spec = match chart {
        Chart::PersonsByGender => BarChart {
            title: "Number of Persons by Gender Concept ID".into(),
            x_label: "Gender Concept ID".into(),
            y_label: "Count".into(),
            bars: counted_bars(&result.rows),
        },
        Chart::AgeDistribution => {
            let ages: Vec<f64> = result
                .rows
                .iter()
                .filter_map(|r| r.first().and_then(SqlValue::as_f64))
                .map(|yob| current_year as f64 - yob)
                .collect();
            BarChart {
                title: "Age Distribution".into(),
                x_label: "Age".into(),
                y_label: "Number of Persons".into(),
                bars: histogram(&ages, AGE_BINS),
            }
        }
        Chart::ObservationsPerYear => BarChart {
            title: "Observations per Year".into(),
            x_label: "Year".into(),
            y_label: "Number of Observations".into(),
            bars: counted_bars(&result.rows),
        },
    };

    let svg = renderer.bar_chart(&spec)?;
    atomic_write(path, svg)?;
    Ok(())
}

/// `(label, count)` rows to bars. A NULL label reads as "unknown".
fn counted_bars(rows: &[Vec<SqlValue>]) -> Vec<Bar> {
    rows.iter()
        .filter_map(|r| match r.as_slice() {
            [label, count, ..] => {
                let label = if label.is_null() {
                    "unknown".to_string()
                } else {
                    label.to_string()
                };
                Some(Bar::new(label, count.as_f64().unwrap_or(0.0)))
            }
            _ => None,
        })
        .collect()
}

/// Equal-width bins over `[min, max]`; the last bin is closed on the right.
/// A single distinct value gets a unit-wide range centred on it.
pub fn histogram(values: &[f64], bins: usize) -> Vec<Bar> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }
    let mut lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / bins as f64;

    let mut counts = vec![0usize; bins];
    for &v in values {
        let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, n)| {
            let start = lo + i as f64 * width;
            Bar::new(format!("{:.0}-{:.0}", start, start + width), n as f64)
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::omop::OmopTable;
    use crate::infrastructure::adapters::duckdb::DuckDBConnector;
    use anyhow::Result;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_histogram_bins() {
        let bars = histogram(&[20.0, 30.0, 40.0, 120.0], 10);
        assert_eq!(bars.len(), 10);
        assert_eq!(bars[0].label, "20-30");
        assert_eq!(bars[0].value, 1.0);
        assert_eq!(bars[1].value, 1.0);
        assert_eq!(bars[2].value, 1.0);
        // Max value lands in the last bin
        assert_eq!(bars[9].value, 1.0);
        let total: f64 = bars.iter().map(|b| b.value).sum();
        assert_eq!(total, 4.0);

        let single = histogram(&[45.0, 45.0], 10);
        assert_eq!(single.iter().map(|b| b.value).sum::<f64>(), 2.0);
        assert!(histogram(&[], 10).is_empty());
    }

    #[tokio::test]
    async fn test_charts_written() -> Result<()> {
        let dir = tempdir()?;
        let connector = DuckDBConnector::new(":memory:")?;
        connector.execute(&OmopTable::Person.create_table_sql(false)).await?;
        connector.execute(&OmopTable::Observation.create_table_sql(false)).await?;
        connector
            .execute(
                "INSERT INTO person (person_id, gender_concept_id, year_of_birth) VALUES \
                 (1, 8507, 1980), (2, 8532, 1990), (3, 8532, NULL);
                 INSERT INTO observation (observation_id, person_id, observation_date) VALUES \
                 (10, 1, '2020-01-05'), (11, 2, '2020-06-01'), (12, 2, '2021-02-02');",
            )
            .await?;

        let report = run_analytics(&connector, dir.path()).await?;
        assert_eq!(report.written.len(), 3);
        assert!(report.failed.is_empty());

        let gender = fs::read_to_string(dir.path().join("persons_by_gender.svg"))?;
        assert!(gender.contains("<title>8532: 2</title>"));
        let per_year = fs::read_to_string(dir.path().join("observations_per_year.svg"))?;
        assert!(per_year.contains("<title>2020: 2</title>"));
        Ok(())
    }

    #[tokio::test]
    async fn test_partial_failure_is_reported() -> Result<()> {
        let dir = tempdir()?;
        let connector = DuckDBConnector::new(":memory:")?;
        connector.execute(&OmopTable::Person.create_table_sql(false)).await?;

        let report = run_analytics(&connector, dir.path()).await?;
        assert_eq!(report.written.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].starts_with("observations_per_year.svg"));
        Ok(())
    }

    #[tokio::test]
    async fn test_all_charts_failing_is_an_error() -> Result<()> {
        let dir = tempdir()?;
        let connector = DuckDBConnector::new(":memory:")?;
        assert!(run_analytics(&connector, dir.path()).await.is_err());
        Ok(())
    }
}
