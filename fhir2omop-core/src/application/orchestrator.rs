// fhir2omop-core/src/application/orchestrator.rs

use indexmap::IndexMap;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, instrument};

use crate::application::analytics::{self, AnalyticsReport};
use crate::application::etl::{self, EtlReport};
use crate::application::mapping::{MappingResult, map_resource};
use crate::application::qa;
use crate::domain::omop::OmopTable;
use crate::domain::pipeline::{PipelineStep, StepOutcome};
use crate::error::OmopError;
use crate::infrastructure::adapters::connect;
use crate::infrastructure::config::AppConfig;
use crate::ports::llm::TextGenerator;

/// Inputs of a pipeline run. `None` steps means the full default sequence.
#[derive(Debug, Clone, Default)]
pub struct PipelineRequest {
    pub steps: Option<Vec<PipelineStep>>,
    pub resource: Option<Value>,
    pub table: Option<OmopTable>,
    pub qa_csv: Option<PathBuf>,
    pub qa_html: Option<PathBuf>,
}

/// Sequences the four pipeline steps. Every step opens its own store handle.
pub struct Orchestrator {
    config: AppConfig,
    llm: Box<dyn TextGenerator>,
}

impl Orchestrator {
    pub fn new(config: AppConfig, llm: Box<dyn TextGenerator>) -> Self {
        Self { config, llm }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub async fn run_etl(&self) -> Result<EtlReport, OmopError> {
        let connector = connect(&self.config).await?;
        etl::run_etl(&self.config, connector.as_ref()).await
    }

    pub async fn run_analytics(&self) -> Result<AnalyticsReport, OmopError> {
        let connector = connect(&self.config).await?;
        analytics::run_analytics(connector.as_ref(), &self.config.docs_dir()).await
    }

    pub async fn run_llm_mapping(
        &self,
        resource: &Value,
        table: OmopTable,
    ) -> Result<MappingResult, OmopError> {
        map_resource(resource, table, self.llm.as_ref()).await
    }

    pub fn run_qa(&self, csv_path: &Path, output_html: &Path) -> Result<PathBuf, OmopError> {
        qa::run_qa(csv_path, output_html)
    }

    /// Runs the requested steps in order. The first failure aborts the run;
    /// steps already done are not undone.
    #[instrument(skip_all)]
    pub async fn orchestrate(
        &self,
        request: &PipelineRequest,
    ) -> Result<IndexMap<PipelineStep, StepOutcome>, OmopError> {
        let steps = request
            .steps
            .clone()
            .unwrap_or_else(|| PipelineStep::ALL.to_vec());
        info!(steps = ?steps, "🚀 Starting pipeline");
        let start = Instant::now();

        let mut results = IndexMap::new();
        for step in steps {
            let outcome = match step {
                PipelineStep::Etl => {
                    let report = self.run_etl().await?;
                    StepOutcome::Loaded {
                        persons: report.persons,
                        observations: report.observations,
                    }
                }
                PipelineStep::LlmMapping => match (&request.resource, request.table) {
                    (Some(resource), Some(table)) => {
                        let result = self.run_llm_mapping(resource, table).await?;
                        StepOutcome::Mapped {
                            used_fallback: result.used_fallback(),
                            row: result.row,
                        }
                    }
                    _ => {
                        info!("⏭️ llm_mapping skipped: needs a resource and a table");
                        continue;
                    }
                },
                PipelineStep::Qa => match (&request.qa_csv, &request.qa_html) {
                    (Some(csv), Some(html)) => StepOutcome::Report {
                        path: self.run_qa(csv, html)?,
                    },
                    _ => {
                        info!("⏭️ qa skipped: needs both a CSV input and an HTML output");
                        continue;
                    }
                },
                PipelineStep::Analytics => {
                    let report = self.run_analytics().await?;
                    StepOutcome::Charts {
                        written: report.written,
                        failed: report.failed,
                    }
                }
            };
            info!(%step, "✅ {}", outcome);
            results.insert(step, outcome);
        }

        info!("🏁 Pipeline finished in {:.2?}", start.elapsed());
        Ok(results)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::infrastructure::llm::ScriptedGenerator;
    use anyhow::Result;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn project(dir: &Path, persons: &str) -> Result<AppConfig> {
        let data = dir.join("data");
        fs::create_dir_all(&data)?;
        fs::write(data.join("person_sample.csv"), persons)?;
        fs::write(
            data.join("observation_sample.csv"),
            "observation_id,person_id,observation_concept_id,observation_date,value_as_number,value_as_string\n\
             1,1,3004249,2021-03-04,120,\n",
        )?;
        let mut config = AppConfig::default();
        config.root = dir.to_path_buf();
        Ok(config)
    }

    fn orchestrator(config: AppConfig) -> Orchestrator {
        Orchestrator::new(config, Box::new(ScriptedGenerator::new(Vec::<String>::new())))
    }

    #[tokio::test]
    async fn test_qa_without_paths_is_skipped() -> Result<()> {
        let dir = tempdir()?;
        let orch = orchestrator(project(dir.path(), "person_id\n1\n")?);
        let request = PipelineRequest {
            steps: Some(vec![PipelineStep::Qa, PipelineStep::LlmMapping]),
            qa_csv: Some(dir.path().join("data/person_sample.csv")),
            ..Default::default()
        };

        let results = orch.orchestrate(&request).await?;
        assert!(results.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_full_run() -> Result<()> {
        let dir = tempdir()?;
        let orch = orchestrator(project(
            dir.path(),
            "person_id,gender_concept_id,year_of_birth\n1,8507,1980\n",
        )?);
        let request = PipelineRequest {
            resource: Some(json!({"resourceType": "Patient", "id": "123", "gender": "female", "birthDate": "1980-01-01"})),
            table: Some(OmopTable::Person),
            qa_csv: Some(dir.path().join("data/person_sample.csv")),
            qa_html: Some(dir.path().join("docs/person_profile_report.html")),
            ..Default::default()
        };

        let results = orch.orchestrate(&request).await?;
        let keys: Vec<_> = results.keys().copied().collect();
        assert_eq!(keys, PipelineStep::ALL.to_vec());

        assert!(matches!(
            results[&PipelineStep::Etl],
            StepOutcome::Loaded { persons: 1, observations: 1 }
        ));
        match &results[&PipelineStep::LlmMapping] {
            StepOutcome::Mapped { row, used_fallback } => {
                assert!(!used_fallback);
                assert_eq!(row.values.len(), 7);
            }
            other => panic!("unexpected outcome {other}"),
        }
        assert!(dir.path().join("docs/person_profile_report.html").exists());
        assert!(dir.path().join("docs/age_distribution.svg").exists());
        assert!(dir.path().join("omop_demo.duckdb").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_first_failure_aborts() -> Result<()> {
        let dir = tempdir()?;
        let orch = orchestrator(project(dir.path(), "person_id,year_of_birth\n1,1980\n1,1990\n")?);
        let request = PipelineRequest {
            steps: Some(vec![PipelineStep::Etl, PipelineStep::Analytics]),
            ..Default::default()
        };

        assert!(orch.orchestrate(&request).await.is_err());
        assert!(!dir.path().join("docs").exists());
        Ok(())
    }
}
