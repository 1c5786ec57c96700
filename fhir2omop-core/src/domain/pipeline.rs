// fhir2omop-core/src/domain/pipeline.rs

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::domain::error::DomainError;
use crate::domain::mapping::MappedRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    Etl,
    LlmMapping,
    Qa,
    Analytics,
}

impl PipelineStep {
    /// Default order of a full run.
    pub const ALL: [PipelineStep; 4] = [
        PipelineStep::Etl,
        PipelineStep::LlmMapping,
        PipelineStep::Qa,
        PipelineStep::Analytics,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStep::Etl => "etl",
            PipelineStep::LlmMapping => "llm_mapping",
            PipelineStep::Qa => "qa",
            PipelineStep::Analytics => "analytics",
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelineStep {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "etl" => Ok(PipelineStep::Etl),
            "llm_mapping" | "llm" | "mapping" => Ok(PipelineStep::LlmMapping),
            "qa" => Ok(PipelineStep::Qa),
            "analytics" => Ok(PipelineStep::Analytics),
            _ => Err(DomainError::InvalidStep(s.to_string())),
        }
    }
}

/// What a finished step hands back to the caller.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Loaded { persons: usize, observations: usize },
    Mapped { row: MappedRow, used_fallback: bool },
    Report { path: PathBuf },
    Charts { written: Vec<PathBuf>, failed: Vec<String> },
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepOutcome::Loaded {
                persons,
                observations,
            } => write!(f, "{} persons, {} observations loaded", persons, observations),
            StepOutcome::Mapped { row, used_fallback } => write!(
                f,
                "{} row mapped{}",
                row.table,
                if *used_fallback { " (LLM fallback)" } else { "" }
            ),
            StepOutcome::Report { path } => write!(f, "report at {}", path.display()),
            StepOutcome::Charts { written, failed } => {
                write!(f, "{} chart(s) written", written.len())?;
                if !failed.is_empty() {
                    write!(f, ", {} failed", failed.len())?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_step_parsing() {
        assert_eq!("llm-mapping".parse::<PipelineStep>().unwrap(), PipelineStep::LlmMapping);
        assert_eq!(" QA ".parse::<PipelineStep>().unwrap(), PipelineStep::Qa);
        assert!(matches!(
            "deploy".parse::<PipelineStep>(),
            Err(DomainError::InvalidStep(_))
        ));
    }

    #[test]
    fn test_default_order() {
        let names: Vec<&str> = PipelineStep::ALL.iter().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["etl", "llm_mapping", "qa", "analytics"]);
    }
}
