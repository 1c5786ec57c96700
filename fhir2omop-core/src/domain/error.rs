// fhir2omop-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DomainError {
    #[error("Data quality checks failed: {}", .violations.join("; "))]
    #[diagnostic(
        code(fhir2omop::domain::data_quality),
        help("Fix the source datasets. Nothing was loaded.")
    )]
    DataQuality { violations: Vec<String> },

    #[error("Could not extract values for '{table}' from the model response")]
    #[diagnostic(
        code(fhir2omop::domain::fallback),
        help("The model must answer with a JSON object keyed by column name.")
    )]
    FallbackUnparseable { table: String, response: String },

    #[error("Unknown OMOP table '{0}'")]
    #[diagnostic(
        code(fhir2omop::domain::unknown_table),
        help("Known tables: person, observation, condition_occurrence, visit_occurrence.")
    )]
    UnknownTable(String),

    #[error("Resource type '{0}' has no OMOP mapping")]
    #[diagnostic(
        code(fhir2omop::domain::unsupported_resource),
        help("Only Patient, Condition and Encounter resources can be mapped.")
    )]
    UnsupportedResource(String),

    #[error("Unknown FHIR resource type '{0}'")]
    #[diagnostic(code(fhir2omop::domain::unknown_resource))]
    UnknownResourceType(String),

    #[error("No supported endpoint for alteration type '{0}'")]
    #[diagnostic(
        code(fhir2omop::domain::alteration),
        help("Supported: MUTATION_EXTENDED, COPY_NUMBER_ALTERATION, MRNA_EXPRESSION.")
    )]
    UnsupportedAlteration(String),

    #[error("Study '{0}' has no sample list")]
    #[diagnostic(code(fhir2omop::domain::sample_list))]
    NoSampleList(String),

    #[error("Unknown molecular profile '{0}'")]
    #[diagnostic(
        code(fhir2omop::domain::profile),
        help("List the study's profiles first: fhir2omop oncology profiles <study>")
    )]
    UnknownProfile(String),

    #[error("Unknown pipeline step '{0}'")]
    #[diagnostic(
        code(fhir2omop::domain::step),
        help("Valid steps: etl, llm_mapping, qa, analytics.")
    )]
    InvalidStep(String),

    #[error("Schema Error: {0}")]
    #[diagnostic(code(fhir2omop::domain::schema))]
    SchemaError(String),
}
