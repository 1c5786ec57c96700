// fhir2omop-core/src/infrastructure/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DatabaseError {
    #[error("DuckDB Engine Error: {0}")]
    #[diagnostic(
        code(fhir2omop::infra::database::duckdb),
        help("An error occurred inside the embedded SQL engine.")
    )]
    DuckDB(#[from] duckdb::Error),

    #[error("PostgreSQL Error: {0}")]
    #[diagnostic(
        code(fhir2omop::infra::database::postgres),
        help("Check the postgresql section of the config (host, port, credentials).")
    )]
    Postgres(#[from] sqlx::Error),

    #[error("Connection lock poisoned")]
    #[diagnostic(code(fhir2omop::infra::database::poisoned))]
    Poisoned,
}

#[derive(Error, Debug, Diagnostic)]
pub enum InfrastructureError {
    // --- DATABASE (Abstracted) ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Database(#[from] DatabaseError),

    // --- FILESYSTEM (IO) ---
    #[error("File System Error: {0}")]
    #[diagnostic(
        code(fhir2omop::infra::io),
        help("Check file permissions or path validity.")
    )]
    Io(#[from] std::io::Error),

    // --- CONFIG / YAML ---
    #[error("YAML Parsing Error: {0}")]
    #[diagnostic(
        code(fhir2omop::infra::yaml),
        help("Check your YAML syntax (indentation, types).")
    )]
    YamlError(#[from] serde_yaml::Error),

    #[error("Configuration Error: {0}")]
    #[diagnostic(code(fhir2omop::infra::config))]
    ConfigError(String),

    #[error("Configuration not found at '{0}'")]
    #[diagnostic(code(fhir2omop::infra::config_missing))]
    ConfigNotFound(String),

    #[error("Invalid configuration: {0}")]
    #[diagnostic(code(fhir2omop::infra::config_invalid))]
    Validation(#[from] validator::ValidationErrors),

    // --- NETWORK ---
    #[error("HTTP Error: {0}")]
    #[diagnostic(
        code(fhir2omop::infra::http),
        help("The remote API could not be reached or returned an error status.")
    )]
    Http(#[from] reqwest::Error),

    #[error("{service} returned {status}: {body}")]
    #[diagnostic(code(fhir2omop::infra::http_status))]
    HttpStatus {
        service: String,
        status: u16,
        body: String,
    },

    #[error("Unexpected {service} payload: {reason}")]
    #[diagnostic(code(fhir2omop::infra::payload))]
    UnexpectedPayload { service: String, reason: String },

    // --- DATA FILES ---
    #[error("CSV Error: {0}")]
    #[diagnostic(
        code(fhir2omop::infra::csv),
        help("Check the header row and the delimiter of the file.")
    )]
    Csv(#[from] csv::Error),

    #[error("JSON Error: {0}")]
    #[diagnostic(code(fhir2omop::infra::json))]
    Json(#[from] serde_json::Error),

    // --- TEMPLATING ---
    #[error("Template Rendering Error: {0}")]
    #[diagnostic(code(fhir2omop::infra::template))]
    TemplateError(#[from] minijinja::Error),
}

// Shortcuts for `?` on raw driver calls
impl From<duckdb::Error> for InfrastructureError {
    fn from(err: duckdb::Error) -> Self {
        InfrastructureError::Database(DatabaseError::DuckDB(err))
    }
}

impl From<sqlx::Error> for InfrastructureError {
    fn from(err: sqlx::Error) -> Self {
        InfrastructureError::Database(DatabaseError::Postgres(err))
    }
}
