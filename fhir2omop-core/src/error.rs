// fhir2omop-core/src/error.rs

use crate::domain::error::DomainError;
use crate::infrastructure::error::InfrastructureError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OmopError {
    // --- DOMAIN ERRORS (data quality, mapping, schema) ---
    #[error(transparent)]
    Domain(#[from] DomainError),

    // --- INFRASTRUCTURE ERRORS (IO, DB, HTTP, parsing) ---
    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),

    // --- GENERIC / APPLICATION ERRORS ---
    #[error("Internal Error: {0}")]
    InternalError(String),
}

// Manual implementation to avoid duplicate enum variant but keep ergonomics
impl From<std::io::Error> for OmopError {
    fn from(err: std::io::Error) -> Self {
        OmopError::Infrastructure(InfrastructureError::Io(err))
    }
}

impl From<duckdb::Error> for OmopError {
    fn from(err: duckdb::Error) -> Self {
        OmopError::Infrastructure(err.into())
    }
}

impl From<sqlx::Error> for OmopError {
    fn from(err: sqlx::Error) -> Self {
        OmopError::Infrastructure(err.into())
    }
}

impl From<reqwest::Error> for OmopError {
    fn from(err: reqwest::Error) -> Self {
        OmopError::Infrastructure(InfrastructureError::Http(err))
    }
}

impl From<csv::Error> for OmopError {
    fn from(err: csv::Error) -> Self {
        OmopError::Infrastructure(InfrastructureError::Csv(err))
    }
}

impl From<serde_json::Error> for OmopError {
    fn from(err: serde_json::Error) -> Self {
        OmopError::Infrastructure(InfrastructureError::Json(err))
    }
}
