// fhir2omop-core/src/infrastructure/config/mod.rs

pub mod app;

pub use app::{
    AppConfig, Backend, DataConfig, DatabaseConfig, DocsConfig, FhirConfig, LlmConfig,
    OncologyConfig, PostgresSettings, load_config,
};
