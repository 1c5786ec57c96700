// fhir2omop-core/src/ports/mod.rs

pub mod connector;
pub mod llm;
