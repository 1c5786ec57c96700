// fhir2omop-core/src/infrastructure/llm/mod.rs

pub mod mock;
pub mod ollama;

pub use mock::ScriptedGenerator;
pub use ollama::OllamaClient;
