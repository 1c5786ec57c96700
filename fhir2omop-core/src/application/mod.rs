// fhir2omop-core/src/application/mod.rs

pub mod analytics;
pub mod engine;
pub mod etl;
pub mod mapping;
pub mod orchestrator;
pub mod qa;
pub mod session;

// --- RE-EXPORTS ---
// The CLI imports services from here without knowing the file layout.

pub use analytics::{AnalyticsReport, run_analytics};
pub use engine::{execute_query, list_tables, preview_table, run_query};
pub use etl::{EtlReport, run_etl};
pub use mapping::{LoadReport, MappingResult, ask, map_and_load, map_resource, prompt};
pub use orchestrator::{Orchestrator, PipelineRequest};
pub use qa::{export_table_csv, profile_store_table, run_qa};
pub use session::SessionState;
