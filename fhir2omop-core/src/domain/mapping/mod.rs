// fhir2omop-core/src/domain/mapping/mod.rs

pub mod direct;
pub mod fallback;
pub mod sql_values;

pub use direct::{MappedRow, MappingOutcome, map_direct};
pub use fallback::{FallbackMapping, ResponseFormat, build_fallback_prompt, parse_fallback_response};
