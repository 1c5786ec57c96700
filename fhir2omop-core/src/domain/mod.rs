pub mod error;
pub mod fhir;
pub mod mapping;
pub mod omop;
pub mod pipeline;
pub mod profile;
pub mod quality;
pub mod records;
pub mod table;

// Shortcuts for the rest of the crate
pub use error::DomainError;
pub use omop::{OmopTable, SqlValue};
