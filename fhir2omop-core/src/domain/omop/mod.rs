// fhir2omop-core/src/domain/omop/mod.rs

pub mod schema;
pub mod value;

pub use schema::{ColumnDef, OmopTable, SqlType};
pub use value::SqlValue;
