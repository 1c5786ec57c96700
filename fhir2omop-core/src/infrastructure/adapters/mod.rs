// fhir2omop-core/src/infrastructure/adapters/mod.rs

pub mod duckdb;
pub mod factory;
pub mod postgres;

pub use factory::connect;
