// fhir2omop-core/src/lib.rs

// 1. Documentation is not mandatory yet
#![allow(missing_docs)]

// 2. Memory safety
#![deny(unsafe_code)]
// 3. Robustness
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
// 4. Performance
#![warn(clippy::perf)]

// --- HEXAGONAL MODULES ---

// 1. Ports (Interfaces / Traits)
// Contracts for the SQL store and the text-generation service.
pub mod ports;

// 2. Domain
// OMOP schemas, field mapping, data-quality checks, profiling.
// Depends on nothing else (no infra, no app).
pub mod domain;

// 3. Infrastructure (Adapters)
// DuckDB / PostgreSQL, YAML config, HTTP clients, templates.
pub mod infrastructure;

// 4. Application (Use Cases)
// ETL, analytics, QA, mapping, orchestration.
pub mod application;

// --- GLOBAL ERROR HANDLING ---
pub mod error;

// --- RE-EXPORTS (FACADE) ---
pub use error::OmopError;
