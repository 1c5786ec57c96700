// fhir2omop-core/src/infrastructure/adapters/factory.rs

use tracing::info;

use crate::error::OmopError;
use crate::infrastructure::adapters::duckdb::DuckDBConnector;
use crate::infrastructure::adapters::postgres::PostgresConnector;
use crate::infrastructure::config::{AppConfig, Backend};
use crate::ports::connector::Connector;

/// Opens a handle on the configured store. Each caller gets its own handle.
pub async fn connect(config: &AppConfig) -> Result<Box<dyn Connector>, OmopError> {
    match config.database.backend {
        Backend::Duckdb => {
            let path = config.embedded_db_path();
            info!(path = ?path, "🦆 Opening embedded store");
            let connector = DuckDBConnector::new(&path.to_string_lossy())?;
            Ok(Box::new(connector))
        }
        Backend::Postgresql => {
            let settings = config.postgres_settings();
            info!(host = %settings.host, db = %settings.db, "🐘 Connecting to PostgreSQL");
            let connector = PostgresConnector::connect(&settings).await?;
            Ok(Box::new(connector))
        }
    }
}
