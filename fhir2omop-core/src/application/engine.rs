// fhir2omop-core/src/application/engine.rs

use std::time::Instant;
use tracing::{debug, error, instrument};

use crate::domain::error::DomainError;
use crate::error::OmopError;
use crate::ports::connector::{Connector, QueryResult};

/// Runs a statement with timing logs. Errors are logged with their duration and returned as-is.
#[instrument(skip(connector), fields(engine = connector.engine_name(), query.len = query.len()))]
pub async fn execute_query(connector: &dyn Connector, query: &str) -> Result<(), OmopError> {
    let start = Instant::now();
    debug!("⚡ Executing statement: {}", query);

    match connector.execute(query).await {
        Ok(()) => {
            debug!("✅ Statement finished in {:.2?}", start.elapsed());
            Ok(())
        }
        Err(e) => {
            error!("❌ Statement failed after {:.2?}: {}", start.elapsed(), e);
            Err(e)
        }
    }
}

/// Same as [`execute_query`] for statements that return rows.
#[instrument(skip(connector), fields(engine = connector.engine_name(), query.len = query.len()))]
pub async fn run_query(connector: &dyn Connector, query: &str) -> Result<QueryResult, OmopError> {
    let start = Instant::now();
    debug!("⚡ Executing query: {}", query);

    match connector.query(query).await {
        Ok(result) => {
            debug!(rows = result.rows.len(), "✅ Query finished in {:.2?}", start.elapsed());
            Ok(result)
        }
        Err(e) => {
            error!("❌ Query failed after {:.2?}: {}", start.elapsed(), e);
            Err(e)
        }
    }
}

pub async fn list_tables(connector: &dyn Connector) -> Result<Vec<String>, OmopError> {
    connector.list_tables().await
}

/// First `limit` rows of a table. The name must be a plain identifier.
pub async fn preview_table(
    connector: &dyn Connector,
    table: &str,
    limit: usize,
) -> Result<QueryResult, OmopError> {
    if !is_identifier(table) {
        return Err(DomainError::SchemaError(format!("'{}' is not a valid table name", table)).into());
    }
    run_query(connector, &format!("SELECT * FROM {} LIMIT {}", table, limit)).await
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::omop::SqlValue;
    use crate::infrastructure::adapters::duckdb::DuckDBConnector;
    use anyhow::Result;

    #[tokio::test]
    async fn test_query_and_preview() -> Result<()> {
        let connector = DuckDBConnector::new(":memory:")?;
        execute_query(&connector, "CREATE TABLE notes (id BIGINT, body VARCHAR)").await?;
        execute_query(&connector, "INSERT INTO notes VALUES (1, 'a'), (2, 'b'), (3, 'c')").await?;

        let preview = preview_table(&connector, "notes", 2).await?;
        assert_eq!(preview.columns, vec!["id", "body"]);
        assert_eq!(preview.rows.len(), 2);

        let count = run_query(&connector, "SELECT COUNT(*) AS n FROM notes").await?;
        assert_eq!(count.rows[0][0], SqlValue::Integer(3));
        assert_eq!(list_tables(&connector).await?, vec!["notes"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_preview_rejects_injection() -> Result<()> {
        let connector = DuckDBConnector::new(":memory:")?;
        let result = preview_table(&connector, "person; DROP TABLE person", 5).await;
        assert!(matches!(
            result,
            Err(OmopError::Domain(DomainError::SchemaError(_)))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_statement_propagates() -> Result<()> {
        let connector = DuckDBConnector::new(":memory:")?;
        assert!(execute_query(&connector, "DROP TABLE ghost").await.is_err());
        Ok(())
    }
}
