// fhir2omop-core/src/ports/connector.rs

// What the application needs from a SQL store, without knowing which engine
// answers. DuckDB (embedded file) and PostgreSQL (client/server) both plug in here.

use crate::domain::omop::{OmopTable, SqlValue};
use crate::domain::table::DataTable;
use crate::error::OmopError;
use async_trait::async_trait;

/// Engine-independent column description.
#[derive(Debug, Clone)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: String,
    pub is_nullable: bool,
}

/// Result set of an ad-hoc query.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
}

impl QueryResult {
    /// Textual copy for CSV export and profiling. NULL becomes an empty cell.
    pub fn to_table(&self) -> DataTable {
        DataTable::new(
            self.columns.clone(),
            self.rows
                .iter()
                .map(|r| r.iter().map(ToString::to_string).collect())
                .collect(),
        )
    }
}

/// Rows bound for one table in a [`Connector::load_tables`] call.
#[derive(Debug, Clone, Copy)]
pub struct TableLoad<'a> {
    pub table: OmopTable,
    pub rows: &'a [Vec<SqlValue>],
}

#[async_trait]
pub trait Connector: Send + Sync {
    /// Runs a statement that returns no rows (DDL, DML).
    async fn execute(&self, query: &str) -> Result<(), OmopError>;

    async fn query(&self, query: &str) -> Result<QueryResult, OmopError>;

    async fn fetch_columns(&self, table_name: &str) -> Result<Vec<ColumnSchema>, OmopError>;

    async fn list_tables(&self) -> Result<Vec<String>, OmopError>;

    /// Inserts every batch inside a single transaction and returns the row count
    /// per batch. With `replace`, each table is dropped and recreated first in
    /// that same transaction. On error the store is left as it was.
    async fn load_tables(
        &self,
        loads: &[TableLoad<'_>],
        replace: bool,
    ) -> Result<Vec<usize>, OmopError>;

    /// Inserts rows, replacing existing ones that share the primary key.
    async fn upsert_rows(&self, table: OmopTable, rows: &[Vec<SqlValue>])
    -> Result<usize, OmopError>;

    /// True for the file-based store, where the ETL owns the schema.
    fn is_embedded(&self) -> bool;

    fn engine_name(&self) -> &str;
}

/// Comma-separated column list of a table, in declared order.
pub fn column_list(table: OmopTable) -> String {
    table.column_names().join(", ")
}
