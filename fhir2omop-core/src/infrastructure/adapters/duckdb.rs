// fhir2omop-core/src/infrastructure/adapters/duckdb.rs

use async_trait::async_trait;
use duckdb::types::{TimeUnit, ToSqlOutput, Value};
use duckdb::{Config, Connection, ToSql, params_from_iter};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

// Hexagonal imports
use crate::domain::omop::{OmopTable, SqlValue};
use crate::error::OmopError;
use crate::infrastructure::error::{DatabaseError, InfrastructureError};
use crate::ports::connector::{ColumnSchema, Connector, QueryResult, TableLoad, column_list};

pub struct DuckDBConnector {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDBConnector {
    pub fn new(db_path: &str) -> Result<Self, InfrastructureError> {
        let config = Config::default();

        let conn = if db_path == ":memory:" {
            Connection::open_in_memory_with_flags(config)?
        } else {
            if let Some(parent) = Path::new(db_path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            Connection::open_with_flags(db_path, config)?
        };

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, OmopError> {
        self.conn
            .lock()
            .map_err(|_| InfrastructureError::Database(DatabaseError::Poisoned).into())
    }

    /// Writes every batch inside one transaction, optionally recreating each
    /// table first. DuckDB DDL is transactional, so a failure restores the
    /// dropped tables too.
    fn write_tables(
        &self,
        loads: &[TableLoad<'_>],
        replace: bool,
        verb: &str,
    ) -> Result<Vec<usize>, OmopError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut counts = Vec::with_capacity(loads.len());
        for load in loads {
            if replace {
                tx.execute_batch(&load.table.drop_table_sql())?;
                tx.execute_batch(&load.table.create_table_sql(false))?;
            }
            let mut stmt = tx.prepare(&write_sql(verb, load.table))?;
            for row in load.rows {
                stmt.execute(params_from_iter(row.iter()))?;
            }
            counts.push(load.rows.len());
        }
        tx.commit()?;
        Ok(counts)
    }
}

fn write_sql(verb: &str, table: OmopTable) -> String {
    format!(
        "{} INTO {} ({}) VALUES ({})",
        verb,
        table.name(),
        column_list(table),
        vec!["?"; table.arity()].join(", ")
    )
}

// --- VALUE MAPPING ---

impl ToSql for SqlValue {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Owned(match self {
            SqlValue::Null => Value::Null,
            SqlValue::Integer(v) => Value::BigInt(*v),
            SqlValue::Real(v) => Value::Double(*v),
            SqlValue::Text(s) => Value::Text(s.clone()),
        }))
    }
}

fn from_duckdb(value: Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Boolean(b) => SqlValue::Integer(i64::from(b)),
        Value::TinyInt(v) => SqlValue::Integer(v.into()),
        Value::SmallInt(v) => SqlValue::Integer(v.into()),
        Value::Int(v) => SqlValue::Integer(v.into()),
        Value::BigInt(v) => SqlValue::Integer(v),
        Value::HugeInt(v) => i64::try_from(v)
            .map(SqlValue::Integer)
            .unwrap_or(SqlValue::Real(v as f64)),
        Value::UTinyInt(v) => SqlValue::Integer(v.into()),
        Value::USmallInt(v) => SqlValue::Integer(v.into()),
        Value::UInt(v) => SqlValue::Integer(v.into()),
        Value::UBigInt(v) => i64::try_from(v)
            .map(SqlValue::Integer)
            .unwrap_or(SqlValue::Real(v as f64)),
        Value::Float(v) => SqlValue::Real(v.into()),
        Value::Double(v) => SqlValue::Real(v),
        Value::Decimal(d) => {
            let text = d.to_string();
            text.parse::<f64>()
                .map(SqlValue::Real)
                .unwrap_or(SqlValue::Text(text))
        }
        Value::Text(s) => SqlValue::Text(s),
        Value::Date32(days) => chrono::NaiveDate::from_ymd_opt(1970, 1, 1)
            .and_then(|epoch| epoch.checked_add_signed(chrono::Duration::days(days.into())))
            .map(|d| SqlValue::Text(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(SqlValue::Null),
        Value::Timestamp(unit, v) => {
            let micros = match unit {
                TimeUnit::Second => v.saturating_mul(1_000_000),
                TimeUnit::Millisecond => v.saturating_mul(1_000),
                TimeUnit::Microsecond => v,
                TimeUnit::Nanosecond => v / 1_000,
            };
            chrono::DateTime::from_timestamp_micros(micros)
                .map(|t| SqlValue::Text(t.naive_utc().to_string()))
                .unwrap_or(SqlValue::Null)
        }
        other => SqlValue::Text(format!("{:?}", other)),
    }
}

#[async_trait]
impl Connector for DuckDBConnector {
    async fn execute(&self, query: &str) -> Result<(), OmopError> {
        let conn = self.lock()?;
        conn.execute_batch(query)?;
        Ok(())
    }

    async fn query(&self, query: &str) -> Result<QueryResult, OmopError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(query)?;

        let mut rows = Vec::new();
        {
            let mut cursor = stmt.query([])?;
            while let Some(row) = cursor.next()? {
                let width = row.as_ref().column_count();
                let mut values = Vec::with_capacity(width);
                for i in 0..width {
                    values.push(from_duckdb(row.get::<_, Value>(i)?));
                }
                rows.push(values);
            }
        }

        // Column names are known once the statement has run.
        let columns = stmt.column_names();
        debug!(rows = rows.len(), "DuckDB query returned");
        Ok(QueryResult { columns, rows })
    }

    async fn fetch_columns(&self, table_name: &str) -> Result<Vec<ColumnSchema>, OmopError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("PRAGMA table_info('{}')", table_name))?;

        let rows = stmt.query_map([], |row| {
            Ok(ColumnSchema {
                name: row.get("name")?,
                data_type: row.get("type")?,
                is_nullable: !row.get::<_, bool>("notnull")?,
            })
        })?;

        let mut columns = Vec::new();
        for row in rows {
            columns.push(row?);
        }
        Ok(columns)
    }

    async fn list_tables(&self) -> Result<Vec<String>, OmopError> {
        let result = self
            .query(
                "SELECT table_name FROM information_schema.tables \
                 WHERE table_schema = 'main' ORDER BY table_name",
            )
            .await?;
        Ok(result
            .rows
            .into_iter()
            .filter_map(|mut r| match r.pop() {
                Some(SqlValue::Text(name)) => Some(name),
                _ => None,
            })
            .collect())
    }

    async fn load_tables(
        &self,
        loads: &[TableLoad<'_>],
        replace: bool,
    ) -> Result<Vec<usize>, OmopError> {
        self.write_tables(loads, replace, "INSERT")
    }

    async fn upsert_rows(
        &self,
        table: OmopTable,
        rows: &[Vec<SqlValue>],
    ) -> Result<usize, OmopError> {
        let counts = self.write_tables(&[TableLoad { table, rows }], false, "INSERT OR REPLACE")?;
        Ok(counts.iter().sum())
    }

    fn is_embedded(&self) -> bool {
        true
    }

    fn engine_name(&self) -> &str {
        "duckdb"
    }
}
