// fhir2omop-core/src/infrastructure/adapters/postgres.rs

use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column, PgPool, Postgres, Row, TypeInfo};
use std::time::Duration;
use tracing::debug;

use crate::domain::omop::{OmopTable, SqlType, SqlValue};
use crate::error::OmopError;
use crate::infrastructure::config::PostgresSettings;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::connector::{ColumnSchema, Connector, QueryResult, TableLoad, column_list};

pub struct PostgresConnector {
    pool: PgPool,
}

impl PostgresConnector {
    pub async fn connect(settings: &PostgresSettings) -> Result<Self, InfrastructureError> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(settings.connect_options())
            .await?;
        debug!(host = %settings.host, db = %settings.db, "PostgreSQL pool ready");
        Ok(Self { pool })
    }

    /// Writes every batch inside one transaction, optionally recreating each
    /// table first. `sql_for` gives the per-row statement of a table.
    async fn write_tables(
        &self,
        loads: &[TableLoad<'_>],
        replace: bool,
        sql_for: fn(OmopTable) -> String,
    ) -> Result<Vec<usize>, OmopError> {
        let mut tx = self.pool.begin().await?;
        let mut counts = Vec::with_capacity(loads.len());
        for load in loads {
            if replace {
                let drop_sql = load.table.drop_table_sql();
                let create = load.table.create_table_sql(false);
                sqlx::raw_sql(&drop_sql).execute(&mut *tx).await?;
                sqlx::raw_sql(&create).execute(&mut *tx).await?;
            }
            let sql = sql_for(load.table);
            for row in load.rows {
                let mut query = sqlx::query(&sql);
                for (col, value) in load.table.columns().iter().zip(row.iter()) {
                    query = bind_typed(query, col.sql_type, value);
                }
                query.execute(&mut *tx).await?;
            }
            counts.push(load.rows.len());
        }
        tx.commit().await?;
        Ok(counts)
    }
}

fn placeholders(n: usize) -> String {
    (1..=n)
        .map(|i| format!("${}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn insert_sql(table: OmopTable) -> String {
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table.name(),
        column_list(table),
        placeholders(table.arity())
    )
}

pub fn upsert_sql(table: OmopTable) -> String {
    let pk = table.primary_key();
    let updates: Vec<String> = table
        .column_names()
        .into_iter()
        .filter(|c| *c != pk)
        .map(|c| format!("{c} = EXCLUDED.{c}"))
        .collect();
    format!(
        "{} ON CONFLICT ({}) DO UPDATE SET {}",
        insert_sql(table),
        pk,
        updates.join(", ")
    )
}

/// Binds with the column's SQL type so that NULLs carry the right parameter type.
fn bind_typed<'q>(
    query: Query<'q, Postgres, PgArguments>,
    sql_type: SqlType,
    value: &SqlValue,
) -> Query<'q, Postgres, PgArguments> {
    match sql_type {
        SqlType::Integer => query.bind(value.as_i64()),
        SqlType::Real => query.bind(value.as_f64()),
        SqlType::Text => query.bind((!value.is_null()).then(|| value.to_string())),
    }
}

fn read_value(row: &PgRow, index: usize) -> SqlValue {
    let type_name = row.column(index).type_info().name().to_ascii_uppercase();
    let value: Result<SqlValue, sqlx::Error> = match type_name.as_str() {
        "INT2" => row
            .try_get::<Option<i16>, _>(index)
            .map(|v| v.map(i64::from).into()),
        "INT4" => row
            .try_get::<Option<i32>, _>(index)
            .map(|v| v.map(i64::from).into()),
        "INT8" => row.try_get::<Option<i64>, _>(index).map(Into::into),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(index)
            .map(|v| v.map(f64::from).into()),
        "FLOAT8" => row.try_get::<Option<f64>, _>(index).map(Into::into),
        "BOOL" => row
            .try_get::<Option<bool>, _>(index)
            .map(|v| v.map(i64::from).into()),
        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(index)
            .map(|v| v.map(|d| d.to_string()).into()),
        "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(index)
            .map(|v| v.map(|d| d.to_string()).into()),
        "TIMESTAMPTZ" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index)
            .map(|v| v.map(|d| d.to_rfc3339()).into()),
        _ => row.try_get::<Option<String>, _>(index).map(Into::into),
    };
    value.unwrap_or_else(|_| SqlValue::Text(format!("<{}>", type_name)))
}

#[async_trait]
impl Connector for PostgresConnector {
    async fn execute(&self, query: &str) -> Result<(), OmopError> {
        sqlx::raw_sql(query).execute(&self.pool).await?;
        Ok(())
    }

    async fn query(&self, query: &str) -> Result<QueryResult, OmopError> {
        let pg_rows = sqlx::query(query).fetch_all(&self.pool).await?;

        let columns = pg_rows
            .first()
            .map(|r| r.columns().iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();
        let rows = pg_rows
            .iter()
            .map(|r| (0..r.len()).map(|i| read_value(r, i)).collect())
            .collect();

        Ok(QueryResult { columns, rows })
    }

    async fn fetch_columns(&self, table_name: &str) -> Result<Vec<ColumnSchema>, OmopError> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            "SELECT column_name, data_type, is_nullable FROM information_schema.columns \
             WHERE table_name = $1 ORDER BY ordinal_position",
        )
        .bind(table_name)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(name, data_type, nullable)| ColumnSchema {
                name,
                data_type,
                is_nullable: nullable == "YES",
            })
            .collect())
    }

    async fn list_tables(&self) -> Result<Vec<String>, OmopError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = 'public' ORDER BY table_name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    async fn load_tables(
        &self,
        loads: &[TableLoad<'_>],
        replace: bool,
    ) -> Result<Vec<usize>, OmopError> {
        self.write_tables(loads, replace, insert_sql).await
    }

    async fn upsert_rows(
        &self,
        table: OmopTable,
        rows: &[Vec<SqlValue>],
    ) -> Result<usize, OmopError> {
        let counts = self
            .write_tables(&[TableLoad { table, rows }], false, upsert_sql)
            .await?;
        Ok(counts.iter().sum())
    }

    fn is_embedded(&self) -> bool {
        false
    }

    fn engine_name(&self) -> &str {
        "postgresql"
    }
}
