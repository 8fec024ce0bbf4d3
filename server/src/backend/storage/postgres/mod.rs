//! # Postgres Storage Engine
//!
//! The network-engine. Connections are pooled; scripts are split into single
//! statements because the extended protocol runs one statement per round trip.

use async_trait::async_trait;
use log::{debug, info};
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::{Column, Postgres, Row, TypeInfo, ValueRef};
use std::time::Duration;

use super::dialect::Dialect;
use super::error::{StorageError, StorageResult};
use super::traits::{EngineKind, EngineTransaction, StorageEngine};
use super::value::{DbRow, ExecOutcome, SqlValue};

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;

/// Postgres-backed storage engine
#[derive(Clone)]
pub struct PostgresEngine {
    pool: PgPool,
}

impl PostgresEngine {
    /// Connect a pool to `url`, failing if no connection is obtained within `timeout`
    pub async fn connect(url: &str, timeout: Duration) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(timeout)
            .connect(url)
            .await?;
        info!("Connected to Postgres");
        Ok(Self { pool })
    }
}

/// Rewrite `?` placeholders to `$1..$n`, leaving quoted literals alone
pub(crate) fn number_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut index = 0;
    let mut in_single = false;
    let mut in_double = false;

    for ch in sql.chars() {
        match ch {
            '\'' if !in_double => {
                in_single = !in_single;
                out.push(ch);
            }
            '"' if !in_single => {
                in_double = !in_double;
                out.push(ch);
            }
            '?' if !in_single && !in_double => {
                index += 1;
                out.push('$');
                out.push_str(&index.to_string());
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Split a script on `;` outside quoted literals, dropping empty statements
pub(crate) fn split_statements(script: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_single = false;
    let mut in_double = false;

    for ch in script.chars() {
        match ch {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            ';' if !in_single && !in_double => {
                let statement = current.trim();
                if !statement.is_empty() {
                    statements.push(statement.to_string());
                }
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }

    let tail = current.trim();
    if !tail.is_empty() {
        statements.push(tail.to_string());
    }
    statements
}

fn bind_all<'q>(sql: &'q str, params: &[SqlValue]) -> PgQuery<'q> {
    params
        .iter()
        .fold(sqlx::query(sql), |query, param| match param {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Integer(v) => query.bind(*v),
            SqlValue::Real(v) => query.bind(*v),
            SqlValue::Text(s) => query.bind(s.clone()),
        })
}

fn decode_row(row: &PgRow) -> StorageResult<DbRow> {
    let mut columns = Vec::with_capacity(row.len());
    let mut values = Vec::with_capacity(row.len());

    for column in row.columns() {
        let index = column.ordinal();
        let raw = row.try_get_raw(index)?;
        let value = if raw.is_null() {
            SqlValue::Null
        } else {
            let type_name = raw.type_info().name().to_string();
            match type_name.as_str() {
                "INT2" => SqlValue::Integer(row.try_get::<i16, _>(index)? as i64),
                "INT4" => SqlValue::Integer(row.try_get::<i32, _>(index)? as i64),
                "INT8" => SqlValue::Integer(row.try_get::<i64, _>(index)?),
                "BOOL" => SqlValue::Integer(row.try_get::<bool, _>(index)? as i64),
                "FLOAT4" => SqlValue::Real(row.try_get::<f32, _>(index)? as f64),
                "FLOAT8" => SqlValue::Real(row.try_get::<f64, _>(index)?),
                "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => {
                    SqlValue::Text(row.try_get::<String, _>(index)?)
                }
                _ => {
                    return Err(StorageError::Decode {
                        column: column.name().to_string(),
                        type_name,
                    })
                }
            }
        };
        columns.push(column.name().to_string());
        values.push(value);
    }

    Ok(DbRow::new(columns, values))
}

fn outcome(result: sqlx::postgres::PgQueryResult) -> ExecOutcome {
    ExecOutcome {
        rows_affected: result.rows_affected(),
        last_insert_id: None,
    }
}

#[async_trait]
impl StorageEngine for PostgresEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Network
    }

    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> StorageResult<ExecOutcome> {
        let sql = number_placeholders(sql);
        let result = bind_all(&sql, params).execute(&self.pool).await?;
        Ok(outcome(result))
    }

    async fn query_all(&self, sql: &str, params: &[SqlValue]) -> StorageResult<Vec<DbRow>> {
        let sql = number_placeholders(sql);
        let rows = bind_all(&sql, params).fetch_all(&self.pool).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn run_script(&self, script: &str) -> StorageResult<()> {
        for statement in split_statements(script) {
            debug!("script statement: {}", statement);
            sqlx::query(&statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn begin(&self) -> StorageResult<Box<dyn EngineTransaction>> {
        let tx = self.pool.begin().await?;
        debug!("BEGIN (postgres)");
        Ok(Box::new(PostgresTransaction { tx }))
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// A transaction on one pooled Postgres connection
pub struct PostgresTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl EngineTransaction for PostgresTransaction {
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> StorageResult<ExecOutcome> {
        let sql = number_placeholders(sql);
        let result = bind_all(&sql, params).execute(&mut *self.tx).await?;
        Ok(outcome(result))
    }

    async fn query_all(&mut self, sql: &str, params: &[SqlValue]) -> StorageResult<Vec<DbRow>> {
        let sql = number_placeholders(sql);
        let rows = bind_all(&sql, params).fetch_all(&mut *self.tx).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn commit(self: Box<Self>) -> StorageResult<()> {
        self.tx.commit().await?;
        debug!("COMMIT (postgres)");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StorageResult<()> {
        self.tx.rollback().await?;
        debug!("ROLLBACK (postgres)");
        Ok(())
    }
}
