//! # SQLite Storage Engine
//!
//! The file-engine: a single SQLite database file opened in WAL journal mode so
//! that readers see either the state before or after a bulk replace, never a mix.

use async_trait::async_trait;
use log::{debug, info};
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
    SqliteRow,
};
use sqlx::{Column, Row, Sqlite, TypeInfo, ValueRef};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::dialect::Dialect;
use super::error::{StorageError, StorageResult};
use super::traits::{EngineKind, EngineTransaction, StorageEngine};
use super::value::{DbRow, ExecOutcome, SqlValue};

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// SQLite-backed storage engine
#[derive(Clone)]
pub struct SqliteEngine {
    pool: SqlitePool,
    path: PathBuf,
}

impl SqliteEngine {
    /// Open (creating if needed) the database file at `path`
    pub async fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        info!("Opened SQLite database at {}", path.display());
        Ok(Self {
            pool,
            path: path.to_path_buf(),
        })
    }

    /// Open an existing database file without write access
    pub async fn open_read_only(path: &Path) -> StorageResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true)
            .create_if_missing(false);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        Ok(Self {
            pool,
            path: path.to_path_buf(),
        })
    }
}

fn bind_all<'q>(sql: &'q str, params: &[SqlValue]) -> SqliteQuery<'q> {
    params
        .iter()
        .fold(sqlx::query(sql), |query, param| match param {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Integer(v) => query.bind(*v),
            SqlValue::Real(v) => query.bind(*v),
            SqlValue::Text(s) => query.bind(s.clone()),
        })
}

fn decode_row(row: &SqliteRow) -> StorageResult<DbRow> {
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
                "INTEGER" | "INT8" | "BOOLEAN" => SqlValue::Integer(row.try_get::<i64, _>(index)?),
                "REAL" | "NUMERIC" => SqlValue::Real(row.try_get::<f64, _>(index)?),
                "TEXT" | "DATE" | "TIME" | "DATETIME" => {
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

fn outcome(result: sqlx::sqlite::SqliteQueryResult) -> ExecOutcome {
    ExecOutcome {
        rows_affected: result.rows_affected(),
        last_insert_id: Some(result.last_insert_rowid()),
    }
}

#[async_trait]
impl StorageEngine for SqliteEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::File
    }

    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn file_path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> StorageResult<ExecOutcome> {
        let result = bind_all(sql, params).execute(&self.pool).await?;
        Ok(outcome(result))
    }

    async fn query_all(&self, sql: &str, params: &[SqlValue]) -> StorageResult<Vec<DbRow>> {
        let rows = bind_all(sql, params).fetch_all(&self.pool).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn run_script(&self, script: &str) -> StorageResult<()> {
        // SQLite accepts several statements in one unprepared execution
        sqlx::Executor::execute(&self.pool, script).await?;
        Ok(())
    }

    async fn begin(&self) -> StorageResult<Box<dyn EngineTransaction>> {
        let tx = self.pool.begin().await?;
        debug!("BEGIN (sqlite)");
        Ok(Box::new(SqliteTransaction { tx }))
    }

    async fn backup_to(&self, dest: &Path) -> StorageResult<()> {
        let target = dest.to_string_lossy().replace('\'', "''");
        sqlx::Executor::execute(&self.pool, format!("VACUUM INTO '{}'", target).as_str()).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// A transaction on one SQLite connection
pub struct SqliteTransaction {
    tx: sqlx::Transaction<'static, Sqlite>,
}

#[async_trait]
impl EngineTransaction for SqliteTransaction {
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> StorageResult<ExecOutcome> {
        let result = bind_all(sql, params).execute(&mut *self.tx).await?;
        Ok(outcome(result))
    }

    async fn query_all(&mut self, sql: &str, params: &[SqlValue]) -> StorageResult<Vec<DbRow>> {
        let rows = bind_all(sql, params).fetch_all(&mut *self.tx).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn commit(self: Box<Self>) -> StorageResult<()> {
        self.tx.commit().await?;
        debug!("COMMIT (sqlite)");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StorageResult<()> {
        self.tx.rollback().await?;
        debug!("ROLLBACK (sqlite)");
        Ok(())
    }
}
