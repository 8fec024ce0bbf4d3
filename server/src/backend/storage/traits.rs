//! # Storage Traits
//!
//! This module defines the storage abstraction that lets the file-engine (SQLite)
//! and the network-engine (Postgres) be used interchangeably by the domain layer.
//! An engine is chosen once at startup and never swapped afterwards.

use async_trait::async_trait;
use std::path::Path;

use super::dialect::Dialect;
use super::error::{StorageError, StorageResult};
use super::value::{DbRow, ExecOutcome, SqlValue};

/// Which kind of engine sits behind the adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    /// Embedded single-file database
    File,
    /// Network relational database
    Network,
}

impl EngineKind {
    pub fn driver_name(&self) -> &'static str {
        match self {
            EngineKind::File => "sqlite",
            EngineKind::Network => "postgres",
        }
    }
}

/// Uniform execute/query/script interface over a storage engine.
///
/// Statements use `?` placeholders; engines translate them as needed.
#[async_trait]
pub trait StorageEngine: Send + Sync {
    fn kind(&self) -> EngineKind;

    /// Engine-specific SQL lives here and nowhere else
    fn dialect(&self) -> Dialect;

    /// Database file backing the engine, if any
    fn file_path(&self) -> Option<&Path> {
        None
    }

    /// Run a single statement and report affected rows
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> StorageResult<ExecOutcome>;

    /// Run a query and return every row in result order
    async fn query_all(&self, sql: &str, params: &[SqlValue]) -> StorageResult<Vec<DbRow>>;

    /// Run a multi-statement script without parameters
    async fn run_script(&self, script: &str) -> StorageResult<()>;

    /// Open an explicit transaction
    async fn begin(&self) -> StorageResult<Box<dyn EngineTransaction>>;

    /// Liveness probe used when selecting the engine
    async fn ping(&self) -> StorageResult<()> {
        self.query_all("SELECT 1 AS ok", &[]).await.map(|_| ())
    }

    /// Write a consistent copy of the database to `dest`
    async fn backup_to(&self, _dest: &Path) -> StorageResult<()> {
        Err(StorageError::Unsupported {
            operation: "backup",
            engine: self.kind().driver_name(),
        })
    }

    /// Close all pooled connections
    async fn close(&self);
}

/// An open transaction on one pooled connection.
///
/// Dropping it without calling [`EngineTransaction::commit`] rolls it back.
#[async_trait]
pub trait EngineTransaction: Send {
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> StorageResult<ExecOutcome>;

    async fn query_all(&mut self, sql: &str, params: &[SqlValue]) -> StorageResult<Vec<DbRow>>;

    async fn commit(self: Box<Self>) -> StorageResult<()>;

    async fn rollback(self: Box<Self>) -> StorageResult<()>;
}
