//! # Schema Manager
//!
//! Brings the transaction table, its unique dedup index and the optional
//! attribution columns into shape on every startup, tolerating whatever partial
//! state an earlier version left behind.

use log::{debug, error, info, warn};

use super::dialect::ATTRIBUTION_COLUMNS;
use super::error::StorageResult;
use super::traits::StorageEngine;

/// What happened to the (type, name, date, amount) unique index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UniqueIndexStatus {
    /// Created, or already present
    Ready,
    /// Creation failed on duplicates; duplicates were removed and the retry worked
    Deduplicated { removed: u64 },
    /// Still missing after one dedup-and-retry; startup carries on without it
    Unresolved { reason: String },
}

/// Result of one column-addition attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnStatus {
    Added,
    AlreadyPresent,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaReport {
    pub unique_index: UniqueIndexStatus,
    pub columns: Vec<(&'static str, ColumnStatus)>,
}

pub struct SchemaManager<'a> {
    engine: &'a dyn StorageEngine,
}

impl<'a> SchemaManager<'a> {
    pub fn new(engine: &'a dyn StorageEngine) -> Self {
        Self { engine }
    }

    /// Idempotently create tables, index and columns.
    ///
    /// Only a failure to create the tables themselves is returned as an error.
    pub async fn ensure_schema(&self) -> StorageResult<SchemaReport> {
        let dialect = self.engine.dialect();
        self.engine.run_script(dialect.create_schema_script()).await?;
        debug!("Transaction and meta tables present");

        let unique_index = self.ensure_unique_index().await;
        let columns = self.ensure_attribution_columns().await;

        Ok(SchemaReport {
            unique_index,
            columns,
        })
    }

    async fn ensure_unique_index(&self) -> UniqueIndexStatus {
        let dialect = self.engine.dialect();
        let create = dialect.create_unique_index();

        let first_error = match self.engine.execute(&create, &[]).await {
            Ok(_) => return UniqueIndexStatus::Ready,
            Err(e) => e,
        };
        warn!(
            "Unique index creation failed ({}); removing duplicate transactions and retrying",
            first_error
        );

        let removed = match self.engine.execute(&dialect.delete_duplicates(), &[]).await {
            Ok(outcome) => outcome.rows_affected,
            Err(e) => {
                error!("Could not remove duplicate transactions: {}", e);
                return UniqueIndexStatus::Unresolved {
                    reason: e.to_string(),
                };
            }
        };
        info!("Removed {} duplicate transaction rows", removed);

        match self.engine.execute(&create, &[]).await {
            Ok(_) => UniqueIndexStatus::Deduplicated { removed },
            Err(e) => {
                error!("Unique index still cannot be created, continuing without it: {}", e);
                UniqueIndexStatus::Unresolved {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn ensure_attribution_columns(&self) -> Vec<(&'static str, ColumnStatus)> {
        let dialect = self.engine.dialect();
        let mut statuses = Vec::with_capacity(ATTRIBUTION_COLUMNS.len());

        for column in ATTRIBUTION_COLUMNS {
            let status = match self.engine.execute(&dialect.add_text_column(column), &[]).await {
                Ok(_) => {
                    info!("Added column transactions.{}", column);
                    ColumnStatus::Added
                }
                Err(e) if e.is_duplicate_column() => {
                    debug!("Column transactions.{} already present", column);
                    ColumnStatus::AlreadyPresent
                }
                Err(e) => {
                    warn!("Could not add column transactions.{}: {}", column, e);
                    ColumnStatus::Failed(e.to_string())
                }
            };
            statuses.push((column, status));
        }

        statuses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::storage::dialect::UNIQUE_INDEX_NAME;
    use crate::backend::storage::sqlite::SqliteEngine;
    use crate::backend::storage::value::SqlValue;
    use tempfile::TempDir;

    async fn setup_test() -> (TempDir, SqliteEngine) {
        let temp_dir = TempDir::new().unwrap();
        let engine = SqliteEngine::open(&temp_dir.path().join("schema.db")).await.unwrap();
        (temp_dir, engine)
    }

    async fn index_exists(engine: &SqliteEngine) -> bool {
        let rows = engine
            .query_all(
                "SELECT name FROM sqlite_master WHERE type = 'index' AND name = ?",
                &[SqlValue::from(UNIQUE_INDEX_NAME)],
            )
            .await
            .unwrap();
        !rows.is_empty()
    }

    async fn insert_raw(engine: &SqliteEngine, kind: &str, name: &str, date: &str, amount: f64) {
        engine
            .execute(
                "INSERT INTO transactions (type, name, date, amount) VALUES (?, ?, ?, ?)",
                &[
                    SqlValue::from(kind),
                    SqlValue::from(name),
                    SqlValue::from(date),
                    SqlValue::from(amount),
                ],
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_fresh_database_gets_table_index_and_columns() {
        let (_temp_dir, engine) = setup_test().await;

        let report = SchemaManager::new(&engine).ensure_schema().await.unwrap();

        assert_eq!(report.unique_index, UniqueIndexStatus::Ready);
        assert_eq!(
            report.columns,
            vec![("created_by", ColumnStatus::Added), ("updated_by", ColumnStatus::Added)]
        );
        assert!(index_exists(&engine).await);
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let (_temp_dir, engine) = setup_test().await;
        SchemaManager::new(&engine).ensure_schema().await.unwrap();

        let report = SchemaManager::new(&engine).ensure_schema().await.unwrap();

        assert_eq!(report.unique_index, UniqueIndexStatus::Ready);
        assert_eq!(
            report.columns,
            vec![
                ("created_by", ColumnStatus::AlreadyPresent),
                ("updated_by", ColumnStatus::AlreadyPresent)
            ]
        );
    }

    #[tokio::test]
    async fn test_duplicates_are_removed_before_index_creation() {
        let (_temp_dir, engine) = setup_test().await;
        engine
            .run_script(engine.dialect().create_schema_script())
            .await
            .unwrap();

        insert_raw(&engine, "income", "Paycheck", "2024-01-01", 1000.0).await; // id 1
        insert_raw(&engine, "expenditure", "Rent", "2024-01-02", 500.0).await; // id 2
        insert_raw(&engine, "income", "Paycheck", "2024-01-01", 1000.0).await; // id 3
        insert_raw(&engine, "expenditure", "Rent", "2024-01-02", 500.0).await; // id 4
        insert_raw(&engine, "expenditure", "Rent", "2024-01-02", 500.0).await; // id 5
        insert_raw(&engine, "expenditure", "Food", "2024-01-03", 20.0).await; // id 6

        let report = SchemaManager::new(&engine).ensure_schema().await.unwrap();

        assert_eq!(report.unique_index, UniqueIndexStatus::Deduplicated { removed: 3 });
        assert!(index_exists(&engine).await);

        let rows = engine
            .query_all("SELECT id FROM transactions ORDER BY id", &[])
            .await
            .unwrap();
        let ids: Vec<i64> = rows.iter().filter_map(|r| r.integer("id")).collect();
        assert_eq!(ids, vec![1, 2, 6]);
    }

    #[tokio::test]
    async fn test_table_creation_failure_is_fatal() {
        let (_temp_dir, engine) = setup_test().await;
        engine.close().await;

        assert!(SchemaManager::new(&engine).ensure_schema().await.is_err());
    }
}
