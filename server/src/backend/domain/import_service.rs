//! One-time seed of the transaction table from a snapshot-format CSV file.

use anyhow::Context;
use csv::{ReaderBuilder, StringRecord};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::backend::domain::commands::import::ImportOutcome;
use crate::backend::domain::models::transaction::{CandidateError, NewTransaction};
use crate::backend::domain::snapshot_service::{EXPENDITURE_OFFSET, INCOME_OFFSET, SnapshotService};
use crate::backend::domain::transaction_service::insert_candidates;
use crate::backend::storage::meta::{read_marker, write_marker};
use crate::backend::storage::StorageEngine;

pub const IMPORT_MARKER: &str = "csv_import_done";

/// Header lines at the top of every import file
const HEADER_LINES: usize = 2;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("import file {0} does not exist")]
    MissingFile(PathBuf),
    #[error("import file is not valid CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("import failed and was rolled back: {0:#}")]
    Storage(anyhow::Error),
}

#[derive(Clone)]
pub struct ImportService {
    engine: Arc<dyn StorageEngine>,
    source: PathBuf,
    snapshot_service: SnapshotService,
}

impl ImportService {
    pub fn new(engine: Arc<dyn StorageEngine>, source: PathBuf, snapshot_service: SnapshotService) -> Self {
        Self {
            engine,
            source,
            snapshot_service,
        }
    }

    /// Import the source file unless a previous import completed.
    ///
    /// With `force` the completion marker is ignored. Existing rows are kept and
    /// rows already present are dropped by the conflict-tolerant insert.
    pub async fn import_once(&self, force: bool) -> Result<ImportOutcome, ImportError> {
        let engine = self.engine.as_ref();

        if !force {
            let marker = read_marker(engine, IMPORT_MARKER)
                .await
                .map_err(|e| ImportError::Storage(e.into()))?;
            if let Some(completed_at) = marker {
                info!("CSV import skipped, already completed at {}", completed_at);
                return Ok(ImportOutcome::Skipped {
                    reason: format!("CSV import already completed at {}", completed_at),
                });
            }
        }

        if !self.source.exists() {
            warn!("CSV import requested but {} is missing", self.source.display());
            return Err(ImportError::MissingFile(self.source.clone()));
        }
        let content = tokio::fs::read(&self.source)
            .await
            .with_context(|| format!("reading {}", self.source.display()))
            .map_err(ImportError::Storage)?;
        let candidates = parse_snapshot(&content)?;

        let imported = self
            .store(&candidates)
            .await
            .map_err(ImportError::Storage)?;
        info!(
            "Imported {} of {} CSV transactions from {}",
            imported,
            candidates.len(),
            self.source.display()
        );

        self.snapshot_service.regenerate_in_background();
        Ok(ImportOutcome::Imported { imported })
    }

    async fn store(&self, candidates: &[NewTransaction]) -> anyhow::Result<usize> {
        let engine = self.engine.as_ref();
        let mut tx = engine.begin().await.context("starting import transaction")?;

        let result: anyhow::Result<usize> = async {
            let imported = insert_candidates(tx.as_mut(), engine, candidates).await?;
            let stamp = chrono::Utc::now().to_rfc3339();
            write_marker(tx.as_mut(), engine, IMPORT_MARKER, &stamp)
                .await
                .context("writing import marker")?;
            Ok(imported)
        }
        .await;

        match result {
            Ok(imported) => {
                tx.commit().await.context("committing import")?;
                Ok(imported)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!("Rollback after failed import also failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }
}

/// Read the dual-column layout; each side of a line is validated on its own
pub fn parse_snapshot(content: &[u8]) -> Result<Vec<NewTransaction>, csv::Error> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content);

    let mut candidates = Vec::new();
    for (line, record) in reader.records().enumerate().skip(HEADER_LINES) {
        let record = record?;
        for (kind, offset) in [("expenditure", EXPENDITURE_OFFSET), ("income", INCOME_OFFSET)] {
            if is_blank(&record, offset) {
                continue;
            }
            match side(&record, kind, offset) {
                Ok(candidate) => candidates.push(candidate),
                Err(e) => info!("Skipping {} on CSV line {}: {}", kind, line + 1, e),
            }
        }
    }
    Ok(candidates)
}

fn field(record: &StringRecord, index: usize) -> &str {
    record.get(index).unwrap_or("")
}

fn is_blank(record: &StringRecord, offset: usize) -> bool {
    (offset..offset + 3).all(|i| field(record, i).trim().is_empty())
}

fn side(
    record: &StringRecord,
    kind: &str,
    offset: usize,
) -> Result<NewTransaction, CandidateError> {
    NewTransaction::validated(
        kind,
        field(record, offset),
        field(record, offset + 1),
        field(record, offset + 2),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::background::BackgroundTasks;
    use crate::backend::domain::transaction_service::TransactionService;
    use crate::backend::storage::{SchemaManager, SqliteEngine};
    use serde_json::json;
    use shared::TransactionType;
    use std::path::Path;
    use tempfile::TempDir;

    async fn engine_in(dir: &Path, file: &str) -> Arc<dyn StorageEngine> {
        let engine = SqliteEngine::open(&dir.join(file)).await.unwrap();
        SchemaManager::new(&engine).ensure_schema().await.unwrap();
        Arc::new(engine)
    }

    fn import_service(engine: Arc<dyn StorageEngine>, source: PathBuf, snapshot: PathBuf) -> ImportService {
        let snapshot = SnapshotService::new(engine.clone(), snapshot, BackgroundTasks::new());
        ImportService::new(engine, source, snapshot)
    }

    #[test]
    fn test_sides_are_validated_independently() {
        let csv = "\
Expenditures,,,,Income,,
Name,Date,Amount,,Name,Date,Amount
Rent,2024-01-02,500,,Paycheck,2024-01-01,1000
,2024-01-03,20,,Bonus,2024-01-04,$250
Coffee,2024-01-05,abc,,,,
Food,2024-01-06,12.5
";
        let candidates = parse_snapshot(csv.as_bytes()).unwrap();
        let summary: Vec<(TransactionType, &str, f64)> = candidates
            .iter()
            .map(|c| (c.transaction_type, c.name.as_str(), c.amount))
            .collect();

        assert_eq!(
            summary,
            vec![
                (TransactionType::Expenditure, "Rent", 500.0),
                (TransactionType::Income, "Paycheck", 1000.0),
                (TransactionType::Income, "Bonus", 250.0),
                (TransactionType::Expenditure, "Food", 12.5),
            ]
        );
    }

    #[test]
    fn test_header_lines_are_always_discarded() {
        let csv = "Rent,2024-01-02,500\nGym,2024-01-03,30\n";
        assert!(parse_snapshot(csv.as_bytes()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_import_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("seed.csv");
        std::fs::write(
            &source,
            "Expenditures,,,,Income,,\nName,Date,Amount,,Name,Date,Amount\nRent,2024-01-02,500,,Paycheck,2024-01-01,1000\n",
        )
        .unwrap();
        let engine = engine_in(temp_dir.path(), "tx.db").await;
        let service = import_service(engine.clone(), source, temp_dir.path().join("snapshot.csv"));

        let first = service.import_once(false).await.unwrap();
        let second = service.import_once(false).await.unwrap();

        assert_eq!(first, ImportOutcome::Imported { imported: 2 });
        match second {
            ImportOutcome::Skipped { reason } => assert!(reason.contains("already completed")),
            other => panic!("expected skip, got {:?}", other),
        }
        let rows = engine.query_all("SELECT id FROM transactions", &[]).await.unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_forced_import_keeps_existing_rows_without_duplicates() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("seed.csv");
        std::fs::write(
            &source,
            "Expenditures,,,,Income,,\nName,Date,Amount,,Name,Date,Amount\nRent,2024-01-02,500,,,,\n",
        )
        .unwrap();
        let engine = engine_in(temp_dir.path(), "tx.db").await;
        let service = import_service(engine.clone(), source, temp_dir.path().join("snapshot.csv"));

        service.import_once(false).await.unwrap();
        let forced = service.import_once(true).await.unwrap();

        assert_eq!(forced, ImportOutcome::Imported { imported: 0 });
        let rows = engine.query_all("SELECT id FROM transactions", &[]).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let engine = engine_in(temp_dir.path(), "tx.db").await;
        let service = import_service(
            engine,
            temp_dir.path().join("absent.csv"),
            temp_dir.path().join("snapshot.csv"),
        );

        assert!(matches!(
            service.import_once(false).await,
            Err(ImportError::MissingFile(_))
        ));
    }

    #[tokio::test]
    async fn test_snapshot_reimport_reproduces_the_stored_set() {
        let temp_dir = TempDir::new().unwrap();
        let snapshot_path = temp_dir.path().join("transactions.csv");

        let primary = engine_in(temp_dir.path(), "primary.db").await;
        let snapshot = SnapshotService::new(primary.clone(), snapshot_path.clone(), BackgroundTasks::new());
        let store = TransactionService::new(primary, snapshot, false);
        let receipt = store
            .replace_all(&json!([
                {"type": "income", "name": "Paycheck", "date": "2024-01-01", "amount": 1000},
                {"type": "expenditure", "name": "Rent", "date": "2024-01-02", "amount": 500},
                {"type": "expenditure", "name": "Food, Drinks", "date": "2024-01-03", "amount": -12.5},
                {"type": "expenditure", "name": "Gym", "date": "2024-01-04", "amount": 30}
            ]))
            .await
            .unwrap();
        receipt.snapshot.await.unwrap();

        let copy = engine_in(temp_dir.path(), "copy.db").await;
        let service = import_service(copy.clone(), snapshot_path, temp_dir.path().join("copy.csv"));
        service.import_once(true).await.unwrap();

        let key = |r: &crate::backend::domain::models::transaction::TransactionRecord| {
            (r.transaction_type.to_string(), r.name.clone(), r.date.clone(), r.amount.to_string())
        };
        let mut expected: Vec<_> = store.export().await.unwrap().iter().map(key).collect();
        let copy_store = TransactionService::new(
            copy.clone(),
            SnapshotService::new(copy, temp_dir.path().join("copy.csv"), BackgroundTasks::new()),
            false,
        );
        let mut actual: Vec<_> = copy_store.export().await.unwrap().iter().map(key).collect();
        expected.sort();
        actual.sort();
        assert_eq!(actual, expected);
    }
}
