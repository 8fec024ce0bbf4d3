//! CSV snapshot of the stored transactions.
//!
//! The snapshot lays expenditures and incomes out side by side:
//!
//! ```text
//! Expenditures,,,,Income,,
//! Name,Date,Amount,,Name,Date,Amount
//! Rent,2024-01-02,500,,Paycheck,2024-01-01,1000
//! ```
//!
//! It is never authoritative. It is rewritten wholesale after every mutation and is
//! only read back by the importer.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use log::{debug, info};
use shared::TransactionType;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::backend::domain::background::BackgroundTasks;
use crate::backend::domain::models::transaction::TransactionRecord;
use crate::backend::domain::transaction_service::load_transactions;
use crate::backend::storage::{SortOrder, StorageEngine};

pub const SNAPSHOT_TITLE_ROW: [&str; 7] = ["Expenditures", "", "", "", "Income", "", ""];
pub const SNAPSHOT_HEADER_ROW: [&str; 7] = ["Name", "Date", "Amount", "", "Name", "Date", "Amount"];

/// Column where the expenditure block starts
pub const EXPENDITURE_OFFSET: usize = 0;
/// Column where the income block starts, after one blank separator column
pub const INCOME_OFFSET: usize = 4;

#[derive(Clone)]
pub struct SnapshotService {
    engine: Arc<dyn StorageEngine>,
    path: PathBuf,
    background: BackgroundTasks,
}

impl SnapshotService {
    pub fn new(engine: Arc<dyn StorageEngine>, path: PathBuf, background: BackgroundTasks) -> Self {
        Self {
            engine,
            path,
            background,
        }
    }

    /// Recompute the snapshot from storage and overwrite the file.
    ///
    /// Each call writes its own temp file and renames it into place, so concurrent
    /// calls never interleave; the last rename wins.
    pub async fn regenerate(&self) -> Result<()> {
        let records = load_transactions(self.engine.as_ref(), SortOrder::OldestFirst).await?;
        let content = render(&records)?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let temp_path = self
            .path
            .with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&temp_path, content.as_bytes())
            .await
            .with_context(|| format!("writing {}", temp_path.display()))?;
        if let Err(e) = tokio::fs::rename(&temp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e).with_context(|| format!("replacing {}", self.path.display()));
        }

        info!(
            "CSV snapshot regenerated with {} transactions at {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Fire-and-forget regeneration; failures are only logged
    pub fn regenerate_in_background(&self) -> JoinHandle<()> {
        debug!("Scheduling CSV snapshot regeneration");
        let this = self.clone();
        self.background
            .spawn("csv-snapshot", async move { this.regenerate().await })
    }
}

/// Project records into the dual-column snapshot layout
pub fn render(records: &[TransactionRecord]) -> Result<String> {
    let (expenditures, incomes): (Vec<&TransactionRecord>, Vec<&TransactionRecord>) = records
        .iter()
        .partition(|r| r.transaction_type == TransactionType::Expenditure);

    let mut writer = WriterBuilder::new().flexible(true).from_writer(Vec::new());
    writer.write_record(SNAPSHOT_TITLE_ROW)?;
    writer.write_record(SNAPSHOT_HEADER_ROW)?;

    let rows = expenditures.len().max(incomes.len());
    for i in 0..rows {
        let mut line: Vec<String> = Vec::with_capacity(7);
        line.extend(side(expenditures.get(i).copied()));
        line.push(String::new());
        line.extend(side(incomes.get(i).copied()));
        writer.write_record(&line)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flushing snapshot buffer: {}", e.error()))?;
    Ok(String::from_utf8(bytes)?)
}

fn side(record: Option<&TransactionRecord>) -> [String; 3] {
    match record {
        Some(r) => [r.name.clone(), r.date.clone(), r.amount.to_string()],
        None => [String::new(), String::new(), String::new()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::models::transaction::NewTransaction;
    use crate::backend::storage::{SchemaManager, SqliteEngine};
    use tempfile::TempDir;

    fn record(id: i64, kind: TransactionType, name: &str, date: &str, amount: f64) -> TransactionRecord {
        TransactionRecord {
            id,
            transaction_type: kind,
            name: name.to_string(),
            date: date.to_string(),
            amount,
            created_by: None,
            updated_by: None,
        }
    }

    #[test]
    fn test_render_pads_the_shorter_side() {
        let records = vec![
            record(1, TransactionType::Income, "Paycheck", "2024-01-01", 1000.0),
            record(2, TransactionType::Expenditure, "Rent", "2024-01-02", 500.0),
            record(3, TransactionType::Expenditure, "Food, Drinks", "2024-01-03", 12.5),
        ];

        let csv = render(&records).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(
            lines,
            vec![
                "Expenditures,,,,Income,,",
                "Name,Date,Amount,,Name,Date,Amount",
                "Rent,2024-01-02,500,,Paycheck,2024-01-01,1000",
                "\"Food, Drinks\",2024-01-03,12.5,,,,",
            ]
        );
    }

    #[test]
    fn test_render_with_no_rows_has_only_headers() {
        let csv = render(&[]).unwrap();
        assert_eq!(csv.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_regenerate_writes_file_and_leaves_no_temp_files() {
        let temp_dir = TempDir::new().unwrap();
        let engine = SqliteEngine::open(&temp_dir.path().join("tx.db")).await.unwrap();
        SchemaManager::new(&engine).ensure_schema().await.unwrap();
        let candidate = NewTransaction::validated("income", "Gift", "2023-12-25", "50").unwrap();
        engine
            .execute(engine.dialect().insert_transaction(), &candidate.insert_params())
            .await
            .unwrap();

        let engine: Arc<dyn StorageEngine> = Arc::new(engine);
        let path = temp_dir.path().join("out").join("transactions.csv");
        let service = SnapshotService::new(engine, path.clone(), BackgroundTasks::new());

        let (a, b) = tokio::join!(service.regenerate(), service.regenerate());
        a.unwrap();
        b.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains(",,,,Gift,2023-12-25,50"));
        let leftovers = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[tokio::test]
    async fn test_background_failure_is_swallowed() {
        let temp_dir = TempDir::new().unwrap();
        let engine = SqliteEngine::open(&temp_dir.path().join("tx.db")).await.unwrap();
        SchemaManager::new(&engine).ensure_schema().await.unwrap();
        let blocker = temp_dir.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();

        let background = BackgroundTasks::new();
        let service = SnapshotService::new(
            Arc::new(engine),
            blocker.join("transactions.csv"),
            background.clone(),
        );

        service.regenerate_in_background().await.unwrap();

        assert_eq!(background.failure_count(), 1);
    }
}
