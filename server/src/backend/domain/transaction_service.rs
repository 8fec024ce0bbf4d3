//! Transaction Store: bulk replace with validation and dedup, plus ordered reads.
use anyhow::{Context, Result};
use log::{error, info, warn};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::backend::domain::commands::transactions::{ReplaceSummary, SaveReceipt};
use crate::backend::domain::models::transaction::{NewTransaction, TransactionRecord};
use crate::backend::domain::snapshot_service::SnapshotService;
use crate::backend::storage::{EngineTransaction, SortOrder, StorageEngine};

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("request body must contain a 'transactions' array")]
    NotAList,
    #[error("refusing to replace {existing} stored transactions with an empty list")]
    EmptySaveRefused { existing: i64 },
    #[error("failed to save transactions: {0:#}")]
    Storage(#[from] anyhow::Error),
}

/// Load every stored transaction in the given order
pub async fn load_transactions(
    engine: &dyn StorageEngine,
    order: SortOrder,
) -> Result<Vec<TransactionRecord>> {
    let rows = engine
        .query_all(&engine.dialect().select_transactions(order), &[])
        .await
        .context("querying transactions")?;
    rows.iter()
        .map(|row| TransactionRecord::from_row(row).map_err(anyhow::Error::from))
        .collect()
}

/// Insert candidates in order inside `tx`; returns how many rows were stored
pub(crate) async fn insert_candidates(
    tx: &mut dyn EngineTransaction,
    engine: &dyn StorageEngine,
    candidates: &[NewTransaction],
) -> Result<usize> {
    let insert = engine.dialect().insert_transaction();
    let mut inserted = 0;
    for candidate in candidates {
        let outcome = tx
            .execute(insert, &candidate.insert_params())
            .await
            .with_context(|| format!("inserting '{}' on {}", candidate.name, candidate.date))?;
        inserted += outcome.rows_affected as usize;
    }
    Ok(inserted)
}

#[derive(Clone)]
pub struct TransactionService {
    engine: Arc<dyn StorageEngine>,
    snapshot_service: SnapshotService,
    allow_empty_save: bool,
}

impl TransactionService {
    pub fn new(
        engine: Arc<dyn StorageEngine>,
        snapshot_service: SnapshotService,
        allow_empty_save: bool,
    ) -> Self {
        Self {
            engine,
            snapshot_service,
            allow_empty_save,
        }
    }

    /// Most recent first
    pub async fn list(&self) -> Result<Vec<TransactionRecord>> {
        load_transactions(self.engine.as_ref(), SortOrder::NewestFirst).await
    }

    /// Chronological
    pub async fn export(&self) -> Result<Vec<TransactionRecord>> {
        load_transactions(self.engine.as_ref(), SortOrder::OldestFirst).await
    }

    pub async fn count(&self) -> Result<i64> {
        let rows = self
            .engine
            .query_all(&self.engine.dialect().count_transactions(), &[])
            .await
            .context("counting transactions")?;
        Ok(rows.first().and_then(|row| row.integer("count")).unwrap_or(0))
    }

    /// Replace the whole stored set with the valid items of `payload`.
    ///
    /// `payload` must be a JSON array. Invalid items are skipped and items that
    /// repeat an earlier item's (type, name, date, amount) are dropped. The delete
    /// and the inserts commit together or not at all.
    pub async fn replace_all(&self, payload: &Value) -> Result<SaveReceipt, SaveError> {
        let items = payload.as_array().ok_or(SaveError::NotAList)?;

        if items.is_empty() && !self.allow_empty_save {
            let existing = self.count().await?;
            if existing > 0 {
                warn!(
                    "Refusing empty save while {} transactions are stored",
                    existing
                );
                return Err(SaveError::EmptySaveRefused { existing });
            }
        }

        let mut candidates = Vec::with_capacity(items.len());
        let mut skipped_invalid = 0;
        for (index, item) in items.iter().enumerate() {
            match NewTransaction::from_json(item) {
                Ok(candidate) => candidates.push(candidate),
                Err(e) => {
                    skipped_invalid += 1;
                    info!("Skipping transaction #{}: {}", index, e);
                }
            }
        }

        let inserted = self.rewrite(&candidates).await?;

        let summary = ReplaceSummary {
            received: items.len(),
            inserted,
            skipped_invalid,
            dropped_duplicates: candidates.len() - inserted,
        };
        info!(
            "Replaced transactions: {} received, {} stored, {} invalid, {} duplicates",
            summary.received, summary.inserted, summary.skipped_invalid, summary.dropped_duplicates
        );

        Ok(SaveReceipt {
            summary,
            snapshot: self.snapshot_service.regenerate_in_background(),
        })
    }

    async fn rewrite(&self, candidates: &[NewTransaction]) -> Result<usize> {
        let engine = self.engine.as_ref();
        let mut tx = engine.begin().await.context("starting transaction")?;

        let result: Result<usize> = async {
            tx.execute(&engine.dialect().delete_all_transactions(), &[])
                .await
                .context("deleting existing transactions")?;
            insert_candidates(tx.as_mut(), engine, candidates).await
        }
        .await;

        match result {
            Ok(inserted) => {
                tx.commit().await.context("committing transaction")?;
                Ok(inserted)
            }
            Err(e) => {
                error!("Bulk replace failed, rolling back: {:#}", e);
                if let Err(rollback_err) = tx.rollback().await {
                    error!("Rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::background::BackgroundTasks;
    use crate::backend::storage::{SchemaManager, SqliteEngine};
    use serde_json::json;
    use shared::TransactionType;
    use tempfile::TempDir;

    async fn setup_test(allow_empty_save: bool) -> (TempDir, TransactionService) {
        let temp_dir = TempDir::new().unwrap();
        let engine = SqliteEngine::open(&temp_dir.path().join("tx.db")).await.unwrap();
        SchemaManager::new(&engine).ensure_schema().await.unwrap();
        let engine: Arc<dyn StorageEngine> = Arc::new(engine);
        let snapshot = SnapshotService::new(
            engine.clone(),
            temp_dir.path().join("transactions.csv"),
            BackgroundTasks::new(),
        );
        let service = TransactionService::new(engine, snapshot, allow_empty_save);
        (temp_dir, service)
    }

    fn tuples(records: &[TransactionRecord]) -> Vec<(TransactionType, String, String, f64)> {
        records
            .iter()
            .map(|r| (r.transaction_type, r.name.clone(), r.date.clone(), r.amount))
            .collect()
    }

    fn paycheck_and_rent() -> Value {
        json!([
            {"type": "income", "name": "Paycheck", "date": "2024-01-01", "amount": 1000},
            {"type": "expenditure", "name": "Rent", "date": "2024-01-02", "amount": 500}
        ])
    }

    #[tokio::test]
    async fn test_replace_all_then_list_is_newest_first() {
        let (_temp_dir, service) = setup_test(false).await;

        let receipt = service.replace_all(&paycheck_and_rent()).await.unwrap();
        receipt.snapshot.await.unwrap();

        assert_eq!(receipt.summary.inserted, 2);
        assert_eq!(
            tuples(&service.list().await.unwrap()),
            vec![
                (TransactionType::Expenditure, "Rent".into(), "2024-01-02".into(), 500.0),
                (TransactionType::Income, "Paycheck".into(), "2024-01-01".into(), 1000.0),
            ]
        );
        assert_eq!(
            tuples(&service.export().await.unwrap())[0].1,
            "Paycheck".to_string()
        );
    }

    #[tokio::test]
    async fn test_same_date_rows_are_ordered_by_id() {
        let (_temp_dir, service) = setup_test(false).await;
        let payload = json!([
            {"type": "expenditure", "name": "Lunch", "date": "2024-01-05", "amount": 12},
            {"type": "expenditure", "name": "Bus", "date": "2024-01-05", "amount": 3},
            {"type": "income", "name": "Refund", "date": "2024-01-05", "amount": 8},
            {"type": "income", "name": "Paycheck", "date": "2024-01-01", "amount": 1000}
        ]);

        service.replace_all(&payload).await.unwrap();

        let listed = service.list().await.unwrap();
        let names: Vec<&str> = listed.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Refund", "Bus", "Lunch", "Paycheck"]);
        assert!(listed[0].id > listed[1].id && listed[1].id > listed[2].id);

        let exported = service.export().await.unwrap();
        let names: Vec<&str> = exported.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Paycheck", "Lunch", "Bus", "Refund"]);
        assert!(exported[1].id < exported[2].id && exported[2].id < exported[3].id);
    }

    #[tokio::test]
    async fn test_same_candidate_twice_is_stored_once() {
        let (_temp_dir, service) = setup_test(false).await;
        let payload = json!([
            {"type": "income", "name": "Paycheck", "date": "2024-01-01", "amount": 1000, "createdBy": "first"},
            {"type": "income", "name": "Paycheck", "date": "2024-01-01", "amount": "1000.00", "createdBy": "second"}
        ]);

        let receipt = service.replace_all(&payload).await.unwrap();

        assert_eq!(receipt.summary.inserted, 1);
        assert_eq!(receipt.summary.dropped_duplicates, 1);
        let stored = service.list().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].created_by.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_invalid_items_are_skipped_not_fatal() {
        let (_temp_dir, service) = setup_test(false).await;
        let payload = json!([
            {"type": "gift", "name": "Bad", "date": "2024-01-01", "amount": 1},
            {"type": "income", "name": "", "date": "2024-01-01", "amount": 1},
            {"type": "income", "name": "Bonus", "date": "2024-02-01", "amount": "$250"},
            {"type": "expenditure", "name": "Coffee", "date": "2024-02-02", "amount": "n/a"},
            42
        ]);

        let receipt = service.replace_all(&payload).await.unwrap();

        assert_eq!(receipt.summary.received, 5);
        assert_eq!(receipt.summary.skipped_invalid, 4);
        assert_eq!(
            tuples(&service.list().await.unwrap()),
            vec![(TransactionType::Income, "Bonus".into(), "2024-02-01".into(), 250.0)]
        );
    }

    #[tokio::test]
    async fn test_replace_all_replaces_rather_than_appends() {
        let (_temp_dir, service) = setup_test(false).await;
        service.replace_all(&paycheck_and_rent()).await.unwrap();

        service
            .replace_all(&json!([{"type": "income", "name": "Gift", "date": "2024-03-01", "amount": 20}]))
            .await
            .unwrap();

        assert_eq!(service.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_non_list_payload_is_rejected() {
        let (_temp_dir, service) = setup_test(false).await;
        let result = service.replace_all(&json!({"type": "income"})).await;
        assert!(matches!(result, Err(SaveError::NotAList)));
        let result = service.replace_all(&Value::Null).await;
        assert!(matches!(result, Err(SaveError::NotAList)));
    }

    #[tokio::test]
    async fn test_empty_save_is_refused_when_rows_exist() {
        let (_temp_dir, service) = setup_test(false).await;
        service.replace_all(&paycheck_and_rent()).await.unwrap();

        let result = service.replace_all(&json!([])).await;

        assert!(matches!(result, Err(SaveError::EmptySaveRefused { existing: 2 })));
        assert_eq!(service.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_empty_save_on_empty_store_is_allowed() {
        let (_temp_dir, service) = setup_test(false).await;
        let receipt = service.replace_all(&json!([])).await.unwrap();
        assert_eq!(receipt.summary, ReplaceSummary::default());
    }

    #[tokio::test]
    async fn test_empty_save_with_override_clears_store() {
        let (_temp_dir, service) = setup_test(true).await;
        service.replace_all(&paycheck_and_rent()).await.unwrap();

        service.replace_all(&json!([])).await.unwrap();

        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failure_mid_batch_leaves_previous_rows() {
        let (_temp_dir, service) = setup_test(false).await;
        service.replace_all(&paycheck_and_rent()).await.unwrap();
        service
            .engine
            .execute(
                "CREATE TRIGGER reject_boom BEFORE INSERT ON transactions \
                 WHEN NEW.name = 'Boom' BEGIN SELECT RAISE(ABORT, 'boom'); END",
                &[],
            )
            .await
            .unwrap();

        let result = service
            .replace_all(&json!([
                {"type": "income", "name": "Fine", "date": "2024-05-01", "amount": 1},
                {"type": "income", "name": "Boom", "date": "2024-05-02", "amount": 2}
            ]))
            .await;

        assert!(matches!(result, Err(SaveError::Storage(_))));
        assert_eq!(
            tuples(&service.export().await.unwrap()),
            vec![
                (TransactionType::Income, "Paycheck".into(), "2024-01-01".into(), 1000.0),
                (TransactionType::Expenditure, "Rent".into(), "2024-01-02".into(), 500.0),
            ]
        );
    }

    #[tokio::test]
    async fn test_snapshot_follows_successful_save() {
        let (temp_dir, service) = setup_test(false).await;

        let receipt = service.replace_all(&paycheck_and_rent()).await.unwrap();
        receipt.snapshot.await.unwrap();

        let snapshot = std::fs::read_to_string(temp_dir.path().join("transactions.csv")).unwrap();
        assert!(snapshot.contains("Rent,2024-01-02,500,,Paycheck,2024-01-01,1000"));
    }
}
