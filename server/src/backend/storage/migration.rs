//! One-time copy of a file-engine database into the network-engine.

use log::{error, info, warn};
use std::path::Path;

use super::meta::{read_marker, write_marker};
use super::sqlite::SqliteEngine;
use super::traits::{EngineKind, EngineTransaction, StorageEngine};
use crate::backend::domain::models::transaction::NewTransaction;

pub const MIGRATION_MARKER: &str = "sqlite_migration_done";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// `rows` were inserted; `invalid` source rows failed validation and were left behind
    Migrated { rows: usize, invalid: usize },
    Skipped { reason: String },
    Failed { reason: String },
}

fn skipped(reason: impl Into<String>) -> MigrationOutcome {
    let reason = reason.into();
    info!("SQLite migration skipped: {}", reason);
    MigrationOutcome::Skipped { reason }
}

fn failed(reason: impl Into<String>) -> MigrationOutcome {
    let reason = reason.into();
    error!("SQLite migration failed: {}", reason);
    MigrationOutcome::Failed { reason }
}

async fn abandon(tx: Box<dyn EngineTransaction>, reason: String) -> MigrationOutcome {
    if let Err(rollback_err) = tx.rollback().await {
        warn!("Rollback after failed migration also failed: {}", rollback_err);
    }
    failed(reason)
}

/// Copy every valid row of `source_path` into an empty network-engine table.
///
/// Source rows are validated like client input; rows that fail are logged and
/// skipped. Runs in one transaction on the target; on failure nothing is kept
/// and the migration is not retried until the next startup.
pub async fn migrate_file_to_network(
    target: &dyn StorageEngine,
    source_path: &Path,
) -> MigrationOutcome {
    if target.kind() != EngineKind::Network {
        return skipped("active engine is not the network engine");
    }
    if !source_path.exists() {
        return skipped(format!("{} does not exist", source_path.display()));
    }

    match read_marker(target, MIGRATION_MARKER).await {
        Ok(Some(at)) => return skipped(format!("already migrated at {}", at)),
        Ok(None) => {}
        Err(e) => return failed(format!("could not read migration marker: {}", e)),
    }

    let dialect = target.dialect();
    let existing = match target.query_all(&dialect.count_transactions(), &[]).await {
        Ok(rows) => rows.first().and_then(|r| r.integer("count")).unwrap_or(0),
        Err(e) => return failed(format!("could not count target rows: {}", e)),
    };
    if existing > 0 {
        return skipped(format!("target already holds {} rows", existing));
    }

    let source = match SqliteEngine::open_read_only(source_path).await {
        Ok(source) => source,
        Err(e) => return failed(format!("could not open {}: {}", source_path.display(), e)),
    };
    let rows = source
        .query_all("SELECT * FROM transactions ORDER BY id", &[])
        .await;
    source.close().await;
    let rows = match rows {
        Ok(rows) => rows,
        Err(e) => return failed(format!("could not read source rows: {}", e)),
    };

    let mut candidates = Vec::with_capacity(rows.len());
    let mut invalid = 0;
    for row in &rows {
        match NewTransaction::from_stored_row(row) {
            Ok(candidate) => candidates.push(candidate),
            Err(e) => {
                invalid += 1;
                warn!(
                    "Not migrating source row {}: {}",
                    row.integer("id").unwrap_or_default(),
                    e
                );
            }
        }
    }

    let mut tx = match target.begin().await {
        Ok(tx) => tx,
        Err(e) => return failed(format!("could not begin transaction: {}", e)),
    };

    let mut inserted = 0;
    for candidate in &candidates {
        let result = tx
            .execute(dialect.insert_transaction(), &candidate.insert_params())
            .await;
        match result {
            Ok(outcome) => inserted += outcome.rows_affected as usize,
            Err(e) => return abandon(tx, format!("insert failed: {}", e)).await,
        }
    }

    let stamp = chrono::Utc::now().to_rfc3339();
    if let Err(e) = write_marker(tx.as_mut(), target, MIGRATION_MARKER, &stamp).await {
        return abandon(tx, format!("could not write marker: {}", e)).await;
    }

    match tx.commit().await {
        Ok(()) => {
            info!(
                "Migrated {} transactions from {} to postgres ({} invalid rows skipped)",
                inserted,
                source_path.display(),
                invalid
            );
            MigrationOutcome::Migrated {
                rows: inserted,
                invalid,
            }
        }
        Err(e) => failed(format!("commit failed: {}", e)),
    }
}
