//! Key-value markers stored next to the transaction table.

use super::error::StorageResult;
use super::traits::{EngineTransaction, StorageEngine};
use super::value::SqlValue;

pub async fn read_marker(engine: &dyn StorageEngine, key: &str) -> StorageResult<Option<String>> {
    let rows = engine
        .query_all(&engine.dialect().select_meta(), &[SqlValue::from(key)])
        .await?;
    Ok(rows.first().and_then(|row| row.text("value")))
}

/// Write a marker as part of an open transaction so it commits with the data
pub async fn write_marker(
    tx: &mut dyn EngineTransaction,
    engine: &dyn StorageEngine,
    key: &str,
    value: &str,
) -> StorageResult<()> {
    tx.execute(
        &engine.dialect().upsert_meta(),
        &[SqlValue::from(key), SqlValue::from(value)],
    )
    .await?;
    Ok(())
}
