use log::{info, warn};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::error::StorageResult;
use super::postgres::PostgresEngine;
use super::sqlite::SqliteEngine;
use super::traits::StorageEngine;

/// How long startup waits for the network database before falling back
const NETWORK_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Pick the storage engine for the lifetime of the process.
///
/// A configured network database is tried once (connect plus liveness probe).
/// Any failure is logged and the file-engine at `db_file` is used instead; there
/// is no retry loop.
pub async fn connect_engine(
    database_url: Option<&str>,
    db_file: &Path,
) -> StorageResult<Arc<dyn StorageEngine>> {
    if let Some(url) = database_url.map(str::trim).filter(|url| !url.is_empty()) {
        match PostgresEngine::connect(url, NETWORK_CONNECT_TIMEOUT).await {
            Ok(engine) => match engine.ping().await {
                Ok(()) => {
                    info!("Using network database engine (postgres)");
                    return Ok(Arc::new(engine));
                }
                Err(e) => {
                    warn!("Postgres liveness probe failed, falling back to SQLite: {}", e);
                    engine.close().await;
                }
            },
            Err(e) => {
                warn!("Could not connect to Postgres, falling back to SQLite: {}", e);
            }
        }
    }

    let engine = SqliteEngine::open(db_file).await?;
    info!("Using file database engine (sqlite) at {}", db_file.display());
    Ok(Arc::new(engine))
}
