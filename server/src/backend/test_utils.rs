//! Test helpers shared by the REST handler tests.

use std::sync::Arc;
use tempfile::TempDir;

use crate::backend::storage::{SchemaManager, SqliteEngine, StorageEngine};
use crate::backend::AppState;
use crate::config::AppConfig;

/// An application state backed by a SQLite file in a temporary data directory.
/// The directory lives as long as the environment.
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub config: AppConfig,
    pub state: AppState,
}

impl TestEnvironment {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(configure: impl FnOnce(&mut AppConfig)) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let mut config = AppConfig::local(temp_dir.path());
        configure(&mut config);

        let engine = SqliteEngine::open(&config.db_file())
            .await
            .expect("Failed to open test database");
        SchemaManager::new(&engine)
            .ensure_schema()
            .await
            .expect("Failed to create schema");
        let engine: Arc<dyn StorageEngine> = Arc::new(engine);

        let state = AppState::new(engine, &config);
        Self {
            temp_dir,
            config,
            state,
        }
    }
}
