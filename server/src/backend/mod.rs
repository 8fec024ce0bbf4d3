//! # Backend Module
//!
//! Contains all server-side logic for the finance tracker.
//!
//! This module serves as the orchestration layer that brings together:
//! - **Domain**: transaction store, CSV snapshot and import, backups, sessions
//! - **Storage**: the SQLite / Postgres engines behind one adapter
//! - **IO**: the REST API consumed by the browser client
//!
//! ## Architecture
//!
//! ```text
//! IO Layer (REST API, handlers)
//!     ↓
//! Domain Layer (Business logic, services)
//!     ↓
//! Storage Layer (Engine adapter, schema)
//! ```

pub mod domain;
pub mod io;
pub mod storage;
#[cfg(test)]
pub mod test_utils;

use anyhow::{Context, Result};
use axum::{
    http::Method,
    routing::{get, post},
    Router,
};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::config::AppConfig;
use domain::{
    BackgroundTasks, BackupService, ExportService, ImportService, InMemorySessionStore,
    SessionPolicy, SessionStore, SnapshotService, TransactionService,
};
use storage::migration::migrate_file_to_network;
use storage::{connect_engine, EngineKind, SchemaManager, StorageEngine, UniqueIndexStatus};

/// Main application state that holds all services
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<dyn StorageEngine>,
    pub transaction_service: TransactionService,
    pub export_service: ExportService,
    pub import_service: ImportService,
    pub sessions: Arc<dyn SessionStore>,
    /// `None` runs the server in open mode
    pub admin_secret: Option<String>,
    pub failed_saves_dir: PathBuf,
    pub background: BackgroundTasks,
}

impl AppState {
    /// Wire services around an engine whose schema is already in place
    pub fn new(engine: Arc<dyn StorageEngine>, config: &AppConfig) -> Self {
        let background = BackgroundTasks::new();
        let snapshot_service =
            SnapshotService::new(engine.clone(), config.snapshot_path(), background.clone());
        let transaction_service =
            TransactionService::new(engine.clone(), snapshot_service.clone(), config.allow_empty_save);
        let export_service = ExportService::new(transaction_service.clone());
        let import_service =
            ImportService::new(engine.clone(), config.import_file(), snapshot_service);
        let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new(SessionPolicy {
            ttl: config.session_ttl(),
        }));

        Self {
            engine,
            transaction_service,
            export_service,
            import_service,
            sessions,
            admin_secret: config
                .admin_secret
                .clone()
                .filter(|secret| !secret.is_empty()),
            failed_saves_dir: config.failed_saves_dir(),
            background,
        }
    }
}

/// Initialize the backend with all required services
pub async fn initialize_backend(config: &AppConfig) -> Result<AppState> {
    info!("Setting up database");
    let engine = connect_engine(config.database_url.as_deref(), &config.db_file()).await?;

    let report = SchemaManager::new(engine.as_ref())
        .ensure_schema()
        .await
        .context("initializing database schema")?;
    if let UniqueIndexStatus::Unresolved { reason } = &report.unique_index {
        warn!("Running without the transaction unique index: {}", reason);
    }

    if config.migrate_from_sqlite {
        migrate_file_to_network(engine.as_ref(), &config.db_file()).await;
    }

    if config.enable_backups {
        if engine.kind() == EngineKind::File {
            info!(
                "Backing up every {}s into {}",
                config.backup_interval().as_secs(),
                config.backups_dir().display()
            );
            BackupService::new(engine.clone(), config.backups_dir())
                .spawn_periodic(config.backup_interval());
        } else {
            warn!("Backups are only taken for the SQLite engine; ignoring --enable-backups");
        }
    }

    if config.admin_secret.as_deref().unwrap_or("").is_empty() {
        warn!("No admin secret configured; transaction writes are open to every client");
    }

    info!("Setting up application state");
    Ok(AppState::new(engine, config))
}

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState, static_dir: Option<&Path>) -> Router {
    // CORS setup to allow a separately served frontend to make requests
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let router = Router::new()
        .route(
            "/transactions",
            get(io::list_transactions).post(io::save_transactions),
        )
        .route("/transactions.csv", get(io::export_transactions_csv))
        .route("/import-csv-once", post(io::import_csv_once))
        .route("/debug/db-info", get(io::db_info))
        .route("/health", get(io::health))
        .route("/login", post(io::login))
        .route("/logout", post(io::logout))
        .route("/session", get(io::current_session));

    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router.layer(cors).with_state(app_state)
}
