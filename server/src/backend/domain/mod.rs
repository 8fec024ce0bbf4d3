//! # Domain Module
//!
//! Business logic for the finance tracker, independent of HTTP and of which
//! storage engine is active.
//!
//! ## Module Organization
//!
//! - **transaction_service**: the Transaction Store (bulk replace with dedup, ordered reads)
//! - **snapshot_service**: dual-column CSV snapshot regenerated after every mutation
//! - **import_service**: one-time seed from a snapshot-format CSV
//! - **export_service**: flat chronological CSV export
//! - **backup_service**: periodic file-engine backups with retention
//! - **background**: detached executor for fire-and-forget side effects
//! - **session**: session store abstraction with injectable expiry
//! - **diagnostics**: failed-save dumps
//!
//! ## Business Rules
//!
//! - A transaction is income or expenditure, has a name and a date, and a finite amount
//! - (type, name, date, amount) is unique; the first of a set of duplicates wins
//! - Saving is a full replace, never an incremental update
//! - An empty save never wipes stored history unless explicitly allowed

pub mod background;
pub mod backup_service;
pub mod commands;
pub mod diagnostics;
pub mod export_service;
pub mod import_service;
pub mod models;
pub mod session;
pub mod snapshot_service;
pub mod transaction_service;

pub use background::BackgroundTasks;
pub use backup_service::BackupService;
pub use commands::import::ImportOutcome;
pub use commands::transactions::{ReplaceSummary, SaveReceipt};
pub use export_service::ExportService;
pub use import_service::{ImportError, ImportService};
pub use session::{InMemorySessionStore, Session, SessionPolicy, SessionStore};
pub use snapshot_service::SnapshotService;
pub use transaction_service::{SaveError, TransactionService};
