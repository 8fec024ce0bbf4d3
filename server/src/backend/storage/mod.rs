//! # Storage Module
//!
//! Persistence for the finance tracker. A single [`StorageEngine`] trait sits in
//! front of two engines: an embedded SQLite file (the file-engine) and a pooled
//! Postgres connection (the network-engine). The engine is picked once at startup
//! by [`connect_engine`]; everything engine-specific is kept in [`Dialect`].
//!
//! ## Layout
//!
//! - `traits` / `value`: the adapter contract and its parameter and row types
//! - `sqlite` / `postgres`: the two engines
//! - `dialect`: per-engine SQL text
//! - `schema`: idempotent table, index and column setup
//! - `migration`: one-time file-engine to network-engine copy
//! - `meta`: idempotency markers stored alongside the data

pub mod connection;
pub mod dialect;
pub mod error;
pub mod meta;
pub mod migration;
pub mod postgres;
pub mod schema;
pub mod sqlite;
pub mod traits;
pub mod value;

pub use connection::connect_engine;
pub use dialect::{Dialect, SortOrder};
pub use error::{StorageError, StorageResult};
pub use schema::{SchemaManager, SchemaReport, UniqueIndexStatus};
pub use sqlite::SqliteEngine;
pub use traits::{EngineKind, EngineTransaction, StorageEngine};
pub use value::{DbRow, ExecOutcome, SqlValue};
