//! Finance tracker backend: bulk transaction sync over SQLite or Postgres, with
//! CSV snapshots, one-time CSV import and periodic backups.

pub mod backend;
pub mod config;
