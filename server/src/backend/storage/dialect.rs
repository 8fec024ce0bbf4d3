//! SQL that differs between the file-engine and the network-engine.
//!
//! Everything outside this module writes engine-neutral SQL with `?` placeholders.

use super::traits::EngineKind;

pub const TRANSACTIONS_TABLE: &str = "transactions";
pub const META_TABLE: &str = "app_meta";
pub const UNIQUE_INDEX_NAME: &str = "idx_transactions_unique";

/// Optional attribution columns added after table creation
pub const ATTRIBUTION_COLUMNS: [&str; 2] = ["created_by", "updated_by"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Most recent first
    NewestFirst,
    /// Chronological
    OldestFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
}

impl Dialect {
    pub fn for_kind(kind: EngineKind) -> Self {
        match kind {
            EngineKind::File => Dialect::Sqlite,
            EngineKind::Network => Dialect::Postgres,
        }
    }

    /// Create-if-absent DDL for the transaction table and the meta table
    pub fn create_schema_script(&self) -> &'static str {
        match self {
            Dialect::Sqlite => {
                r#"
                CREATE TABLE IF NOT EXISTS transactions (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    type TEXT NOT NULL,
                    name TEXT NOT NULL,
                    date TEXT NOT NULL,
                    amount REAL NOT NULL
                );
                CREATE TABLE IF NOT EXISTS app_meta (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );
                "#
            }
            Dialect::Postgres => {
                r#"
                CREATE TABLE IF NOT EXISTS transactions (
                    id SERIAL PRIMARY KEY,
                    type TEXT NOT NULL,
                    name TEXT NOT NULL,
                    date DATE NOT NULL,
                    amount NUMERIC NOT NULL
                );
                CREATE TABLE IF NOT EXISTS app_meta (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );
                "#
            }
        }
    }

    pub fn create_unique_index(&self) -> String {
        format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} (type, name, date, amount)",
            UNIQUE_INDEX_NAME, TRANSACTIONS_TABLE
        )
    }

    /// Keep the lowest id of every duplicate group
    pub fn delete_duplicates(&self) -> String {
        format!(
            "DELETE FROM {table} WHERE id NOT IN (\
             SELECT MIN(id) FROM {table} GROUP BY type, name, date, amount)",
            table = TRANSACTIONS_TABLE
        )
    }

    pub fn add_text_column(&self, column: &str) -> String {
        format!("ALTER TABLE {} ADD COLUMN {} TEXT", TRANSACTIONS_TABLE, column)
    }

    /// Conflict-tolerant insert: a row colliding on the dedup tuple is dropped
    pub fn insert_transaction(&self) -> &'static str {
        match self {
            Dialect::Sqlite => {
                "INSERT INTO transactions (type, name, date, amount, created_by, updated_by) \
                 VALUES (?, ?, ?, ?, ?, ?) ON CONFLICT DO NOTHING"
            }
            Dialect::Postgres => {
                "INSERT INTO transactions (type, name, date, amount, created_by, updated_by) \
                 VALUES (?, ?, ?::date, ?::numeric, ?, ?) ON CONFLICT DO NOTHING"
            }
        }
    }

    /// Select list normalised to text dates and floating point amounts
    fn transaction_columns(&self) -> &'static str {
        match self {
            Dialect::Sqlite => "id, type, name, date, amount, created_by, updated_by",
            Dialect::Postgres => {
                "id, type, name, to_char(date, 'YYYY-MM-DD') AS date, \
                 amount::float8 AS amount, created_by, updated_by"
            }
        }
    }

    pub fn select_transactions(&self, order: SortOrder) -> String {
        let direction = match order {
            SortOrder::NewestFirst => "DESC",
            SortOrder::OldestFirst => "ASC",
        };
        format!(
            "SELECT {} FROM {} ORDER BY date {dir}, id {dir}",
            self.transaction_columns(),
            TRANSACTIONS_TABLE,
            dir = direction
        )
    }

    pub fn count_transactions(&self) -> String {
        format!("SELECT COUNT(*) AS count FROM {}", TRANSACTIONS_TABLE)
    }

    pub fn delete_all_transactions(&self) -> String {
        format!("DELETE FROM {}", TRANSACTIONS_TABLE)
    }

    pub fn select_meta(&self) -> String {
        format!("SELECT value FROM {} WHERE key = ?", META_TABLE)
    }

    pub fn upsert_meta(&self) -> String {
        format!(
            "INSERT INTO {} (key, value) VALUES (?, ?) \
             ON CONFLICT (key) DO UPDATE SET value = excluded.value",
            META_TABLE
        )
    }
}
