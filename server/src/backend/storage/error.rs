//! Storage error type shared by both engines.

use thiserror::Error;

/// SQLSTATE raised by Postgres for `ADD COLUMN` on an existing column
const PG_DUPLICATE_COLUMN: &str = "42701";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{operation} is not supported by the {engine} engine")]
    Unsupported {
        operation: &'static str,
        engine: &'static str,
    },

    #[error("cannot decode column '{column}' of type {type_name}")]
    Decode { column: String, type_name: String },
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

impl StorageError {
    /// True when the error is the engine telling us a column already exists.
    ///
    /// Schema evolution swallows exactly this kind and nothing else.
    pub fn is_duplicate_column(&self) -> bool {
        match self {
            StorageError::Database(sqlx::Error::Database(db_error)) => {
                let code = db_error.code();
                is_duplicate_column_error(code.as_deref(), db_error.message())
            }
            _ => false,
        }
    }
}

pub(crate) fn is_duplicate_column_error(code: Option<&str>, message: &str) -> bool {
    if code == Some(PG_DUPLICATE_COLUMN) {
        return true;
    }
    // SQLite only reports the generic SQLITE_ERROR code, so match on the message
    let message = message.to_ascii_lowercase();
    message.contains("duplicate column")
        || (message.contains("column") && message.contains("already exists"))
}
