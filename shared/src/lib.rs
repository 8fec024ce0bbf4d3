use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A stored income or expenditure line item as seen by the browser client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Surrogate key assigned by the storage engine
    pub id: i64,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Descriptive label, never empty
    pub name: String,
    /// Calendar date, normally `YYYY-MM-DD`
    pub date: String,
    pub amount: f64,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub updated_by: Option<String>,
}

/// The two kinds of line item the tracker knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expenditure,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expenditure => "expenditure",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTransactionType(pub String);

impl fmt::Display for UnknownTransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown transaction type '{}'", self.0)
    }
}

impl std::error::Error for UnknownTransactionType {}

impl FromStr for TransactionType {
    type Err = UnknownTransactionType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(TransactionType::Income),
            "expenditure" => Ok(TransactionType::Expenditure),
            other => Err(UnknownTransactionType(other.to_string())),
        }
    }
}

/// Response body for `GET /transactions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionListResponse {
    pub transactions: Vec<Transaction>,
}

/// Request body for `POST /transactions`.
///
/// The list is kept as raw JSON so that a malformed payload (missing key, object
/// instead of array) can be reported as a client error instead of a decode failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveTransactionsRequest {
    #[serde(default)]
    pub transactions: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// Error body shared by every endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            detail: None,
        }
    }

    pub fn with_detail(error: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            detail: Some(detail.into()),
        }
    }
}

/// Successful `POST /import-csv-once`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportResponse {
    pub imported: usize,
}

/// `409` body of `POST /import-csv-once` when the import already ran
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSkippedResponse {
    pub skipped: bool,
    pub reason: String,
}

/// Response body for `GET /debug/db-info`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbInfoResponse {
    pub driver: String,
    pub db_file: Option<String>,
    pub row_count: i64,
    pub file_size_bytes: Option<u64>,
    pub mtime: Option<String>,
    /// Background jobs (snapshot rewrites) that failed since startup
    pub background_failures: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub driver: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub secret: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    pub elevated: bool,
}
