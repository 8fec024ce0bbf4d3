//! Domain model for a stored transaction and for a proposed (not yet stored) one.
use serde_json::Value;
use shared::TransactionType;
use thiserror::Error;

use crate::backend::storage::{DbRow, SqlValue};

/// A row of the transactions table
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub id: i64,
    pub transaction_type: TransactionType,
    pub name: String,
    pub date: String,
    pub amount: f64,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

impl TransactionRecord {
    pub fn from_row(row: &DbRow) -> Result<Self, RowDecodeError> {
        let id = row.integer("id").ok_or(RowDecodeError::Missing("id"))?;
        let raw_type = row.text("type").ok_or(RowDecodeError::Missing("type"))?;
        let transaction_type = raw_type
            .parse()
            .map_err(|_| RowDecodeError::UnknownType(raw_type.clone()))?;

        Ok(Self {
            id,
            transaction_type,
            name: row.text("name").ok_or(RowDecodeError::Missing("name"))?,
            date: row.text("date").ok_or(RowDecodeError::Missing("date"))?,
            amount: row.real("amount").ok_or(RowDecodeError::Missing("amount"))?,
            created_by: row.text("created_by"),
            updated_by: row.text("updated_by"),
        })
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum RowDecodeError {
    #[error("column '{0}' is missing or NULL")]
    Missing(&'static str),
    #[error("stored transaction has unknown type '{0}'")]
    UnknownType(String),
}

/// A validated transaction waiting to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub transaction_type: TransactionType,
    pub name: String,
    pub date: String,
    pub amount: f64,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
}

/// Why a proposed transaction was skipped
#[derive(Debug, Error, PartialEq)]
pub enum CandidateError {
    #[error("transaction must be a JSON object")]
    NotAnObject,
    #[error("type must be 'income' or 'expenditure', got '{0}'")]
    InvalidType(String),
    #[error("name is required")]
    MissingName,
    #[error("date is required")]
    MissingDate,
    #[error("amount '{0}' is not a finite number")]
    InvalidAmount(String),
}

impl NewTransaction {
    /// Validate the four required fields from their textual form
    pub fn validated(
        raw_type: &str,
        name: &str,
        date: &str,
        raw_amount: &str,
    ) -> Result<Self, CandidateError> {
        let transaction_type = parse_type(raw_type)?;
        let name = required(name, CandidateError::MissingName)?;
        let date = required(date, CandidateError::MissingDate)?;
        let amount =
            parse_amount(raw_amount).ok_or_else(|| CandidateError::InvalidAmount(raw_amount.to_string()))?;

        Ok(Self {
            transaction_type,
            name,
            date,
            amount,
            created_by: None,
            updated_by: None,
        })
    }

    /// Validate one element of a client-submitted list
    pub fn from_json(value: &Value) -> Result<Self, CandidateError> {
        let object = value.as_object().ok_or(CandidateError::NotAnObject)?;

        let raw_type = object.get("type").and_then(Value::as_str).unwrap_or_default();
        let name = object.get("name").map(scalar_text).unwrap_or_default();
        let date = object.get("date").map(scalar_text).unwrap_or_default();

        let transaction_type = parse_type(raw_type)?;
        let name = required(&name, CandidateError::MissingName)?;
        let date = required(&date, CandidateError::MissingDate)?;
        let amount = match object.get("amount") {
            Some(Value::Number(n)) => n.as_f64().filter(|v| v.is_finite()),
            Some(Value::String(s)) => parse_amount(s),
            _ => None,
        }
        .ok_or_else(|| {
            CandidateError::InvalidAmount(object.get("amount").map(scalar_text).unwrap_or_default())
        })?;

        Ok(Self {
            transaction_type,
            name,
            date,
            amount,
            created_by: attribution(object, "createdBy", "created_by"),
            updated_by: attribution(object, "updatedBy", "updated_by"),
        })
    }

    /// Re-validate a row read from another database before copying it.
    ///
    /// Legacy files may hold values the current schema would never accept.
    pub fn from_stored_row(row: &DbRow) -> Result<Self, CandidateError> {
        let text = |column: &str| row.text(column).unwrap_or_default();
        let mut candidate =
            Self::validated(&text("type"), &text("name"), &text("date"), &text("amount"))?;
        candidate.created_by = row.text("created_by").filter(|s| !s.trim().is_empty());
        candidate.updated_by = row.text("updated_by").filter(|s| !s.trim().is_empty());
        Ok(candidate)
    }

    /// Parameters in the column order of the dialect's insert statement
    pub fn insert_params(&self) -> [SqlValue; 6] {
        [
            SqlValue::from(self.transaction_type.as_str()),
            SqlValue::from(self.name.as_str()),
            SqlValue::from(self.date.as_str()),
            SqlValue::from(self.amount),
            SqlValue::from(self.created_by.clone()),
            SqlValue::from(self.updated_by.clone()),
        ]
    }
}

fn parse_type(raw: &str) -> Result<TransactionType, CandidateError> {
    raw.parse()
        .map_err(|_| CandidateError::InvalidType(raw.trim().to_string()))
}

fn required(raw: &str, missing: CandidateError) -> Result<String, CandidateError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Err(missing)
    } else {
        Ok(trimmed.to_string())
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

fn attribution(object: &serde_json::Map<String, Value>, camel: &str, snake: &str) -> Option<String> {
    object
        .get(camel)
        .or_else(|| object.get(snake))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Parse a user-entered amount such as `"$1,234.50"` or `"-12"`.
///
/// Everything except digits, `.` and `-` is dropped before parsing.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}
