//! Export service domain logic for the finance tracker.
//!
//! Produces the flat chronological CSV served at `/transactions.csv`.

use anyhow::Result;
use csv::Writer;
use log::info;

use crate::backend::domain::models::transaction::TransactionRecord;
use crate::backend::domain::transaction_service::TransactionService;

pub const EXPORT_HEADER: [&str; 6] = ["type", "name", "date", "amount", "created_by", "updated_by"];

#[derive(Clone)]
pub struct ExportService {
    transaction_service: TransactionService,
}

impl ExportService {
    pub fn new(transaction_service: TransactionService) -> Self {
        Self {
            transaction_service,
        }
    }

    pub async fn export_csv(&self) -> Result<String> {
        let records = self.transaction_service.export().await?;
        info!("EXPORT: writing {} transactions as CSV", records.len());
        render_export_csv(&records)
    }
}

pub fn render_export_csv(records: &[TransactionRecord]) -> Result<String> {
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(EXPORT_HEADER)?;

    for record in records {
        writer.write_record([
            record.transaction_type.as_str(),
            record.name.as_str(),
            record.date.as_str(),
            record.amount.to_string().as_str(),
            record.created_by.as_deref().unwrap_or(""),
            record.updated_by.as_deref().unwrap_or(""),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flushing export buffer: {}", e.error()))?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::TransactionType;

    #[test]
    fn test_render_export_csv() {
        let records = vec![
            TransactionRecord {
                id: 1,
                transaction_type: TransactionType::Income,
                name: "Paycheck".to_string(),
                date: "2024-01-01".to_string(),
                amount: 1000.0,
                created_by: Some("alex".to_string()),
                updated_by: None,
            },
            TransactionRecord {
                id: 2,
                transaction_type: TransactionType::Expenditure,
                name: "Rent, flat".to_string(),
                date: "2024-01-02".to_string(),
                amount: 500.0,
                created_by: None,
                updated_by: None,
            },
        ];

        let csv = render_export_csv(&records).unwrap();

        assert_eq!(
            csv,
            "type,name,date,amount,created_by,updated_by\n\
             income,Paycheck,2024-01-01,1000,alex,\n\
             expenditure,\"Rent, flat\",2024-01-02,500,,\n"
        );
    }
}
