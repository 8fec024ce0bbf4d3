use crate::backend::domain::models::transaction::TransactionRecord;
use shared::Transaction as SharedTransaction;

pub struct TransactionMapper;

impl TransactionMapper {
    pub fn to_dto(domain: TransactionRecord) -> SharedTransaction {
        SharedTransaction {
            id: domain.id,
            transaction_type: domain.transaction_type,
            name: domain.name,
            date: domain.date,
            amount: domain.amount,
            created_by: domain.created_by,
            updated_by: domain.updated_by,
        }
    }

    pub fn to_dto_list(domain: Vec<TransactionRecord>) -> Vec<SharedTransaction> {
        domain.into_iter().map(Self::to_dto).collect()
    }
}
