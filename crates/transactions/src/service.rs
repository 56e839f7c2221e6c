use crate::models::{Transaction, TransactionQuery};
use crate::repository::TransactionRepository;
use chrono::{DateTime, Utc};
use database::{RepositoryError, Database};
use tracing::instrument;

#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Database error: {0}")]
    Infrastructure(String),
}

impl From<RepositoryError> for TransactionError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Infrastructure(e) => TransactionError::Infrastructure(e.to_string()),
            _ => TransactionError::Infrastructure(err.to_string()),
        }
    }
}

pub struct TransactionService;

impl TransactionService {
    #[instrument(skip(db))]
    pub async fn list_in_range(
        db: &Database,
        customer_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Transaction>, TransactionError> {
        let query = TransactionQuery::new(customer_id, start, end)
            .map_err(TransactionError::InvalidInput)?;

        let mut uow = db.begin().await?;
        let mut repo = TransactionRepository::new(uow.connection());

        let transactions = repo.list_in_range(&query).await?;
        tracing::debug!("Loaded {} transactions", transactions.len());

        Ok(transactions)
    }
}
