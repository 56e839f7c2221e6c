use crate::period::Period;
use async_trait::async_trait;
use categories::models::{BudgetGoal, Category};
use categories::service::{CategoryError, CategoryService};
use database::Database;
use transactions::models::Transaction;
use transactions::service::{TransactionError, TransactionService};

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Transaction lookup failed: {0}")]
    Transactions(#[from] TransactionError),
    #[error("Category lookup failed: {0}")]
    Categories(#[from] CategoryError),
    #[error("Source unavailable: {0}")]
    Unavailable(String),
}

/// Read side of the data the dashboard aggregates. Calls are independent and
/// may complete in any order.
#[async_trait]
pub trait DashboardSource: Send + Sync {
    async fn fetch_transactions(
        &self,
        customer_id: &str,
        period: &Period,
    ) -> Result<Vec<Transaction>, SourceError>;

    /// Transactions of the equal-length window right before `period`.
    async fn fetch_previous_period_transactions(
        &self,
        customer_id: &str,
        period: &Period,
    ) -> Result<Vec<Transaction>, SourceError> {
        self.fetch_transactions(customer_id, &period.previous()).await
    }

    async fn fetch_categories(&self) -> Result<Vec<Category>, SourceError>;

    async fn fetch_goals(&self, customer_id: &str) -> Result<Vec<BudgetGoal>, SourceError>;
}

#[derive(Clone)]
pub struct SqliteDashboardSource {
    db: Database,
}

impl SqliteDashboardSource {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DashboardSource for SqliteDashboardSource {
    async fn fetch_transactions(
        &self,
        customer_id: &str,
        period: &Period,
    ) -> Result<Vec<Transaction>, SourceError> {
        let transactions =
            TransactionService::list_in_range(&self.db, customer_id, period.start(), period.end())
                .await?;
        Ok(transactions)
    }

    async fn fetch_categories(&self) -> Result<Vec<Category>, SourceError> {
        Ok(CategoryService::list_categories(&self.db).await?)
    }

    async fn fetch_goals(&self, customer_id: &str) -> Result<Vec<BudgetGoal>, SourceError> {
        Ok(CategoryService::list_goals(&self.db, customer_id).await?)
    }
}
