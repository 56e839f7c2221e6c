use crate::models::BudgetGoal;
use database::{self, RepositoryError};
use sqlx::FromRow;

#[derive(FromRow)]
struct BudgetGoalRecord {
    id: String,
    category_id: String,
    monthly_budget: i64,
}

impl From<BudgetGoalRecord> for BudgetGoal {
    fn from(record: BudgetGoalRecord) -> Self {
        BudgetGoal {
            id: record.id,
            category_id: record.category_id,
            monthly_budget: record.monthly_budget,
        }
    }
}

pub(crate) struct GoalRepository<'a> {
    conn: &'a mut database::Connection,
}

impl<'a> GoalRepository<'a> {
    pub fn new(conn: &'a mut database::Connection) -> Self {
        Self { conn }
    }

    pub async fn list_for_customer(&mut self, customer_id: &str) -> Result<Vec<BudgetGoal>, RepositoryError> {
        let records = sqlx::query_as::<_, BudgetGoalRecord>(
            "SELECT id, category_id, monthly_budget FROM budget_goals WHERE customer_id = $1 ORDER BY id",
        )
        .bind(customer_id)
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(records.into_iter().map(|r| r.into()).collect())
    }
}
