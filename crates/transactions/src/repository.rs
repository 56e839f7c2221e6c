use crate::models::{Transaction, TransactionQuery};
use chrono::{DateTime, Utc};
use database::{self, RepositoryError};
use sqlx::FromRow;

#[derive(FromRow)]
struct TransactionRecord {
    id: String,
    occurred_at: DateTime<Utc>,
    merchant_name: String,
    category_id: String,
    amount: i64,
    payment_method: String,
    description: Option<String>,
}

impl From<TransactionRecord> for Transaction {
    fn from(record: TransactionRecord) -> Self {
        Transaction {
            id: record.id,
            occurred_at: record.occurred_at,
            merchant_name: record.merchant_name,
            category_id: record.category_id,
            amount: record.amount,
            payment_method: record.payment_method,
            description: record.description,
        }
    }
}

pub(crate) struct TransactionRepository<'a> {
    conn: &'a mut database::Connection,
}

impl<'a> TransactionRepository<'a> {
    pub fn new(conn: &'a mut database::Connection) -> Self {
        Self { conn }
    }

    pub async fn list_in_range(&mut self, query: &TransactionQuery) -> Result<Vec<Transaction>, RepositoryError> {
        let records = sqlx::query_as::<_, TransactionRecord>(
            "SELECT id, occurred_at, merchant_name, category_id, amount, payment_method, description FROM transactions WHERE customer_id = $1 AND occurred_at >= $2 AND occurred_at < $3 ORDER BY occurred_at DESC, id",
        )
        .bind(query.customer_id())
        .bind(query.start())
        .bind(query.end())
        .fetch_all(&mut *self.conn)
        .await?;

        Ok(records.into_iter().map(|r| r.into()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use database::get_test_db;

    async fn insert(conn: &mut database::Connection, id: &str, customer_id: &str, at: DateTime<Utc>, amount: i64) {
        sqlx::query(
            "INSERT INTO transactions (id, customer_id, occurred_at, merchant_name, category_id, amount, payment_method, description) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(id)
        .bind(customer_id)
        .bind(at)
        .bind("Pick n Pay")
        .bind("groceries")
        .bind(amount)
        .bind("Credit Card")
        .bind(Option::<String>::None)
        .execute(&mut *conn)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_list_in_range_is_half_open() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();

        let start = Utc.with_ymd_and_hms(2024, 9, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 9, 16, 0, 0, 0).unwrap();
        insert(uow.connection(), "txn_before", "12345", start - chrono::Duration::seconds(1), 100).await;
        insert(uow.connection(), "txn_start", "12345", start, 200).await;
        insert(uow.connection(), "txn_mid", "12345", start + chrono::Duration::days(3), 300).await;
        insert(uow.connection(), "txn_end", "12345", end, 400).await;

        let mut repo = TransactionRepository::new(uow.connection());
        let query = TransactionQuery::new("12345", start, end).unwrap();
        let list = repo.list_in_range(&query).await.unwrap();

        let ids: Vec<&str> = list.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["txn_mid", "txn_start"]);
        assert_eq!(list[0].amount, 300);
        assert_eq!(list[0].occurred_at, start + chrono::Duration::days(3));
    }

    #[tokio::test]
    async fn test_list_in_range_filters_customer() {
        let db = get_test_db().await;
        let mut uow = db.begin().await.unwrap();

        let start = Utc.with_ymd_and_hms(2024, 9, 1, 0, 0, 0).unwrap();
        insert(uow.connection(), "txn_mine", "12345", start + chrono::Duration::hours(1), 100).await;
        insert(uow.connection(), "txn_other", "99999", start + chrono::Duration::hours(2), 100).await;

        let mut repo = TransactionRepository::new(uow.connection());
        let query = TransactionQuery::new("12345", start, start + chrono::Duration::days(1)).unwrap();
        let list = repo.list_in_range(&query).await.unwrap();

        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, "txn_mine");
    }
}
