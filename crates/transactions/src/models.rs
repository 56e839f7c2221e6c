use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub occurred_at: DateTime<Utc>,
    pub merchant_name: String,
    pub category_id: String,
    pub amount: i64, // Cents, always positive
    pub payment_method: String,
    pub description: Option<String>,
}

/// A validated half-open `[start, end)` lookup window for one customer.
#[derive(Debug)]
pub struct TransactionQuery {
    customer_id: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TransactionQuery {
    pub fn new(
        customer_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self, String> {
        if customer_id.trim().is_empty() {
            return Err("Customer id cannot be empty".to_string());
        }
        if start >= end {
            return Err("Range start must be before its end".to_string());
        }

        Ok(Self {
            customer_id: customer_id.trim().to_string(),
            start,
            end,
        })
    }

    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }
}
