use crate::period::{Period, PeriodSelector};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use transactions::models::Transaction;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PeriodComparison {
    /// Percent change of total spend against the previous period.
    pub spent_change: f64,
    /// Percent change of transaction count against the previous period.
    pub transaction_change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedSummary {
    pub total_spent: i64,         // Cents
    pub transaction_count: usize,
    pub average_transaction: i64, // Cents
    pub top_category_id: Option<String>,
    pub compared_to_previous: PeriodComparison,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBreakdownEntry {
    pub category_id: String,
    pub display_name: String,
    pub color_token: Option<String>,
    pub amount: i64, // Cents
    pub percentage: f64,
    pub transaction_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub month: String, // YYYY-MM
    pub total_spent: i64,
    pub transaction_count: usize,
    pub average_transaction: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    OnTrack,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalProgress {
    pub goal_id: String,
    pub category_id: String,
    pub monthly_budget: i64, // Cents
    pub current_spent: i64,  // Cents
    /// Not clamped: overspending reports more than 100.
    pub percentage_used: f64,
    pub days_remaining_in_month: i64,
    pub status: GoalStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentTransactions {
    pub items: Vec<Transaction>,
    pub total: usize,
    pub has_more: bool,
}

/// Everything the dashboard shows for one period. Built in full before it is
/// ever handed to a consumer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSnapshot {
    pub generation: u64,
    pub selector: PeriodSelector,
    pub period: Period,
    pub generated_at: DateTime<Utc>,
    /// ISO 4217 code every cent amount in the snapshot is denominated in.
    pub currency: String,
    pub summary: DerivedSummary,
    pub breakdown: Vec<CategoryBreakdownEntry>,
    pub trend: Vec<TrendPoint>,
    pub goals: Vec<GoalProgress>,
    pub recent: RecentTransactions,
}

/// What a consumer can observe at any moment.
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub snapshot: Option<Arc<RefreshSnapshot>>,
    pub loading: bool,
    pub last_error: Option<String>,
    pub generation: u64,
}
