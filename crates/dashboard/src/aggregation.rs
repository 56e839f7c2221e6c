//! Pure roll-ups over transaction sets.
//!
//! Nothing here does I/O or fails: empty input yields zero-valued output and
//! every ratio with a zero denominator is reported as 0.

use crate::models::{
    CategoryBreakdownEntry, DerivedSummary, GoalProgress, GoalStatus, PeriodComparison,
    RecentTransactions, TrendPoint,
};
use crate::period::{days_remaining_in_month, month_start};
use categories::models::{BudgetGoal, Category};
use chrono::{Months, NaiveDate};
use std::collections::{BTreeMap, HashMap};
use transactions::models::Transaction;

/// Goals at or above this share of their budget are flagged.
const WARNING_THRESHOLD_PERCENT: i64 = 90;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn percentage(part: i64, whole: i64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round2(part as f64 / whole as f64 * 100.0)
}

fn percent_change(current: i64, previous: i64) -> f64 {
    if previous == 0 {
        return 0.0;
    }
    round2((current - previous) as f64 / previous as f64 * 100.0)
}

fn average(total: i64, count: usize) -> i64 {
    if count == 0 {
        return 0;
    }
    (total as f64 / count as f64).round() as i64
}

fn total_of(transactions: &[Transaction]) -> i64 {
    transactions.iter().map(|t| t.amount).sum()
}

/// Per-category (amount, count), keyed and iterated in ascending id order.
fn totals_by_category(transactions: &[Transaction]) -> BTreeMap<&str, (i64, usize)> {
    let mut totals: BTreeMap<&str, (i64, usize)> = BTreeMap::new();
    for t in transactions {
        let entry = totals.entry(t.category_id.as_str()).or_insert((0, 0));
        entry.0 += t.amount;
        entry.1 += 1;
    }
    totals
}

pub fn compute_summary(transactions: &[Transaction], previous: &[Transaction]) -> DerivedSummary {
    let total_spent = total_of(transactions);
    let transaction_count = transactions.len();

    // Ascending id order plus a strict comparison keeps the smallest id on ties.
    let mut top: Option<(&str, i64)> = None;
    for (category_id, (amount, _)) in totals_by_category(transactions) {
        if top.is_none_or(|(_, best)| amount > best) {
            top = Some((category_id, amount));
        }
    }

    let previous_total = total_of(previous);
    let previous_count = previous.len() as i64;

    DerivedSummary {
        total_spent,
        transaction_count,
        average_transaction: average(total_spent, transaction_count),
        top_category_id: top.map(|(id, _)| id.to_string()),
        compared_to_previous: PeriodComparison {
            spent_change: percent_change(total_spent, previous_total),
            transaction_change: percent_change(transaction_count as i64, previous_count),
        },
    }
}

pub fn compute_category_breakdown(
    transactions: &[Transaction],
    categories: &[Category],
) -> Vec<CategoryBreakdownEntry> {
    let lookup: HashMap<&str, &Category> = categories.iter().map(|c| (c.id.as_str(), c)).collect();
    let grand_total = total_of(transactions);

    let mut entries: Vec<CategoryBreakdownEntry> = totals_by_category(transactions)
        .into_iter()
        .map(|(category_id, (amount, transaction_count))| {
            let category = lookup.get(category_id);
            CategoryBreakdownEntry {
                category_id: category_id.to_string(),
                display_name: category
                    .map(|c| c.display_name.clone())
                    .unwrap_or_else(|| category_id.to_string()),
                color_token: category.map(|c| c.color_token.clone()),
                amount,
                percentage: percentage(amount, grand_total),
                transaction_count,
            }
        })
        .collect();

    // Stable sort over id-ordered input: equal amounts stay in ascending id order.
    entries.sort_by(|a, b| b.amount.cmp(&a.amount));
    entries
}

/// One point per calendar month, oldest first, ending with the month of
/// `reference`. Months without transactions are emitted as zeros.
pub fn compute_trend(
    transactions: &[Transaction],
    months_back: u32,
    reference: NaiveDate,
) -> Vec<TrendPoint> {
    if months_back == 0 {
        return Vec::new();
    }

    let first = month_start(reference) - Months::new(months_back - 1);
    let mut buckets: BTreeMap<NaiveDate, (i64, usize)> = (0..months_back)
        .map(|i| (first + Months::new(i), (0, 0)))
        .collect();

    for t in transactions {
        let month = month_start(t.occurred_at.date_naive());
        if let Some(bucket) = buckets.get_mut(&month) {
            bucket.0 += t.amount;
            bucket.1 += 1;
        }
    }

    buckets
        .into_iter()
        .map(|(month, (total_spent, transaction_count))| TrendPoint {
            month: month.format("%Y-%m").to_string(),
            total_spent,
            transaction_count,
            average_transaction: average(total_spent, transaction_count),
        })
        .collect()
}

pub fn compute_goal_progress(
    transactions: &[Transaction],
    goals: &[BudgetGoal],
    reference: NaiveDate,
) -> Vec<GoalProgress> {
    let month_begin = month_start(reference);
    let days_remaining = days_remaining_in_month(reference);

    goals
        .iter()
        .map(|goal| {
            let current_spent: i64 = transactions
                .iter()
                .filter(|t| t.category_id == goal.category_id)
                .filter(|t| {
                    let day = t.occurred_at.date_naive();
                    month_begin <= day && day <= reference
                })
                .map(|t| t.amount)
                .sum();

            // Compared in cents so exactly 90% can't fall under through rounding.
            let status = if goal.monthly_budget > 0
                && current_spent * 100 >= goal.monthly_budget * WARNING_THRESHOLD_PERCENT
            {
                GoalStatus::Warning
            } else {
                GoalStatus::OnTrack
            };

            GoalProgress {
                goal_id: goal.id.clone(),
                category_id: goal.category_id.clone(),
                monthly_budget: goal.monthly_budget,
                current_spent,
                percentage_used: percentage(current_spent, goal.monthly_budget),
                days_remaining_in_month: days_remaining,
                status,
            }
        })
        .collect()
}

/// Newest first; ties on the timestamp fall back to the id.
pub fn recent_transactions(transactions: &[Transaction], limit: usize) -> RecentTransactions {
    let mut sorted: Vec<&Transaction> = transactions.iter().collect();
    sorted.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at).then_with(|| a.id.cmp(&b.id)));

    RecentTransactions {
        items: sorted.into_iter().take(limit).cloned().collect(),
        total: transactions.len(),
        has_more: transactions.len() > limit,
    }
}
