use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub display_name: String,
    pub color_token: String,
}

/// A monthly spending ceiling on one category. A customer holds at most one
/// goal per category; it applies to every calendar month.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BudgetGoal {
    pub id: String,
    pub category_id: String,
    pub monthly_budget: i64, // Cents
}
