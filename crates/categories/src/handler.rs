use crate::models::{BudgetGoal, Category};
use crate::service::{CategoryError, CategoryService};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use common::AppState;
use std::sync::Arc;
use serde::Deserialize;
use serde_json::json;

impl IntoResponse for CategoryError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            CategoryError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            CategoryError::NotFound => (StatusCode::NOT_FOUND, "Category not found".to_string()),
            CategoryError::Infrastructure(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        (status, Json(json!({ "error": msg }))).into_response()
    }
}

pub fn categories_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_categories))
        .route("/goals", get(list_goals))
        .route("/{id}", get(get_category))
        .with_state(state)
}

async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Category>>, CategoryError> {
    let categories = CategoryService::list_categories(&state.db).await?;
    Ok(Json(categories))
}

async fn get_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Category>, CategoryError> {
    let category = CategoryService::get_category(&state.db, &id).await?;
    Ok(Json(category))
}

#[derive(Deserialize)]
struct GoalsQuery {
    #[serde(rename = "customerId")]
    customer_id: String,
}

async fn list_goals(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GoalsQuery>,
) -> Result<Json<Vec<BudgetGoal>>, CategoryError> {
    let goals = CategoryService::list_goals(&state.db, &params.customer_id).await?;
    Ok(Json(goals))
}
