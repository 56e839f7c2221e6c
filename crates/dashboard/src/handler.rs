use crate::models::{DashboardView, RefreshSnapshot};
use crate::orchestrator::{
    DashboardError, RefreshOrchestrator, RefreshOutcome, RefreshSettings, TracingObserver,
};
use crate::period::PeriodSelector;
use crate::source::SqliteDashboardSource;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use common::AppState;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let (status, msg) = match &self {
            DashboardError::InvalidPeriod(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            DashboardError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            DashboardError::Retrieval { .. } => (
                StatusCode::BAD_GATEWAY,
                "Dashboard data is temporarily unavailable".to_string(),
            ),
        };

        (status, Json(json!({ "error": msg }))).into_response()
    }
}

type Orchestrator = RefreshOrchestrator<SqliteDashboardSource>;

struct Tracked {
    orchestrator: Arc<Orchestrator>,
    last_used: u64,
}

#[derive(Default)]
struct Registry {
    entries: HashMap<String, Tracked>,
    clock: u64,
}

impl Registry {
    fn touch(&mut self, customer_id: &str) -> Option<Arc<Orchestrator>> {
        self.clock += 1;
        let clock = self.clock;
        self.entries.get_mut(customer_id).map(|tracked| {
            tracked.last_used = clock;
            tracked.orchestrator.clone()
        })
    }

    fn evict_least_recent(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, tracked)| tracked.last_used)
            .map(|(id, _)| id.clone());
        if let Some(id) = oldest {
            tracing::debug!("Evicting dashboard state for customer {}", id);
            self.entries.remove(&id);
        }
    }
}

/// One orchestrator per customer, so concurrent requests for the same
/// customer share a generation counter and a committed snapshot. At most
/// `capacity` customers are tracked; the least recently requested one is
/// evicted to make room. A request still holding an evicted orchestrator
/// finishes normally.
pub struct DashboardState {
    source: Arc<SqliteDashboardSource>,
    settings: RefreshSettings,
    capacity: usize,
    registry: Mutex<Registry>,
}

impl DashboardState {
    pub fn new(source: SqliteDashboardSource, settings: RefreshSettings, capacity: usize) -> Self {
        Self {
            source: Arc::new(source),
            settings,
            capacity: capacity.max(1),
            registry: Mutex::new(Registry::default()),
        }
    }

    fn normalise(customer_id: &str) -> Result<&str, DashboardError> {
        let customer_id = customer_id.trim();
        if customer_id.is_empty() {
            return Err(DashboardError::InvalidInput("Customer id cannot be empty".into()));
        }
        Ok(customer_id)
    }

    async fn orchestrator_for(&self, customer_id: &str) -> Result<Arc<Orchestrator>, DashboardError> {
        let customer_id = Self::normalise(customer_id)?;
        let mut registry = self.registry.lock().await;
        if let Some(existing) = registry.touch(customer_id) {
            return Ok(existing);
        }

        let orchestrator = Arc::new(
            RefreshOrchestrator::new(self.source.clone(), customer_id, self.settings.clone())?
                .with_observer(Arc::new(TracingObserver)),
        );
        while registry.entries.len() >= self.capacity {
            registry.evict_least_recent();
        }
        let last_used = registry.clock;
        registry.entries.insert(
            customer_id.to_string(),
            Tracked {
                orchestrator: orchestrator.clone(),
                last_used,
            },
        );
        Ok(orchestrator)
    }

    /// Looks up without registering; reading state never grows the registry.
    async fn existing(&self, customer_id: &str) -> Result<Option<Arc<Orchestrator>>, DashboardError> {
        let customer_id = Self::normalise(customer_id)?;
        Ok(self.registry.lock().await.touch(customer_id))
    }

    async fn tracked_customers(&self) -> usize {
        self.registry.lock().await.entries.len()
    }
}

pub fn dashboard_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let dashboard_state = Arc::new(DashboardState::new(
        SqliteDashboardSource::new(state.db.clone()),
        RefreshSettings::from(&state.config),
        usize::try_from(state.config.max_tracked_customers).unwrap_or(usize::MAX),
    ));

    Router::new()
        .route("/", get(get_dashboard))
        .route("/state", get(get_dashboard_state))
        .with_state(dashboard_state)
}

#[derive(Deserialize)]
pub struct DashboardQuery {
    #[serde(rename = "customerId")]
    pub customer_id: String,
    pub period: Option<String>,
}

async fn get_dashboard(
    State(state): State<Arc<DashboardState>>,
    Query(params): Query<DashboardQuery>,
) -> Result<Response, DashboardError> {
    let period = params
        .period
        .unwrap_or_else(|| PeriodSelector::default().to_string());
    tracing::info!("Dashboard requested for customer {} over {}", params.customer_id, period);

    let orchestrator = state.orchestrator_for(&params.customer_id).await?;
    match orchestrator.request_refresh(&period).await? {
        RefreshOutcome::Committed(snapshot) => {
            Ok(Json::<Arc<RefreshSnapshot>>(snapshot).into_response())
        }
        RefreshOutcome::Superseded { generation, latest } => {
            tracing::info!("Request {} superseded by {}", generation, latest);
            let body = json!({
                "error": "Superseded by a newer dashboard request",
                "generation": generation,
                "latest": latest,
            });
            Ok((StatusCode::CONFLICT, Json(body)).into_response())
        }
    }
}

#[derive(Deserialize)]
pub struct StateQuery {
    #[serde(rename = "customerId")]
    pub customer_id: String,
}

async fn get_dashboard_state(
    State(state): State<Arc<DashboardState>>,
    Query(params): Query<StateQuery>,
) -> Result<Json<DashboardView>, DashboardError> {
    let view = state
        .existing(&params.customer_id)
        .await?
        .map(|orchestrator| orchestrator.view())
        .unwrap_or_default();
    Ok(Json(view))
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::get_test_db;

    #[tokio::test]
    async fn test_orchestrator_shared_per_customer() {
        let state = DashboardState::new(
            SqliteDashboardSource::new(get_test_db().await),
            RefreshSettings::default(),
            16,
        );

        let first = state.orchestrator_for("12345").await.unwrap();
        let again = state.orchestrator_for(" 12345 ").await.unwrap();
        let other = state.orchestrator_for("67890").await.unwrap();

        assert!(Arc::ptr_eq(&first, &again));
        assert!(!Arc::ptr_eq(&first, &other));
        assert!(matches!(
            state.orchestrator_for("").await,
            Err(DashboardError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_refresh_against_sqlite() {
        let db = get_test_db().await;
        let now = chrono::Utc::now();
        sqlx::query(
            "INSERT INTO transactions (id, customer_id, occurred_at, merchant_name, category_id, amount, payment_method) VALUES ('txn_1', '12345', $1, 'Pick n Pay', 'groceries', 24580, 'Credit Card')",
        )
        .bind(now - chrono::Duration::hours(1))
        .execute(&db.pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO budget_goals (id, customer_id, category_id, monthly_budget) VALUES ('goal_001', '12345', 'groceries', 150000)",
        )
        .execute(&db.pool)
        .await
        .unwrap();

        let state = DashboardState::new(SqliteDashboardSource::new(db), RefreshSettings::default(), 16);
        let orchestrator = state.orchestrator_for("12345").await.unwrap();
        let outcome = orchestrator.request_refresh("7d").await.unwrap();

        let RefreshOutcome::Committed(snapshot) = outcome else {
            panic!("expected a committed snapshot");
        };
        assert_eq!(snapshot.summary.total_spent, 24580);
        assert_eq!(snapshot.breakdown[0].display_name, "Groceries");
        assert_eq!(snapshot.breakdown[0].percentage, 100.0);
        assert_eq!(snapshot.goals.len(), 1);
        assert_eq!(snapshot.recent.items[0].merchant_name, "Pick n Pay");
        assert_eq!(snapshot.trend.len(), 6);
        assert_eq!(snapshot.currency, "ZAR");
    }

    #[tokio::test]
    async fn test_state_lookup_does_not_register_customers() {
        let state = Arc::new(DashboardState::new(
            SqliteDashboardSource::new(get_test_db().await),
            RefreshSettings::default(),
            16,
        ));

        let Json(view) = get_dashboard_state(
            State(state.clone()),
            Query(StateQuery { customer_id: "unknown".into() }),
        )
        .await
        .unwrap();

        assert!(view.snapshot.is_none());
        assert!(!view.loading);
        assert_eq!(view.generation, 0);
        assert_eq!(state.tracked_customers().await, 0);

        let err = get_dashboard_state(State(state.clone()), Query(StateQuery { customer_id: " ".into() }))
            .await
            .unwrap_err();
        assert!(matches!(err, DashboardError::InvalidInput(_)));
        assert_eq!(state.tracked_customers().await, 0);
    }

    #[tokio::test]
    async fn test_registry_evicts_least_recently_used() {
        let state = DashboardState::new(
            SqliteDashboardSource::new(get_test_db().await),
            RefreshSettings::default(),
            2,
        );

        let first = state.orchestrator_for("c1").await.unwrap();
        state.orchestrator_for("c2").await.unwrap();
        // c1 is used again, so c2 becomes the eviction candidate.
        state.orchestrator_for("c1").await.unwrap();
        state.orchestrator_for("c3").await.unwrap();

        assert_eq!(state.tracked_customers().await, 2);
        assert!(state.existing("c2").await.unwrap().is_none());
        let kept = state.existing("c1").await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &kept));
        assert!(state.existing("c3").await.unwrap().is_some());

        for i in 0..50 {
            state.orchestrator_for(&format!("bulk_{}", i)).await.unwrap();
        }
        assert_eq!(state.tracked_customers().await, 2);
    }

    #[test]
    fn test_error_status_codes() {
        let response = DashboardError::InvalidPeriod("2w".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = DashboardError::Retrieval {
            fetch: crate::orchestrator::FetchKind::Goals,
            message: "down".into(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
