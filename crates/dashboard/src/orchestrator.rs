use crate::aggregation::{
    compute_category_breakdown, compute_goal_progress, compute_summary, compute_trend,
    recent_transactions,
};
use crate::models::{DashboardView, RefreshSnapshot};
use crate::period::{Period, PeriodSelector};
use crate::source::{DashboardSource, SourceError};
use categories::models::{BudgetGoal, Category};
use chrono::{DateTime, Utc};
use common::Config;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::instrument;
use transactions::models::Transaction;

/// The independent repository reads one refresh fans out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    Transactions,
    PreviousTransactions,
    TrendTransactions,
    Categories,
    Goals,
}

impl fmt::Display for FetchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FetchKind::Transactions => "transactions",
            FetchKind::PreviousTransactions => "previous period transactions",
            FetchKind::TrendTransactions => "trend transactions",
            FetchKind::Categories => "categories",
            FetchKind::Goals => "goals",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("Invalid period: {0}")]
    InvalidPeriod(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Retrieval of {fetch} failed: {message}")]
    Retrieval { fetch: FetchKind, message: String },
}

#[derive(Debug, Clone)]
pub struct RefreshSettings {
    pub trend_months: u32,
    pub recent_limit: usize,
    pub fetch_timeout: Duration,
    pub currency: String,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            trend_months: 6,
            recent_limit: 5,
            fetch_timeout: Duration::from_secs(10),
            currency: "ZAR".to_string(),
        }
    }
}

impl From<&Config> for RefreshSettings {
    fn from(config: &Config) -> Self {
        Self {
            trend_months: config.trend_months,
            recent_limit: config.recent_limit,
            fetch_timeout: Duration::from_secs(config.fetch_timeout_secs),
            currency: config.currency.clone(),
        }
    }
}

/// Receives the signals a presentation layer renders from.
pub trait DashboardObserver: Send + Sync {
    fn on_snapshot(&self, snapshot: Arc<RefreshSnapshot>);

    fn on_loading_change(&self, loading: bool);

    fn on_refresh_failed(&self, _error: &DashboardError) {}
}

/// Logs every signal; used where no UI is attached.
pub struct TracingObserver;

impl DashboardObserver for TracingObserver {
    fn on_snapshot(&self, snapshot: Arc<RefreshSnapshot>) {
        tracing::info!(
            generation = snapshot.generation,
            period = %snapshot.selector,
            total_spent = snapshot.summary.total_spent,
            "Dashboard snapshot committed"
        );
    }

    fn on_loading_change(&self, loading: bool) {
        tracing::debug!(loading, "Dashboard loading changed");
    }

    fn on_refresh_failed(&self, error: &DashboardError) {
        tracing::warn!("Dashboard refresh failed, keeping previous snapshot: {}", error);
    }
}

#[derive(Debug)]
pub enum RefreshOutcome {
    Committed(Arc<RefreshSnapshot>),
    /// A newer request was issued while this one was in flight; its result
    /// was dropped.
    Superseded { generation: u64, latest: u64 },
}

struct RefreshInputs {
    current: Vec<Transaction>,
    previous: Vec<Transaction>,
    trend_window: Vec<Transaction>,
    categories: Vec<Category>,
    goals: Vec<BudgetGoal>,
}

#[derive(Default)]
struct ViewState {
    generation: u64,
    snapshot: Option<Arc<RefreshSnapshot>>,
    loading: bool,
    last_error: Option<String>,
}

fn lock_state(state: &Mutex<ViewState>) -> MutexGuard<'_, ViewState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Held for the lifetime of one refresh. If the refresh is dropped before it
/// commits (the caller went away mid-fetch) and no newer request has started,
/// the loading flag is lowered here instead.
struct InFlight<'a> {
    state: &'a Mutex<ViewState>,
    observer: Option<&'a Arc<dyn DashboardObserver>>,
    generation: u64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = lock_state(self.state);
        if state.generation == self.generation && state.loading {
            tracing::debug!(generation = self.generation, "Refresh abandoned before commit");
            state.loading = false;
            if let Some(observer) = self.observer {
                observer.on_loading_change(false);
            }
        }
    }
}

/// Turns period selections for one customer into committed snapshots.
///
/// Every request takes the next generation number. Its results are only
/// committed if that number is still the latest when they arrive, so a slow
/// request can never overwrite the snapshot of a newer one. The snapshot is
/// swapped in whole or not at all.
pub struct RefreshOrchestrator<S> {
    source: Arc<S>,
    customer_id: String,
    settings: RefreshSettings,
    observer: Option<Arc<dyn DashboardObserver>>,
    state: Mutex<ViewState>,
}

impl<S: DashboardSource> RefreshOrchestrator<S> {
    pub fn new(
        source: Arc<S>,
        customer_id: &str,
        settings: RefreshSettings,
    ) -> Result<Self, DashboardError> {
        let customer_id = customer_id.trim();
        if customer_id.is_empty() {
            return Err(DashboardError::InvalidInput("Customer id cannot be empty".into()));
        }

        Ok(Self {
            source,
            customer_id: customer_id.to_string(),
            settings,
            observer: None,
            state: Mutex::new(ViewState::default()),
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn DashboardObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    pub fn view(&self) -> DashboardView {
        let state = lock_state(&self.state);
        DashboardView {
            snapshot: state.snapshot.clone(),
            loading: state.loading,
            last_error: state.last_error.clone(),
            generation: state.generation,
        }
    }

    pub fn snapshot(&self) -> Option<Arc<RefreshSnapshot>> {
        lock_state(&self.state).snapshot.clone()
    }

    /// Parses `period` and refreshes relative to the current time. An
    /// unsupported selector is rejected before anything is fetched.
    #[instrument(skip(self), fields(customer_id = %self.customer_id))]
    pub async fn request_refresh(&self, period: &str) -> Result<RefreshOutcome, DashboardError> {
        let selector = period
            .parse::<PeriodSelector>()
            .map_err(DashboardError::InvalidPeriod)?;
        self.refresh_at(selector, Utc::now()).await
    }

    pub async fn refresh_at(
        &self,
        selector: PeriodSelector,
        now: DateTime<Utc>,
    ) -> Result<RefreshOutcome, DashboardError> {
        let in_flight = self.begin();
        let generation = in_flight.generation;
        let period = Period::resolve(selector, now);
        let trend_window = Period::trailing_months(self.settings.trend_months, now);
        tracing::info!(generation, %selector, "Refreshing dashboard");

        let result = self
            .fetch_all(&period, &trend_window)
            .await
            .map(|inputs| self.build_snapshot(generation, selector, period, now, inputs));

        let outcome = self.commit(generation, result);
        drop(in_flight);
        outcome
    }

    /// Publishes `result` if `generation` is still the latest request.
    fn commit(
        &self,
        generation: u64,
        result: Result<RefreshSnapshot, DashboardError>,
    ) -> Result<RefreshOutcome, DashboardError> {
        let mut state = lock_state(&self.state);
        if state.generation != generation {
            tracing::debug!(generation, latest = state.generation, "Dropping superseded refresh");
            return Ok(RefreshOutcome::Superseded {
                generation,
                latest: state.generation,
            });
        }

        state.loading = false;
        match result {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                state.snapshot = Some(snapshot.clone());
                state.last_error = None;
                if let Some(observer) = &self.observer {
                    observer.on_snapshot(snapshot.clone());
                    observer.on_loading_change(false);
                }
                Ok(RefreshOutcome::Committed(snapshot))
            }
            Err(err) => {
                tracing::error!(generation, "Dashboard refresh failed: {}", err);
                state.last_error = Some(err.to_string());
                if let Some(observer) = &self.observer {
                    observer.on_loading_change(false);
                    observer.on_refresh_failed(&err);
                }
                Err(err)
            }
        }
    }

    /// Claims the next generation and raises the loading flag. The visible
    /// snapshot is left untouched.
    fn begin(&self) -> InFlight<'_> {
        let mut state = lock_state(&self.state);
        state.generation += 1;
        if !state.loading {
            state.loading = true;
            if let Some(observer) = &self.observer {
                observer.on_loading_change(true);
            }
        }
        InFlight {
            state: &self.state,
            observer: self.observer.as_ref(),
            generation: state.generation,
        }
    }

    async fn fetch_all(
        &self,
        period: &Period,
        trend_window: &Period,
    ) -> Result<RefreshInputs, DashboardError> {
        let customer_id = self.customer_id.as_str();
        let (current, previous, trend_window, categories, goals) = tokio::try_join!(
            self.bounded(
                FetchKind::Transactions,
                self.source.fetch_transactions(customer_id, period),
            ),
            self.bounded(
                FetchKind::PreviousTransactions,
                self.source.fetch_previous_period_transactions(customer_id, period),
            ),
            self.bounded(
                FetchKind::TrendTransactions,
                self.source.fetch_transactions(customer_id, trend_window),
            ),
            self.bounded(FetchKind::Categories, self.source.fetch_categories()),
            self.bounded(FetchKind::Goals, self.source.fetch_goals(customer_id)),
        )?;

        Ok(RefreshInputs {
            current,
            previous,
            trend_window,
            categories,
            goals,
        })
    }

    async fn bounded<T>(
        &self,
        fetch: FetchKind,
        future: impl Future<Output = Result<T, SourceError>>,
    ) -> Result<T, DashboardError> {
        match tokio::time::timeout(self.settings.fetch_timeout, future).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(DashboardError::Retrieval {
                fetch,
                message: err.to_string(),
            }),
            Err(_) => Err(DashboardError::Retrieval {
                fetch,
                message: format!("timed out after {:?}", self.settings.fetch_timeout),
            }),
        }
    }

    fn build_snapshot(
        &self,
        generation: u64,
        selector: PeriodSelector,
        period: Period,
        now: DateTime<Utc>,
        inputs: RefreshInputs,
    ) -> RefreshSnapshot {
        let today = now.date_naive();
        RefreshSnapshot {
            generation,
            selector,
            period,
            generated_at: now,
            currency: self.settings.currency.clone(),
            summary: compute_summary(&inputs.current, &inputs.previous),
            breakdown: compute_category_breakdown(&inputs.current, &inputs.categories),
            trend: compute_trend(&inputs.trend_window, self.settings.trend_months, today),
            goals: compute_goal_progress(&inputs.trend_window, &inputs.goals, today),
            recent: recent_transactions(&inputs.current, self.settings.recent_limit),
        }
    }
}
