//! Period-scoped spending dashboard: pure aggregation over a customer's
//! transactions, plus the refresh orchestration that keeps the visible
//! snapshot consistent while the period selection changes.

pub mod aggregation;
pub mod handler;
pub mod models;
pub mod orchestrator;
pub mod period;
pub mod source;

pub use models::{DashboardView, RefreshSnapshot};
pub use orchestrator::{
    DashboardError, DashboardObserver, RefreshOrchestrator, RefreshOutcome, RefreshSettings,
};
pub use period::{Period, PeriodSelector};
pub use source::{DashboardSource, SourceError, SqliteDashboardSource};
