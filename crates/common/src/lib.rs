use clap::Parser;
use database::Database;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:dashboard.db")]
    pub database_url: String,

    #[arg(long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Number of calendar months in the spending trend, current month included.
    #[arg(
        long,
        env = "TREND_MONTHS",
        default_value = "6",
        value_parser = clap::value_parser!(u32).range(1..=120)
    )]
    pub trend_months: u32,

    /// How many of the newest transactions each snapshot carries.
    #[arg(long, env = "RECENT_LIMIT", default_value = "5")]
    pub recent_limit: usize,

    /// Upper bound on each repository fetch during a refresh.
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value = "10")]
    pub fetch_timeout_secs: u64,

    /// Currency the stored cent amounts are denominated in.
    #[arg(long, env = "CURRENCY", default_value = "ZAR")]
    pub currency: String,

    /// Most customers whose dashboard state is kept in memory at once.
    #[arg(
        long,
        env = "MAX_TRACKED_CUSTOMERS",
        default_value = "1024",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub max_tracked_customers: u64,
}
