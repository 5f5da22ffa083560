use anyhow::{anyhow, Result};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

/// Upper bound for the "recent" analytics window (100 years)
pub const MAX_RECENT_WINDOW_DAYS: i64 = 36_500;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Scheduler
    pub refresh_interval_seconds: u64,
    pub failure_backoff_seconds: u64,

    // Analytics
    pub analytics_limit: usize,
    pub recent_window_days: i64,

    // PostgreSQL (catalog store)
    #[serde(default)]
    pub database_url: String,
    pub database_max_connections: u32,

    // Observability: fallback tracing filter when RUST_LOG is unset
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_interval_seconds: 300,
            failure_backoff_seconds: 60,
            analytics_limit: 10,
            recent_window_days: 30,
            database_url: String::new(),
            database_max_connections: 10,
            log_level: "info,trending_service=debug".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> crate::error::Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .set_default("refresh_interval_seconds", 300)? // 5 minutes
            .set_default("failure_backoff_seconds", 60)?
            .set_default("analytics_limit", 10)?
            .set_default("recent_window_days", 30)?
            .set_default("database_max_connections", 10)?
            .set_default("log_level", "info,trending_service=debug")?
            .add_source(config::Environment::default().separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.refresh_interval_seconds == 0 {
            return Err(anyhow!("Refresh interval must be greater than 0"));
        }

        if self.failure_backoff_seconds == 0 {
            return Err(anyhow!("Failure backoff must be greater than 0"));
        }

        if self.analytics_limit == 0 {
            return Err(anyhow!("Analytics limit must be greater than 0"));
        }

        if self.recent_window_days <= 0 {
            return Err(anyhow!("Recent window must be at least one day"));
        }

        if self.recent_window_days > MAX_RECENT_WINDOW_DAYS {
            return Err(anyhow!(
                "Recent window must be at most {} days",
                MAX_RECENT_WINDOW_DAYS
            ));
        }

        EnvFilter::try_new(&self.log_level)
            .map_err(|e| anyhow!("Invalid log level '{}': {}", self.log_level, e))?;

        Ok(())
    }

    /// Checks that apply only when the Postgres store is in use
    pub fn validate_database(&self) -> Result<()> {
        if self.database_url.is_empty() {
            return Err(anyhow!("Database URL is required"));
        }

        if self.database_max_connections == 0 {
            return Err(anyhow!("Database max connections must be greater than 0"));
        }

        Ok(())
    }
}
