pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod metrics;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};

// Re-export common types
pub use db::{CatalogStore, InMemoryCatalogStore, PgCatalogStore, Rescore};
pub use jobs::{SchedulerConfig, SchedulerStatus, TrendingScheduler};
pub use models::{AnalyticsBundle, CatalogAverages, CycleSummary, Ranking, ScoreDelta, Tool};
pub use services::{
    AnalyticsAggregator, BatchRefresher, IncrementalRefresher, ScoreBreakdown, TrendingScorer,
    TrendingService,
};
