//! Service layer for trending-service
//!
//! - scoring: pure trending score calculator
//! - refresh: batch and incremental recompute paths
//! - analytics: top-N listings over the ranked catalog
//! - trending: facade exposing the operations the API layer calls

pub mod analytics;
pub mod refresh;
pub mod scoring;
pub mod trending;

pub use analytics::AnalyticsAggregator;
pub use refresh::{BatchRefresher, IncrementalRefresher};
pub use scoring::{ScoreBreakdown, TrendingScorer};
pub use trending::TrendingService;
