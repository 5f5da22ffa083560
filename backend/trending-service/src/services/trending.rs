/// Trending Service
///
/// Entry point for the API layer: scheduler lifecycle, manual refresh,
/// view events and analytics listings over one shared catalog store.
use std::sync::Arc;
use uuid::Uuid;

use crate::config::Config;
use crate::db::CatalogStore;
use crate::error::Result;
use crate::jobs::{SchedulerConfig, SchedulerStatus, TrendingScheduler};
use crate::models::{AnalyticsBundle, CycleSummary, Tool};
use crate::services::analytics::AnalyticsAggregator;
use crate::services::refresh::{BatchRefresher, IncrementalRefresher};

pub struct TrendingService {
    incremental: IncrementalRefresher,
    analytics: AnalyticsAggregator,
    scheduler: TrendingScheduler,
}

impl TrendingService {
    pub fn new(store: Arc<dyn CatalogStore>, config: &Config) -> Self {
        let refresher = Arc::new(BatchRefresher::new(store.clone()));

        Self {
            incremental: IncrementalRefresher::new(store.clone()),
            analytics: AnalyticsAggregator::new(store, refresher.clone())
                .with_limits(config.analytics_limit, config.recent_window_days),
            scheduler: TrendingScheduler::new(refresher, SchedulerConfig::from(config)),
        }
    }

    /// Returns `false` if already running
    pub async fn start_scheduler(&self) -> bool {
        self.scheduler.start().await
    }

    /// Blocks until the background refresh task has exited
    pub async fn stop_scheduler(&self) -> bool {
        self.scheduler.stop().await
    }

    pub async fn scheduler_status(&self) -> SchedulerStatus {
        self.scheduler.status().await
    }

    pub async fn trigger_refresh_now(&self) -> Result<CycleSummary> {
        self.scheduler.trigger_now().await
    }

    /// `AppError::NotFound` for unknown ids
    pub async fn on_view(&self, tool_id: Uuid) -> Result<Tool> {
        self.incremental.on_view(tool_id).await
    }

    pub async fn get_analytics(&self, recalculate: bool) -> Result<AnalyticsBundle> {
        self.analytics.get_analytics(recalculate).await
    }
}
