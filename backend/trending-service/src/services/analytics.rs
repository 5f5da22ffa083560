/// Analytics Aggregator
///
/// Read-only top-N listings over the ranked catalog, optionally preceded by
/// a synchronous batch refresh.
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::CatalogStore;
use crate::error::Result;
use crate::metrics::RefreshTrigger;
use crate::models::{AnalyticsBundle, Ranking};
use crate::services::refresh::BatchRefresher;

pub const DEFAULT_LIMIT: usize = 10;
pub const DEFAULT_RECENT_DAYS: i64 = 30;

pub struct AnalyticsAggregator {
    store: Arc<dyn CatalogStore>,
    refresher: Arc<BatchRefresher>,
    limit: usize,
    recent_days: i64,
}

impl AnalyticsAggregator {
    pub fn new(store: Arc<dyn CatalogStore>, refresher: Arc<BatchRefresher>) -> Self {
        Self {
            store,
            refresher,
            limit: DEFAULT_LIMIT,
            recent_days: DEFAULT_RECENT_DAYS,
        }
    }

    pub fn with_limits(mut self, limit: usize, recent_days: i64) -> Self {
        self.limit = limit;
        self.recent_days = recent_days;
        self
    }

    /// Build all six listings
    ///
    /// A failed recalculation does not abort the listings: the error is
    /// attached to the bundle and the queries run against current data.
    /// Query failures do propagate.
    pub async fn get_analytics(&self, recalculate: bool) -> Result<AnalyticsBundle> {
        let (refresh, refresh_error) = if recalculate {
            match self.refresher.run_cycle(RefreshTrigger::Analytics).await {
                Ok(summary) => (Some(summary), None),
                Err(e) => {
                    warn!(error = %e, "Recalculation before analytics failed, serving current scores");
                    (None, Some(e.to_string()))
                }
            }
        } else {
            (None, None)
        };

        let now = Utc::now();
        let limit = self.limit;

        let (top_trending, top_rated, most_viewed, recent, featured, hot) = tokio::try_join!(
            self.store.top(Ranking::TrendingScore, limit, now),
            self.store.top(Ranking::TopRated, limit, now),
            self.store.top(Ranking::MostViewed, limit, now),
            self.store.top(Ranking::Recent { days: self.recent_days }, limit, now),
            self.store.top(Ranking::Featured, limit, now),
            self.store.top(Ranking::Hot, limit, now),
        )?;

        info!(
            recalculated = refresh.is_some(),
            top_trending = top_trending.len(),
            featured = featured.len(),
            hot = hot.len(),
            "Analytics listings built"
        );

        Ok(AnalyticsBundle {
            generated_at: now,
            refresh,
            refresh_error,
            top_trending,
            top_rated,
            most_viewed,
            recent,
            featured,
            hot,
        })
    }
}
