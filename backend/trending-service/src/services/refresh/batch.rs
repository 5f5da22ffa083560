/// Batch Refresher
///
/// Recomputes every tool's trending score against one set of catalog-wide
/// averages and persists the result as a single batch write.
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

use crate::db::CatalogStore;
use crate::error::Result;
use crate::metrics::{self, RefreshTrigger};
use crate::models::{CatalogAverages, CycleSummary, ScoreDelta};
use crate::services::scoring::TrendingScorer;

pub struct BatchRefresher {
    store: Arc<dyn CatalogStore>,
    scorer: TrendingScorer,
}

impl BatchRefresher {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self {
            store,
            scorer: TrendingScorer::new(),
        }
    }

    /// One full-catalog cycle
    ///
    /// All tools in a cycle share the same `last_updated` (the cycle start).
    /// An empty catalog is reported through `CycleSummary::empty_catalog`,
    /// not as an error. A failed `save_all` fails the whole cycle; whether a
    /// prefix of rows stays written depends on the store's batch atomicity.
    pub async fn refresh_all(&self) -> Result<CycleSummary> {
        let start = Instant::now();
        let started_at = Utc::now();

        let mut tools = self.store.list_all().await?;

        if tools.is_empty() {
            info!("No tools in catalog, skipping trending refresh");
            return Ok(CycleSummary::empty(started_at));
        }

        let averages = CatalogAverages::from_tools(&tools);
        let mut deltas = Vec::with_capacity(tools.len());

        for tool in tools.iter_mut() {
            let old_score = tool.trending_score;
            let new_score = self.scorer.score_at(tool, &averages, started_at);

            tool.trending_score = new_score;
            tool.last_updated = Some(started_at);

            debug!(
                tool_id = %tool.id,
                name = %tool.name,
                old_score = old_score,
                new_score = new_score,
                "Recomputed trending score"
            );

            deltas.push(ScoreDelta {
                tool_id: tool.id,
                name: tool.name.clone(),
                old_score,
                new_score,
            });
        }

        self.store.save_all(&tools).await?;

        let summary = CycleSummary {
            started_at,
            total_tools: tools.len(),
            updated_tools: tools.len(),
            empty_catalog: false,
            averages,
            deltas,
            elapsed_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            total_tools = summary.total_tools,
            updated_tools = summary.updated_tools,
            changed = summary.changed(),
            avg_views = averages.avg_views,
            avg_rating = averages.avg_rating,
            avg_reviews = averages.avg_reviews,
            elapsed_ms = summary.elapsed_ms,
            "Trending refresh completed"
        );

        Ok(summary)
    }

    /// `refresh_all` plus metrics, labelled by what started it
    pub async fn run_cycle(&self, trigger: RefreshTrigger) -> Result<CycleSummary> {
        let start = Instant::now();
        let result = self.refresh_all().await;
        metrics::record_refresh_duration(start.elapsed());

        match &result {
            Ok(summary) if summary.empty_catalog => {
                metrics::record_refresh_run(trigger, "empty");
                metrics::set_tools_updated(0);
            }
            Ok(summary) => {
                metrics::record_refresh_run(trigger, "success");
                metrics::set_tools_updated(summary.updated_tools);
            }
            Err(e) => {
                metrics::record_refresh_run(trigger, "error");
                error!(
                    trigger = trigger.as_str(),
                    error = %e,
                    "Trending refresh failed"
                );
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{InMemoryCatalogStore, MockCatalogStore};
    use crate::error::AppError;
    use crate::models::Tool;
    use chrono::Duration;

    fn catalog() -> Vec<Tool> {
        let now = Utc::now();
        vec![
            Tool {
                views: 200,
                rating: 4.5,
                total_reviews: 50,
                created_at: now - Duration::days(10),
                is_hot: true,
                ..Tool::new("formatter")
            },
            Tool {
                views: 0,
                created_at: now - Duration::days(120),
                ..Tool::new("legacy")
            },
        ]
    }

    #[tokio::test]
    async fn test_empty_catalog_is_not_an_error() {
        let refresher = BatchRefresher::new(Arc::new(InMemoryCatalogStore::new()));
        let summary = refresher.refresh_all().await.unwrap();

        assert!(summary.empty_catalog);
        assert_eq!(summary.updated_tools, 0);
        assert_eq!(summary.total_tools, 0);
        assert!(summary.deltas.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_updates_every_tool_with_shared_timestamp() {
        let store = Arc::new(InMemoryCatalogStore::with_tools(catalog()));
        let refresher = BatchRefresher::new(store.clone());

        let summary = refresher.refresh_all().await.unwrap();
        assert_eq!(summary.total_tools, 2);
        assert_eq!(summary.updated_tools, 2);
        assert!(!summary.empty_catalog);
        assert!((summary.averages.avg_views - 100.0).abs() < 1e-9);
        assert!((summary.averages.avg_rating - 4.5).abs() < 1e-9);

        let tools = store.list_all().await.unwrap();
        for tool in &tools {
            assert_eq!(tool.last_updated, Some(summary.started_at));
            assert!((0.0..=100.0).contains(&tool.trending_score));
        }
        assert!(tools[0].trending_score > tools[1].trending_score);
    }

    #[tokio::test]
    async fn test_refresh_is_idempotent() {
        let store = Arc::new(InMemoryCatalogStore::with_tools(catalog()));
        let refresher = BatchRefresher::new(store.clone());

        refresher.refresh_all().await.unwrap();
        let first = store.list_all().await.unwrap();
        let second_summary = refresher.refresh_all().await.unwrap();
        let second = store.list_all().await.unwrap();

        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.trending_score, b.trending_score);
        }
        assert_eq!(second_summary.changed(), 0);
    }

    #[tokio::test]
    async fn test_save_failure_fails_cycle_without_partial_writes() {
        let store = Arc::new(InMemoryCatalogStore::with_tools(catalog()));
        store.set_fail_writes(true);
        let refresher = BatchRefresher::new(store.clone());

        let err = refresher.refresh_all().await.unwrap_err();
        assert!(matches!(err, AppError::Persistence(_)));

        for tool in store.list_all().await.unwrap() {
            assert_eq!(tool.trending_score, 0.0);
            assert!(tool.last_updated.is_none());
        }
    }

    #[tokio::test]
    async fn test_read_failure_propagates_from_run_cycle() {
        let mut mock = MockCatalogStore::new();
        mock.expect_list_all()
            .times(1)
            .returning(|| Err(AppError::StoreUnavailable("connection refused".into())));
        mock.expect_save_all().never();

        let refresher = BatchRefresher::new(Arc::new(mock));
        let err = refresher.run_cycle(RefreshTrigger::Manual).await.unwrap_err();
        assert!(matches!(err, AppError::StoreUnavailable(_)));
    }
}
