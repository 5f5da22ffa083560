/// Incremental Refresher
///
/// Applies one view event and recomputes that tool's score synchronously.
/// Catalog averages come from a fresh full scan on every call, so they can
/// differ from the ones a concurrently running batch cycle uses.
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::{CatalogStore, Rescore};
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{CatalogAverages, Tool};
use crate::services::scoring::TrendingScorer;

pub struct IncrementalRefresher {
    store: Arc<dyn CatalogStore>,
    scorer: TrendingScorer,
}

impl IncrementalRefresher {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self {
            store,
            scorer: TrendingScorer::new(),
        }
    }

    /// Count one view of `tool_id` and return the re-scored tool
    ///
    /// The view count, score and `last_updated` land in a single store write.
    /// Unknown ids return `AppError::NotFound`, and any error leaves the
    /// stored row untouched, so a retry counts the view once.
    pub async fn on_view(&self, tool_id: Uuid) -> Result<Tool> {
        let catalog = self.store.list_all().await?;
        let old_score = catalog
            .iter()
            .find(|t| t.id == tool_id)
            .map(|t| t.trending_score);

        let Some(averages) = averages_with_view(catalog, tool_id) else {
            warn!(tool_id = %tool_id, "View recorded for unknown tool");
            return Err(AppError::NotFound(tool_id.to_string()));
        };

        let now = Utc::now();
        let scorer = self.scorer;
        let rescore: Rescore = Box::new(move |tool: &mut Tool| {
            tool.trending_score = scorer.score_at(tool, &averages, now);
            tool.last_updated = Some(now);
        });

        let Some(tool) = self.store.record_view(tool_id, rescore).await? else {
            warn!(tool_id = %tool_id, "Tool removed before its view was recorded");
            return Err(AppError::NotFound(tool_id.to_string()));
        };
        metrics::record_view();

        debug!(
            tool_id = %tool.id,
            views = tool.views,
            old_score = ?old_score,
            new_score = tool.trending_score,
            avg_views = averages.avg_views,
            "Incremental trending update"
        );

        Ok(tool)
    }
}

/// Full-scan averages as they stand once `tool_id` has one more view
fn averages_with_view(mut catalog: Vec<Tool>, tool_id: Uuid) -> Option<CatalogAverages> {
    catalog.iter_mut().find(|t| t.id == tool_id)?.views += 1;
    Some(CatalogAverages::from_tools(&catalog))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{InMemoryCatalogStore, MockCatalogStore};

    #[tokio::test]
    async fn test_on_view_increments_and_rescores() {
        let tool = Tool {
            views: 9,
            rating: 4.0,
            total_reviews: 3,
            ..Tool::new("linter")
        };
        let other = Tool {
            views: 11,
            rating: 2.0,
            total_reviews: 1,
            ..Tool::new("other")
        };
        let id = tool.id;
        let store = Arc::new(InMemoryCatalogStore::with_tools(vec![tool, other]));
        let refresher = IncrementalRefresher::new(store.clone());

        let updated = refresher.on_view(id).await.unwrap();

        assert_eq!(updated.views, 10);
        let scored_at = updated.last_updated.expect("last_updated set");

        // Averages of a full scan that already includes this view
        let catalog = store.list_all().await.unwrap();
        let averages = CatalogAverages::from_tools(&catalog);
        assert!((averages.avg_views - 10.5).abs() < 1e-9);
        let expected = TrendingScorer::new().score_at(&updated, &averages, scored_at);
        assert!(
            (updated.trending_score - expected).abs() < 1e-9,
            "score {} != {}",
            updated.trending_score,
            expected
        );

        let stored = store.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored, updated);
    }

    #[tokio::test]
    async fn test_on_view_unknown_tool_writes_nothing() {
        let store = Arc::new(InMemoryCatalogStore::with_tools(vec![Tool::new("a")]));
        let before = store.list_all().await.unwrap();
        let refresher = IncrementalRefresher::new(store.clone());

        let err = refresher.on_view(Uuid::new_v4()).await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(store.list_all().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_on_view_read_failure_leaves_row_untouched() {
        let tool = Tool {
            views: 4,
            ..Tool::new("a")
        };
        let id = tool.id;
        let store = Arc::new(InMemoryCatalogStore::with_tools(vec![tool.clone()]));
        let refresher = IncrementalRefresher::new(store.clone());

        store.set_fail_reads(true);
        let err = refresher.on_view(id).await.unwrap_err();
        assert!(matches!(err, AppError::StoreUnavailable(_)));
        store.set_fail_reads(false);

        let stored = store.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored, tool);

        // Retrying after the failure counts the view exactly once
        let updated = refresher.on_view(id).await.unwrap();
        assert_eq!(updated.views, 5);
    }

    #[tokio::test]
    async fn test_on_view_write_failure_leaves_row_untouched() {
        let tool = Tool::new("a");
        let id = tool.id;
        let store = Arc::new(InMemoryCatalogStore::with_tools(vec![tool.clone()]));
        store.set_fail_writes(true);

        let err = IncrementalRefresher::new(store.clone())
            .on_view(id)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Persistence(_)));
        assert_eq!(store.get_by_id(id).await.unwrap().unwrap(), tool);
    }

    #[tokio::test]
    async fn test_on_view_failed_scan_never_writes() {
        let mut mock = MockCatalogStore::new();
        mock.expect_list_all()
            .returning(|| Err(AppError::StoreUnavailable("connection reset".into())));
        mock.expect_record_view().never();

        let refresher = IncrementalRefresher::new(Arc::new(mock));
        let err = refresher.on_view(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn test_on_view_tool_deleted_mid_call_is_not_found() {
        let tool = Tool::new("a");
        let id = tool.id;

        let mut mock = MockCatalogStore::new();
        mock.expect_list_all()
            .returning(move || Ok(vec![tool.clone()]));
        mock.expect_record_view().returning(|_, _| Ok(None));

        let err = IncrementalRefresher::new(Arc::new(mock))
            .on_view(id)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
