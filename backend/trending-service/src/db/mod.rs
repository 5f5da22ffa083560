// Catalog store abstraction
//
// The storage engine and its schema belong to the catalog CRUD layer; the
// trending subsystem only reads tool statistics and writes back
// `trending_score` / `last_updated`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Ranking, Tool};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryCatalogStore;
pub use postgres::PgCatalogStore;

/// Rescoring step `record_view` applies to the row after the increment
pub type Rescore = Box<dyn FnOnce(&mut Tool) + Send>;

/// Read/write access to the tool catalog
///
/// Implementations must provide per-row atomic read-modify-write. Writes from
/// the batch and incremental paths are last-write-wins; no version checks.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Every tool, in the store's natural row order
    async fn list_all(&self) -> Result<Vec<Tool>>;

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Tool>>;

    /// Persist `trending_score` and `last_updated` for every tool as one logical write
    ///
    /// Other columns (notably `views`) are never written here, so a batch
    /// cycle cannot clobber view increments that landed after it read the catalog.
    async fn save_all(&self, tools: &[Tool]) -> Result<()>;

    /// Persist `trending_score` and `last_updated` for a single tool
    async fn save(&self, tool: &Tool) -> Result<()>;

    /// Add one view, run `rescore` on the incremented row, and persist `views`,
    /// `trending_score` and `last_updated` in one atomic write
    ///
    /// Returns the stored row, or `None` without writing if the id is unknown.
    /// On error nothing is written.
    async fn record_view(&self, id: Uuid, rescore: Rescore) -> Result<Option<Tool>>;

    /// At most `limit` tools for one analytics listing
    ///
    /// Ties keep the natural row order of `list_all`.
    async fn top(&self, ranking: Ranking, limit: usize, now: DateTime<Utc>) -> Result<Vec<Tool>> {
        let tools = self.list_all().await?;
        rank_tools(tools, ranking, limit, now)
    }
}

/// Filter and order an in-memory catalog for one listing
pub fn rank_tools(
    tools: Vec<Tool>,
    ranking: Ranking,
    limit: usize,
    now: DateTime<Utc>,
) -> Result<Vec<Tool>> {
    let cutoff = ranking.cutoff(now)?;
    let mut selected: Vec<Tool> = tools
        .into_iter()
        .filter(|t| ranking.admits(t, cutoff))
        .collect();

    // sort_by is stable, which is what keeps ties in row order
    match ranking {
        Ranking::TrendingScore => {
            selected.sort_by(|a, b| b.trending_score.total_cmp(&a.trending_score))
        }
        Ranking::TopRated => selected.sort_by(|a, b| b.rating.total_cmp(&a.rating)),
        Ranking::MostViewed => selected.sort_by(|a, b| b.views.cmp(&a.views)),
        Ranking::Recent { .. } => selected.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        Ranking::Featured | Ranking::Hot => {}
    }

    selected.truncate(limit);
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn tool(name: &str, score: f64, views: i64) -> Tool {
        Tool {
            trending_score: score,
            views,
            ..Tool::new(name)
        }
    }

    #[test]
    fn test_rank_tools_ties_keep_row_order() {
        let tools = vec![tool("a", 10.0, 1), tool("b", 50.0, 1), tool("c", 10.0, 1)];
        let ranked = rank_tools(tools, Ranking::TrendingScore, 10, Utc::now()).unwrap();
        let names: Vec<&str> = ranked.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_rank_tools_respects_limit() {
        let tools: Vec<Tool> = (0..25).map(|i| tool("t", 0.0, i)).collect();
        let ranked = rank_tools(tools, Ranking::MostViewed, 10, Utc::now()).unwrap();
        assert_eq!(ranked.len(), 10);
        assert_eq!(ranked[0].views, 24);
        assert_eq!(ranked[9].views, 15);
    }

    #[test]
    fn test_rank_tools_recent_filters_and_orders() {
        let now = Utc::now();
        let mut old = tool("old", 0.0, 0);
        old.created_at = now - Duration::days(45);
        let mut newer = tool("newer", 0.0, 0);
        newer.created_at = now - Duration::days(1);
        let mut older = tool("older", 0.0, 0);
        older.created_at = now - Duration::days(10);

        let ranked =
            rank_tools(vec![old, older, newer], Ranking::Recent { days: 30 }, 10, now).unwrap();
        let names: Vec<&str> = ranked.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["newer", "older"]);
    }
}
