use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

use super::{CatalogStore, Rescore};
use crate::error::{AppError, Result};
use crate::models::{naive_to_utc, Ranking, Tool};

const TOOL_COLUMNS: &str = r#"
    id, name, views, rating, total_reviews, created_at,
    is_hot, is_featured, trending_score, last_updated
"#;

/// Row as stored by the catalog layer (`TIMESTAMP WITHOUT TIME ZONE` columns)
#[derive(Debug, sqlx::FromRow)]
struct ToolRow {
    id: Uuid,
    name: String,
    views: i64,
    rating: f64,
    total_reviews: i64,
    created_at: NaiveDateTime,
    is_hot: bool,
    is_featured: bool,
    trending_score: f64,
    last_updated: Option<NaiveDateTime>,
}

impl From<ToolRow> for Tool {
    fn from(row: ToolRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            views: row.views,
            rating: row.rating,
            total_reviews: row.total_reviews,
            created_at: naive_to_utc(row.created_at),
            is_hot: row.is_hot,
            is_featured: row.is_featured,
            trending_score: row.trending_score,
            last_updated: row.last_updated.map(naive_to_utc),
        }
    }
}

/// Postgres-backed catalog (`tools` table)
#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| {
                error!("Failed to connect to catalog database: {}", e);
                AppError::StoreUnavailable(e.to_string())
            })?;

        Ok(Self::new(pool))
    }
}

/// WHERE / ORDER BY fragments for one analytics listing
fn ranking_clauses(ranking: Ranking) -> (&'static str, &'static str) {
    match ranking {
        Ranking::TrendingScore => ("TRUE", "ORDER BY trending_score DESC"),
        Ranking::TopRated => ("total_reviews > 0", "ORDER BY rating DESC"),
        Ranking::MostViewed => ("TRUE", "ORDER BY views DESC"),
        Ranking::Recent { .. } => ("created_at >= $2", "ORDER BY created_at DESC"),
        Ranking::Featured => ("is_featured", ""),
        Ranking::Hot => ("is_hot", ""),
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn list_all(&self) -> Result<Vec<Tool>> {
        let sql = format!("SELECT {TOOL_COLUMNS} FROM tools");

        let rows = sqlx::query_as::<_, ToolRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to list tools: {}", e);
                AppError::from(e)
            })?;

        Ok(rows.into_iter().map(Tool::from).collect())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Tool>> {
        let sql = format!("SELECT {TOOL_COLUMNS} FROM tools WHERE id = $1");

        let row = sqlx::query_as::<_, ToolRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to fetch tool {}: {}", id, e);
                AppError::from(e)
            })?;

        Ok(row.map(Tool::from))
    }

    async fn save_all(&self, tools: &[Tool]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for tool in tools {
            sqlx::query(
                r#"
                UPDATE tools
                SET trending_score = $1, last_updated = $2
                WHERE id = $3
                "#,
            )
            .bind(tool.trending_score)
            .bind(tool.last_updated.map(|ts| ts.naive_utc()))
            .bind(tool.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("Failed to update trending score for {}: {}", tool.id, e);
                AppError::Persistence(e.to_string())
            })?;
        }

        // Dropping an uncommitted transaction rolls it back
        tx.commit().await.map_err(|e| {
            error!("Failed to commit trending batch: {}", e);
            AppError::Persistence(e.to_string())
        })?;

        Ok(())
    }

    async fn save(&self, tool: &Tool) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE tools
            SET trending_score = $1, last_updated = $2
            WHERE id = $3
            "#,
        )
        .bind(tool.trending_score)
        .bind(tool.last_updated.map(|ts| ts.naive_utc()))
        .bind(tool.id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to save trending score for {}: {}", tool.id, e);
            AppError::Persistence(e.to_string())
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(tool.id.to_string()));
        }

        Ok(())
    }

    async fn record_view(&self, id: Uuid, rescore: Rescore) -> Result<Option<Tool>> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent views of the same tool
        let sql = format!("SELECT {TOOL_COLUMNS} FROM tools WHERE id = $1 FOR UPDATE");
        let row = sqlx::query_as::<_, ToolRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| {
                error!("Failed to lock tool {} for view: {}", id, e);
                AppError::from(e)
            })?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut tool = Tool::from(row);
        tool.views += 1;
        rescore(&mut tool);

        sqlx::query(
            r#"
            UPDATE tools
            SET views = views + 1, trending_score = $1, last_updated = $2
            WHERE id = $3
            "#,
        )
        .bind(tool.trending_score)
        .bind(tool.last_updated.map(|ts| ts.naive_utc()))
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!("Failed to record view for {}: {}", id, e);
            AppError::Persistence(e.to_string())
        })?;

        tx.commit().await.map_err(|e| {
            error!("Failed to commit view for {}: {}", id, e);
            AppError::Persistence(e.to_string())
        })?;

        Ok(Some(tool))
    }

    async fn top(&self, ranking: Ranking, limit: usize, now: DateTime<Utc>) -> Result<Vec<Tool>> {
        let (filter, order) = ranking_clauses(ranking);
        let sql = format!("SELECT {TOOL_COLUMNS} FROM tools WHERE {filter} {order} LIMIT $1");

        let mut query = sqlx::query_as::<_, ToolRow>(&sql).bind(limit as i64);
        if let Some(cutoff) = ranking.cutoff(now)? {
            query = query.bind(cutoff.naive_utc());
        }

        let rows = query.fetch_all(&self.pool).await.map_err(|e| {
            error!("Failed to query {} listing: {}", ranking, e);
            AppError::from(e)
        })?;

        Ok(rows.into_iter().map(Tool::from).collect())
    }
}
