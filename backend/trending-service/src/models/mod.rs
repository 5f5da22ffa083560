// Domain models for the trending subsystem

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Catalog item ("tool") with the statistics the scorer reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub id: Uuid,
    pub name: String,
    pub views: i64,
    /// 0.0 means "no ratings yet"
    pub rating: f64,
    pub total_reviews: i64,
    pub created_at: DateTime<Utc>,
    pub is_hot: bool,
    pub is_featured: bool,
    /// Always within [0, 100] after a recompute
    pub trending_score: f64,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Tool {
    /// New tool with zeroed statistics, created now
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            views: 0,
            rating: 0.0,
            total_reviews: 0,
            created_at: Utc::now(),
            is_hot: false,
            is_featured: false,
            trending_score: 0.0,
            last_updated: None,
        }
    }

    /// Whole days elapsed since creation, floored at zero for future timestamps
    pub fn days_old(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_days().max(0)
    }

    pub fn is_rated(&self) -> bool {
        self.rating > 0.0
    }
}

/// Interpret a timezone-naive timestamp as UTC
///
/// Legacy catalog rows store `TIMESTAMP WITHOUT TIME ZONE`; the scorer always
/// compares against an aware UTC clock.
pub fn naive_to_utc(ts: NaiveDateTime) -> DateTime<Utc> {
    ts.and_utc()
}

/// Catalog-wide averages used as scoring denominators
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogAverages {
    pub tool_count: usize,
    pub avg_views: f64,
    /// Mean over rated tools only (0.0 when nothing is rated)
    pub avg_rating: f64,
    pub avg_reviews: f64,
}

impl CatalogAverages {
    /// Full scan over the catalog
    pub fn from_tools(tools: &[Tool]) -> Self {
        if tools.is_empty() {
            return Self::default();
        }

        let count = tools.len() as f64;
        let total_views: i64 = tools.iter().map(|t| t.views).sum();
        let total_reviews: i64 = tools.iter().map(|t| t.total_reviews).sum();

        let (rated_sum, rated_count) = tools
            .iter()
            .filter(|t| t.is_rated())
            .fold((0.0, 0usize), |(sum, n), t| (sum + t.rating, n + 1));

        Self {
            tool_count: tools.len(),
            avg_views: total_views as f64 / count,
            avg_rating: if rated_count > 0 {
                rated_sum / rated_count as f64
            } else {
                0.0
            },
            avg_reviews: total_reviews as f64 / count,
        }
    }
}

/// Before/after score of one tool within a batch cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreDelta {
    pub tool_id: Uuid,
    pub name: String,
    pub old_score: f64,
    pub new_score: f64,
}

impl ScoreDelta {
    pub fn change(&self) -> f64 {
        self.new_score - self.old_score
    }
}

/// Report of one batch cycle (not persisted)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleSummary {
    pub started_at: DateTime<Utc>,
    pub total_tools: usize,
    pub updated_tools: usize,
    pub empty_catalog: bool,
    pub averages: CatalogAverages,
    pub deltas: Vec<ScoreDelta>,
    pub elapsed_ms: u64,
}

impl CycleSummary {
    pub fn empty(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            total_tools: 0,
            updated_tools: 0,
            empty_catalog: true,
            averages: CatalogAverages::default(),
            deltas: Vec::new(),
            elapsed_ms: 0,
        }
    }

    /// Number of tools whose score actually moved
    pub fn changed(&self) -> usize {
        self.deltas
            .iter()
            .filter(|d| d.change().abs() > f64::EPSILON)
            .count()
    }
}

/// Ordering/filter used by the analytics listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ranking {
    /// Highest trending score first
    TrendingScore,
    /// Highest rating first, reviewed tools only
    TopRated,
    /// Most viewed first
    MostViewed,
    /// Created within the last `days` days, newest first
    Recent { days: i64 },
    Featured,
    Hot,
}

impl Ranking {
    pub fn as_str(&self) -> &str {
        match self {
            Self::TrendingScore => "trending_score",
            Self::TopRated => "top_rated",
            Self::MostViewed => "most_viewed",
            Self::Recent { .. } => "recent",
            Self::Featured => "featured",
            Self::Hot => "hot",
        }
    }

    /// Oldest `created_at` a `Recent` listing admits, `None` for every other listing
    ///
    /// Windows that reach outside the representable time range are a
    /// `Configuration` error.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
        match self {
            Self::Recent { days } => Duration::try_days(*days)
                .and_then(|window| now.checked_sub_signed(window))
                .map(Some)
                .ok_or_else(|| {
                    AppError::Configuration(format!("recent window of {days} days is out of range"))
                }),
            _ => Ok(None),
        }
    }

    /// Whether `tool` belongs in this listing, given the listing's `cutoff`
    pub fn admits(&self, tool: &Tool, cutoff: Option<DateTime<Utc>>) -> bool {
        match self {
            Self::TrendingScore | Self::MostViewed => true,
            Self::TopRated => tool.total_reviews > 0,
            Self::Recent { .. } => cutoff.map_or(true, |cutoff| tool.created_at >= cutoff),
            Self::Featured => tool.is_featured,
            Self::Hot => tool.is_hot,
        }
    }
}

impl std::fmt::Display for Ranking {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Top-N listings over the ranked catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsBundle {
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh: Option<CycleSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_error: Option<String>,
    pub top_trending: Vec<Tool>,
    pub top_rated: Vec<Tool>,
    pub most_viewed: Vec<Tool>,
    pub recent: Vec<Tool>,
    pub featured: Vec<Tool>,
    pub hot: Vec<Tool>,
}
