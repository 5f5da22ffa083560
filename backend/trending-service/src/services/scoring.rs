/// Trending Score Calculator
///
/// Weighted sum of five independently capped components, clamped to [0, 100]:
/// - views relative to the catalog average (max 40)
/// - rating out of 5 (max 25)
/// - reviews relative to the catalog average (max 15)
/// - recency, linear decay over 30 days then 60 more (max 10)
/// - hot / featured flags (+5 each)
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{CatalogAverages, Tool};

pub const MAX_SCORE: f64 = 100.0;

const VIEWS_WEIGHT: f64 = 20.0;
const VIEWS_CAP: f64 = 40.0;
const RATING_WEIGHT: f64 = 25.0;
const MAX_RATING: f64 = 5.0;
const REVIEWS_WEIGHT: f64 = 7.5;
const REVIEWS_CAP: f64 = 15.0;
const FRESH_DAYS: f64 = 30.0;
const FRESH_POINTS: f64 = 10.0;
const AGING_DAYS: f64 = 60.0;
const AGING_POINTS: f64 = 5.0;
const FLAG_BONUS: f64 = 5.0;

/// Per-component view of one score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub views: f64,
    pub rating: f64,
    pub reviews: f64,
    pub recency: f64,
    pub bonus: f64,
    pub total: f64,
}

/// Pure scoring function; no I/O
#[derive(Debug, Clone, Copy, Default)]
pub struct TrendingScorer;

impl TrendingScorer {
    pub fn new() -> Self {
        Self
    }

    /// Score against the current UTC clock
    pub fn score(&self, tool: &Tool, averages: &CatalogAverages) -> f64 {
        self.score_at(tool, averages, Utc::now())
    }

    pub fn score_at(&self, tool: &Tool, averages: &CatalogAverages, now: DateTime<Utc>) -> f64 {
        self.breakdown(tool, averages, now).total
    }

    /// `avg_rating` is carried in `averages` but does not enter the formula
    pub fn breakdown(
        &self,
        tool: &Tool,
        averages: &CatalogAverages,
        now: DateTime<Utc>,
    ) -> ScoreBreakdown {
        let views = views_component(tool.views, averages.avg_views);
        let rating = rating_component(tool.rating);
        let reviews = reviews_component(tool.total_reviews, averages.avg_reviews);
        let recency = recency_component(tool.days_old(now));
        let bonus = flag_bonus(tool.is_hot) + flag_bonus(tool.is_featured);

        let total = (views + rating + reviews + recency + bonus).clamp(0.0, MAX_SCORE);

        ScoreBreakdown {
            views,
            rating,
            reviews,
            recency,
            bonus,
            total,
        }
    }
}

/// Averages below 1 (including an empty catalog's 0) are treated as 1
fn denominator(avg: f64) -> f64 {
    avg.max(1.0)
}

fn views_component(views: i64, avg_views: f64) -> f64 {
    (views.max(0) as f64 / denominator(avg_views) * VIEWS_WEIGHT).min(VIEWS_CAP)
}

fn rating_component(rating: f64) -> f64 {
    (rating.clamp(0.0, MAX_RATING) / MAX_RATING) * RATING_WEIGHT
}

fn reviews_component(total_reviews: i64, avg_reviews: f64) -> f64 {
    (total_reviews.max(0) as f64 / denominator(avg_reviews) * REVIEWS_WEIGHT).min(REVIEWS_CAP)
}

pub fn recency_component(days_old: i64) -> f64 {
    let days = days_old.max(0) as f64;

    if days < FRESH_DAYS {
        FRESH_POINTS * (1.0 - days / FRESH_DAYS)
    } else if days < FRESH_DAYS + AGING_DAYS {
        AGING_POINTS * (1.0 - (days - FRESH_DAYS) / AGING_DAYS)
    } else {
        0.0
    }
}

fn flag_bonus(set: bool) -> f64 {
    if set {
        FLAG_BONUS
    } else {
        0.0
    }
}
