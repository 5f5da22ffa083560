//! Trending Refresh Metrics
//!
//! Prometheus metrics for the batch, incremental and scheduler paths

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::time::Duration;

static REFRESH_RUNS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "trending_refresh_runs_total",
        "Total trending refresh cycles by trigger and outcome",
        &["trigger", "status"]
    )
    .expect("Failed to register trending refresh runs metric")
});

static REFRESH_DURATION_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "trending_refresh_duration_seconds",
        "Duration of full-catalog trending refresh cycles",
        vec![0.001, 0.01, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0]
    )
    .expect("Failed to register trending refresh duration metric")
});

static TOOLS_UPDATED: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "trending_tools_updated",
        "Number of tools updated in the last refresh cycle"
    )
    .expect("Failed to register trending tools updated metric")
});

static VIEWS_RECORDED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "trending_views_recorded_total",
        "Total view events applied by the incremental path"
    )
    .expect("Failed to register trending views recorded metric")
});

static SCHEDULER_CONSECUTIVE_FAILURES: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "trending_scheduler_consecutive_failures",
        "Consecutive failed cycles of the trending scheduler"
    )
    .expect("Failed to register trending scheduler failures metric")
});

/// What started a refresh cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    Scheduled,
    Manual,
    Analytics,
}

impl RefreshTrigger {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Manual => "manual",
            Self::Analytics => "analytics",
        }
    }
}

/// Record refresh cycle outcome (success/empty/error)
pub fn record_refresh_run(trigger: RefreshTrigger, status: &str) {
    REFRESH_RUNS_TOTAL
        .with_label_values(&[trigger.as_str(), status])
        .inc();
}

pub fn record_refresh_duration(duration: Duration) {
    REFRESH_DURATION_SECONDS.observe(duration.as_secs_f64());
}

pub fn set_tools_updated(count: usize) {
    TOOLS_UPDATED.set(count as i64);
}

pub fn record_view() {
    VIEWS_RECORDED_TOTAL.inc();
}

pub fn set_consecutive_failures(count: u32) {
    SCHEDULER_CONSECUTIVE_FAILURES.set(count as i64);
}
