use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::Result;
use crate::metrics::{self, RefreshTrigger};
use crate::models::CycleSummary;
use crate::services::refresh::BatchRefresher;

/// Time between successful cycles (5 minutes)
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(300);

/// Time before retrying a failed cycle
pub const DEFAULT_FAILURE_BACKOFF: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub interval: Duration,
    pub backoff: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_REFRESH_INTERVAL,
            backoff: DEFAULT_FAILURE_BACKOFF,
        }
    }
}

impl From<&Config> for SchedulerConfig {
    fn from(config: &Config) -> Self {
        Self {
            interval: Duration::from_secs(config.refresh_interval_seconds),
            backoff: Duration::from_secs(config.failure_backoff_seconds),
        }
    }
}

/// Point-in-time view of the scheduler
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub interval_secs: u64,
    pub backoff_secs: u64,
    pub cycles_completed: u64,
    pub consecutive_failures: u32,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

struct RunningLoop {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Periodic full-catalog refresh on a background task
///
/// **Lifecycle**: `Stopped -> Running -> Stopped`. `start` on a running
/// scheduler and `stop` on a stopped one are no-ops.
///
/// **Usage**:
/// ```ignore
/// let scheduler = TrendingScheduler::new(refresher, SchedulerConfig::default());
/// scheduler.start().await;
///
/// // Later: returns once the background task has exited
/// scheduler.stop().await;
/// ```
pub struct TrendingScheduler {
    refresher: Arc<BatchRefresher>,
    config: SchedulerConfig,
    status: Arc<RwLock<SchedulerStatus>>,
    running: Mutex<Option<RunningLoop>>,
}

impl TrendingScheduler {
    pub fn new(refresher: Arc<BatchRefresher>, config: SchedulerConfig) -> Self {
        let status = SchedulerStatus {
            interval_secs: config.interval.as_secs(),
            backoff_secs: config.backoff.as_secs(),
            ..Default::default()
        };

        Self {
            refresher,
            config,
            status: Arc::new(RwLock::new(status)),
            running: Mutex::new(None),
        }
    }

    /// Spawn the refresh loop; the first cycle runs immediately
    ///
    /// Returns `false` if the scheduler was already running.
    pub async fn start(&self) -> bool {
        let mut running = self.running.lock().await;
        if running.is_some() {
            debug!("Trending scheduler already running");
            return false;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        self.status.write().await.running = true;

        let handle = tokio::spawn(run_refresh_loop(
            self.refresher.clone(),
            self.config,
            self.status.clone(),
            shutdown_rx,
        ));

        *running = Some(RunningLoop {
            shutdown_tx,
            handle,
        });

        true
    }

    /// Signal the loop and wait for the background task to exit
    ///
    /// A cycle already in flight runs to completion; no new cycle starts
    /// after this returns. Returns `false` if the scheduler was not running.
    pub async fn stop(&self) -> bool {
        let mut running = self.running.lock().await;
        let Some(RunningLoop {
            shutdown_tx,
            handle,
        }) = running.take()
        else {
            debug!("Trending scheduler already stopped");
            return false;
        };

        // Receiver only goes away if the task already exited
        let _ = shutdown_tx.send(true);

        if let Err(e) = handle.await {
            error!(error = %e, "Trending scheduler task panicked");
        }

        self.status.write().await.running = false;
        info!("Trending scheduler stopped");
        true
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    pub async fn status(&self) -> SchedulerStatus {
        self.status.read().await.clone()
    }

    /// One synchronous cycle regardless of scheduler state; errors go to the caller
    pub async fn trigger_now(&self) -> Result<CycleSummary> {
        info!("Manual trending refresh requested");
        self.refresher.run_cycle(RefreshTrigger::Manual).await
    }
}

async fn run_refresh_loop(
    refresher: Arc<BatchRefresher>,
    config: SchedulerConfig,
    status: Arc<RwLock<SchedulerStatus>>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    info!(
        interval_secs = config.interval.as_secs(),
        backoff_secs = config.backoff.as_secs(),
        "Trending scheduler started"
    );

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let delay = match refresher.run_cycle(RefreshTrigger::Scheduled).await {
            Ok(summary) => {
                let mut s = status.write().await;
                if s.consecutive_failures > 0 {
                    info!(
                        recovered_after = s.consecutive_failures,
                        "Trending scheduler recovered after failures"
                    );
                }
                s.cycles_completed += 1;
                s.consecutive_failures = 0;
                s.last_success_at = Some(summary.started_at);
                metrics::set_consecutive_failures(0);
                config.interval
            }
            Err(e) => {
                let mut s = status.write().await;
                s.consecutive_failures += 1;
                s.last_failure_at = Some(Utc::now());
                s.last_error = Some(e.to_string());
                metrics::set_consecutive_failures(s.consecutive_failures);

                error!(
                    error = %e,
                    consecutive_failures = s.consecutive_failures,
                    backoff_secs = config.backoff.as_secs(),
                    "Trending refresh cycle failed, backing off"
                );
                config.backoff
            }
        };

        tokio::select! {
            _ = sleep(delay) => {}
            changed = shutdown_rx.changed() => {
                // Sender dropped: the owning scheduler is gone
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    info!("Trending scheduler loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{CatalogStore, InMemoryCatalogStore};
    use crate::models::Tool;

    fn scheduler_with(store: Arc<InMemoryCatalogStore>) -> TrendingScheduler {
        let refresher = Arc::new(BatchRefresher::new(store));
        TrendingScheduler::new(refresher, SchedulerConfig::default())
    }

    #[test]
    fn test_default_intervals() {
        let config = SchedulerConfig::default();
        assert_eq!(config.interval, Duration::from_secs(300));
        assert_eq!(config.backoff, Duration::from_secs(60));
    }

    #[test]
    fn test_config_from_app_config() {
        let app = Config {
            refresh_interval_seconds: 120,
            failure_backoff_seconds: 15,
            ..Config::default()
        };
        let config = SchedulerConfig::from(&app);
        assert_eq!(config.interval, Duration::from_secs(120));
        assert_eq!(config.backoff, Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_and_stop_are_idempotent() {
        let scheduler = scheduler_with(Arc::new(InMemoryCatalogStore::new()));

        assert!(!scheduler.stop().await);
        assert!(scheduler.start().await);
        assert!(!scheduler.start().await);
        assert!(scheduler.is_running().await);

        assert!(scheduler.stop().await);
        assert!(!scheduler.stop().await);
        assert!(!scheduler.is_running().await);
        assert!(!scheduler.status().await.running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_on_interval() {
        let store = Arc::new(InMemoryCatalogStore::with_tools(vec![Tool::new("a")]));
        let scheduler = scheduler_with(store.clone());

        scheduler.start().await;
        sleep(Duration::from_secs(301)).await;

        let status = scheduler.status().await;
        assert_eq!(status.cycles_completed, 2);
        assert_eq!(status.consecutive_failures, 0);
        assert!(status.last_success_at.is_some());
        assert!(store.list_all().await.unwrap()[0].last_updated.is_some());

        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_back_off_and_recover() {
        let store = Arc::new(InMemoryCatalogStore::with_tools(vec![Tool::new("a")]));
        store.set_fail_reads(true);
        let scheduler = scheduler_with(store.clone());

        scheduler.start().await;
        // Cycles at t=0 and t=60 fail
        sleep(Duration::from_secs(61)).await;

        let status = scheduler.status().await;
        assert!(status.running);
        assert_eq!(status.consecutive_failures, 2);
        assert_eq!(status.cycles_completed, 0);
        assert!(status.last_failure_at.is_some());
        assert!(status.last_error.is_some());

        // Next retry at t=120 succeeds
        store.set_fail_reads(false);
        sleep(Duration::from_secs(60)).await;

        let status = scheduler.status().await;
        assert_eq!(status.consecutive_failures, 0);
        assert_eq!(status.cycles_completed, 1);

        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_cycle_after_stop() {
        let store = Arc::new(InMemoryCatalogStore::with_tools(vec![Tool::new("a")]));
        let scheduler = scheduler_with(store);

        scheduler.start().await;
        sleep(Duration::from_secs(1)).await;
        scheduler.stop().await;
        let completed = scheduler.status().await.cycles_completed;

        sleep(Duration::from_secs(3600)).await;
        assert_eq!(scheduler.status().await.cycles_completed, completed);
    }

    #[tokio::test]
    async fn test_trigger_now_works_while_stopped() {
        let store = Arc::new(InMemoryCatalogStore::with_tools(vec![Tool::new("a")]));
        let scheduler = scheduler_with(store.clone());

        let summary = scheduler.trigger_now().await.unwrap();
        assert_eq!(summary.updated_tools, 1);
        assert!(!scheduler.is_running().await);

        store.set_fail_writes(true);
        assert!(scheduler.trigger_now().await.is_err());
    }
}
