// ============================================
// Background Jobs
// ============================================
//
// scheduler: periodic full-catalog trending refresh with failure backoff.
// Owned by the process bootstrap; started once at startup and stopped
// (joined) at shutdown.

pub mod scheduler;

pub use scheduler::{SchedulerConfig, SchedulerStatus, TrendingScheduler};
