//! Score recompute paths
//!
//! - batch: full-catalog cycle driven by the scheduler or an admin trigger
//! - incremental: single-tool recompute on a view event

pub mod batch;
pub mod incremental;

pub use batch::BatchRefresher;
pub use incremental::IncrementalRefresher;
