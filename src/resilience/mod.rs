//! Resilience helpers.
//!
//! Failed reconciliations are requeued with exponential backoff plus up to
//! 10% jitter so retries of many objects spread out. Source polls stay on a
//! fixed interval.

pub mod backoff;

pub use backoff::{calculate_backoff, BackoffPolicy};
