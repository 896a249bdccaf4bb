//! Error types for the crawl scheduler.

use thiserror::Error;

/// Errors surfaced by [`crate::scheduler::BalancedScheduler`] and friends.
///
/// Per the scheduler's error handling design, contract violations
/// (mutating a tombstoned entry, a non-positive `balancing_temperature`,
/// a negative `batch_size`) are programming errors and panic rather than
/// flow through this enum; only the recoverable `QueueClosed` case is
/// modeled here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// A request was pushed to a domain slot that has already been closed.
    #[error("queue closed for slot {slot:?}")]
    QueueClosed { slot: String },
}

impl SchedulerError {
    pub fn queue_closed(slot: impl Into<String>) -> Self {
        Self::QueueClosed { slot: slot.into() }
    }
}

/// Convenience alias for results returned by scheduler operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;
