//! Errors surfaced by structural edits.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Boxed error returned by a [`SleepStore`](crate::SleepStore) implementation.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Failures of split, merge and delete operations.
///
/// Boundary drags never produce these. An invalid drag is a
/// [`RejectReason`](crate::RejectReason), not an error.
#[derive(Debug, Error)]
pub enum EditError {
    /// No entry of the night contains the split instant.
    #[error("no sleep entry contains {at}")]
    NoEntryAt { at: DateTime<Utc> },

    /// The wake phase would reach or pass the end of the entry being split.
    #[error("a {wake_minutes} minute wake phase would reach the end of the entry")]
    WakeTooLong { wake_minutes: u32 },

    /// Wake phases are at least one minute long.
    #[error("wake duration must be at least 1 minute")]
    InvalidWakeDuration,

    /// The entries bounding a wake phase are no longer adjacent in the night.
    #[error("the entries around this wake phase could not be found")]
    MergeTargetNotFound,

    /// The store rejected the write. Any optimistic change was rolled back.
    #[error("store write failed: {0}")]
    Store(#[source] StoreError),
}
