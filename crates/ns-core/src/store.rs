//! The persistence operations the editor needs from its host.

use chrono::{DateTime, Utc};

use crate::boundary::BoundaryWrite;
use crate::entry::SleepEntry;
use crate::types::{BoundaryField, EntryId};

/// Backing store for sleep entries.
///
/// Implemented by `ns-db` for SQLite and by test fixtures. Every call either
/// fully succeeds or leaves the store unchanged; the editor relies on a
/// reload after success to replace its optimistic state.
pub trait SleepStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Shortens `target` to end at `at` and creates a new entry starting
    /// `wake_minutes` later with the target's original end.
    fn split_entry(
        &mut self,
        target: &SleepEntry,
        at: DateTime<Utc>,
        wake_minutes: u32,
    ) -> Result<(), Self::Error>;

    /// Extends `first` to the end of `second` and removes `second`.
    fn merge_entries(&mut self, first: &SleepEntry, second: &SleepEntry) -> Result<(), Self::Error>;

    /// Sets a single timestamp of an entry.
    fn adjust_boundary(
        &mut self,
        entry_id: &EntryId,
        field: BoundaryField,
        at: DateTime<Utc>,
    ) -> Result<(), Self::Error>;

    /// Applies a batch of boundary writes as one action.
    ///
    /// Intervals are checked once the whole batch is applied, so two writes
    /// to the same entry may be listed in either order. A failure keeps none
    /// of the batch. The default performs the writes one by one and stops at
    /// the first error; stores with transactions override it.
    fn adjust_boundaries(&mut self, writes: &[BoundaryWrite]) -> Result<(), Self::Error> {
        for write in writes {
            self.adjust_boundary(&write.entry_id, write.field, write.at)?;
        }
        Ok(())
    }

    /// Deletes all listed entries as one action.
    fn delete_entries(&mut self, ids: &[EntryId]) -> Result<(), Self::Error>;
}
