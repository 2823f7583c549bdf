//! Persisted sleep intervals.

use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::{Deserialize, Serialize};

use crate::types::EntryId;

/// A single sleep interval as stored by the backing store.
///
/// `id` is `None` for entries that so far only exist in an optimistic overlay
/// (e.g. the second half of a split the store has not confirmed yet).
/// `end_time` is `None` while the sleep is still ongoing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SleepEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntryId>,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
}

impl SleepEntry {
    /// Creates a persisted entry.
    pub const fn new(id: EntryId, start_time: DateTime<Utc>, end_time: Option<DateTime<Utc>>) -> Self {
        Self {
            id: Some(id),
            start_time,
            end_time,
        }
    }

    /// Creates an entry that has not been saved yet.
    pub const fn unsaved(start_time: DateTime<Utc>, end_time: Option<DateTime<Utc>>) -> Self {
        Self {
            id: None,
            start_time,
            end_time,
        }
    }

    pub const fn is_ongoing(&self) -> bool {
        self.end_time.is_none()
    }

    pub const fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// End of the interval, or `now` if the sleep is still ongoing.
    pub fn end_or(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.end_time.unwrap_or(now)
    }

    /// Whole minutes slept in this entry. Never negative.
    pub fn duration_minutes(&self, now: DateTime<Utc>) -> i64 {
        (self.end_or(now) - self.start_time).num_minutes().max(0)
    }

    /// Whether `at` lies strictly inside the entry's live span.
    ///
    /// An ongoing entry contains every instant after its start.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at > self.start_time && self.end_time.is_none_or(|end| at < end)
    }

    /// Tolerant identity check.
    ///
    /// Compares IDs when both entries have one, otherwise compares the
    /// minute-truncated start and end timestamps. Optimistic entries have no
    /// ID yet, so this is how they are found again in a newer list.
    pub fn same_entry(&self, other: &Self) -> bool {
        if let (Some(a), Some(b)) = (&self.id, &other.id) {
            return a == b;
        }
        truncate_to_minute(self.start_time) == truncate_to_minute(other.start_time)
            && self.end_time.map(truncate_to_minute) == other.end_time.map(truncate_to_minute)
    }
}

/// Drops seconds and sub-second precision.
pub fn truncate_to_minute(at: DateTime<Utc>) -> DateTime<Utc> {
    at.duration_trunc(Duration::minutes(1)).unwrap_or(at)
}

/// Returns the index of `needle` within `entries` using [`SleepEntry::same_entry`].
pub fn locate_entry(entries: &[SleepEntry], needle: &SleepEntry) -> Option<usize> {
    entries.iter().position(|entry| entry.same_entry(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, m, s).unwrap()
    }

    fn id(s: &str) -> EntryId {
        EntryId::new(s).unwrap()
    }

    #[test]
    fn truncate_drops_seconds() {
        assert_eq!(truncate_to_minute(at(22, 15, 42)), at(22, 15, 0));
        assert_eq!(truncate_to_minute(at(22, 15, 0)), at(22, 15, 0));
    }

    #[test]
    fn contains_excludes_edges() {
        let entry = SleepEntry::new(id("a"), at(20, 0, 0), Some(at(22, 0, 0)));
        assert!(!entry.contains(at(20, 0, 0)));
        assert!(entry.contains(at(21, 0, 0)));
        assert!(!entry.contains(at(22, 0, 0)));
    }

    #[test]
    fn ongoing_entry_contains_everything_after_start() {
        let entry = SleepEntry::new(id("a"), at(20, 0, 0), None);
        assert!(entry.contains(at(23, 59, 0)));
        assert!(!entry.contains(at(19, 0, 0)));
        assert_eq!(entry.duration_minutes(at(21, 30, 0)), 90);
    }

    #[test]
    fn same_entry_prefers_ids() {
        let a = SleepEntry::new(id("a"), at(20, 0, 0), Some(at(22, 0, 0)));
        let b = SleepEntry::new(id("b"), at(20, 0, 0), Some(at(22, 0, 0)));
        assert!(!a.same_entry(&b));

        let moved = SleepEntry::new(id("a"), at(20, 5, 0), Some(at(22, 0, 0)));
        assert!(a.same_entry(&moved));
    }

    #[test]
    fn same_entry_falls_back_to_minute_timestamps() {
        let saved = SleepEntry::new(id("a"), at(20, 0, 0), Some(at(22, 0, 0)));
        let pending = SleepEntry::unsaved(at(20, 0, 31), Some(at(22, 0, 5)));
        assert!(saved.same_entry(&pending));

        let other = SleepEntry::unsaved(at(20, 1, 0), Some(at(22, 0, 0)));
        assert!(!saved.same_entry(&other));
    }
}
