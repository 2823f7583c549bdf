//! Wake phases derived from gaps between sleep entries.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entry::SleepEntry;

/// A gap between two temporally adjacent entries of a night.
///
/// Wake phases are never stored. They are re-derived from the entry list
/// whenever it changes and have no identity beyond the entries that bound
/// them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WakePhase {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_seconds: i64,
    pub prev_entry: SleepEntry,
    pub next_entry: SleepEntry,
}

impl WakePhase {
    pub const fn duration_minutes(&self) -> i64 {
        self.duration_seconds / 60
    }
}

/// Derives the wake phases of a night.
///
/// `entries` must be sorted by start time. Abutting or overlapping neighbours
/// produce no phase, and neither does a gap after an ongoing entry.
pub fn wake_phases(entries: &[SleepEntry]) -> Vec<WakePhase> {
    entries
        .windows(2)
        .filter_map(|pair| {
            let (prev, next) = (&pair[0], &pair[1]);
            let prev_end = prev.end_time?;
            if next.start_time <= prev_end {
                return None;
            }
            let gap_ms = (next.start_time - prev_end).num_milliseconds();
            Some(WakePhase {
                start: prev_end,
                end: next.start_time,
                duration_seconds: (gap_ms + 500) / 1000,
                prev_entry: prev.clone(),
                next_entry: next.clone(),
            })
        })
        .collect()
}

/// Sum of all wake phase durations.
pub fn total_wake_seconds(phases: &[WakePhase]) -> i64 {
    phases.iter().map(|phase| phase.duration_seconds).sum()
}
