//! Splitting an entry around a new wake phase and merging across one.

use chrono::{DateTime, Duration, Utc};

use crate::entry::{SleepEntry, locate_entry};
use crate::error::EditError;
use crate::wake::WakePhase;

/// Result of planning a split, computed before anything is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPlan {
    /// The entry being split, as found in the live list.
    pub target: SleepEntry,
    /// `target` shortened to end at the split instant.
    pub first: SleepEntry,
    /// New unsaved entry starting after the wake phase.
    pub second: SleepEntry,
    /// The full entry list with `target` replaced by `first` and `second`.
    pub entries: Vec<SleepEntry>,
}

/// Plans inserting a `wake_minutes` wake phase at `at`.
///
/// The target is whichever entry's live span strictly contains `at`. The
/// wake phase must end before the target does.
pub fn plan_split(
    entries: &[SleepEntry],
    at: DateTime<Utc>,
    wake_minutes: u32,
) -> Result<SplitPlan, EditError> {
    if wake_minutes == 0 {
        return Err(EditError::InvalidWakeDuration);
    }
    let index = entries
        .iter()
        .position(|entry| entry.contains(at))
        .ok_or(EditError::NoEntryAt { at })?;
    let target = entries[index].clone();

    let wake_end = at + Duration::minutes(i64::from(wake_minutes));
    if target.end_time.is_some_and(|end| wake_end >= end) {
        return Err(EditError::WakeTooLong { wake_minutes });
    }

    let first = SleepEntry {
        end_time: Some(at),
        ..target.clone()
    };
    let second = SleepEntry {
        id: None,
        start_time: wake_end,
        end_time: target.end_time,
    };

    let mut next = entries.to_vec();
    next.splice(index..=index, [first.clone(), second.clone()]);
    Ok(SplitPlan {
        target,
        first,
        second,
        entries: next,
    })
}

/// Result of planning a merge across one wake phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePlan {
    /// Earlier entry as found in the live list.
    pub prev: SleepEntry,
    /// Later entry as found in the live list.
    pub next: SleepEntry,
    /// `prev` extended to the end of `next`.
    pub merged: SleepEntry,
    /// The full entry list with both entries replaced by `merged`.
    pub entries: Vec<SleepEntry>,
}

/// Plans removing `phase` by merging the entries around it.
///
/// The phase's entries are located in `entries` by ID, or by minute-truncated
/// timestamps when one of them has not been saved yet.
pub fn plan_merge(entries: &[SleepEntry], phase: &WakePhase) -> Result<MergePlan, EditError> {
    let prev_index =
        locate_entry(entries, &phase.prev_entry).ok_or(EditError::MergeTargetNotFound)?;
    let next_index =
        locate_entry(entries, &phase.next_entry).ok_or(EditError::MergeTargetNotFound)?;
    if next_index != prev_index + 1 {
        return Err(EditError::MergeTargetNotFound);
    }

    let prev = entries[prev_index].clone();
    let next = entries[next_index].clone();
    let merged = SleepEntry {
        end_time: next.end_time,
        ..prev.clone()
    };

    let mut updated = entries.to_vec();
    updated.splice(prev_index..=next_index, [merged.clone()]);
    Ok(MergePlan {
        prev,
        next,
        merged,
        entries: updated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntryId;
    use crate::wake::wake_phases;
    use chrono::TimeZone;

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, h, m, 0).unwrap()
    }

    fn night() -> Vec<SleepEntry> {
        vec![SleepEntry::new(
            EntryId::new("a").unwrap(),
            at(1, 22, 0),
            Some(at(2, 6, 0)),
        )]
    }

    #[test]
    fn split_inserts_wake_phase() {
        let plan = plan_split(&night(), at(2, 2, 0), 10).unwrap();

        assert_eq!(plan.entries.len(), 2);
        assert_eq!(plan.first.start_time, at(1, 22, 0));
        assert_eq!(plan.first.end_time, Some(at(2, 2, 0)));
        assert_eq!(plan.first.id, plan.target.id);
        assert_eq!(plan.second.id, None);
        assert_eq!(plan.second.start_time, at(2, 2, 10));
        assert_eq!(plan.second.end_time, Some(at(2, 6, 0)));

        let phases = wake_phases(&plan.entries);
        assert_eq!(phases.len(), 1);
        assert_eq!(phases[0].duration_seconds, 600);
    }

    #[test]
    fn split_then_merge_restores_the_night() {
        let split = plan_split(&night(), at(2, 2, 0), 10).unwrap();
        let phase = wake_phases(&split.entries)[0].clone();
        let merged = plan_merge(&split.entries, &phase).unwrap();

        assert_eq!(merged.entries, night());
    }

    #[test]
    fn split_outside_any_entry_is_rejected() {
        let result = plan_split(&night(), at(2, 7, 0), 10);
        assert!(matches!(result, Err(EditError::NoEntryAt { .. })));

        let result = plan_split(&night(), at(1, 22, 0), 10);
        assert!(matches!(result, Err(EditError::NoEntryAt { .. })));
    }

    #[test]
    fn split_wake_reaching_entry_end_is_rejected() {
        let result = plan_split(&night(), at(2, 5, 0), 60);
        assert!(matches!(result, Err(EditError::WakeTooLong { wake_minutes: 60 })));

        assert!(plan_split(&night(), at(2, 5, 0), 59).is_ok());
    }

    #[test]
    fn split_requires_a_positive_wake() {
        let result = plan_split(&night(), at(2, 2, 0), 0);
        assert!(matches!(result, Err(EditError::InvalidWakeDuration)));
    }

    #[test]
    fn split_of_ongoing_entry_keeps_it_ongoing() {
        let entries = vec![SleepEntry::new(
            EntryId::new("a").unwrap(),
            at(1, 22, 0),
            None,
        )];
        let plan = plan_split(&entries, at(2, 2, 0), 15).unwrap();
        assert_eq!(plan.second.end_time, None);
        assert_eq!(plan.second.start_time, at(2, 2, 15));
    }

    #[test]
    fn merge_matches_unsaved_entry_by_timestamps() {
        let split = plan_split(&night(), at(2, 2, 0), 10).unwrap();
        let mut phase = wake_phases(&split.entries)[0].clone();
        // The caller's copy carries seconds the live list does not.
        phase.next_entry.start_time += Duration::seconds(20);

        let merged = plan_merge(&split.entries, &phase).unwrap();
        assert_eq!(merged.merged.end_time, Some(at(2, 6, 0)));
        assert_eq!(merged.next.id, None);
    }

    #[test]
    fn merge_of_non_adjacent_entries_is_rejected() {
        let split = plan_split(&night(), at(2, 2, 0), 10).unwrap();
        let phase = wake_phases(&split.entries)[0].clone();
        let result = plan_merge(&night(), &phase);
        assert!(matches!(result, Err(EditError::MergeTargetNotFound)));
    }
}
