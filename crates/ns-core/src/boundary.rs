//! Boundary reconciliation for interactive edits.
//!
//! A night has four kinds of editable edges: its first start, its last end,
//! and the start and end of every wake phase. Each edge is identified by a
//! [`BoundaryKey`]. Edits arrive as absolute candidate instants and are either
//! accepted, producing a new entry list plus the field writes that persist it,
//! or rejected without side effects.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::entry::{SleepEntry, locate_entry, truncate_to_minute};
use crate::types::{BoundaryField, EntryId};
use crate::wake::WakePhase;

/// Identity of an editable edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BoundaryKey {
    /// Start of the night's first entry.
    NightStart(EntryId),
    /// End of the night's last entry.
    NightEnd(EntryId),
    /// End of `.0`, which opens the wake phase before `.1`.
    WakeStart(EntryId, EntryId),
    /// Start of `.1`, which closes the wake phase after `.0`.
    WakeEnd(EntryId, EntryId),
}

impl BoundaryKey {
    /// The entry and field a write for this edge updates.
    pub const fn target(&self) -> (&EntryId, BoundaryField) {
        match self {
            Self::NightStart(id) | Self::WakeEnd(_, id) => (id, BoundaryField::StartTime),
            Self::NightEnd(id) | Self::WakeStart(id, _) => (id, BoundaryField::EndTime),
        }
    }

    /// Key of the edge that `field` of `entries[index]` forms within a night.
    pub fn for_field(entries: &[SleepEntry], index: usize, field: BoundaryField) -> Option<Self> {
        let id = entries.get(index)?.id.clone()?;
        match field {
            BoundaryField::StartTime if index == 0 => Some(Self::NightStart(id)),
            BoundaryField::StartTime => {
                let prev = entries.get(index - 1)?.id.clone()?;
                Some(Self::WakeEnd(prev, id))
            }
            BoundaryField::EndTime if index + 1 == entries.len() => Some(Self::NightEnd(id)),
            BoundaryField::EndTime => {
                let next = entries.get(index + 1)?.id.clone()?;
                Some(Self::WakeStart(id, next))
            }
        }
    }
}

impl fmt::Display for BoundaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NightStart(id) => write!(f, "night-start-{id}"),
            Self::NightEnd(id) => write!(f, "night-end-{id}"),
            Self::WakeStart(a, b) => write!(f, "wake-start-{a}-{b}"),
            Self::WakeEnd(a, b) => write!(f, "wake-end-{a}-{b}"),
        }
    }
}

impl Serialize for BoundaryKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Last accepted value per edge, scoped to one editor session.
#[derive(Debug, Clone, Default)]
pub struct BoundaryRefs {
    accepted: HashMap<BoundaryKey, DateTime<Utc>>,
}

impl BoundaryRefs {
    pub fn get(&self, key: &BoundaryKey) -> Option<DateTime<Utc>> {
        self.accepted.get(key).copied()
    }

    pub fn record(&mut self, key: BoundaryKey, at: DateTime<Utc>) {
        self.accepted.insert(key, at);
    }

    pub fn clear(&mut self) {
        self.accepted.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }
}

/// Why a candidate instant was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The candidate matches the last accepted value for the edge.
    Unchanged,
    /// The candidate would invert an entry, collapse a wake phase, or cross
    /// into a neighbouring entry.
    OutOfBounds,
    /// An affected entry has not been saved yet and has no ID to write to.
    Unsaved,
    /// The wake phase no longer exists in the current entry list.
    PhaseNotFound,
    /// The night has no entries.
    EmptyNight,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Unchanged => "unchanged",
            Self::OutOfBounds => "out of bounds",
            Self::Unsaved => "entry not saved yet",
            Self::PhaseNotFound => "wake phase not found",
            Self::EmptyNight => "night has no entries",
        };
        f.write_str(text)
    }
}

/// A single field update produced by an accepted edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoundaryWrite {
    pub key: BoundaryKey,
    pub entry_id: EntryId,
    pub field: BoundaryField,
    pub at: DateTime<Utc>,
}

/// An accepted edit: the new entry list and the writes that persist it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryEdit {
    pub entries: Vec<SleepEntry>,
    pub writes: Vec<BoundaryWrite>,
}

type Reconciled = Result<BoundaryEdit, RejectReason>;

fn write_for(entries: &[SleepEntry], index: usize, field: BoundaryField) -> Result<BoundaryWrite, RejectReason> {
    let key = BoundaryKey::for_field(entries, index, field).ok_or(RejectReason::Unsaved)?;
    let entry = &entries[index];
    let entry_id = entry.id.clone().ok_or(RejectReason::Unsaved)?;
    let at = match field {
        BoundaryField::StartTime => entry.start_time,
        BoundaryField::EndTime => entry.end_time.ok_or(RejectReason::OutOfBounds)?,
    };
    Ok(BoundaryWrite {
        key,
        entry_id,
        field,
        at,
    })
}

fn single_write(entries: Vec<SleepEntry>, index: usize, field: BoundaryField) -> Reconciled {
    let write = write_for(&entries, index, field)?;
    Ok(BoundaryEdit {
        entries,
        writes: vec![write],
    })
}

/// Shifts every entry of the night by `delta`, preserving span and gaps.
///
/// Writes are ordered so that each entry stays a valid interval while they
/// are applied one by one: ends first when moving later, starts first when
/// moving earlier.
fn translate(entries: &[SleepEntry], delta: Duration) -> Reconciled {
    let shifted: Vec<SleepEntry> = entries
        .iter()
        .map(|entry| SleepEntry {
            id: entry.id.clone(),
            start_time: entry.start_time + delta,
            end_time: entry.end_time.map(|end| end + delta),
        })
        .collect();

    let fields = if delta > Duration::zero() {
        [BoundaryField::EndTime, BoundaryField::StartTime]
    } else {
        [BoundaryField::StartTime, BoundaryField::EndTime]
    };
    let mut writes = Vec::with_capacity(shifted.len() * 2);
    let order: Vec<usize> = if delta > Duration::zero() {
        (0..shifted.len()).rev().collect()
    } else {
        (0..shifted.len()).collect()
    };
    for index in order {
        for field in fields {
            if field == BoundaryField::EndTime && shifted[index].is_ongoing() {
                continue;
            }
            writes.push(write_for(&shifted, index, field)?);
        }
    }
    Ok(BoundaryEdit {
        entries: shifted,
        writes,
    })
}

fn is_unchanged(candidate: DateTime<Utc>, last_accepted: Option<DateTime<Utc>>) -> bool {
    last_accepted.is_some_and(|last| truncate_to_minute(last) == candidate)
}

/// Moves the start of the night's first entry.
///
/// A candidate at or past the night's end translates the whole night by
/// `candidate - original start`, so the end moves by the same delta. In a
/// multi-entry night, a candidate between the first entry's end and the
/// night's end is rejected because it would overlap the next entry.
pub fn move_night_start(
    entries: &[SleepEntry],
    refs: &BoundaryRefs,
    candidate: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Reconciled {
    let candidate = truncate_to_minute(candidate);
    let first = entries.first().ok_or(RejectReason::EmptyNight)?;
    let id = first.id.clone().ok_or(RejectReason::Unsaved)?;
    let original = refs
        .get(&BoundaryKey::NightStart(id))
        .unwrap_or(first.start_time);
    if is_unchanged(candidate, Some(original)) {
        return Err(RejectReason::Unchanged);
    }

    let night_end = entries.last().and_then(|last| last.end_time);
    if night_end.is_some_and(|end| candidate >= end) {
        return translate(entries, candidate - original);
    }

    if candidate >= first.end_or(now) {
        return Err(RejectReason::OutOfBounds);
    }
    let mut next = entries.to_vec();
    next[0].start_time = candidate;
    single_write(next, 0, BoundaryField::StartTime)
}

/// Moves the end of the night's last entry.
///
/// A candidate at or before the night's start translates the whole night by
/// `candidate - original end`. An ongoing night has no end to shift from, so
/// such a candidate is rejected instead.
pub fn move_night_end(entries: &[SleepEntry], refs: &BoundaryRefs, candidate: DateTime<Utc>) -> Reconciled {
    let candidate = truncate_to_minute(candidate);
    let last_index = entries.len().checked_sub(1).ok_or(RejectReason::EmptyNight)?;
    let last = &entries[last_index];
    let id = last.id.clone().ok_or(RejectReason::Unsaved)?;
    let original = refs.get(&BoundaryKey::NightEnd(id)).or(last.end_time);
    if is_unchanged(candidate, original) {
        return Err(RejectReason::Unchanged);
    }

    let night_start = entries[0].start_time;
    if let Some(original) = original.filter(|_| candidate <= night_start) {
        return translate(entries, candidate - original);
    }

    if candidate <= last.start_time {
        return Err(RejectReason::OutOfBounds);
    }
    let mut next = entries.to_vec();
    next[last_index].end_time = Some(candidate);
    single_write(next, last_index, BoundaryField::EndTime)
}

fn locate_phase(entries: &[SleepEntry], phase: &WakePhase) -> Result<usize, RejectReason> {
    let prev = locate_entry(entries, &phase.prev_entry).ok_or(RejectReason::PhaseNotFound)?;
    let next = locate_entry(entries, &phase.next_entry).ok_or(RejectReason::PhaseNotFound)?;
    if next != prev + 1 {
        return Err(RejectReason::PhaseNotFound);
    }
    if entries[prev].id.is_none() || entries[next].id.is_none() {
        return Err(RejectReason::Unsaved);
    }
    Ok(prev)
}

/// Moves the start of a wake phase, i.e. the end of the earlier entry.
///
/// Rejected at or before the earlier entry's start and at or after the
/// current wake end.
pub fn move_wake_start(
    entries: &[SleepEntry],
    refs: &BoundaryRefs,
    phase: &WakePhase,
    candidate: DateTime<Utc>,
) -> Reconciled {
    let candidate = truncate_to_minute(candidate);
    let prev_index = locate_phase(entries, phase)?;
    let (prev, next) = (&entries[prev_index], &entries[prev_index + 1]);
    let key = BoundaryKey::for_field(entries, prev_index, BoundaryField::EndTime)
        .ok_or(RejectReason::Unsaved)?;
    if is_unchanged(candidate, refs.get(&key).or(prev.end_time)) {
        return Err(RejectReason::Unchanged);
    }

    if candidate <= prev.start_time || candidate >= next.start_time {
        return Err(RejectReason::OutOfBounds);
    }
    let mut updated = entries.to_vec();
    updated[prev_index].end_time = Some(candidate);
    single_write(updated, prev_index, BoundaryField::EndTime)
}

/// Moves the end of a wake phase, i.e. the start of the later entry.
///
/// Rejected at or before the current wake start and at or after the later
/// entry's end when it has one.
pub fn move_wake_end(
    entries: &[SleepEntry],
    refs: &BoundaryRefs,
    phase: &WakePhase,
    candidate: DateTime<Utc>,
) -> Reconciled {
    let candidate = truncate_to_minute(candidate);
    let prev_index = locate_phase(entries, phase)?;
    let next_index = prev_index + 1;
    let (prev, next) = (&entries[prev_index], &entries[next_index]);
    let key = BoundaryKey::for_field(entries, next_index, BoundaryField::StartTime)
        .ok_or(RejectReason::Unsaved)?;
    if is_unchanged(candidate, Some(refs.get(&key).unwrap_or(next.start_time))) {
        return Err(RejectReason::Unchanged);
    }

    let wake_start = prev.end_time.ok_or(RejectReason::OutOfBounds)?;
    if candidate <= wake_start || next.end_time.is_some_and(|end| candidate >= end) {
        return Err(RejectReason::OutOfBounds);
    }
    let mut updated = entries.to_vec();
    updated[next_index].start_time = candidate;
    single_write(updated, next_index, BoundaryField::StartTime)
}
