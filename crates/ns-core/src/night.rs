//! Night window classification.
//!
//! Sleep entries are bucketed into nights by a fixed daily anchor: the most
//! recent 17:30 wall-clock time at or before the entry's start. The anchor
//! opens a 990-minute (16.5 h) window. Entries whose anchors coincide belong
//! to the same night.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::Serialize;

use crate::entry::SleepEntry;

/// Wall-clock hour of the daily night anchor.
pub const NIGHT_ANCHOR_HOUR: u32 = 17;

/// Wall-clock minute of the daily night anchor.
pub const NIGHT_ANCHOR_MINUTE: u32 = 30;

/// Length of the canonical night window opened by an anchor.
pub const NIGHT_WINDOW_MINUTES: i64 = 990;

fn anchor_time() -> NaiveTime {
    NaiveTime::from_hms_opt(NIGHT_ANCHOR_HOUR, NIGHT_ANCHOR_MINUTE, 0).unwrap_or(NaiveTime::MIN)
}

/// Converts a local wall-clock time to UTC.
///
/// Ambiguous times (DST fall-back) resolve to the earlier instant. Times
/// inside a spring-forward gap resolve to the same wall-clock time one hour
/// later, which always exists.
pub(crate) fn resolve_local<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        LocalResult::None => {
            let shifted = local + Duration::hours(1);
            match tz.from_local_datetime(&shifted) {
                LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
                LocalResult::None => Utc.from_utc_datetime(&local),
            }
        }
    }
}

/// Computes the night anchor for an entry starting at `start`.
///
/// Clock times before 17:30 belong to the previous calendar day's anchor. An
/// entry starting exactly at 17:30 belongs to that day's window.
pub fn night_anchor<Tz: TimeZone>(start: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
    let local = start.with_timezone(tz).naive_local();
    let mut date = local.date();
    if local.time() < anchor_time() {
        date = date.pred_opt().unwrap_or(date);
    }
    anchor_for_date(date, tz)
}

/// The 17:30 anchor of the night named by a local calendar date.
pub fn anchor_for_date<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    resolve_local(tz, date.and_time(anchor_time()))
}

/// Whole minutes between the anchor and `date`, clamped at zero.
pub fn minutes_from_anchor(date: DateTime<Utc>, anchor: DateTime<Utc>) -> i64 {
    (date - anchor).num_minutes().max(0)
}

/// The `[anchor, anchor + 990 min)` window of a night.
pub fn night_window(anchor: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (anchor, anchor + Duration::minutes(NIGHT_WINDOW_MINUTES))
}

/// The entries of one night plus derived totals.
///
/// A group is never edited in place. Any change to its entries produces a new
/// group via [`NightGroup::from_entries`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NightGroup {
    anchor: DateTime<Utc>,
    entries: Vec<SleepEntry>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    ongoing: bool,
    total_minutes: i64,
}

impl NightGroup {
    /// Builds a group from the entries of one night.
    ///
    /// Entries are sorted by start. `now` stands in for the end of an ongoing
    /// entry. Returns `None` for an empty entry list.
    pub fn from_entries(
        anchor: DateTime<Utc>,
        mut entries: Vec<SleepEntry>,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        entries.sort_by_key(|entry| entry.start_time);
        let start = entries.first()?.start_time;
        let end = entries.iter().map(|entry| entry.end_or(now)).max()?;
        let ongoing = entries.iter().any(SleepEntry::is_ongoing);
        let total_minutes = entries.iter().map(|entry| entry.duration_minutes(now)).sum();
        Some(Self {
            anchor,
            entries,
            start,
            end,
            ongoing,
            total_minutes,
        })
    }

    /// Rebuilds the group with a replacement entry list, keeping the anchor.
    pub fn with_entries(&self, entries: Vec<SleepEntry>, now: DateTime<Utc>) -> Option<Self> {
        Self::from_entries(self.anchor, entries, now)
    }

    pub const fn anchor(&self) -> DateTime<Utc> {
        self.anchor
    }

    /// Entries sorted by start time.
    pub fn entries(&self) -> &[SleepEntry] {
        &self.entries
    }

    /// Earliest entry start.
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Latest entry end, or "now" at construction if the night is ongoing.
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub const fn is_ongoing(&self) -> bool {
        self.ongoing
    }

    /// Sum of each entry's own duration, gaps excluded.
    pub const fn total_minutes(&self) -> i64 {
        self.total_minutes
    }

    /// Minutes from night start to night end, gaps included.
    pub fn span_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    pub fn first(&self) -> &SleepEntry {
        &self.entries[0]
    }

    pub fn last(&self) -> &SleepEntry {
        &self.entries[self.entries.len() - 1]
    }

    /// Local calendar date the night is anchored on.
    pub fn anchor_date<Tz: TimeZone>(&self, tz: &Tz) -> NaiveDate {
        self.anchor.with_timezone(tz).date_naive()
    }
}

/// Groups entries into nights, newest night first.
pub fn group_nights<Tz: TimeZone>(
    entries: impl IntoIterator<Item = SleepEntry>,
    tz: &Tz,
    now: DateTime<Utc>,
) -> Vec<NightGroup> {
    let mut buckets: BTreeMap<DateTime<Utc>, Vec<SleepEntry>> = BTreeMap::new();
    for entry in entries {
        buckets
            .entry(night_anchor(entry.start_time, tz))
            .or_default()
            .push(entry);
    }
    buckets
        .into_iter()
        .rev()
        .filter_map(|(anchor, entries)| NightGroup::from_entries(anchor, entries, now))
        .collect()
}
