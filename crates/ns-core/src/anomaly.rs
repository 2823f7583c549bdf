//! Detection of implausibly long nights and a proposed corrected end.
//!
//! A night spanning more than 24 hours almost always means a sleep was
//! started and never stopped. The fix keeps the recorded end's wall-clock
//! time and searches the first few calendar days after the start for the
//! date that gives the most plausible night length.

use chrono::{DateTime, Days, Duration, TimeZone, Utc};
use serde::Serialize;

use crate::night::{NIGHT_WINDOW_MINUTES, NightGroup, resolve_local};

/// Nights spanning more than this many minutes are anomalous.
pub const ANOMALY_THRESHOLD_MINUTES: i64 = 1440;

/// Candidates shorter than this are not considered plausible.
const MIN_PLAUSIBLE_MINUTES: i64 = 30;

/// Night length the scoring pulls towards (10 h).
const TARGET_NIGHT_MINUTES: i64 = 600;

/// Days after the start's calendar date searched for a candidate end.
const SEARCH_DAY_OFFSETS: [u64; 3] = [0, 1, 2];

/// A proposed correction for an anomalous night.
///
/// This is only a proposal. Nothing is written until the user confirms it
/// through [`NightEditor::confirm_anomaly_fix`](crate::NightEditor::confirm_anomaly_fix).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnomalyFix {
    pub current_end: DateTime<Utc>,
    pub proposed_end: DateTime<Utc>,
}

pub fn is_anomalous(start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    end - start > Duration::minutes(ANOMALY_THRESHOLD_MINUTES)
}

/// Heavy penalty past the night window, moderate penalty away from 10 h.
const fn score(span_minutes: i64) -> i64 {
    let overflow = span_minutes - NIGHT_WINDOW_MINUTES;
    let overflow = if overflow > 0 { overflow } else { 0 };
    overflow * 2 + (span_minutes - TARGET_NIGHT_MINUTES).abs()
}

/// Proposes a corrected end for a night running from `start` to `end`.
///
/// Falls back to the day after the start, at the end's clock time, when no
/// searched candidate is plausible.
pub fn propose_end_fix<Tz: TimeZone>(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    tz: &Tz,
) -> DateTime<Utc> {
    let start_date = start.with_timezone(tz).date_naive();
    let end_clock = end.with_timezone(tz).time();
    let on_day = |offset: u64| {
        start_date
            .checked_add_days(Days::new(offset))
            .map(|date| resolve_local(tz, date.and_time(end_clock)))
    };

    let best = SEARCH_DAY_OFFSETS
        .into_iter()
        .filter_map(on_day)
        .filter(|candidate| *candidate > start)
        .map(|candidate| ((candidate - start).num_minutes(), candidate))
        .filter(|(span, _)| *span >= MIN_PLAUSIBLE_MINUTES)
        .min_by_key(|(span, _)| score(*span));

    match best {
        Some((span, candidate)) => {
            tracing::debug!(%start, %end, %candidate, span, "proposed anomaly fix");
            candidate
        }
        None => on_day(1).unwrap_or(end),
    }
}

/// Returns a fix proposal when `group` is anomalous.
pub fn detect<Tz: TimeZone>(group: &NightGroup, tz: &Tz) -> Option<AnomalyFix> {
    if !is_anomalous(group.start(), group.end()) {
        return None;
    }
    Some(AnomalyFix {
        current_end: group.end(),
        proposed_end: propose_end_fix(group.start(), group.end(), tz),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::SleepEntry;
    use crate::types::EntryId;
    use chrono::FixedOffset;

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, h, m, 0).unwrap()
    }

    #[test]
    fn threshold_is_exclusive() {
        assert!(!is_anomalous(at(1, 20, 0), at(2, 20, 0)));
        assert!(is_anomalous(at(1, 20, 0), at(2, 20, 1)));
    }

    #[test]
    fn seconds_past_the_threshold_count() {
        assert!(is_anomalous(at(1, 20, 0), at(2, 20, 0) + Duration::seconds(59)));
    }

    #[test]
    fn multi_day_night_is_pulled_back_to_next_morning() {
        let fix = propose_end_fix(at(1, 20, 0), at(4, 7, 15), &Utc);
        assert_eq!(fix, at(2, 7, 15));
    }

    #[test]
    fn same_day_candidate_wins_when_plausible() {
        // Started at 01:00, the 09:30 end on the same day gives 8.5 h.
        let fix = propose_end_fix(at(2, 1, 0), at(5, 9, 30), &Utc);
        assert_eq!(fix, at(2, 9, 30));
    }

    #[test]
    fn too_short_candidates_are_skipped() {
        // 20:10 on the start day is only 10 minutes in, so a day later wins.
        let fix = propose_end_fix(at(1, 20, 0), at(4, 20, 10), &Utc);
        assert_eq!(fix, at(2, 20, 10));
    }

    #[test]
    fn fix_keeps_local_clock_time() {
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        // Local: starts Jan 1 20:00, ends Jan 4 07:15.
        let fix = propose_end_fix(at(2, 1, 0), at(4, 12, 15), &tz);
        assert_eq!(fix, at(2, 12, 15));
    }

    #[test]
    fn detect_only_flags_long_nights() {
        let id = EntryId::new("a").unwrap();
        let normal = NightGroup::from_entries(
            at(1, 17, 30),
            vec![SleepEntry::new(id.clone(), at(1, 22, 0), Some(at(2, 6, 0)))],
            at(2, 12, 0),
        )
        .unwrap();
        assert!(detect(&normal, &Utc).is_none());

        let stuck = NightGroup::from_entries(
            at(1, 17, 30),
            vec![SleepEntry::new(id, at(1, 20, 0), None)],
            at(4, 7, 15),
        )
        .unwrap();
        let fix = detect(&stuck, &Utc).unwrap();
        assert_eq!(fix.current_end, at(4, 7, 15));
        assert_eq!(fix.proposed_end, at(2, 7, 15));
    }
}
