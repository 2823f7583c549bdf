//! Shared utilities for CLI commands.

use std::fmt::Display;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use ns_core::{FlushReport, NightEditor, NightGroup, SchedulerConfig, WakePhase, anchor_for_date};
use ns_db::Database;
use regex::Regex;

/// Pre-compiled regex for relative time parsing.
static RELATIVE_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s+(minute|hour|day|week)s?\s+ago$").unwrap());

/// Conservative bounds for relative time parsing (~1000 years in minutes).
const MAX_RELATIVE_MINUTES: i64 = 1000 * 365 * 24 * 60;

const LOCAL_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Everything a command needs: the store, the display zone and a fixed "now".
pub struct Session<'a, Tz: TimeZone> {
    pub db: &'a mut Database,
    pub tz: Tz,
    pub now: DateTime<Utc>,
    pub scheduler: SchedulerConfig,
}

impl<Tz: TimeZone> Session<'_, Tz> {
    /// Parses a user-supplied time in this session's zone.
    pub fn parse_time(&self, s: &str) -> Result<DateTime<Utc>> {
        parse_datetime(s, &self.tz, self.now)
    }

    /// Loads the night anchored on `date` from the store.
    pub fn load_night(&self, date: NaiveDate) -> Result<NightGroup> {
        let anchor = anchor_for_date(date, &self.tz);
        let next_anchor = date
            .succ_opt()
            .map_or(anchor + Duration::days(1), |next| anchor_for_date(next, &self.tz));
        let entries = self
            .db
            .list_entries_in_range(anchor, next_anchor)
            .with_context(|| format!("failed to load night of {date}"))?;
        tracing::debug!(%date, count = entries.len(), "loaded night");
        NightGroup::from_entries(anchor, entries, self.now)
            .with_context(|| format!("no sleep recorded for the night of {date}"))
    }

    /// Opens an editing session on the night anchored on `date`.
    pub fn editor(&self, date: NaiveDate) -> Result<NightEditor> {
        Ok(NightEditor::new(self.load_night(date)?, self.scheduler))
    }

    /// Writes every pending edit of `editor` as one batch.
    pub fn commit(&mut self, editor: &mut NightEditor) -> Result<FlushReport> {
        let report = editor.commit_pending(&mut *self.db);
        if let Some(err) = &report.error {
            let keys: Vec<String> = report.failed.iter().map(ToString::to_string).collect();
            anyhow::bail!("failed to save {}: {err}", keys.join(", "));
        }
        Ok(report)
    }
}

/// Parse a datetime string as ISO 8601, local wall-clock, or relative time.
///
/// Supports:
/// - ISO 8601: "2026-01-15T10:30:00Z"
/// - Local: "2026-01-15 10:30" in `tz`
/// - "now"
/// - Relative: "2 hours ago", "30 minutes ago", "1 day ago", "1 week ago"
pub fn parse_datetime<Tz: TimeZone>(s: &str, tz: &Tz, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(local) = NaiveDateTime::parse_from_str(s, LOCAL_FORMAT) {
        return tz
            .from_local_datetime(&local)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .with_context(|| format!("{s} does not exist in the local time zone"));
    }

    if s.eq_ignore_ascii_case("now") {
        return Ok(now);
    }

    let Some(caps) = RELATIVE_TIME_RE.captures(s) else {
        anyhow::bail!(
            "Invalid datetime: {s}. Use ISO 8601 (e.g., 2026-01-15T10:30:00Z), local (e.g., '2026-01-15 22:30') or relative (e.g., '2 hours ago')"
        );
    };

    let n: i64 = caps[1]
        .parse()
        .context("failed to parse number in relative time")?;

    let (max_for_unit, minutes_per_unit) = match &caps[2] {
        "minute" => (MAX_RELATIVE_MINUTES, 1),
        "hour" => (MAX_RELATIVE_MINUTES / 60, 60),
        "day" => (MAX_RELATIVE_MINUTES / (60 * 24), 60 * 24),
        "week" => (MAX_RELATIVE_MINUTES / (60 * 24 * 7), 60 * 24 * 7),
        unit => anyhow::bail!("Unknown time unit: {unit}"),
    };

    if n > max_for_unit {
        anyhow::bail!("Relative time value too large: {n} {}", &caps[2]);
    }

    Ok(now - Duration::minutes(n * minutes_per_unit))
}

/// Picks a wake phase by its 1-based number.
pub fn wake_phase(phases: &[WakePhase], number: usize) -> Result<WakePhase> {
    number
        .checked_sub(1)
        .and_then(|index| phases.get(index))
        .cloned()
        .with_context(|| match phases.len() {
            0 => "this night has no wake phases".to_string(),
            len => format!("wake phase {number} does not exist (night has {len})"),
        })
}

/// Formats minutes as hours and minutes (e.g., "2h 30m").
pub fn format_minutes(minutes: i64) -> String {
    if minutes < 0 {
        return "0m".to_string();
    }
    let hours = minutes / 60;
    let minutes = minutes % 60;

    if hours >= 1 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Local date and clock time, e.g. "2024-01-15 22:30".
pub fn format_local<Tz>(at: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    at.with_timezone(tz).format(LOCAL_FORMAT).to_string()
}

/// Local clock time only, e.g. "22:30".
pub fn format_clock<Tz>(at: DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    at.with_timezone(tz).format("%H:%M").to_string()
}
