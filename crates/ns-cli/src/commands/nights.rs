//! Nights command: recent nights with their wake phases.

use std::fmt::Display;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use ns_core::{AnomalyFix, NightGroup, SleepEntry, detect, group_nights, total_wake_seconds, wake_phases};
use serde::Serialize;

use super::util::{Session, format_clock, format_local, format_minutes};

#[derive(Serialize)]
struct JsonNight<'a> {
    date: NaiveDate,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    ongoing: bool,
    asleep_minutes: i64,
    awake_seconds: i64,
    entries: &'a [SleepEntry],
    wake_phases: Vec<JsonWake>,
    anomaly: Option<AnomalyFix>,
}

#[derive(Serialize)]
struct JsonWake {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    duration_seconds: i64,
}

pub fn run<W, Tz>(writer: &mut W, session: &Session<'_, Tz>, json: bool, limit: usize) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let entries = session.db.list_entries().context("failed to list entries")?;
    let mut nights = group_nights(entries, &session.tz, session.now);
    nights.truncate(limit);

    if json {
        let output = format_nights_json(&nights, &session.tz)?;
        writeln!(writer, "{output}")?;
        return Ok(());
    }

    if nights.is_empty() {
        writeln!(writer, "No sleep recorded.")?;
        return Ok(());
    }

    for (i, night) in nights.iter().enumerate() {
        if i > 0 {
            writeln!(writer)?;
        }
        write_night(writer, night, &session.tz, session.now)?;
    }
    Ok(())
}

/// Writes one night as text: entries interleaved with numbered wake phases.
pub fn write_night<W, Tz>(writer: &mut W, night: &NightGroup, tz: &Tz, now: DateTime<Utc>) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let phases = wake_phases(night.entries());
    writeln!(writer, "Night of {}", night.anchor_date(tz))?;

    for entry in night.entries() {
        if let Some((i, phase)) = phases
            .iter()
            .enumerate()
            .find(|(_, phase)| phase.next_entry == *entry)
        {
            writeln!(
                writer,
                "  wake {} {} -> {}  {}",
                i + 1,
                format_clock(phase.start, tz),
                format_clock(phase.end, tz),
                format_minutes(phase.duration_minutes())
            )?;
        }
        let end = entry
            .end_time
            .map_or_else(|| "...".to_string(), |end| format_clock(end, tz));
        writeln!(
            writer,
            "  sleep  {} -> {}  {}",
            format_clock(entry.start_time, tz),
            end,
            format_minutes(entry.duration_minutes(now))
        )?;
    }

    writeln!(
        writer,
        "  total: {} asleep, {} awake{}",
        format_minutes(night.total_minutes()),
        format_minutes(total_wake_seconds(&phases) / 60),
        if night.is_ongoing() { " (ongoing)" } else { "" }
    )?;

    if let Some(fix) = detect(night, tz) {
        writeln!(
            writer,
            "  anomaly: spans {}, proposed end {} (ns fix --night {})",
            format_minutes(night.span_minutes()),
            format_local(fix.proposed_end, tz),
            night.anchor_date(tz)
        )?;
    }
    Ok(())
}

fn format_nights_json<Tz: TimeZone>(nights: &[NightGroup], tz: &Tz) -> Result<String> {
    let nights: Vec<JsonNight<'_>> = nights
        .iter()
        .map(|night| {
            let phases = wake_phases(night.entries());
            JsonNight {
                date: night.anchor_date(tz),
                start: night.start(),
                end: night.end(),
                ongoing: night.is_ongoing(),
                asleep_minutes: night.total_minutes(),
                awake_seconds: total_wake_seconds(&phases),
                entries: night.entries(),
                wake_phases: phases
                    .into_iter()
                    .map(|phase| JsonWake {
                        start: phase.start,
                        end: phase.end,
                        duration_seconds: phase.duration_seconds,
                    })
                    .collect(),
                anomaly: detect(night, tz),
            }
        })
        .collect();
    Ok(serde_json::to_string_pretty(&nights)?)
}
