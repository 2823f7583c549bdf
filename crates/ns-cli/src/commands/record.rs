//! Recording sleep: `start`, `stop` and `add`.

use std::fmt::Display;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::TimeZone;

use super::util::{Session, format_local, format_minutes};

pub fn start<W, Tz>(writer: &mut W, session: &mut Session<'_, Tz>, at: Option<&str>) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let at = at.map_or(Ok(session.now), |s| session.parse_time(s))?;
    let entry = session
        .db
        .start_sleep(at)
        .context("failed to start sleep")?;
    tracing::info!(at = %entry.start_time, "sleep started");
    writeln!(writer, "Sleeping since {}", format_local(at, &session.tz))?;
    Ok(())
}

pub fn stop<W, Tz>(writer: &mut W, session: &mut Session<'_, Tz>, at: Option<&str>) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let at = at.map_or(Ok(session.now), |s| session.parse_time(s))?;
    let entry = session.db.stop_sleep(at).context("failed to stop sleep")?;
    tracing::info!(at = %at, "sleep stopped");
    writeln!(
        writer,
        "Woke at {} after {}",
        format_local(at, &session.tz),
        format_minutes(entry.duration_minutes(at))
    )?;
    Ok(())
}

pub fn add<W, Tz>(writer: &mut W, session: &mut Session<'_, Tz>, start: &str, end: &str) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let start = session.parse_time(start)?;
    let end = session.parse_time(end)?;
    let entry = session
        .db
        .insert_entry(start, Some(end))
        .context("failed to add sleep")?;
    writeln!(
        writer,
        "Added sleep {} -> {} ({})",
        format_local(start, &session.tz),
        format_local(end, &session.tz),
        format_minutes(entry.duration_minutes(end))
    )?;
    Ok(())
}
