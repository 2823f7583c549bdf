//! Split command: insert a wake phase into a sleep entry.

use std::fmt::Display;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::{NaiveDate, TimeZone};

use super::nights::write_night;
use super::util::{Session, format_clock};

pub fn run<W, Tz>(
    writer: &mut W,
    session: &mut Session<'_, Tz>,
    night: NaiveDate,
    at: &str,
    wake_minutes: u32,
) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let at = session.parse_time(at)?;
    let mut editor = session.editor(night)?;
    editor
        .split(at, wake_minutes, session.now, &mut *session.db)
        .with_context(|| format!("failed to split at {}", format_clock(at, &session.tz)))?;

    let reloaded = session.load_night(night)?;
    writeln!(
        writer,
        "Added a {wake_minutes} minute wake phase at {}",
        format_clock(at, &session.tz)
    )?;
    write_night(writer, &reloaded, &session.tz, session.now)?;
    editor.close();
    Ok(())
}
