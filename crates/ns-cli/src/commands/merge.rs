//! Merge command: remove a wake phase by joining its neighbours.

use std::fmt::Display;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::{NaiveDate, TimeZone};

use super::nights::write_night;
use super::util::{Session, format_clock, format_minutes, wake_phase};

pub fn run<W, Tz>(writer: &mut W, session: &mut Session<'_, Tz>, night: NaiveDate, wake: usize) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut editor = session.editor(night)?;
    let phase = wake_phase(&editor.wake_phases(), wake)?;
    editor
        .merge(&phase, session.now, &mut *session.db)
        .context("failed to merge")?;

    let reloaded = session.load_night(night)?;
    writeln!(
        writer,
        "Removed wake phase {} -> {} ({})",
        format_clock(phase.start, &session.tz),
        format_clock(phase.end, &session.tz),
        format_minutes(phase.duration_minutes())
    )?;
    write_night(writer, &reloaded, &session.tz, session.now)?;
    editor.close();
    Ok(())
}
