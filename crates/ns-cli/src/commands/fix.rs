//! Fix command: propose, and optionally apply, an end for a night that was
//! never stopped.

use std::fmt::Display;
use std::io::Write;

use anyhow::Result;
use chrono::{NaiveDate, TimeZone};
use ns_core::EditOutcome;

use super::util::{Session, format_local, format_minutes};

pub fn run<W, Tz>(writer: &mut W, session: &mut Session<'_, Tz>, night: NaiveDate, apply: bool) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut editor = session.editor(night)?;
    let span = format_minutes(editor.group().span_minutes());
    let Some(fix) = editor.anomaly_fix(&session.tz) else {
        writeln!(writer, "Night of {night} looks fine ({span}).")?;
        return Ok(());
    };

    writeln!(writer, "Night of {night} spans {span}.")?;
    writeln!(
        writer,
        "Proposed end: {} (currently {})",
        format_local(fix.proposed_end, &session.tz),
        format_local(fix.current_end, &session.tz)
    )?;

    if !apply {
        writeln!(writer, "Run again with --apply to save it.")?;
        return Ok(());
    }

    if let EditOutcome::Rejected(reason) = editor.confirm_anomaly_fix(&fix, session.now) {
        anyhow::bail!("cannot apply fix: {reason}");
    }
    session.commit(&mut editor)?;
    editor.close();
    writeln!(writer, "Saved.")?;
    Ok(())
}
