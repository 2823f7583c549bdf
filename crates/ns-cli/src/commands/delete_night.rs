//! Delete-night command.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{NaiveDate, TimeZone};

use super::util::Session;

pub fn run<W, Tz>(writer: &mut W, session: &mut Session<'_, Tz>, night: NaiveDate) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
{
    let mut editor = session.editor(night)?;
    let deleted = editor
        .delete_night(&mut *session.db)
        .with_context(|| format!("failed to delete night of {night}"))?;
    writeln!(
        writer,
        "Deleted {deleted} {} from the night of {night}",
        if deleted == 1 { "entry" } else { "entries" }
    )?;
    Ok(())
}
