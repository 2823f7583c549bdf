//! Adjust command: move one edge of a night.

use std::fmt::Display;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::{NaiveDate, TimeZone};
use ns_core::EditOutcome;

use super::nights::write_night;
use super::util::{Session, format_local, wake_phase};
use crate::Edge;

pub fn run<W, Tz>(
    writer: &mut W,
    session: &mut Session<'_, Tz>,
    edge: Edge,
    night: NaiveDate,
    wake: Option<usize>,
    to: &str,
) -> Result<()>
where
    W: Write,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let to = session.parse_time(to)?;
    let mut editor = session.editor(night)?;
    let now = session.now;

    let outcome = match edge {
        Edge::NightStart => editor.move_night_start(to, now),
        Edge::NightEnd => editor.move_night_end(to, now),
        Edge::WakeStart | Edge::WakeEnd => {
            let number = wake.context("--wake is required for wake edges")?;
            let phase = wake_phase(&editor.wake_phases(), number)?;
            if edge == Edge::WakeStart {
                editor.move_wake_start(&phase, to, now)
            } else {
                editor.move_wake_end(&phase, to, now)
            }
        }
    };
    if let EditOutcome::Rejected(reason) = outcome {
        anyhow::bail!("cannot move {edge} to {}: {reason}", format_local(to, &session.tz));
    }

    let report = session.commit(&mut editor)?;
    tracing::debug!(writes = report.written.len(), "adjust committed");

    let night = session.load_night(night)?;
    writeln!(writer, "Moved {edge} to {}", format_local(to, &session.tz))?;
    write_night(writer, &night, &session.tz, now)?;
    editor.close();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use insta::assert_snapshot;
    use ns_core::SchedulerConfig;
    use ns_db::Database;

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, h, m, 0).unwrap()
    }

    fn night() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn adjust(db: &mut Database, edge: Edge, wake: Option<usize>, to: &str) -> Result<String> {
        let mut session = Session {
            db,
            tz: Utc,
            now: at(2, 12, 0),
            scheduler: SchedulerConfig::default(),
        };
        let mut output = Vec::new();
        run(&mut output, &mut session, edge, night(), wake, to)?;
        Ok(String::from_utf8(output).unwrap())
    }

    fn two_entry_db() -> Database {
        let mut db = Database::open_in_memory().unwrap();
        db.insert_entry(at(1, 22, 0), Some(at(2, 2, 0))).unwrap();
        db.insert_entry(at(2, 2, 30), Some(at(2, 6, 0))).unwrap();
        db
    }

    #[test]
    fn moving_wake_end_persists() {
        let mut db = two_entry_db();
        let output = adjust(&mut db, Edge::WakeEnd, Some(1), "2024-01-02 02:15").unwrap();
        assert_snapshot!(output, @r"
        Moved wake end to 2024-01-02 02:15
        Night of 2024-01-01
          sleep  22:00 -> 02:00  4h 0m
          wake 1 02:00 -> 02:15  15m
          sleep  02:15 -> 06:00  3h 45m
          total: 7h 45m asleep, 15m awake
        ");
        assert_eq!(db.list_entries().unwrap()[1].start_time, at(2, 2, 15));
    }

    #[test]
    fn moving_night_start_keeps_end() {
        let mut db = Database::open_in_memory().unwrap();
        db.insert_entry(at(1, 22, 0), Some(at(2, 6, 0))).unwrap();

        adjust(&mut db, Edge::NightStart, None, "2024-01-01 23:00").unwrap();

        let entries = db.list_entries().unwrap();
        assert_eq!(entries[0].start_time, at(1, 23, 0));
        assert_eq!(entries[0].end_time, Some(at(2, 6, 0)));
    }

    #[test]
    fn night_start_past_the_end_shifts_whole_night() {
        let mut db = Database::open_in_memory().unwrap();
        db.insert_entry(at(1, 22, 0), Some(at(2, 6, 0))).unwrap();

        adjust(&mut db, Edge::NightStart, None, "2024-01-02 07:00").unwrap();

        let entries = db.list_entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].start_time, at(2, 7, 0));
        assert_eq!(entries[0].end_time, Some(at(2, 15, 0)));
    }

    #[test]
    fn rejected_edit_writes_nothing() {
        let mut db = two_entry_db();
        let err = adjust(&mut db, Edge::WakeStart, Some(1), "2024-01-02 02:30").unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot move wake start to 2024-01-02 02:30: out of bounds"
        );
        assert_eq!(db.list_entries().unwrap()[0].end_time, Some(at(2, 2, 0)));
    }

    #[test]
    fn wake_edges_need_a_phase_number() {
        let mut db = two_entry_db();
        assert!(adjust(&mut db, Edge::WakeEnd, None, "2024-01-02 02:15").is_err());
        assert!(adjust(&mut db, Edge::WakeEnd, Some(2), "2024-01-02 02:15").is_err());
    }
}
