//! Storage layer for the night sleep tracker.
//!
//! Provides persistence for sleep entries using `rusqlite` and implements
//! [`ns_core::SleepStore`] so an editor session can write straight to it.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` instance can be moved between threads but cannot be shared
//! across threads without external synchronization.
//!
//! # Schema
//!
//! Timestamps are stored as TEXT in RFC 3339 format with millisecond
//! precision and a `Z` suffix (e.g. `2024-01-15T22:30:00.000Z`), so
//! lexicographic order matches chronological order. `end_time` is NULL while
//! a sleep is ongoing.

use std::path::Path;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use ns_core::{BoundaryField, BoundaryWrite, EntryId, SleepEntry, SleepStore, ValidationError};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;
use uuid::Uuid;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for entry {entry_id}: {timestamp}")]
    TimestampParse {
        entry_id: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored ID failed validation.
    #[error("invalid entry id: {0}")]
    InvalidId(#[from] ValidationError),
    /// No entry matches the given ID or start time.
    #[error("sleep entry not found: {0}")]
    EntryNotFound(String),
    /// The write would leave an entry ending at or before its start.
    #[error("entry would end at {end} before it starts at {start}")]
    InvalidInterval { start: String, end: String },
    /// A sleep is already in progress.
    #[error("already sleeping since {since} (entry {entry_id})")]
    AlreadySleeping { entry_id: String, since: String },
    /// No sleep is in progress.
    #[error("no sleep in progress")]
    NotSleeping,
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

type EntryRow = (String, String, Option<String>);

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS sleep_entries (
                id TEXT PRIMARY KEY,
                start_time TEXT NOT NULL,
                end_time TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sleep_entries_start ON sleep_entries(start_time);
            ",
        )?;
        Ok(())
    }

    /// Inserts a new entry with a generated ID.
    pub fn insert_entry(
        &mut self,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> Result<SleepEntry, DbError> {
        validate_interval(start, end)?;
        let entry = new_entry(start, end)?;
        insert_row(&self.conn, &entry)?;
        tracing::debug!(id = %entry_label(&entry), "inserted sleep entry");
        Ok(entry)
    }

    /// Starts an ongoing sleep at `at`.
    pub fn start_sleep(&mut self, at: DateTime<Utc>) -> Result<SleepEntry, DbError> {
        if let Some(ongoing) = self.ongoing_entry()? {
            return Err(DbError::AlreadySleeping {
                entry_id: entry_label(&ongoing),
                since: format_timestamp(ongoing.start_time),
            });
        }
        self.insert_entry(at, None)
    }

    /// Ends the ongoing sleep at `at`.
    pub fn stop_sleep(&mut self, at: DateTime<Utc>) -> Result<SleepEntry, DbError> {
        let ongoing = self.ongoing_entry()?.ok_or(DbError::NotSleeping)?;
        let id = ongoing.id.clone().ok_or(DbError::NotSleeping)?;
        self.adjust_boundary(&id, BoundaryField::EndTime, at)?;
        Ok(SleepEntry {
            end_time: Some(at),
            ..ongoing
        })
    }

    /// Lists all entries ordered by start time then ID.
    pub fn list_entries(&self) -> Result<Vec<SleepEntry>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, start_time, end_time
            FROM sleep_entries
            ORDER BY start_time ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(entry_from_row(row?)?);
        }
        Ok(entries)
    }

    /// Lists entries starting within a time range.
    ///
    /// The range is inclusive of `start` and exclusive of `end`.
    pub fn list_entries_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SleepEntry>, DbError> {
        if end <= start {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(
            "
            SELECT id, start_time, end_time
            FROM sleep_entries
            WHERE start_time >= ? AND start_time < ?
            ORDER BY start_time ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map([format_timestamp(start), format_timestamp(end)], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(entry_from_row(row?)?);
        }
        Ok(entries)
    }

    /// Fetches a single entry by ID.
    pub fn get_entry(&self, id: &EntryId) -> Result<Option<SleepEntry>, DbError> {
        fetch_entry(&self.conn, id)
    }

    /// Returns the most recent entry without an end, if any.
    pub fn ongoing_entry(&self) -> Result<Option<SleepEntry>, DbError> {
        let row: Option<EntryRow> = self
            .conn
            .query_row(
                "
                SELECT id, start_time, end_time
                FROM sleep_entries
                WHERE end_time IS NULL
                ORDER BY start_time DESC
                LIMIT 1
                ",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        row.map(entry_from_row).transpose()
    }

    /// Applies boundary writes in one transaction.
    ///
    /// Each touched entry is validated after every write has been applied,
    /// so the writes of one entry may come in any order.
    fn write_boundaries<'a>(
        &mut self,
        writes: impl IntoIterator<Item = (&'a EntryId, BoundaryField, DateTime<Utc>)>,
    ) -> Result<(), DbError> {
        let tx = self.conn.transaction()?;
        let updated_at = format_timestamp(Utc::now());
        let mut touched: Vec<&EntryId> = Vec::new();
        for (entry_id, field, at) in writes {
            let sql = match field {
                BoundaryField::StartTime => {
                    "UPDATE sleep_entries SET start_time = ?, updated_at = ? WHERE id = ?"
                }
                BoundaryField::EndTime => {
                    "UPDATE sleep_entries SET end_time = ?, updated_at = ? WHERE id = ?"
                }
            };
            let changed = tx.execute(sql, params![format_timestamp(at), updated_at, entry_id.as_str()])?;
            if changed == 0 {
                return Err(DbError::EntryNotFound(entry_id.to_string()));
            }
            if !touched.contains(&entry_id) {
                touched.push(entry_id);
            }
        }
        for entry_id in touched {
            let stored = fetch_entry(&tx, entry_id)?
                .ok_or_else(|| DbError::EntryNotFound(entry_id.to_string()))?;
            validate_interval(stored.start_time, stored.end_time)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Finds the stored version of `entry`.
    ///
    /// Entries without an ID come from an optimistic overlay and are matched
    /// by their exact start time instead.
    fn resolve(&self, entry: &SleepEntry) -> Result<SleepEntry, DbError> {
        if let Some(id) = &entry.id {
            return self
                .get_entry(id)?
                .ok_or_else(|| DbError::EntryNotFound(id.to_string()));
        }
        let start = format_timestamp(entry.start_time);
        let row: Option<EntryRow> = self
            .conn
            .query_row(
                "SELECT id, start_time, end_time FROM sleep_entries WHERE start_time = ? LIMIT 1",
                [&start],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        row.map(entry_from_row)
            .transpose()?
            .ok_or(DbError::EntryNotFound(start))
    }
}

impl SleepStore for Database {
    type Error = DbError;

    fn split_entry(
        &mut self,
        target: &SleepEntry,
        at: DateTime<Utc>,
        wake_minutes: u32,
    ) -> Result<(), DbError> {
        let stored = self.resolve(target)?;
        let id = stored
            .id
            .clone()
            .ok_or_else(|| DbError::EntryNotFound(format_timestamp(target.start_time)))?;
        let second_start = at + Duration::minutes(i64::from(wake_minutes));
        validate_interval(stored.start_time, Some(at))?;
        validate_interval(second_start, stored.end_time)?;
        let second = new_entry(second_start, stored.end_time)?;

        let tx = self.conn.transaction()?;
        tx.execute(
            "UPDATE sleep_entries SET end_time = ?, updated_at = ? WHERE id = ?",
            params![format_timestamp(at), format_timestamp(Utc::now()), id.as_str()],
        )?;
        insert_row(&tx, &second)?;
        tx.commit()?;

        tracing::debug!(%id, %at, wake_minutes, "split sleep entry");
        Ok(())
    }

    fn merge_entries(&mut self, first: &SleepEntry, second: &SleepEntry) -> Result<(), DbError> {
        let first = self.resolve(first)?;
        let second = self.resolve(second)?;
        let (Some(first_id), Some(second_id)) = (first.id.clone(), second.id.clone()) else {
            return Err(DbError::EntryNotFound(format_timestamp(first.start_time)));
        };
        validate_interval(first.start_time, second.end_time)?;

        let tx = self.conn.transaction()?;
        tx.execute(
            "UPDATE sleep_entries SET end_time = ?, updated_at = ? WHERE id = ?",
            params![
                second.end_time.map(format_timestamp),
                format_timestamp(Utc::now()),
                first_id.as_str()
            ],
        )?;
        tx.execute("DELETE FROM sleep_entries WHERE id = ?", [second_id.as_str()])?;
        tx.commit()?;

        tracing::debug!(%first_id, %second_id, "merged sleep entries");
        Ok(())
    }

    fn adjust_boundary(
        &mut self,
        entry_id: &EntryId,
        field: BoundaryField,
        at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        self.write_boundaries([(entry_id, field, at)])?;
        tracing::debug!(%entry_id, %field, %at, "adjusted boundary");
        Ok(())
    }

    fn adjust_boundaries(&mut self, writes: &[BoundaryWrite]) -> Result<(), DbError> {
        self.write_boundaries(
            writes
                .iter()
                .map(|write| (&write.entry_id, write.field, write.at)),
        )?;
        tracing::debug!(count = writes.len(), "adjusted boundaries");
        Ok(())
    }

    fn delete_entries(&mut self, ids: &[EntryId]) -> Result<(), DbError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare("DELETE FROM sleep_entries WHERE id = ?")?;
            for id in ids {
                if stmt.execute([id.as_str()])? == 0 {
                    return Err(DbError::EntryNotFound(id.to_string()));
                }
            }
        }
        tx.commit()?;
        tracing::debug!(count = ids.len(), "deleted sleep entries");
        Ok(())
    }
}

fn new_entry(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Result<SleepEntry, DbError> {
    let id = EntryId::new(Uuid::new_v4().to_string())?;
    Ok(SleepEntry::new(id, start, end))
}

fn insert_row(conn: &Connection, entry: &SleepEntry) -> Result<(), DbError> {
    let now = format_timestamp(Utc::now());
    conn.execute(
        "
        INSERT INTO sleep_entries (id, start_time, end_time, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        ",
        params![
            entry.id.as_ref().map(EntryId::as_str),
            format_timestamp(entry.start_time),
            entry.end_time.map(format_timestamp),
            now,
            now,
        ],
    )?;
    Ok(())
}

fn fetch_entry(conn: &Connection, id: &EntryId) -> Result<Option<SleepEntry>, DbError> {
    let row: Option<EntryRow> = conn
        .query_row(
            "SELECT id, start_time, end_time FROM sleep_entries WHERE id = ?",
            [id.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;
    row.map(entry_from_row).transpose()
}

fn entry_label(entry: &SleepEntry) -> String {
    entry
        .id
        .as_ref()
        .map_or_else(|| "(unsaved)".to_string(), ToString::to_string)
}

fn validate_interval(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Result<(), DbError> {
    match end {
        Some(end) if end <= start => Err(DbError::InvalidInterval {
            start: format_timestamp(start),
            end: format_timestamp(end),
        }),
        _ => Ok(()),
    }
}

fn entry_from_row((id, start, end): EntryRow) -> Result<SleepEntry, DbError> {
    let start_time = parse_timestamp(&start, &id)?;
    let end_time = end
        .as_deref()
        .map(|end| parse_timestamp(end, &id))
        .transpose()?;
    Ok(SleepEntry::new(EntryId::new(id)?, start_time, end_time))
}

fn parse_timestamp(timestamp: &str, entry_id: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            entry_id: entry_id.to_string(),
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ns_core::{BoundaryKey, NightEditor, NightGroup, SchedulerConfig};

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, h, m, 0).unwrap()
    }

    fn table_columns(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .unwrap();
        stmt.query_map([], |row| row.get::<_, String>(1))
            .unwrap()
            .map(Result::unwrap)
            .collect()
    }

    #[test]
    fn open_in_memory_database() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn schema_matches_data_model() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(
            table_columns(&db.conn, "sleep_entries"),
            vec!["id", "start_time", "end_time", "created_at", "updated_at"]
        );
    }

    #[test]
    fn open_is_idempotent_on_disk() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("ns.db");
        {
            let mut db = Database::open(&path).unwrap();
            db.insert_entry(at(1, 22, 0), Some(at(2, 6, 0))).unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.list_entries().unwrap().len(), 1);
    }

    #[test]
    fn insert_rejects_inverted_interval() {
        let mut db = Database::open_in_memory().unwrap();
        let err = db.insert_entry(at(2, 6, 0), Some(at(1, 22, 0))).unwrap_err();
        assert!(matches!(err, DbError::InvalidInterval { .. }));
    }

    #[test]
    fn start_and_stop_sleep() {
        let mut db = Database::open_in_memory().unwrap();
        let started = db.start_sleep(at(1, 22, 0)).unwrap();
        assert!(started.is_ongoing());
        assert!(matches!(
            db.start_sleep(at(1, 23, 0)),
            Err(DbError::AlreadySleeping { .. })
        ));

        let stopped = db.stop_sleep(at(2, 6, 0)).unwrap();
        assert_eq!(stopped.end_time, Some(at(2, 6, 0)));
        assert!(db.ongoing_entry().unwrap().is_none());
        assert!(matches!(db.stop_sleep(at(2, 7, 0)), Err(DbError::NotSleeping)));
    }

    #[test]
    fn list_in_range_is_half_open() {
        let mut db = Database::open_in_memory().unwrap();
        db.insert_entry(at(1, 22, 0), Some(at(2, 2, 0))).unwrap();
        db.insert_entry(at(2, 3, 0), Some(at(2, 6, 0))).unwrap();

        let entries = db.list_entries_in_range(at(1, 22, 0), at(2, 3, 0)).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(db.list_entries_in_range(at(2, 3, 0), at(2, 3, 0)).unwrap().is_empty());
    }

    #[test]
    fn split_shortens_and_inserts() {
        let mut db = Database::open_in_memory().unwrap();
        let entry = db.insert_entry(at(1, 22, 0), Some(at(2, 6, 0))).unwrap();

        db.split_entry(&entry, at(2, 2, 0), 10).unwrap();

        let entries = db.list_entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, entry.id);
        assert_eq!(entries[0].end_time, Some(at(2, 2, 0)));
        assert_eq!(entries[1].start_time, at(2, 2, 10));
        assert_eq!(entries[1].end_time, Some(at(2, 6, 0)));
    }

    #[test]
    fn merge_resolves_unsaved_entry_by_start() {
        let mut db = Database::open_in_memory().unwrap();
        let entry = db.insert_entry(at(1, 22, 0), Some(at(2, 6, 0))).unwrap();
        db.split_entry(&entry, at(2, 2, 0), 10).unwrap();

        let first = SleepEntry {
            end_time: Some(at(2, 2, 0)),
            ..entry.clone()
        };
        let second = SleepEntry::unsaved(at(2, 2, 10), Some(at(2, 6, 0)));
        db.merge_entries(&first, &second).unwrap();

        let entries = db.list_entries().unwrap();
        assert_eq!(entries, vec![entry]);
    }

    #[test]
    fn adjust_validates_interval() {
        let mut db = Database::open_in_memory().unwrap();
        let entry = db.insert_entry(at(1, 22, 0), Some(at(2, 6, 0))).unwrap();
        let id = entry.id.unwrap();

        db.adjust_boundary(&id, BoundaryField::StartTime, at(1, 21, 30))
            .unwrap();
        let err = db
            .adjust_boundary(&id, BoundaryField::EndTime, at(1, 21, 0))
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidInterval { .. }));

        let stored = db.get_entry(&id).unwrap().unwrap();
        assert_eq!(stored.start_time, at(1, 21, 30));
        assert_eq!(stored.end_time, Some(at(2, 6, 0)));
    }

    #[test]
    fn delete_is_all_or_nothing() {
        let mut db = Database::open_in_memory().unwrap();
        let a = db.insert_entry(at(1, 22, 0), Some(at(2, 2, 0))).unwrap();
        let missing = EntryId::new("missing").unwrap();

        let err = db
            .delete_entries(&[a.id.clone().unwrap(), missing])
            .unwrap_err();
        assert!(matches!(err, DbError::EntryNotFound(_)));
        assert_eq!(db.list_entries().unwrap().len(), 1);

        db.delete_entries(&[a.id.unwrap()]).unwrap();
        assert!(db.list_entries().unwrap().is_empty());
    }

    #[test]
    fn editor_session_writes_through_to_sqlite() {
        let mut db = Database::open_in_memory().unwrap();
        db.insert_entry(at(1, 22, 0), Some(at(2, 6, 0))).unwrap();
        let now = at(2, 12, 0);
        let group = NightGroup::from_entries(at(1, 17, 30), db.list_entries().unwrap(), now).unwrap();
        let mut editor = NightEditor::new(group, SchedulerConfig::default());

        assert!(editor.move_night_start(at(1, 23, 0), now).is_accepted());
        let report = editor.commit_pending(&mut db);
        assert_eq!(report.written.len(), 1);
        assert!(!report.has_failures());

        editor.split(at(2, 2, 0), 15, now, &mut db).unwrap();
        let reloaded =
            NightGroup::from_entries(at(1, 17, 30), db.list_entries().unwrap(), now).unwrap();
        editor.replace_authoritative(reloaded);

        let entries = editor.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].start_time, at(1, 23, 0));
        assert!(entries.iter().all(SleepEntry::is_persisted));
        assert_eq!(editor.total_wake_seconds(), 15 * 60);
    }

    fn editor_over(db: &Database, now: DateTime<Utc>) -> NightEditor {
        let group = NightGroup::from_entries(at(1, 17, 30), db.list_entries().unwrap(), now).unwrap();
        NightEditor::new(group, SchedulerConfig::default())
    }

    #[test]
    fn batch_is_checked_after_every_write() {
        let mut db = Database::open_in_memory().unwrap();
        let entry = db.insert_entry(at(1, 22, 0), Some(at(2, 6, 0))).unwrap();
        let id = entry.id.unwrap();
        let write = |field: BoundaryField, at: DateTime<Utc>| BoundaryWrite {
            key: match field {
                BoundaryField::StartTime => BoundaryKey::NightStart(id.clone()),
                BoundaryField::EndTime => BoundaryKey::NightEnd(id.clone()),
            },
            entry_id: id.clone(),
            field,
            at,
        };

        // The start alone would pass the stored end.
        db.adjust_boundaries(&[
            write(BoundaryField::StartTime, at(2, 8, 0)),
            write(BoundaryField::EndTime, at(2, 11, 0)),
        ])
        .unwrap();

        let stored = db.get_entry(&id).unwrap().unwrap();
        assert_eq!(stored.start_time, at(2, 8, 0));
        assert_eq!(stored.end_time, Some(at(2, 11, 0)));
    }

    #[test]
    fn failed_batch_leaves_every_entry_untouched() {
        let mut db = Database::open_in_memory().unwrap();
        let a = db.insert_entry(at(1, 22, 0), Some(at(2, 2, 0))).unwrap();
        let a_id = a.id.clone().unwrap();
        let missing = EntryId::new("missing").unwrap();

        let err = db
            .adjust_boundaries(&[
                BoundaryWrite {
                    key: BoundaryKey::NightStart(a_id.clone()),
                    entry_id: a_id,
                    field: BoundaryField::StartTime,
                    at: at(1, 13, 0),
                },
                BoundaryWrite {
                    key: BoundaryKey::NightEnd(missing.clone()),
                    entry_id: missing,
                    field: BoundaryField::EndTime,
                    at: at(1, 21, 0),
                },
            ])
            .unwrap_err();

        assert!(matches!(err, DbError::EntryNotFound(_)));
        assert_eq!(db.list_entries().unwrap(), vec![a]);
    }

    #[test]
    fn both_ends_edited_in_one_burst_are_kept() {
        let mut db = Database::open_in_memory().unwrap();
        db.insert_entry(at(1, 22, 0), Some(at(2, 6, 0))).unwrap();
        let now = at(2, 12, 0);
        let mut editor = editor_over(&db, now);

        assert!(editor.move_night_end(at(2, 10, 0), now).is_accepted());
        assert!(
            editor
                .move_night_start(at(2, 8, 0), now + Duration::milliseconds(100))
                .is_accepted()
        );
        assert!(
            editor
                .move_night_end(at(2, 11, 0), now + Duration::milliseconds(200))
                .is_accepted()
        );
        let report = editor.commit_pending(&mut db);

        assert!(!report.has_failures());
        let entries = db.list_entries().unwrap();
        assert_eq!(entries[0].start_time, at(2, 8, 0));
        assert_eq!(entries[0].end_time, Some(at(2, 11, 0)));
        assert_eq!(editor.group().start(), at(2, 8, 0));
        assert_eq!(editor.group().end(), at(2, 11, 0));
    }

    #[test]
    fn due_start_brings_its_pending_end_along() {
        let mut db = Database::open_in_memory().unwrap();
        db.insert_entry(at(1, 22, 0), Some(at(2, 6, 0))).unwrap();
        let now = at(2, 12, 0);
        let mut editor = editor_over(&db, now);

        editor.move_night_end(at(2, 10, 0), now);
        editor.move_night_start(at(2, 8, 0), now + Duration::milliseconds(100));
        editor.move_night_end(at(2, 11, 0), now + Duration::milliseconds(200));
        let report = editor.flush(now + Duration::milliseconds(350), &mut db);

        assert_eq!(report.written.len(), 2);
        assert!(!editor.is_saving());
        let entries = db.list_entries().unwrap();
        assert_eq!(entries[0].start_time, at(2, 8, 0));
        assert_eq!(entries[0].end_time, Some(at(2, 11, 0)));
    }

    #[test]
    fn linked_shift_of_a_split_night_is_stored() {
        let mut db = Database::open_in_memory().unwrap();
        db.insert_entry(at(1, 22, 0), Some(at(2, 2, 0))).unwrap();
        db.insert_entry(at(2, 2, 30), Some(at(2, 6, 0))).unwrap();
        let now = at(2, 12, 0);
        let mut editor = editor_over(&db, now);

        assert!(editor.move_night_end(at(1, 21, 0), now).is_accepted());
        let report = editor.commit_pending(&mut db);

        assert_eq!(report.written.len(), 4);
        let spans: Vec<_> = db
            .list_entries()
            .unwrap()
            .into_iter()
            .map(|entry| (entry.start_time, entry.end_time))
            .collect();
        assert_eq!(spans, vec![
            (at(1, 13, 0), Some(at(1, 17, 0))),
            (at(1, 17, 30), Some(at(1, 21, 0))),
        ]);
    }
}
