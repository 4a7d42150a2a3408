//! sqlite-adapter: SQLite implementation of the EventRepository port.
//!
//! Purpose
//! - Provide the file-based store behind the event site.
//! - Implements the `EventRepository` trait from the `domain` crate.
//! - Owns the schema: `create_schema()` runs on open and is idempotent,
//!   `drop_schema()` removes both tables (used by tests and resets).
//!
//! Notes
//! - Uses `rusqlite` with the `bundled` feature for portability.
//! - Every operation is one parameterized statement; caller values are never
//!   spliced into SQL text.
//! - The connection sits behind a mutex; the guard is released on every exit
//!   path, including errors.
//! - Stores timestamps as seconds since UNIX_EPOCH.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use domain::{
    CoreError, Event, EventInput, EventRepository, Registration, RegistrationInput, Slug,
};
use rusqlite::{params, Connection};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        description TEXT NOT NULL DEFAULT '',
        created INTEGER NOT NULL,
        updated INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS registrations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        comment TEXT NOT NULL DEFAULT '',
        event INTEGER NOT NULL REFERENCES events(id),
        created INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_registrations_event ON registrations(event);
"#;

const DROP_SCHEMA: &str = r#"
    DROP TABLE IF EXISTS registrations;
    DROP TABLE IF EXISTS events;
"#;

const EVENT_COLUMNS: &str = "id, name, slug, description, created, updated";
const REGISTRATION_COLUMNS: &str = "id, name, comment, event, created";

/// SQLite-backed event store.
pub struct SqliteRepo {
    conn: Mutex<Connection>,
}

impl SqliteRepo {
    /// Open (or create) a SQLite database at the given path and ensure schema.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        let conn = Connection::open(path).map_err(map_sqerr)?;
        Self::with_connection(conn)
    }

    /// Like `new`, but creates the parent directory first.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        if let Some(dir) = path.as_ref().parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)
                    .map_err(|e| CoreError::Repository(format!("create db dir: {e}")))?;
            }
        }
        Self::new(path)
    }

    fn with_connection(conn: Connection) -> Result<Self, CoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(map_sqerr)?;
        let repo = Self {
            conn: Mutex::new(conn),
        };
        repo.create_schema()?;
        Ok(repo)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, CoreError> {
        self.conn
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))
    }

    pub fn create_schema(&self) -> Result<(), CoreError> {
        self.conn()?.execute_batch(SCHEMA).map_err(map_sqerr)
    }

    pub fn drop_schema(&self) -> Result<(), CoreError> {
        self.conn()?.execute_batch(DROP_SCHEMA).map_err(map_sqerr)
    }
}

fn map_sqerr<E: std::fmt::Display>(e: E) -> CoreError {
    CoreError::Repository(format!("sqlite error: {e}"))
}

// A UNIQUE(slug) hit means the name is taken; anything else is a store error.
fn map_write_err(e: rusqlite::Error) -> CoreError {
    if let rusqlite::Error::SqliteFailure(err, _) = &e {
        if err.code == rusqlite::ErrorCode::ConstraintViolation
            && err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        {
            return CoreError::AlreadyExists;
        }
    }
    map_sqerr(e)
}

fn system_time_to_secs(t: SystemTime) -> i64 {
    t.duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs() as i64
}

fn secs_to_system_time(secs: i64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs.max(0) as u64)
}

fn row_to_event(row: &rusqlite::Row) -> Result<Event, CoreError> {
    let id: i64 = row.get(0).map_err(map_sqerr)?;
    let name: String = row.get(1).map_err(map_sqerr)?;
    let slug: String = row.get(2).map_err(map_sqerr)?;
    let description: String = row.get(3).map_err(map_sqerr)?;
    let created: i64 = row.get(4).map_err(map_sqerr)?;
    let updated: i64 = row.get(5).map_err(map_sqerr)?;

    let slug =
        Slug::new(slug).map_err(|e| CoreError::Repository(format!("bad slug in db: {e}")))?;
    Ok(Event {
        id,
        name,
        slug,
        description,
        created: secs_to_system_time(created),
        updated: secs_to_system_time(updated),
    })
}

fn row_to_registration(row: &rusqlite::Row) -> Result<Registration, CoreError> {
    let id: i64 = row.get(0).map_err(map_sqerr)?;
    let name: String = row.get(1).map_err(map_sqerr)?;
    let comment: String = row.get(2).map_err(map_sqerr)?;
    let event: i64 = row.get(3).map_err(map_sqerr)?;
    let created: i64 = row.get(4).map_err(map_sqerr)?;
    Ok(Registration {
        id,
        name,
        comment,
        event,
        created: secs_to_system_time(created),
    })
}

impl EventRepository for SqliteRepo {
    fn create_event(&self, input: &EventInput, at: SystemTime) -> Result<Event, CoreError> {
        let slug = Slug::from_name(&input.name)?;
        let conn = self.conn()?;
        let sql = format!(
            "INSERT INTO events(name, slug, description, created, updated) VALUES (?1, ?2, ?3, ?4, ?4) RETURNING {EVENT_COLUMNS}"
        );
        let mut stmt = conn.prepare(&sql).map_err(map_sqerr)?;
        let mut rows = stmt
            .query(params![
                input.name,
                slug.as_str(),
                input.description,
                system_time_to_secs(at)
            ])
            .map_err(map_write_err)?;
        let row = rows.next().map_err(map_write_err)?;
        match row {
            Some(row) => row_to_event(row),
            None => Err(CoreError::Repository("insert returned no row".into())),
        }
    }

    fn edit_event(
        &self,
        old_slug: &Slug,
        input: &EventInput,
        at: SystemTime,
    ) -> Result<Event, CoreError> {
        let slug = Slug::from_name(&input.name)?;
        let conn = self.conn()?;
        let sql = format!(
            "UPDATE events SET name = ?1, slug = ?2, description = ?3, updated = ?4 WHERE slug = ?5 RETURNING {EVENT_COLUMNS}"
        );
        let mut stmt = conn.prepare(&sql).map_err(map_sqerr)?;
        let mut rows = stmt
            .query(params![
                input.name,
                slug.as_str(),
                input.description,
                system_time_to_secs(at),
                old_slug.as_str()
            ])
            .map_err(map_write_err)?;
        let row = rows.next().map_err(map_write_err)?;
        match row {
            Some(row) => row_to_event(row),
            None => Err(CoreError::NotFound),
        }
    }

    fn list_events(&self) -> Result<Vec<Event>, CoreError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!("SELECT {EVENT_COLUMNS} FROM events ORDER BY id"))
            .map_err(map_sqerr)?;
        let mut rows = stmt.query([]).map_err(map_sqerr)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(map_sqerr)? {
            out.push(row_to_event(row)?);
        }
        Ok(out)
    }

    fn get_event(&self, slug: &Slug) -> Result<Option<Event>, CoreError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE slug = ?1"))
            .map_err(map_sqerr)?;
        let mut rows = stmt.query(params![slug.as_str()]).map_err(map_sqerr)?;
        let row = rows.next().map_err(map_sqerr)?;
        row.map(row_to_event).transpose()
    }

    fn register_for_event(
        &self,
        input: &RegistrationInput,
        event_id: i64,
        at: SystemTime,
    ) -> Result<Registration, CoreError> {
        let conn = self.conn()?;
        let sql = format!(
            "INSERT INTO registrations(name, comment, event, created) VALUES (?1, ?2, ?3, ?4) RETURNING {REGISTRATION_COLUMNS}"
        );
        let mut stmt = conn.prepare(&sql).map_err(map_sqerr)?;
        let mut rows = stmt
            .query(params![
                input.name,
                input.comment,
                event_id,
                system_time_to_secs(at)
            ])
            .map_err(map_sqerr)?;
        let row = rows.next().map_err(map_sqerr)?;
        match row {
            Some(row) => row_to_registration(row),
            None => Err(CoreError::Repository("insert returned no row".into())),
        }
    }

    fn registrations_for_event(&self, event_id: i64) -> Result<Vec<Registration>, CoreError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE event = ?1 ORDER BY id"
            ))
            .map_err(map_sqerr)?;
        let mut rows = stmt.query(params![event_id]).map_err(map_sqerr)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(map_sqerr)? {
            out.push(row_to_registration(row)?);
        }
        Ok(out)
    }
}
