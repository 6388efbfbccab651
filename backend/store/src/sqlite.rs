use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use tracing::{debug, info};

use heartlog_core::{Event, EventStore, EventType, HeartlogError};

const IN_MEMORY_PATH: &str = ":memory:";

/// SQLite-backed event store.
///
/// `created_at` is written as fixed-width RFC 3339 UTC text, so ordering by
/// the column is chronological.
pub struct SqliteEventStore {
    conn: Mutex<Connection>,
}

impl SqliteEventStore {
    /// Open or create the store at the given path. `:memory:` opens a
    /// private in-memory database.
    pub fn open(path: &str) -> Result<Self> {
        if path == IN_MEMORY_PATH {
            return Self::in_memory();
        }

        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .context("Failed to enable WAL mode")?;
        let store = Self::init(conn)?;
        info!(path = %path, "Event store opened");
        Ok(store)
    }

    /// Create an in-memory store.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory SQLite")?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                origin TEXT NOT NULL,
                event_type TEXT NOT NULL,
                body TEXT NOT NULL,
                owner TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_events_type_created
                ON events(event_type, created_at);",
        )
        .context("Failed to create events schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, HeartlogError> {
        self.conn
            .lock()
            .map_err(|_| HeartlogError::Persistence("connection mutex poisoned".into()))
    }

    /// Count all stored events.
    pub fn count(&self) -> Result<usize, HeartlogError> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))
            .map_err(HeartlogError::persistence)?;
        Ok(count as usize)
    }
}

type RawRow = (i64, String, String, String, String, String);

fn decode_row(raw: RawRow) -> Result<Event, HeartlogError> {
    let (id, origin, event_type, body, owner, created_at) = raw;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| HeartlogError::Persistence(format!("bad created_at for event {id}: {e}")))?
        .with_timezone(&Utc);

    Ok(Event {
        id: Some(id),
        origin,
        event_type: event_type.parse()?,
        body,
        owner,
        created_at,
    })
}

impl EventStore for SqliteEventStore {
    fn insert(
        &self,
        origin: &str,
        event_type: EventType,
        body: &str,
        owner: &str,
    ) -> Result<(), HeartlogError> {
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        self.conn()?
            .execute(
                "INSERT INTO events (origin, event_type, body, owner, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![origin, event_type.as_str(), body, owner, created_at],
            )
            .map_err(HeartlogError::persistence)?;
        Ok(())
    }

    fn find(&self, event_type: EventType) -> Result<Vec<Event>, HeartlogError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, origin, event_type, body, owner, created_at
                 FROM events WHERE event_type = ?1
                 ORDER BY created_at DESC, id DESC",
            )
            .map_err(HeartlogError::persistence)?;

        let rows = stmt
            .query_map(params![event_type.as_str()], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })
            .map_err(HeartlogError::persistence)?;

        let mut events = Vec::new();
        for raw in rows {
            let raw: RawRow = raw.map_err(HeartlogError::persistence)?;
            events.push(decode_row(raw)?);
        }

        debug!(event_type = %event_type, count = events.len(), "Loaded events");
        Ok(events)
    }

    fn clear_all(&self) -> Result<(), HeartlogError> {
        let removed = self
            .conn()?
            .execute("DELETE FROM events", [])
            .map_err(HeartlogError::persistence)?;
        info!(removed, "Cleared all events");
        Ok(())
    }
}
