use jules_types::Record;
use rusqlite::Connection;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

use super::{RecordIter, RecordStore};
use crate::error::lock;
use crate::queries::records::{self, RecordRow};
use crate::schema::init_records_schema;
use crate::{Error, Result};

/// One connection to a records database, shared by every scope stored in it.
///
/// The registry opens a single instance per data directory so that the number
/// of open handles does not grow with the number of sessions.
pub struct SqliteRecordDatabase {
    location: PathBuf,
    conn: Mutex<Connection>,
}

impl SqliteRecordDatabase {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Arc<Self>> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::unavailable(parent, e))?;
        }

        let conn = Connection::open(db_path).map_err(|e| Error::unavailable(db_path, e))?;
        Self::prepare(db_path.to_path_buf(), conn)
    }

    pub fn open_in_memory() -> Result<Arc<Self>> {
        let location = PathBuf::from(":memory:");
        let conn = Connection::open_in_memory().map_err(|e| Error::unavailable(&location, e))?;
        Self::prepare(location, conn)
    }

    fn prepare(location: PathBuf, conn: Connection) -> Result<Arc<Self>> {
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(|e| Error::unavailable(&location, e))?;
        init_records_schema(&conn).map_err(|e| Error::unavailable(&location, e))?;
        Ok(Arc::new(Self {
            location,
            conn: Mutex::new(conn),
        }))
    }

    pub fn location(&self) -> &Path {
        &self.location
    }
}

enum Source {
    Path(PathBuf),
    Memory,
    Shared(Arc<SqliteRecordDatabase>),
}

/// Persistent client-side backend for sandboxed hosts.
///
/// Many scopes share one database file; each store instance reads and writes
/// only rows tagged with its own `scope_id`, ordered by the
/// `(scope_id, ts, seq)` index. `ts` is the first-write timestamp in
/// nanoseconds since the Unix epoch.
pub struct SqliteRecordStore<R> {
    source: Source,
    scope_id: String,
    db: Mutex<Option<Arc<SqliteRecordDatabase>>>,
    _marker: PhantomData<fn() -> R>,
}

impl<R: Record> SqliteRecordStore<R> {
    /// Store with its own connection to `db_path`, opened by `init()`.
    pub fn new(db_path: impl Into<PathBuf>, scope_id: impl Into<String>) -> Self {
        Self::with_source(Source::Path(db_path.into()), scope_id.into())
    }

    /// Private in-memory database; contents are lost on `close()`.
    pub fn in_memory(scope_id: impl Into<String>) -> Self {
        Self::with_source(Source::Memory, scope_id.into())
    }

    /// Store that borrows an already open database. `close()` releases this
    /// store's reference only; other scopes keep working.
    pub fn in_database(db: Arc<SqliteRecordDatabase>, scope_id: impl Into<String>) -> Self {
        Self::with_source(Source::Shared(db), scope_id.into())
    }

    fn with_source(source: Source, scope_id: String) -> Self {
        Self {
            source,
            scope_id,
            db: Mutex::new(None),
            _marker: PhantomData,
        }
    }

    pub fn scope_id(&self) -> &str {
        &self.scope_id
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let db = lock(&self.db, "sqlite record store")?
            .clone()
            .ok_or_else(|| {
                Error::StoreClosed(format!("{}#{}", self.display_location(), self.scope_id))
            })?;
        let conn = lock(&db.conn, "sqlite record database")?;
        f(&conn)
    }

    fn display_location(&self) -> String {
        match &self.source {
            Source::Path(path) => path.display().to_string(),
            Source::Memory => ":memory:".to_string(),
            Source::Shared(db) => db.location().display().to_string(),
        }
    }

    fn decode(&self, row: RecordRow) -> Option<R> {
        match serde_json::from_str(&row.body) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(
                    scope_id = %self.scope_id,
                    id = %row.id,
                    error = %e,
                    "skipping malformed record"
                );
                None
            }
        }
    }
}

impl<R: Record> RecordStore<R> for SqliteRecordStore<R> {
    fn init(&self) -> Result<()> {
        let mut guard = lock(&self.db, "sqlite record store")?;
        if guard.is_none() {
            *guard = Some(match &self.source {
                Source::Path(path) => SqliteRecordDatabase::open(path)?,
                Source::Memory => SqliteRecordDatabase::open_in_memory()?,
                Source::Shared(db) => db.clone(),
            });
        }
        Ok(())
    }

    fn append(&self, record: &R) -> Result<()> {
        let body = serde_json::to_string(record)?;
        let ts = record.timestamp().timestamp_nanos_opt().ok_or_else(|| {
            Error::Query(format!(
                "timestamp of record {} is outside the storable range",
                record.record_id()
            ))
        })?;
        self.with_conn(|conn| records::upsert(conn, &self.scope_id, record.record_id(), ts, &body))
    }

    fn get(&self, id: &str) -> Result<Option<R>> {
        let row = self.with_conn(|conn| records::get(conn, &self.scope_id, id))?;
        Ok(row.and_then(|row| self.decode(row)))
    }

    fn latest(&self) -> Result<Option<R>> {
        let newest = self.with_conn(|conn| records::list(conn, &self.scope_id, true, Some(1)))?;
        if let Some(record) = newest.into_iter().next().and_then(|row| self.decode(row)) {
            return Ok(Some(record));
        }

        // Newest row missing or unreadable: fall back to the next readable one.
        let rows = self.with_conn(|conn| records::list(conn, &self.scope_id, true, None))?;
        Ok(rows.into_iter().find_map(|row| self.decode(row)))
    }

    fn scan(&self) -> Result<RecordIter<R>> {
        let rows = self.with_conn(|conn| records::list(conn, &self.scope_id, false, None))?;
        let decoded: Vec<R> = rows.into_iter().filter_map(|row| self.decode(row)).collect();
        Ok(Box::new(decoded.into_iter()))
    }

    fn close(&self) -> Result<()> {
        lock(&self.db, "sqlite record store")?.take();
        Ok(())
    }
}
