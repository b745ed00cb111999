use chrono::{DateTime, Utc};
use jules_types::{CachedSession, SessionIndexEntry, SessionSummary, format_timestamp};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use super::SessionIndex;
use crate::error::lock;
use crate::queries::{entries, sessions};
use crate::schema::init_index_schema;
use crate::{Error, Result};

/// Durable session index backed by one SQLite file.
///
/// All access goes through a single mutex-guarded connection; upserts run
/// in a transaction spanning both tables.
pub struct SqliteSessionIndex {
    conn: Mutex<Connection>,
}

impl SqliteSessionIndex {
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::unavailable(parent, e))?;
        }

        let conn = Connection::open(db_path).map_err(|e| Error::unavailable(db_path, e))?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(|e| Error::unavailable(db_path, e))?;
        init_index_schema(&conn).map_err(|e| Error::unavailable(db_path, e))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_index_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn vacuum(&self) -> Result<()> {
        lock(&self.conn, "sqlite session index")?.execute("VACUUM", [])?;
        Ok(())
    }
}

impl SessionIndex for SqliteSessionIndex {
    fn upsert(&self, summary: &SessionSummary, synced_at: DateTime<Utc>) -> Result<()> {
        let synced_at = format_timestamp(&synced_at);

        let mut conn = lock(&self.conn, "sqlite session index")?;
        let tx = conn.transaction()?;
        sessions::upsert(&tx, summary, &synced_at)?;
        entries::upsert(&tx, summary, &synced_at)?;
        tx.commit()?;
        Ok(())
    }

    fn get(&self, session_id: &str) -> Result<Option<CachedSession>> {
        sessions::get(&*lock(&self.conn, "sqlite session index")?, session_id)
    }

    fn entry(&self, session_id: &str) -> Result<Option<SessionIndexEntry>> {
        entries::get(&*lock(&self.conn, "sqlite session index")?, session_id)
    }

    fn contains(&self, session_id: &str) -> Result<bool> {
        entries::exists(&*lock(&self.conn, "sqlite session index")?, session_id)
    }

    fn entries(&self) -> Result<Vec<SessionIndexEntry>> {
        entries::list(&*lock(&self.conn, "sqlite session index")?, None)
    }

    fn max_create_time(&self) -> Result<Option<DateTime<Utc>>> {
        entries::max_create_time(&*lock(&self.conn, "sqlite session index")?)
    }

    fn update_index_entry(
        &self,
        session_id: &str,
        high_water_mark: Option<DateTime<Utc>>,
        activity_count: u64,
    ) -> Result<()> {
        let conn = lock(&self.conn, "sqlite session index")?;
        let changed = entries::advance(
            &conn,
            session_id,
            high_water_mark.as_ref(),
            activity_count,
            &format_timestamp(&Utc::now()),
        )?;

        if changed == 0 {
            return Err(Error::MissingIndexEntry(session_id.to_string()));
        }
        Ok(())
    }

    fn remove(&self, session_id: &str) -> Result<bool> {
        let mut conn = lock(&self.conn, "sqlite session index")?;
        let tx = conn.transaction()?;
        let removed = sessions::delete(&tx, session_id)? + entries::delete(&tx, session_id)?;
        tx.commit()?;
        Ok(removed > 0)
    }
}
