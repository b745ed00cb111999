use chrono::{DateTime, Utc};
use jules_types::{SessionIndexEntry, SessionState, SessionSummary, format_timestamp, parse_timestamp};
use rusqlite::{Connection, Row, params};

use crate::{Error, Result};

struct RawEntry {
    id: String,
    title: String,
    state: String,
    create_time: String,
    source: Option<String>,
    activity_high_water_mark: Option<String>,
    activity_count: i64,
    updated_at: String,
}

impl RawEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            state: row.get(2)?,
            create_time: row.get(3)?,
            source: row.get(4)?,
            activity_high_water_mark: row.get(5)?,
            activity_count: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn into_entry(self) -> Result<SessionIndexEntry> {
        let ts = |field: &str, value: &str| {
            parse_timestamp(value).ok_or_else(|| {
                Error::Query(format!("invalid {} for session {}: {}", field, self.id, value))
            })
        };

        let create_time = ts("create_time", &self.create_time)?;
        let updated_at = ts("updated_at", &self.updated_at)?;
        let activity_high_water_mark = match &self.activity_high_water_mark {
            Some(value) => Some(ts("activity_high_water_mark", value)?),
            None => None,
        };

        Ok(SessionIndexEntry {
            state: self
                .state
                .parse::<SessionState>()
                .unwrap_or(SessionState::Unspecified),
            id: self.id,
            title: self.title,
            create_time,
            source: self.source,
            activity_high_water_mark,
            activity_count: self.activity_count.max(0) as u64,
            updated_at,
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, title, state, create_time, source,
           activity_high_water_mark, activity_count, updated_at
    FROM session_index
"#;

/// Insert or refresh the metadata columns, leaving the bookmark untouched.
pub fn upsert(conn: &Connection, summary: &SessionSummary, updated_at: &str) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO session_index (id, title, state, create_time, source, activity_count, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)
        ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            state = excluded.state,
            create_time = excluded.create_time,
            source = excluded.source,
            updated_at = excluded.updated_at
        "#,
        params![
            &summary.id,
            &summary.title,
            summary.state.as_str(),
            format_timestamp(&summary.create_time),
            &summary.source,
            updated_at,
        ],
    )?;

    Ok(())
}

/// Move the bookmark forward. Returns the number of rows touched.
pub fn advance(
    conn: &Connection,
    session_id: &str,
    high_water_mark: Option<&DateTime<Utc>>,
    activity_count: u64,
    updated_at: &str,
) -> Result<usize> {
    let mark = high_water_mark.map(format_timestamp);

    let changed = conn.execute(
        r#"
        UPDATE session_index SET
            activity_high_water_mark = CASE
                WHEN ?2 IS NULL THEN activity_high_water_mark
                WHEN activity_high_water_mark IS NULL OR ?2 > activity_high_water_mark THEN ?2
                ELSE activity_high_water_mark
            END,
            activity_count = ?3,
            updated_at = ?4
        WHERE id = ?1
        "#,
        params![session_id, mark, activity_count as i64, updated_at],
    )?;

    Ok(changed)
}

pub fn get(conn: &Connection, session_id: &str) -> Result<Option<SessionIndexEntry>> {
    let mut stmt = conn.prepare(&format!("{} WHERE id = ?1", SELECT_COLUMNS))?;
    let mut rows = stmt.query([session_id])?;

    match rows.next()? {
        Some(row) => Ok(Some(RawEntry::from_row(row)?.into_entry()?)),
        None => Ok(None),
    }
}

/// All rows, newest `create_time` first.
pub fn list(conn: &Connection, limit: Option<usize>) -> Result<Vec<SessionIndexEntry>> {
    let limit_clause = limit.map(|l| format!("LIMIT {}", l)).unwrap_or_default();
    let query = format!(
        "{} ORDER BY create_time DESC, id ASC {}",
        SELECT_COLUMNS, limit_clause
    );

    let mut stmt = conn.prepare(&query)?;
    let raw = stmt
        .query_map([], RawEntry::from_row)?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

    raw.into_iter().map(RawEntry::into_entry).collect()
}

pub fn max_create_time(conn: &Connection) -> Result<Option<DateTime<Utc>>> {
    let max: Option<String> =
        conn.query_row("SELECT MAX(create_time) FROM session_index", [], |row| {
            row.get(0)
        })?;

    match max {
        Some(value) => parse_timestamp(&value)
            .map(Some)
            .ok_or_else(|| Error::Query(format!("invalid create_time: {}", value))),
        None => Ok(None),
    }
}

pub fn exists(conn: &Connection, session_id: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM session_index WHERE id = ?1",
        [session_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn delete(conn: &Connection, session_id: &str) -> Result<usize> {
    Ok(conn.execute("DELETE FROM session_index WHERE id = ?1", [session_id])?)
}
