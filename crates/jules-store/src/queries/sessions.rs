use jules_types::{CachedSession, SessionSummary, parse_timestamp};
use rusqlite::{Connection, OptionalExtension, params};

use crate::{Error, Result};

pub fn upsert(conn: &Connection, summary: &SessionSummary, synced_at: &str) -> Result<()> {
    let body = serde_json::to_string(summary)?;

    conn.execute(
        r#"
        INSERT INTO sessions (id, body, last_synced_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(id) DO UPDATE SET
            body = excluded.body,
            last_synced_at = excluded.last_synced_at
        "#,
        params![&summary.id, body, synced_at],
    )?;

    Ok(())
}

pub fn get(conn: &Connection, session_id: &str) -> Result<Option<CachedSession>> {
    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT body, last_synced_at FROM sessions WHERE id = ?1",
            [session_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let Some((body, last_synced_at)) = row else {
        return Ok(None);
    };

    let summary: SessionSummary = serde_json::from_str(&body)?;
    let last_synced_at = parse_timestamp(&last_synced_at).ok_or_else(|| {
        Error::Query(format!(
            "invalid last_synced_at for session {}: {}",
            session_id, last_synced_at
        ))
    })?;

    Ok(Some(CachedSession::new(summary, last_synced_at)))
}

pub fn delete(conn: &Connection, session_id: &str) -> Result<usize> {
    Ok(conn.execute("DELETE FROM sessions WHERE id = ?1", [session_id])?)
}
