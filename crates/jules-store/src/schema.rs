use rusqlite::Connection;

use crate::Result;

// Schema versions (increment when changing table definitions)
pub const INDEX_SCHEMA_VERSION: i32 = 4;
pub const RECORDS_SCHEMA_VERSION: i32 = 2;

// NOTE: Storage Design Rationale
//
// Why two tables for sessions?
// - `sessions` holds the full cached summary as returned by the service,
//   plus the wall-clock time of the last successful refresh
// - `session_index` is the narrow row scanned by sync and list views; it
//   carries the per-session activity bookmark
// - Both are written in one transaction so a reader never sees a fresh
//   summary next to a stale index row
//
// Why rebuild on version mismatch?
// - Everything here is a cache of remote state; dropping it costs one sync

pub fn init_index_schema(conn: &Connection) -> Result<()> {
    let current_version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if current_version != INDEX_SCHEMA_VERSION {
        conn.execute_batch(
            r#"
            DROP TABLE IF EXISTS session_index;
            DROP TABLE IF EXISTS sessions;
            "#,
        )?;
    }

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            body TEXT NOT NULL,
            last_synced_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS session_index (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            state TEXT NOT NULL,
            create_time TEXT NOT NULL,
            source TEXT,
            activity_high_water_mark TEXT,
            activity_count INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_session_index_create ON session_index(create_time DESC);
        "#,
    )?;

    conn.execute(
        &format!("PRAGMA user_version = {}", INDEX_SCHEMA_VERSION),
        [],
    )?;

    Ok(())
}

pub fn init_records_schema(conn: &Connection) -> Result<()> {
    let current_version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if current_version != RECORDS_SCHEMA_VERSION {
        conn.execute_batch("DROP TABLE IF EXISTS records;")?;
    }

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS records (
            scope_id TEXT NOT NULL,
            id TEXT NOT NULL,
            ts INTEGER NOT NULL,
            seq INTEGER NOT NULL,
            body TEXT NOT NULL,
            PRIMARY KEY (scope_id, id)
        );

        CREATE INDEX IF NOT EXISTS idx_records_scope_ts ON records(scope_id, ts, seq);
        "#,
    )?;

    conn.execute(
        &format!("PRAGMA user_version = {}", RECORDS_SCHEMA_VERSION),
        [],
    )?;

    Ok(())
}
