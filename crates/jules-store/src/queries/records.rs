use rusqlite::{Connection, OptionalExtension, params};

use crate::Result;

/// Raw stored row: ordering key is `(ts, seq)` of the first write.
pub struct RecordRow {
    pub id: String,
    pub body: String,
}

pub fn upsert(conn: &Connection, scope_id: &str, id: &str, ts_nanos: i64, body: &str) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO records (scope_id, id, ts, seq, body)
        VALUES (?1, ?2, ?3,
                (SELECT COALESCE(MAX(seq), 0) + 1 FROM records WHERE scope_id = ?1),
                ?4)
        ON CONFLICT(scope_id, id) DO UPDATE SET
            body = excluded.body
        "#,
        params![scope_id, id, ts_nanos, body],
    )?;

    Ok(())
}

pub fn get(conn: &Connection, scope_id: &str, id: &str) -> Result<Option<RecordRow>> {
    let row = conn
        .query_row(
            "SELECT id, body FROM records WHERE scope_id = ?1 AND id = ?2",
            params![scope_id, id],
            |row| {
                Ok(RecordRow {
                    id: row.get(0)?,
                    body: row.get(1)?,
                })
            },
        )
        .optional()?;

    Ok(row)
}

/// Rows of one scope ordered by `(ts, seq)`, ascending or descending.
pub fn list(
    conn: &Connection,
    scope_id: &str,
    descending: bool,
    limit: Option<usize>,
) -> Result<Vec<RecordRow>> {
    let order_clause = if descending {
        "ORDER BY ts DESC, seq DESC"
    } else {
        "ORDER BY ts ASC, seq ASC"
    };
    let limit_clause = limit.map(|l| format!("LIMIT {}", l)).unwrap_or_default();

    let query = format!(
        "SELECT id, body FROM records WHERE scope_id = ?1 {} {}",
        order_clause, limit_clause
    );

    let mut stmt = conn.prepare(&query)?;
    let rows = stmt
        .query_map([scope_id], |row| {
            Ok(RecordRow {
                id: row.get(0)?,
                body: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

    Ok(rows)
}
