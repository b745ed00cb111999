use chrono::{DateTime, Utc};
use jules_types::{CachedSession, SessionIndexEntry, SessionSummary};
use std::collections::HashMap;
use std::sync::Mutex;

use super::SessionIndex;
use crate::error::lock;
use crate::{Error, Result};

struct Row {
    cached: CachedSession,
    entry: SessionIndexEntry,
}

/// Volatile session index for tests and ephemeral clients.
#[derive(Default)]
pub struct MemorySessionIndex {
    rows: Mutex<HashMap<String, Row>>,
}

impl MemorySessionIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionIndex for MemorySessionIndex {
    fn upsert(&self, summary: &SessionSummary, synced_at: DateTime<Utc>) -> Result<()> {
        let mut rows = lock(&self.rows, "memory session index")?;
        let cached = CachedSession::new(summary.clone(), synced_at);

        match rows.get_mut(&summary.id) {
            Some(row) => {
                row.cached = cached;
                row.entry.refresh_from(summary, synced_at);
            }
            None => {
                rows.insert(
                    summary.id.clone(),
                    Row {
                        cached,
                        entry: SessionIndexEntry::from_summary(summary, synced_at),
                    },
                );
            }
        }
        Ok(())
    }

    fn get(&self, session_id: &str) -> Result<Option<CachedSession>> {
        let rows = lock(&self.rows, "memory session index")?;
        Ok(rows.get(session_id).map(|row| row.cached.clone()))
    }

    fn entry(&self, session_id: &str) -> Result<Option<SessionIndexEntry>> {
        let rows = lock(&self.rows, "memory session index")?;
        Ok(rows.get(session_id).map(|row| row.entry.clone()))
    }

    fn contains(&self, session_id: &str) -> Result<bool> {
        Ok(lock(&self.rows, "memory session index")?.contains_key(session_id))
    }

    fn entries(&self) -> Result<Vec<SessionIndexEntry>> {
        let rows = lock(&self.rows, "memory session index")?;
        let mut entries: Vec<SessionIndexEntry> =
            rows.values().map(|row| row.entry.clone()).collect();
        entries.sort_by(|a, b| {
            b.create_time
                .cmp(&a.create_time)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(entries)
    }

    fn max_create_time(&self) -> Result<Option<DateTime<Utc>>> {
        let rows = lock(&self.rows, "memory session index")?;
        Ok(rows.values().map(|row| row.entry.create_time).max())
    }

    fn update_index_entry(
        &self,
        session_id: &str,
        high_water_mark: Option<DateTime<Utc>>,
        activity_count: u64,
    ) -> Result<()> {
        let mut rows = lock(&self.rows, "memory session index")?;
        let row = rows
            .get_mut(session_id)
            .ok_or_else(|| Error::MissingIndexEntry(session_id.to_string()))?;
        row.entry
            .advance(high_water_mark, activity_count, Utc::now());
        Ok(())
    }

    fn remove(&self, session_id: &str) -> Result<bool> {
        Ok(lock(&self.rows, "memory session index")?
            .remove(session_id)
            .is_some())
    }
}
