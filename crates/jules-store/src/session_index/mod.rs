//! Shared table of cached session summaries and per-session sync bookmarks.

mod memory;
mod sqlite;

pub use memory::MemorySessionIndex;
pub use sqlite::SqliteSessionIndex;

use chrono::{DateTime, Utc};
use jules_types::{CachedSession, SessionIndexEntry, SessionSummary};

use crate::Result;

/// One table for all sessions. Implementations serialize writers so that a
/// cached summary and its index row are always updated together.
pub trait SessionIndex: Send + Sync {
    /// Store a freshly fetched summary and refresh its index row, keeping
    /// the row's bookmark.
    fn upsert(&self, summary: &SessionSummary, synced_at: DateTime<Utc>) -> Result<()>;

    fn get(&self, session_id: &str) -> Result<Option<CachedSession>>;

    fn entry(&self, session_id: &str) -> Result<Option<SessionIndexEntry>>;

    fn contains(&self, session_id: &str) -> Result<bool>;

    /// Index rows, newest `create_time` first.
    fn entries(&self) -> Result<Vec<SessionIndexEntry>>;

    /// Newest `create_time` across all rows; the global listing high-water mark.
    fn max_create_time(&self) -> Result<Option<DateTime<Utc>>>;

    /// Record the activity bookmark of one session. The high-water mark
    /// never moves backwards.
    fn update_index_entry(
        &self,
        session_id: &str,
        high_water_mark: Option<DateTime<Utc>>,
        activity_count: u64,
    ) -> Result<()>;

    /// Drop the cached summary and index row. Returns whether anything existed.
    fn remove(&self, session_id: &str) -> Result<bool>;
}

#[cfg(test)]
pub(crate) mod contract {
    use super::*;
    use chrono::{Duration, TimeZone};
    use jules_types::SessionState;

    pub fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_750_000_000 + secs, 0).unwrap()
    }

    pub fn summary(id: &str, created: i64, state: SessionState) -> SessionSummary {
        SessionSummary {
            id: id.to_string(),
            title: format!("Session {}", id),
            state,
            create_time: at(created),
            update_time: at(created),
            source: Some("sources/github/acme/widgets".to_string()),
        }
    }

    pub fn upsert_then_read(index: &dyn SessionIndex) {
        index
            .upsert(&summary("s1", 100, SessionState::InProgress), at(500))
            .unwrap();

        let cached = index.get("s1").unwrap().unwrap();
        assert_eq!(cached.summary.title, "Session s1");
        assert_eq!(cached.last_synced_at, at(500));

        let entry = index.entry("s1").unwrap().unwrap();
        assert_eq!(entry.state, SessionState::InProgress);
        assert_eq!(entry.activity_count, 0);
        assert!(entry.activity_high_water_mark.is_none());
        assert!(index.contains("s1").unwrap());
        assert!(!index.contains("s2").unwrap());
        assert!(index.get("s2").unwrap().is_none());
    }

    pub fn upsert_keeps_bookmark(index: &dyn SessionIndex) {
        index
            .upsert(&summary("s1", 100, SessionState::InProgress), at(500))
            .unwrap();
        index.update_index_entry("s1", Some(at(450)), 12).unwrap();
        index
            .upsert(&summary("s1", 100, SessionState::Completed), at(900))
            .unwrap();

        let entry = index.entry("s1").unwrap().unwrap();
        assert_eq!(entry.state, SessionState::Completed);
        assert_eq!(entry.activity_count, 12);
        assert_eq!(entry.activity_high_water_mark, Some(at(450)));
        assert_eq!(index.get("s1").unwrap().unwrap().last_synced_at, at(900));
    }

    pub fn high_water_mark_only_moves_forward(index: &dyn SessionIndex) {
        index
            .upsert(&summary("s1", 100, SessionState::InProgress), at(500))
            .unwrap();
        index.update_index_entry("s1", Some(at(300)), 3).unwrap();
        index.update_index_entry("s1", Some(at(200)), 4).unwrap();
        index.update_index_entry("s1", None, 4).unwrap();

        let entry = index.entry("s1").unwrap().unwrap();
        assert_eq!(entry.activity_high_water_mark, Some(at(300)));
        assert_eq!(entry.activity_count, 4);
    }

    pub fn missing_row_update_fails(index: &dyn SessionIndex) {
        let err = index.update_index_entry("ghost", Some(at(1)), 1).unwrap_err();
        assert!(matches!(err, crate::Error::MissingIndexEntry(id) if id == "ghost"));
    }

    pub fn entries_are_newest_first(index: &dyn SessionIndex) {
        assert!(index.max_create_time().unwrap().is_none());
        for (id, created) in [("old", 100), ("newest", 300), ("mid", 200)] {
            index
                .upsert(&summary(id, created, SessionState::Completed), at(1000))
                .unwrap();
        }

        let ids: Vec<String> = index.entries().unwrap().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["newest", "mid", "old"]);
        assert_eq!(index.max_create_time().unwrap(), Some(at(300)));
    }

    pub fn remove_drops_both_tables(index: &dyn SessionIndex) {
        index
            .upsert(&summary("s1", 100, SessionState::Failed), at(500))
            .unwrap();
        assert!(index.remove("s1").unwrap());
        assert!(!index.remove("s1").unwrap());
        assert!(index.get("s1").unwrap().is_none());
        assert!(index.entry("s1").unwrap().is_none());
    }

    pub fn sub_second_create_times_order_correctly(index: &dyn SessionIndex) {
        let mut a = summary("a", 100, SessionState::Queued);
        a.create_time = at(100) + Duration::milliseconds(900);
        let mut b = summary("b", 100, SessionState::Queued);
        b.create_time = at(100) + Duration::milliseconds(50);
        index.upsert(&b, at(200)).unwrap();
        index.upsert(&a, at(200)).unwrap();

        assert_eq!(index.max_create_time().unwrap(), Some(a.create_time));
        assert_eq!(index.entries().unwrap()[0].id, "a");
    }

    pub fn nanosecond_timestamps_round_trip(index: &dyn SessionIndex) {
        let mut s = summary("s1", 100, SessionState::Completed);
        s.create_time = at(100) + Duration::nanoseconds(123_456_789);
        let mut t = summary("s2", 100, SessionState::Completed);
        t.create_time = at(100) + Duration::nanoseconds(123_456_100);
        index.upsert(&t, at(200)).unwrap();
        index.upsert(&s, at(200)).unwrap();
        let mark = at(150) + Duration::nanoseconds(7);
        index.update_index_entry("s1", Some(mark), 1).unwrap();
        index
            .update_index_entry("s1", Some(at(150) + Duration::nanoseconds(3)), 1)
            .unwrap();

        assert_eq!(index.max_create_time().unwrap(), Some(s.create_time));
        let entry = index.entry("s1").unwrap().unwrap();
        assert_eq!(entry.create_time, s.create_time);
        assert_eq!(entry.activity_high_water_mark, Some(mark));
        assert_eq!(index.entries().unwrap()[0].id, "s1");
    }

    pub fn run_all<F>(make: F)
    where
        F: Fn() -> Box<dyn SessionIndex>,
    {
        let checks: [fn(&dyn SessionIndex); 8] = [
            upsert_then_read,
            upsert_keeps_bookmark,
            high_water_mark_only_moves_forward,
            missing_row_update_fails,
            entries_are_newest_first,
            remove_drops_both_tables,
            sub_second_create_times_order_correctly,
            nanosecond_timestamps_round_trip,
        ];
        for check in checks {
            check(make().as_ref());
        }
    }
}
