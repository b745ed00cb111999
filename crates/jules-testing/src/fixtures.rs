//! Fixtures for sample sessions and activities.
//!
//! All timestamps are offsets in seconds from one fixed epoch so tests can
//! talk about `t:100` and `t:200` directly.

use chrono::{DateTime, TimeZone, Utc};
use jules_types::{Activity, SessionState, SessionSummary};

/// Fixed epoch used by every fixture (2025-01-01T00:00:00Z).
pub const EPOCH_SECS: i64 = 1_735_689_600;

/// Timestamp `secs` seconds after the fixture epoch.
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(EPOCH_SECS + secs, 0)
        .single()
        .expect("fixture timestamp out of range")
}

/// Session created at `t:created`, last updated at the same instant.
pub fn session(id: &str, created: i64, state: SessionState) -> SessionSummary {
    SessionSummary {
        id: id.to_string(),
        title: format!("Fix flaky test in {}", id),
        state,
        create_time: at(created),
        update_time: at(created),
        source: Some("sources/github/acme/widgets".to_string()),
    }
}

/// `count` sessions named `{prefix}-{n}`, newest first, as the service lists them.
pub fn sessions_newest_first(prefix: &str, count: usize) -> Vec<SessionSummary> {
    (0..count)
        .rev()
        .map(|n| session(&format!("{}-{}", prefix, n), n as i64 * 10, SessionState::Completed))
        .collect()
}

pub fn activity(id: &str, session_id: &str, secs: i64) -> Activity {
    Activity::new(id, session_id, at(secs)).with_payload(serde_json::json!({
        "progressUpdated": { "title": format!("step {}", id) }
    }))
}

/// Activity with a random id, for tests that only care about counts.
pub fn random_activity(session_id: &str, secs: i64) -> Activity {
    activity(&uuid::Uuid::new_v4().to_string(), session_id, secs)
}
