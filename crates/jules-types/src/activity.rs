use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::Record;

/// Immutable event emitted by the remote agent for one session.
///
/// Only `id`, `session_id` and `create_time` matter to the cache; the rest of
/// the wire object is carried untouched in `payload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Unique within the owning session.
    pub id: String,
    pub session_id: String,
    /// Non-decreasing per session; duplicates are possible.
    pub create_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub payload: serde_json::Value,
}

impl Activity {
    pub fn new(
        id: impl Into<String>,
        session_id: impl Into<String>,
        create_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            session_id: session_id.into(),
            create_time,
            payload: serde_json::Value::Null,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

impl Record for Activity {
    fn record_id(&self) -> &str {
        &self.id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.create_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_activity_wire_format_is_camel_case() {
        let ts = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let activity = Activity::new("a1", "s1", ts)
            .with_payload(serde_json::json!({"agentMessaged": {"text": "hi"}}));

        let json = serde_json::to_value(&activity).unwrap();
        assert_eq!(json["sessionId"], "s1");
        assert_eq!(json["createTime"], "2025-06-01T12:00:00Z");
        assert_eq!(json["payload"]["agentMessaged"]["text"], "hi");
    }

    #[test]
    fn test_missing_payload_defaults_to_null() {
        let activity: Activity = serde_json::from_str(
            r#"{"id":"a2","sessionId":"s1","createTime":"2025-06-01T12:00:00Z"}"#,
        )
        .unwrap();

        assert!(activity.payload.is_null());
        assert_eq!(activity.record_id(), "a2");
    }
}
