use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a remote session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Queued,
    Planning,
    AwaitingPlanApproval,
    AwaitingUserFeedback,
    InProgress,
    Paused,
    Completed,
    Failed,
    #[serde(rename = "STATE_UNSPECIFIED")]
    #[serde(other)]
    Unspecified,
}

impl SessionState {
    /// Terminal sessions no longer produce activities.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "QUEUED",
            Self::Planning => "PLANNING",
            Self::AwaitingPlanApproval => "AWAITING_PLAN_APPROVAL",
            Self::AwaitingUserFeedback => "AWAITING_USER_FEEDBACK",
            Self::InProgress => "IN_PROGRESS",
            Self::Paused => "PAUSED",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Unspecified => "STATE_UNSPECIFIED",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SessionState {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "QUEUED" => Self::Queued,
            "PLANNING" => Self::Planning,
            "AWAITING_PLAN_APPROVAL" => Self::AwaitingPlanApproval,
            "AWAITING_USER_FEEDBACK" => Self::AwaitingUserFeedback,
            "IN_PROGRESS" => Self::InProgress,
            "PAUSED" => Self::Paused,
            "COMPLETED" => Self::Completed,
            "FAILED" => Self::Failed,
            _ => Self::Unspecified,
        })
    }
}

/// Projection of remote session state as returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub state: SessionState,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
    /// Repository or other source the session works against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// A session summary as held in the local cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedSession {
    #[serde(flatten)]
    pub summary: SessionSummary,
    /// Local wall-clock time of the last successful network refresh.
    pub last_synced_at: DateTime<Utc>,
}

impl CachedSession {
    pub fn new(summary: SessionSummary, last_synced_at: DateTime<Utc>) -> Self {
        Self {
            summary,
            last_synced_at,
        }
    }

    /// Time elapsed since the last refresh.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.last_synced_at
    }
}

/// Denormalized index row kept alongside the cached summary.
///
/// Carries the per-session sync bookmark. Derived data only; the remote
/// service and the activity log are the sources of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionIndexEntry {
    pub id: String,
    pub title: String,
    pub state: SessionState,
    pub create_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Timestamp of the newest durably recorded activity. Only moves forward.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_high_water_mark: Option<DateTime<Utc>>,
    #[serde(default)]
    pub activity_count: u64,
    pub updated_at: DateTime<Utc>,
}

impl SessionIndexEntry {
    /// Fresh row for a newly discovered session, with an empty bookmark.
    pub fn from_summary(summary: &SessionSummary, updated_at: DateTime<Utc>) -> Self {
        Self {
            id: summary.id.clone(),
            title: summary.title.clone(),
            state: summary.state,
            create_time: summary.create_time,
            source: summary.source.clone(),
            activity_high_water_mark: None,
            activity_count: 0,
            updated_at,
        }
    }

    /// Refresh the metadata columns from a newer summary, keeping the bookmark.
    pub fn refresh_from(&mut self, summary: &SessionSummary, updated_at: DateTime<Utc>) {
        self.title = summary.title.clone();
        self.state = summary.state;
        self.create_time = summary.create_time;
        self.source = summary.source.clone();
        self.updated_at = updated_at;
    }

    /// Record a new bookmark. The high-water mark never moves backwards.
    pub fn advance(
        &mut self,
        high_water_mark: Option<DateTime<Utc>>,
        activity_count: u64,
        updated_at: DateTime<Utc>,
    ) {
        self.activity_high_water_mark = match (self.activity_high_water_mark, high_water_mark) {
            (Some(current), Some(candidate)) => Some(current.max(candidate)),
            (current, candidate) => current.or(candidate),
        };
        self.activity_count = activity_count;
        self.updated_at = updated_at;
    }
}
