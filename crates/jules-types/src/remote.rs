//! Contract of the remote session/activity service consumed by the cache.
//!
//! Authentication, rate-limit backoff and transient retries live behind this
//! trait. Anything it returns as an error is terminal for the operation that
//! observed it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::activity::Activity;
use crate::session::SessionSummary;

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Opaque continuation token; absent on the last page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_page_token: Option<String>) -> Self {
        Self {
            items,
            next_page_token,
        }
    }

    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, None)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Failure reported by the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The requested resource no longer exists (HTTP 404).
    NotFound(String),

    /// Any other transport, auth or rate-limit failure, already retried by
    /// the transport as far as it is willing to.
    Transport(String),
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteError::NotFound(id) => write!(f, "Remote resource not found: {}", id),
            RemoteError::Transport(msg) => write!(f, "Remote request failed: {}", msg),
        }
    }
}

impl std::error::Error for RemoteError {}

/// Remote capability offering session and activity listings.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Sessions ordered newest-created first.
    async fn list_sessions(
        &self,
        page_size: usize,
        page_token: Option<&str>,
    ) -> Result<Page<SessionSummary>, RemoteError>;

    /// Activities of one session ordered oldest first.
    async fn list_activities(
        &self,
        session_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page<Activity>, RemoteError>;

    async fn get_session(&self, id: &str) -> Result<SessionSummary, RemoteError>;
}
