//! Scripted in-memory stand-in for the remote session service.
//!
//! Sessions and activities can be changed while a test runs (`push_activity`,
//! `remove_session`), failures injected per session, and every call is
//! counted so tests can assert "zero network calls".

use async_trait::async_trait;
use jules_types::{Activity, Page, RemoteError, RemoteSource, SessionSummary};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

const DEFAULT_ACTIVITY_PAGE_SIZE: usize = 50;

#[derive(Default)]
struct State {
    /// Newest-created first, the order the service lists them in.
    sessions: Vec<SessionSummary>,
    scripted_pages: Option<Vec<Page<SessionSummary>>>,
    activities: HashMap<String, Vec<Activity>>,
    activity_page_size: Option<usize>,
    activity_failures: HashMap<String, String>,
    listing_failure: Option<String>,
    get_failure: Option<String>,
    activity_delays: HashMap<String, Duration>,
    requested_page_sizes: Vec<usize>,
    list_sessions_calls: usize,
    list_activities_calls: HashMap<String, usize>,
    get_session_calls: usize,
}

/// Remote double implementing [`RemoteSource`].
///
/// # Example
/// ```
/// use jules_testing::{MockRemote, fixtures};
/// use jules_types::SessionState;
///
/// let remote = MockRemote::new()
///     .with_sessions(vec![fixtures::session("s1", 100, SessionState::Completed)])
///     .with_activities("s1", vec![fixtures::activity("a1", "s1", 100)]);
/// assert_eq!(remote.total_calls(), 0);
/// ```
#[derive(Default)]
pub struct MockRemote {
    state: Mutex<State>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sessions to list, given newest first.
    pub fn with_sessions(self, sessions: Vec<SessionSummary>) -> Self {
        self.state().sessions = sessions;
        self
    }

    /// Return these pages verbatim from `list_sessions`, ignoring page size.
    /// Page `n + 1` is served for the token carried by page `n`.
    pub fn with_session_pages(self, pages: Vec<Page<SessionSummary>>) -> Self {
        {
            let mut state = self.state();
            state.sessions = pages.iter().flat_map(|p| p.items.clone()).collect();
            state.scripted_pages = Some(pages);
        }
        self
    }

    pub fn with_activities(self, session_id: &str, activities: Vec<Activity>) -> Self {
        self.state()
            .activities
            .insert(session_id.to_string(), activities);
        self
    }

    pub fn with_activity_page_size(self, size: usize) -> Self {
        self.state().activity_page_size = Some(size.max(1));
        self
    }

    /// Make `list_activities` for one session sleep before answering.
    pub fn with_activity_delay(self, session_id: &str, delay: Duration) -> Self {
        self.state()
            .activity_delays
            .insert(session_id.to_string(), delay);
        self
    }

    /// New session appearing at the head of the listing.
    pub fn add_session(&self, summary: SessionSummary) {
        self.state().sessions.insert(0, summary);
    }

    /// Replace the remote copy of a session (e.g. a state change).
    pub fn update_session(&self, summary: SessionSummary) {
        let mut state = self.state();
        match state.sessions.iter_mut().find(|s| s.id == summary.id) {
            Some(existing) => *existing = summary,
            None => state.sessions.insert(0, summary),
        }
    }

    /// Delete a session remotely; further lookups answer `NotFound`.
    pub fn remove_session(&self, session_id: &str) {
        let mut state = self.state();
        state.sessions.retain(|s| s.id != session_id);
        state.activities.remove(session_id);
    }

    /// Append a live activity, as the agent would while the session runs.
    pub fn push_activity(&self, activity: Activity) {
        self.state()
            .activities
            .entry(activity.session_id.clone())
            .or_default()
            .push(activity);
    }

    pub fn fail_activities_for(&self, session_id: &str, message: &str) {
        self.state()
            .activity_failures
            .insert(session_id.to_string(), message.to_string());
    }

    pub fn fail_session_listing(&self, message: &str) {
        self.state().listing_failure = Some(message.to_string());
    }

    pub fn fail_get_session(&self, message: &str) {
        self.state().get_failure = Some(message.to_string());
    }

    pub fn list_sessions_calls(&self) -> usize {
        self.state().list_sessions_calls
    }

    pub fn list_activities_calls(&self, session_id: &str) -> usize {
        self.state()
            .list_activities_calls
            .get(session_id)
            .copied()
            .unwrap_or(0)
    }

    /// Sessions whose activities were requested at least once.
    pub fn hydrated_sessions(&self) -> HashSet<String> {
        self.state().list_activities_calls.keys().cloned().collect()
    }

    pub fn get_session_calls(&self) -> usize {
        self.state().get_session_calls
    }

    pub fn total_calls(&self) -> usize {
        let state = self.state();
        state.list_sessions_calls
            + state.get_session_calls
            + state.list_activities_calls.values().sum::<usize>()
    }

    /// Page sizes passed to `list_sessions`, in call order.
    pub fn requested_page_sizes(&self) -> Vec<usize> {
        self.state().requested_page_sizes.clone()
    }

    /// Highest number of `list_activities` calls observed running at once.
    pub fn max_concurrent_activity_fetches(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("mock remote state poisoned")
    }
}

fn offset_token(offset: usize) -> String {
    format!("offset:{}", offset)
}

fn parse_offset(token: Option<&str>) -> Result<usize, RemoteError> {
    match token {
        None => Ok(0),
        Some(token) => token
            .strip_prefix("offset:")
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| RemoteError::Transport(format!("invalid page token: {}", token))),
    }
}

fn paginate<T: Clone>(items: &[T], offset: usize, size: usize) -> Page<T> {
    let end = (offset + size).min(items.len());
    let slice = items.get(offset..end).unwrap_or_default().to_vec();
    let next = (end < items.len()).then(|| offset_token(end));
    Page::new(slice, next)
}

/// Decrements the in-flight counter even when the caller drops the future.
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteSource for MockRemote {
    async fn list_sessions(
        &self,
        page_size: usize,
        page_token: Option<&str>,
    ) -> Result<Page<SessionSummary>, RemoteError> {
        let mut state = self.state();
        state.list_sessions_calls += 1;
        state.requested_page_sizes.push(page_size);

        if let Some(message) = &state.listing_failure {
            return Err(RemoteError::Transport(message.clone()));
        }

        if let Some(pages) = &state.scripted_pages {
            let index = match page_token {
                None => 0,
                Some(token) => pages
                    .iter()
                    .position(|p| p.next_page_token.as_deref() == Some(token))
                    .map(|i| i + 1)
                    .ok_or_else(|| {
                        RemoteError::Transport(format!("invalid page token: {}", token))
                    })?,
            };
            return Ok(pages
                .get(index)
                .cloned()
                .unwrap_or_else(|| Page::last(Vec::new())));
        }

        let offset = parse_offset(page_token)?;
        Ok(paginate(&state.sessions, offset, page_size.max(1)))
    }

    async fn list_activities(
        &self,
        session_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page<Activity>, RemoteError> {
        let delay = {
            let mut state = self.state();
            *state
                .list_activities_calls
                .entry(session_id.to_string())
                .or_insert(0) += 1;
            state.activity_delays.get(session_id).copied()
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(self.in_flight.clone());
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state();
        if let Some(message) = state.activity_failures.get(session_id) {
            return Err(RemoteError::Transport(message.clone()));
        }
        let known = state.sessions.iter().any(|s| s.id == session_id)
            || state.activities.contains_key(session_id);
        if !known {
            return Err(RemoteError::NotFound(session_id.to_string()));
        }

        let offset = parse_offset(page_token)?;
        let size = state
            .activity_page_size
            .unwrap_or(DEFAULT_ACTIVITY_PAGE_SIZE);
        let empty = Vec::new();
        let activities = state.activities.get(session_id).unwrap_or(&empty);
        Ok(paginate(activities, offset, size))
    }

    async fn get_session(&self, id: &str) -> Result<SessionSummary, RemoteError> {
        let mut state = self.state();
        state.get_session_calls += 1;
        if let Some(message) = &state.get_failure {
            return Err(RemoteError::Transport(message.clone()));
        }
        state
            .sessions
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))
    }
}
