//! Cold, hot and hybrid iteration over one session's activities.
//!
//! Every method returns a fresh lazy stream; nothing touches the network
//! until the stream is polled, and dropping the stream is the only way to
//! stop a live tail.

use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream};
use futures::{StreamExt, TryStreamExt};
use jules_store::{ActivityStore, RecordStore};
use jules_types::{Activity, RemoteSource};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::{Error, Result};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct ActivityStream {
    session_id: String,
    store: ActivityStore,
    remote: Arc<dyn RemoteSource>,
    poll_interval: Duration,
}

impl ActivityStream {
    pub fn new(
        session_id: impl Into<String>,
        store: ActivityStore,
        remote: Arc<dyn RemoteSource>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            store,
            remote,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Populate an empty store from the remote log. Returns the number of
    /// records appended; a store that already holds records is left alone.
    pub async fn hydrate(&self) -> Result<usize> {
        if !on_store(&self.store, |store| store.is_empty()).await? {
            return Ok(0);
        }

        let fetched = fetch_all(self.remote.as_ref(), &self.session_id).await?;
        let count = fetched.len();
        append_all(&self.store, fetched).await?;

        debug!(
            session_id = %self.session_id,
            count,
            "hydrated activity log"
        );
        Ok(count)
    }

    /// Every cached activity in timestamp order, fetching first only when
    /// the cache is empty. Finite.
    pub fn history(&self) -> BoxStream<'static, Result<Activity>> {
        let this = self.clone();
        stream::once(async move {
            this.hydrate().await?;
            let records = on_store(&this.store, |store| store.scan()).await?;
            Ok::<_, Error>(stream::iter(records.map(Ok::<Activity, Error>)))
        })
        .try_flatten()
        .boxed()
    }

    /// Live tail: polls the remote and yields each activity newer than the
    /// newest stored one, exactly once. Ends only on a remote or store error.
    pub fn updates(&self) -> BoxStream<'static, Result<Activity>> {
        let state = TailState {
            stream: self.clone(),
            boundary: None,
            pending: VecDeque::new(),
        };

        stream::try_unfold(state, |mut state| async move {
            loop {
                if let Some(activity) = state.pending.pop_front() {
                    return Ok::<_, Error>(Some((activity, state)));
                }
                state.poll_once().await?;
            }
        })
        .boxed()
    }

    /// `history()` followed by `updates()`, with no gap in between.
    pub fn stream(&self) -> BoxStream<'static, Result<Activity>> {
        self.history().chain(self.updates()).boxed()
    }
}

struct TailState {
    stream: ActivityStream,
    /// Seeded from the store on the first poll, not at construction.
    boundary: Option<Boundary>,
    pending: VecDeque<Activity>,
}

impl TailState {
    async fn poll_once(&mut self) -> Result<()> {
        let store = &self.stream.store;
        if self.boundary.is_none() {
            self.boundary = Some(on_store(store, Boundary::seed).await?);
        }

        tokio::time::sleep(self.stream.poll_interval).await;
        let fetched = fetch_all(self.stream.remote.as_ref(), &self.stream.session_id).await?;

        let Some(boundary) = self.boundary.as_mut() else {
            return Ok(());
        };
        let mut admitted = Vec::new();
        for activity in fetched {
            if boundary.admits(&activity) {
                boundary.advance(&activity);
                admitted.push(activity);
            }
        }
        // Stored before any of them is yielded.
        append_all(store, admitted.clone()).await?;
        self.pending.extend(admitted);

        debug!(
            session_id = %self.stream.session_id,
            new = self.pending.len(),
            "polled activity tail"
        );
        Ok(())
    }
}

/// Newest timestamp already delivered, plus every id delivered at exactly
/// that timestamp.
#[derive(Debug, Default)]
struct Boundary {
    timestamp: Option<DateTime<Utc>>,
    ids: HashSet<String>,
}

impl Boundary {
    fn seed(store: &dyn RecordStore<Activity>) -> jules_store::Result<Self> {
        let Some(latest) = store.latest()? else {
            return Ok(Self::default());
        };

        let ids = store
            .scan()?
            .filter(|a| a.create_time == latest.create_time)
            .map(|a| a.id)
            .collect();
        Ok(Self {
            timestamp: Some(latest.create_time),
            ids,
        })
    }

    fn admits(&self, activity: &Activity) -> bool {
        match self.timestamp {
            None => true,
            Some(ts) if activity.create_time < ts => false,
            Some(ts) if activity.create_time == ts => !self.ids.contains(&activity.id),
            Some(_) => true,
        }
    }

    fn advance(&mut self, activity: &Activity) {
        match self.timestamp {
            Some(ts) if activity.create_time == ts => {
                self.ids.insert(activity.id.clone());
            }
            Some(ts) if activity.create_time < ts => {}
            _ => {
                self.timestamp = Some(activity.create_time);
                self.ids.clear();
                self.ids.insert(activity.id.clone());
            }
        }
    }
}

/// Run a store call on the blocking pool. Stores do synchronous file and
/// database IO, which must not stall other sessions polled on the same task.
pub(crate) async fn on_store<T, F>(store: &ActivityStore, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn RecordStore<Activity>) -> jules_store::Result<T> + Send + 'static,
{
    let store = store.clone();
    Ok(tokio::task::spawn_blocking(move || f(&*store)).await??)
}

async fn append_all(store: &ActivityStore, activities: Vec<Activity>) -> Result<()> {
    if activities.is_empty() {
        return Ok(());
    }
    on_store(store, move |store| {
        activities.iter().try_for_each(|activity| store.append(activity))
    })
    .await
}

/// All activity pages of one session, oldest first. An empty page ends the
/// listing even when it carries a token.
pub(crate) async fn fetch_all(
    remote: &dyn RemoteSource,
    session_id: &str,
) -> Result<Vec<Activity>> {
    let mut activities = Vec::new();
    let mut token: Option<String> = None;

    loop {
        let page = remote.list_activities(session_id, token.as_deref()).await?;
        if page.is_empty() {
            break;
        }
        activities.extend(page.items);
        match page.next_page_token {
            Some(next) => token = Some(next),
            None => break,
        }
    }

    Ok(activities)
}
