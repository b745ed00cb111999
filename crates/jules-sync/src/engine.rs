use chrono::Utc;
use futures::stream::{self, StreamExt, TryStreamExt};
use jules_store::{ActivityStores, SessionIndex};
use jules_types::RemoteSource;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::activity_stream::{ActivityStream, DEFAULT_POLL_INTERVAL, on_store};
use crate::cursor::{DEFAULT_PAGE_SIZE, ListingCursor};
use crate::Result;

pub const DEFAULT_CONCURRENCY: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncDepth {
    /// Session summaries only.
    #[default]
    Metadata,
    /// Summaries plus each candidate's activity log.
    Activities,
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub limit: Option<usize>,
    pub depth: SyncDepth,
    pub incremental: bool,
    pub concurrency: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            limit: None,
            depth: SyncDepth::Metadata,
            incremental: true,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl SyncOptions {
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_depth(mut self, depth: SyncDepth) -> Self {
        self.depth = depth;
        self
    }

    /// Walk the whole listing instead of stopping at the first known session.
    pub fn full(mut self) -> Self {
        self.incremental = false;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    FetchingList,
    HydratingRecords,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncProgress {
    pub phase: SyncPhase,
    /// Sessions discovered (listing) or hydrated (hydration) so far.
    pub current: usize,
    pub total: Option<usize>,
    /// Last session processed; where a caller resumes after a failure.
    pub last_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStats {
    pub sessions_processed: usize,
    pub activities_ingested: usize,
    pub duration: Duration,
    /// False when `limit` stopped discovery before the listing ran out.
    pub is_complete: bool,
}

/// Outcome of hydrating one session.
struct Hydrated {
    session_id: String,
    appended: usize,
    high_water_mark: Option<chrono::DateTime<Utc>>,
    activity_count: u64,
}

/// Incremental or full synchronization of the remote session list into the
/// local index, optionally pulling each session's activity log.
///
/// Each `sync()` call runs to completion or to the first error; nothing is
/// left running in the background.
pub struct SyncEngine {
    remote: Arc<dyn RemoteSource>,
    index: Arc<dyn SessionIndex>,
    stores: Arc<ActivityStores>,
    page_size: usize,
    poll_interval: Duration,
}

impl SyncEngine {
    pub fn new(
        remote: Arc<dyn RemoteSource>,
        index: Arc<dyn SessionIndex>,
        stores: Arc<ActivityStores>,
    ) -> Self {
        Self {
            remote,
            index,
            stores,
            page_size: DEFAULT_PAGE_SIZE,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub async fn sync<F>(&self, options: SyncOptions, mut on_progress: F) -> Result<SyncStats>
    where
        F: FnMut(SyncProgress),
    {
        let started = Instant::now();
        info!(
            incremental = options.incremental,
            depth = ?options.depth,
            limit = ?options.limit,
            "sync started"
        );

        let (candidates, exhausted) = self.discover(&options, &mut on_progress).await?;

        let mut activities_ingested = 0;
        if options.depth == SyncDepth::Activities && !candidates.is_empty() {
            activities_ingested = self
                .hydrate_all(&candidates, options.concurrency.max(1), &mut on_progress)
                .await?;
        }

        let stats = SyncStats {
            sessions_processed: candidates.len(),
            activities_ingested,
            duration: started.elapsed(),
            is_complete: exhausted,
        };

        on_progress(SyncProgress {
            phase: SyncPhase::Done,
            current: stats.sessions_processed,
            total: Some(stats.sessions_processed),
            last_id: candidates.last().cloned(),
        });
        info!(
            sessions = stats.sessions_processed,
            activities = stats.activities_ingested,
            complete = stats.is_complete,
            elapsed_ms = stats.duration.as_millis() as u64,
            "sync finished"
        );

        Ok(stats)
    }

    /// Walk the listing newest first, upserting every candidate. Returns the
    /// candidate ids and whether discovery ended without hitting `limit`.
    async fn discover<F>(
        &self,
        options: &SyncOptions,
        on_progress: &mut F,
    ) -> Result<(Vec<String>, bool)>
    where
        F: FnMut(SyncProgress),
    {
        let high_water_mark = if options.incremental {
            self.index.max_create_time()?
        } else {
            None
        };

        let mut cursor = ListingCursor::new(self.remote.clone()).page_size(self.page_size);
        if let Some(limit) = options.limit {
            cursor = cursor.limit(limit);
        }
        let mut listing = cursor.into_stream();

        let mut candidates = Vec::new();
        while let Some(summary) = listing.try_next().await? {
            if let Some(hwm) = high_water_mark
                && summary.create_time <= hwm
                && self.index.contains(&summary.id)?
            {
                debug!(session_id = %summary.id, "reached indexed session, stopping listing");
                return Ok((candidates, true));
            }

            self.index.upsert(&summary, Utc::now())?;
            candidates.push(summary.id.clone());
            on_progress(SyncProgress {
                phase: SyncPhase::FetchingList,
                current: candidates.len(),
                total: options.limit,
                last_id: Some(summary.id),
            });
        }

        let truncated = options
            .limit
            .is_some_and(|limit| candidates.len() >= limit);
        Ok((candidates, !truncated))
    }

    /// Hydrate candidates through a pool of `concurrency` in-flight sessions.
    /// This loop is the only writer of progress and bookmarks, so `current`
    /// counts 1..=N in completion order. The first error drops queued work.
    async fn hydrate_all<F>(
        &self,
        candidates: &[String],
        concurrency: usize,
        on_progress: &mut F,
    ) -> Result<usize>
    where
        F: FnMut(SyncProgress),
    {
        let total = candidates.len();
        info!(sessions = total, concurrency, "hydrating activity logs");

        let mut work = stream::iter(candidates.iter().cloned())
            .map(|session_id| self.hydrate_one(session_id))
            .buffer_unordered(concurrency);

        let mut completed = 0;
        let mut ingested = 0;
        while let Some(result) = work.next().await {
            let hydrated = result?;
            self.index.update_index_entry(
                &hydrated.session_id,
                hydrated.high_water_mark,
                hydrated.activity_count,
            )?;

            completed += 1;
            ingested += hydrated.appended;
            on_progress(SyncProgress {
                phase: SyncPhase::HydratingRecords,
                current: completed,
                total: Some(total),
                last_id: Some(hydrated.session_id),
            });
        }

        Ok(ingested)
    }

    async fn hydrate_one(&self, session_id: String) -> Result<Hydrated> {
        let store = self.stores.for_session(&session_id)?;
        let stream = ActivityStream::new(session_id.clone(), store.clone(), self.remote.clone())
            .with_poll_interval(self.poll_interval);

        let appended = stream.hydrate().await?;
        let (high_water_mark, activity_count) = on_store(&store, |store| {
            let high_water_mark = store.latest()?.map(|a| a.create_time);
            Ok((high_water_mark, store.scan()?.count() as u64))
        })
        .await?;

        debug!(session_id = %session_id, appended, "hydrated session");
        Ok(Hydrated {
            session_id,
            appended,
            high_water_mark,
            activity_count,
        })
    }
}

