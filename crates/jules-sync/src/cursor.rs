//! Paginated session listing.
//!
//! Awaiting a [`ListingCursor`] fetches exactly one page; `into_stream()`
//! walks every page. Both honour `limit` and the write-through index.

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, BoxStream, StreamExt};
use jules_store::SessionIndex;
use jules_types::{Page, RemoteSource, SessionSummary};
use std::collections::VecDeque;
use std::future::IntoFuture;
use std::sync::Arc;
use tracing::debug;

use crate::{Error, Result};

pub const DEFAULT_PAGE_SIZE: usize = 50;

pub struct ListingCursor {
    remote: Arc<dyn RemoteSource>,
    page_size: usize,
    page_token: Option<String>,
    limit: Option<usize>,
    index: Option<Arc<dyn SessionIndex>>,
}

impl ListingCursor {
    pub fn new(remote: Arc<dyn RemoteSource>) -> Self {
        Self {
            remote,
            page_size: DEFAULT_PAGE_SIZE,
            page_token: None,
            limit: None,
            index: None,
        }
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Resume from a continuation token returned with an earlier page.
    pub fn page_token(mut self, token: impl Into<String>) -> Self {
        self.page_token = Some(token.into());
        self
    }

    /// Stop after this many sessions in total, even mid-page.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Upsert each session into `index` before handing it out.
    pub fn write_through(mut self, index: Arc<dyn SessionIndex>) -> Self {
        self.index = Some(index);
        self
    }

    /// Page size for the next request given how many items were already yielded.
    fn request_size(&self, yielded: usize) -> usize {
        match self.limit {
            Some(limit) => self.page_size.min(limit.saturating_sub(yielded)).max(1),
            None => self.page_size,
        }
    }

    fn persist(&self, summary: &SessionSummary) -> Result<()> {
        if let Some(index) = &self.index {
            index.upsert(summary, Utc::now())?;
        }
        Ok(())
    }

    async fn fetch(&self, yielded: usize, token: Option<&str>) -> Result<Page<SessionSummary>> {
        let size = self.request_size(yielded);
        let page = self.remote.list_sessions(size, token).await?;
        debug!(
            requested = size,
            received = page.items.len(),
            has_next = page.next_page_token.is_some(),
            "fetched session page"
        );
        Ok(page)
    }

    /// One page, truncated to `limit`.
    pub async fn first_page(self) -> Result<Page<SessionSummary>> {
        if self.limit == Some(0) {
            return Ok(Page::last(Vec::new()));
        }

        let mut page = self.fetch(0, self.page_token.as_deref()).await?;
        if let Some(limit) = self.limit {
            page.items.truncate(limit);
        }
        for summary in &page.items {
            self.persist(summary)?;
        }
        Ok(page)
    }

    /// Every session across all pages, newest first.
    pub fn into_stream(self) -> BoxStream<'static, Result<SessionSummary>> {
        let token = self.page_token.clone();
        let state = ListingState {
            cursor: self,
            token,
            buffered: VecDeque::new(),
            yielded: 0,
            exhausted: false,
        };

        stream::try_unfold(state, |mut state| async move {
            loop {
                if state.limit_reached() {
                    return Ok::<_, Error>(None);
                }
                if let Some(summary) = state.buffered.pop_front() {
                    state.cursor.persist(&summary)?;
                    state.yielded += 1;
                    return Ok(Some((summary, state)));
                }
                if state.exhausted {
                    return Ok(None);
                }
                state.fetch_next().await?;
            }
        })
        .boxed()
    }
}

impl IntoFuture for ListingCursor {
    type Output = Result<Page<SessionSummary>>;
    type IntoFuture = BoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        self.first_page().boxed()
    }
}

struct ListingState {
    cursor: ListingCursor,
    token: Option<String>,
    buffered: VecDeque<SessionSummary>,
    yielded: usize,
    exhausted: bool,
}

impl ListingState {
    fn limit_reached(&self) -> bool {
        self.cursor.limit.is_some_and(|limit| self.yielded >= limit)
    }

    async fn fetch_next(&mut self) -> Result<()> {
        let page = self
            .cursor
            .fetch(self.yielded, self.token.as_deref())
            .await?;

        // An empty page ends the listing even if it carries a token.
        if page.is_empty() {
            self.exhausted = true;
            return Ok(());
        }

        self.exhausted = page.next_page_token.is_none();
        self.token = page.next_page_token;
        self.buffered.extend(page.items);
        Ok(())
    }
}
