use chrono::Utc;
use jules_store::{
    ActivityStores, MemorySessionIndex, SessionIndex, SqliteSessionIndex, StoreBackend,
};
use jules_sync::{
    ActivityStream, CacheValidityPolicy, Config, ListingCursor, SyncEngine, SyncOptions,
    SyncProgress, SyncStats,
};
use jules_types::{CachedSession, RemoteError, RemoteSource, SessionIndexEntry};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{Error, Result};

struct ClientInner {
    remote: Arc<dyn RemoteSource>,
    index: Arc<dyn SessionIndex>,
    stores: Arc<ActivityStores>,
    config: Config,
    policy: CacheValidityPolicy,
}

/// Entry point to the local-first cache.
///
/// Cloning is cheap; clones share the same index and stores.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    pub fn builder(remote: Arc<dyn RemoteSource>) -> ClientBuilder {
        ClientBuilder::new(remote)
    }

    /// Open the cache stored under `path`.
    pub fn connect(remote: Arc<dyn RemoteSource>, path: impl Into<PathBuf>) -> Result<Self> {
        ClientBuilder::new(remote).data_dir(path).open()
    }

    /// Open the cache in the default data directory (`JULES_CACHE_PATH`,
    /// then the platform data directory).
    pub fn connect_default(remote: Arc<dyn RemoteSource>) -> Result<Self> {
        ClientBuilder::new(remote).open()
    }

    pub fn sessions(&self) -> SessionClient {
        SessionClient {
            inner: self.inner.clone(),
        }
    }

    pub fn session(&self, id: &str) -> SessionHandle {
        SessionHandle {
            inner: self.inner.clone(),
            id: id.to_string(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Bring the local index up to date. See [`SyncEngine::sync`].
    pub async fn sync<F>(&self, options: SyncOptions, on_progress: F) -> Result<SyncStats>
    where
        F: FnMut(SyncProgress),
    {
        if options.concurrency == 0 {
            return Err(Error::InvalidInput(
                "sync concurrency must be at least 1".to_string(),
            ));
        }

        let engine = SyncEngine::new(
            self.inner.remote.clone(),
            self.inner.index.clone(),
            self.inner.stores.clone(),
        )
        .with_page_size(self.inner.config.sync.page_size)
        .with_poll_interval(self.inner.config.poll_interval());

        Ok(engine.sync(options, on_progress).await?)
    }
}

pub struct ClientBuilder {
    remote: Arc<dyn RemoteSource>,
    data_dir: Option<PathBuf>,
    in_memory: bool,
    backend: Option<StoreBackend>,
    config: Option<Config>,
}

impl ClientBuilder {
    pub fn new(remote: Arc<dyn RemoteSource>) -> Self {
        Self {
            remote,
            data_dir: None,
            in_memory: false,
            backend: None,
            config: None,
        }
    }

    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(path.into());
        self
    }

    /// Keep everything in memory; nothing touches the filesystem.
    pub fn in_memory(mut self) -> Self {
        self.in_memory = true;
        self
    }

    /// Override the activity store backend from the config file.
    pub fn backend(mut self, backend: StoreBackend) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Use this config instead of `config.toml` in the data directory.
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub fn open(self) -> Result<Client> {
        if self.in_memory {
            let config = self.config.unwrap_or_default();
            return Ok(Client::from_parts(
                self.remote,
                Arc::new(MemorySessionIndex::new()),
                Arc::new(ActivityStores::in_memory()),
                config,
            ));
        }

        let data_dir = match self.data_dir {
            Some(path) => path,
            None => jules_sync::resolve_workspace_path(None)?,
        };
        let config = match self.config {
            Some(config) => config,
            None => Config::load_from(&data_dir.join("config.toml"))?,
        };
        let backend = self.backend.unwrap_or(config.storage.backend);

        let index = SqliteSessionIndex::open(&data_dir.join("index.db"))?;
        let stores = ActivityStores::new(backend, &data_dir);
        debug!(data_dir = %data_dir.display(), %backend, "opened jules cache");

        Ok(Client::from_parts(
            self.remote,
            Arc::new(index),
            Arc::new(stores),
            config,
        ))
    }
}

impl Client {
    fn from_parts(
        remote: Arc<dyn RemoteSource>,
        index: Arc<dyn SessionIndex>,
        stores: Arc<ActivityStores>,
        config: Config,
    ) -> Self {
        let policy = config.policy();
        Self {
            inner: Arc::new(ClientInner {
                remote,
                index,
                stores,
                config,
                policy,
            }),
        }
    }
}

/// Cached, policy-aware access to session summaries.
pub struct SessionClient {
    inner: Arc<ClientInner>,
}

impl SessionClient {
    /// Serve the cached summary when the validity policy trusts it,
    /// otherwise refresh it from the remote. A session the remote no longer
    /// has is evicted from the cache before `NotFound` is returned.
    pub async fn get(&self, id: &str) -> Result<CachedSession> {
        let inner = &self.inner;
        let now = Utc::now();
        let cached = inner.index.get(id)?;

        if let Some(cached) = cached.as_ref()
            && inner.policy.is_valid(Some(cached), now)
        {
            debug!(
                session_id = %id,
                tier = %inner.policy.classify(cached, now),
                "serving cached session"
            );
            return Ok(cached.clone());
        }

        match inner.remote.get_session(id).await {
            Ok(summary) => {
                let synced_at = Utc::now();
                inner.index.upsert(&summary, synced_at)?;
                Ok(CachedSession::new(summary, synced_at))
            }
            Err(RemoteError::NotFound(_)) => {
                if inner.index.remove(id)? {
                    warn!(
                        session_id = %id,
                        "session no longer exists remotely, evicted from cache"
                    );
                }
                Err(Error::NotFound(format!("Session {}", id)))
            }
            Err(err) => Err(Error::Remote(err)),
        }
    }

    /// Remote listing that writes each session through to the index.
    /// Await it for one page or call `into_stream()` for all of them.
    pub fn list(&self) -> ListingCursor {
        ListingCursor::new(self.inner.remote.clone())
            .page_size(self.inner.config.sync.page_size)
            .write_through(self.inner.index.clone())
    }

    /// Index rows, newest first, without any network call.
    pub fn cached(&self) -> Result<Vec<SessionIndexEntry>> {
        Ok(self.inner.index.entries()?)
    }
}

/// One session: its summary and its activity streams.
pub struct SessionHandle {
    inner: Arc<ClientInner>,
    id: String,
}

impl SessionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn summary(&self) -> Result<CachedSession> {
        SessionClient {
            inner: self.inner.clone(),
        }
        .get(&self.id)
        .await
    }

    /// Sync bookmark for this session, if it has been indexed.
    pub fn entry(&self) -> Result<Option<SessionIndexEntry>> {
        Ok(self.inner.index.entry(&self.id)?)
    }

    /// Activity streams backed by this session's record store.
    pub fn activities(&self) -> Result<ActivityStream> {
        let store = self.inner.stores.for_session(&self.id)?;
        Ok(
            ActivityStream::new(self.id.clone(), store, self.inner.remote.clone())
                .with_poll_interval(self.inner.config.poll_interval()),
        )
    }
}
