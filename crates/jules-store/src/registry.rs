use jules_types::Activity;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::lock;
use crate::record_store::{
    JsonlRecordStore, MemoryRecordStore, RecordStore, SqliteRecordDatabase, SqliteRecordStore,
};
use crate::Result;

/// Which [`RecordStore`] implementation backs per-session activity logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Memory,
    #[default]
    Jsonl,
    Sqlite,
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StoreBackend::Memory => "memory",
            StoreBackend::Jsonl => "jsonl",
            StoreBackend::Sqlite => "sqlite",
        };
        write!(f, "{}", name)
    }
}

pub type ActivityStore = Arc<dyn RecordStore<Activity>>;

/// Hands out exactly one activity store per session.
///
/// Stores are created lazily and initialised before they are returned, so a
/// caller never sees a store that is not open. Persistent stores hold no
/// per-session handle: JSONL files are opened per operation and every SQLite
/// scope shares the one `activities.db` connection.
pub struct ActivityStores {
    backend: StoreBackend,
    root: PathBuf,
    stores: Mutex<HashMap<String, ActivityStore>>,
    database: Mutex<Option<Arc<SqliteRecordDatabase>>>,
}

impl ActivityStores {
    pub fn new(backend: StoreBackend, root: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            root: root.into(),
            stores: Mutex::new(HashMap::new()),
            database: Mutex::new(None),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(StoreBackend::Memory, PathBuf::new())
    }

    pub fn backend(&self) -> StoreBackend {
        self.backend
    }

    pub fn for_session(&self, session_id: &str) -> Result<ActivityStore> {
        let mut stores = lock(&self.stores, "activity store registry")?;
        if let Some(store) = stores.get(session_id) {
            return Ok(store.clone());
        }

        let store: ActivityStore = match self.backend {
            StoreBackend::Memory => Arc::new(MemoryRecordStore::new(session_id)),
            StoreBackend::Jsonl => Arc::new(JsonlRecordStore::new(
                jsonl_path(&self.root, session_id),
            )),
            StoreBackend::Sqlite => {
                Arc::new(SqliteRecordStore::in_database(self.database()?, session_id))
            }
        };
        store.init()?;

        stores.insert(session_id.to_string(), store.clone());
        Ok(store)
    }

    /// Close every store handed out so far. The registry stays usable.
    pub fn close_all(&self) -> Result<()> {
        let mut stores = lock(&self.stores, "activity store registry")?;
        for store in stores.values() {
            store.close()?;
        }
        stores.clear();
        lock(&self.database, "activity store registry")?.take();
        Ok(())
    }

    fn database(&self) -> Result<Arc<SqliteRecordDatabase>> {
        let mut database = lock(&self.database, "activity store registry")?;
        if let Some(db) = database.as_ref() {
            return Ok(db.clone());
        }
        let db = SqliteRecordDatabase::open(self.root.join("activities.db"))?;
        *database = Some(db.clone());
        Ok(db)
    }
}

/// File name key for a session: the id itself when it is filename-safe,
/// otherwise its SHA-256.
pub fn store_key(session_id: &str) -> String {
    let safe = !session_id.is_empty()
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if safe {
        return session_id.to_string();
    }

    let mut hasher = Sha256::new();
    hasher.update(session_id.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn jsonl_path(root: &Path, session_id: &str) -> PathBuf {
    root.join("activities")
        .join(format!("{}.jsonl", store_key(session_id)))
}
