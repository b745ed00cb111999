use std::fmt;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

/// Result type for jules-store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the storage layer
#[derive(Debug)]
pub enum Error {
    /// The backing medium could not be prepared (missing permissions,
    /// read-only filesystem, unopenable database). Never retried here.
    StorageUnavailable {
        location: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Operation on a store that is not open (never initialised, or closed)
    StoreClosed(String),

    /// Bookmark update for a session that has no index row
    MissingIndexEntry(String),

    /// Database operation failed
    Database(rusqlite::Error),

    /// IO operation failed
    Io(std::io::Error),

    /// Record could not be serialized
    Serialization(serde_json::Error),

    /// Stored row could not be decoded
    Query(String),

    /// A lock was poisoned by a panicking writer
    Poisoned(String),
}

impl Error {
    pub(crate) fn unavailable(
        location: impl Into<PathBuf>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::StorageUnavailable {
            location: location.into(),
            source: source.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::StorageUnavailable { location, source } => {
                write!(
                    f,
                    "Storage unavailable at {}: {}",
                    location.display(),
                    source
                )
            }
            Error::StoreClosed(what) => write!(f, "Store is not open: {}", what),
            Error::MissingIndexEntry(id) => write!(f, "No index entry for session {}", id),
            Error::Database(err) => {
                let msg = err.to_string();
                if msg.contains("no such column") || msg.contains("no such table") {
                    write!(
                        f,
                        "Database schema mismatch: {}. Reopen the cache to rebuild it.",
                        msg
                    )
                } else {
                    write!(f, "Database error: {}", err)
                }
            }
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Serialization(err) => write!(f, "Serialization error: {}", err),
            Error::Query(msg) => write!(f, "Query error: {}", msg),
            Error::Poisoned(what) => write!(f, "Lock poisoned: {}", what),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::StorageUnavailable { source, .. } => Some(source.as_ref()),
            Error::Database(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::Serialization(err) => Some(err),
            Error::StoreClosed(_)
            | Error::MissingIndexEntry(_)
            | Error::Query(_)
            | Error::Poisoned(_) => None,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err)
    }
}

pub(crate) fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>> {
    mutex.lock().map_err(|_| Error::Poisoned(what.to_string()))
}
