use jules_types::RemoteError;
use std::fmt;

/// Result type for jules-sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while reading through or syncing the cache
#[derive(Debug)]
pub enum Error {
    /// Local storage layer error
    Store(jules_store::Error),

    /// The remote copy no longer exists
    NotFound(String),

    /// Any other remote failure, propagated verbatim
    Remote(RemoteError),

    /// Configuration error
    Config(String),

    /// IO operation failed
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Store(err) => write!(f, "Store error: {}", err),
            Error::NotFound(id) => write!(f, "Not found: {}", id),
            Error::Remote(err) => write!(f, "{}", err),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Store(err) => Some(err),
            Error::Remote(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::NotFound(_) | Error::Config(_) => None,
        }
    }
}

impl From<jules_store::Error> for Error {
    fn from(err: jules_store::Error) -> Self {
        Error::Store(err)
    }
}

impl From<RemoteError> for Error {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::NotFound(id) => Error::NotFound(id),
            other => Error::Remote(other),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Io(std::io::Error::other(err))
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}
