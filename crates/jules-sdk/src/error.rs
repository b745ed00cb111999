use jules_types::RemoteError;
use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    NotFound(String),
    InvalidInput(String),
    Storage(jules_store::Error),
    Remote(RemoteError),
    Internal(jules_sync::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotFound(msg) => write!(f, "Not found: {}", msg),
            Error::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            Error::Storage(err) => write!(f, "Storage error: {}", err),
            Error::Remote(err) => write!(f, "{}", err),
            Error::Internal(err) => write!(f, "Internal error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Storage(err) => Some(err),
            Error::Remote(err) => Some(err),
            Error::Internal(err) => Some(err),
            _ => None,
        }
    }
}

impl From<jules_store::Error> for Error {
    fn from(err: jules_store::Error) -> Self {
        Error::Storage(err)
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

impl From<jules_sync::Error> for Error {
    fn from(err: jules_sync::Error) -> Self {
        match err {
            jules_sync::Error::Store(err) => Error::Storage(err),
            jules_sync::Error::NotFound(id) => Error::NotFound(id),
            jules_sync::Error::Remote(err) => Error::Remote(err),
            other => Error::Internal(other),
        }
    }
}
