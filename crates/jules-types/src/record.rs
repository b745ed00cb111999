use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// A persisted, write-once item with a stable identity and a timestamp.
///
/// Stores order records by `timestamp()` and de-duplicate by `record_id()`.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    fn record_id(&self) -> &str;

    fn timestamp(&self) -> DateTime<Utc>;
}
