// Local storage for the jules cache
// Record logs per session plus one shared session index

pub mod error;
mod queries;
pub mod record_store;
mod registry;
mod schema;
pub mod session_index;

// Public API
pub use error::{Error, Result};
pub use record_store::{
    JsonlRecordStore, MemoryRecordStore, RecordIter, RecordStore, SqliteRecordDatabase,
    SqliteRecordStore,
};
pub use registry::{ActivityStore, ActivityStores, StoreBackend, store_key};
pub use schema::{INDEX_SCHEMA_VERSION, RECORDS_SCHEMA_VERSION};
pub use session_index::{MemorySessionIndex, SessionIndex, SqliteSessionIndex};
