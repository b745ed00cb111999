//! Type re-exports for the SDK.
//!
//! Consumers work with these names only, so the storage and sync crates can
//! be reorganised without breaking them.

// ============================================================================
// Domain Types (from jules-types)
// ============================================================================

pub use jules_types::{
    Activity, CachedSession, Page, Record, RemoteError, RemoteSource, SessionIndexEntry,
    SessionState, SessionSummary,
};

// ============================================================================
// Storage Types (from jules-store)
// ============================================================================

pub use jules_store::{RecordStore, SessionIndex, StoreBackend};

// ============================================================================
// Sync Types (from jules-sync)
// ============================================================================

pub use jules_sync::{
    CacheTier, CacheValidityPolicy, Config, SyncDepth, SyncOptions, SyncPhase, SyncProgress,
    SyncStats,
};
