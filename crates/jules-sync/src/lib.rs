//! Read-through caching and synchronization for the jules session service.
//!
//! - [`CacheValidityPolicy`] decides whether a cached session may be served
//!   without a network round-trip.
//! - [`ActivityStream`] turns activity polling into cold, hot and hybrid
//!   streams backed by a per-session record store.
//! - [`ListingCursor`] pages through the remote session list.
//! - [`SyncEngine`] brings the local index up to date, incrementally by
//!   default, hydrating activity logs through a bounded pool.

pub mod activity_stream;
pub mod config;
pub mod cursor;
pub mod engine;
pub mod error;
pub mod policy;

pub use activity_stream::ActivityStream;
pub use config::{CacheConfig, Config, StorageConfig, SyncConfig, resolve_workspace_path};
pub use cursor::ListingCursor;
pub use engine::{SyncDepth, SyncEngine, SyncOptions, SyncPhase, SyncProgress, SyncStats};
pub use error::{Error, Result};
pub use policy::{CacheTier, CacheValidityPolicy};
