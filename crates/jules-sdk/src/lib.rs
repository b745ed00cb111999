//! jules-sdk: local-first client for the Jules coding-agent API.
//!
//! # Overview
//!
//! Remote sessions and their activity logs change while agents work. This
//! SDK keeps a local copy so callers can read without re-fetching everything:
//! session summaries are served from the cache while the tiered validity
//! policy trusts them, activity logs are persisted per session and tailed
//! by polling, and `sync` brings the whole index up to date incrementally.
//!
//! The HTTP transport is supplied by the caller as a [`RemoteSource`]
//! implementation; authentication and retries live there.
//!
//! # Quickstart
//!
//! ```no_run
//! use jules_sdk::{Client, SyncDepth, SyncOptions};
//! # use jules_sdk::types::RemoteSource;
//! # use std::sync::Arc;
//!
//! # async fn run(remote: Arc<dyn RemoteSource>) -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::connect_default(remote)?;
//!
//! // Pull new sessions and their activity logs
//! let stats = client
//!     .sync(SyncOptions::default().with_depth(SyncDepth::Activities), |p| {
//!         println!("{:?} {}/{:?}", p.phase, p.current, p.total);
//!     })
//!     .await?;
//! println!("{} sessions, {} activities", stats.sessions_processed, stats.activities_ingested);
//!
//! // Cached reads
//! for entry in client.sessions().cached()? {
//!     println!("{} [{}] {}", entry.id, entry.state, entry.title);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! This SDK acts as a facade over:
//! - `jules-types`: domain models and the remote capability contract
//! - `jules-store`: per-session record stores and the session index
//! - `jules-sync`: validity policy, activity streams, listing cursor, sync engine
//!
//! # Usage Patterns
//!
//! ## Following a session live
//!
//! ```no_run
//! use futures::stream::StreamExt;
//! use jules_sdk::Client;
//! # use jules_sdk::types::RemoteSource;
//! # use std::sync::Arc;
//!
//! # async fn run(remote: Arc<dyn RemoteSource>) -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::connect_default(remote)?;
//! let activities = client.session("sessions/123").activities()?;
//!
//! // Cached history first, then new activities as they appear
//! let mut stream = activities.stream();
//! while let Some(activity) = stream.next().await {
//!     let activity = activity?;
//!     println!("{} {}", activity.create_time, activity.id);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Listing with write-through
//!
//! ```no_run
//! use futures::stream::TryStreamExt;
//! use jules_sdk::Client;
//! # use jules_sdk::types::RemoteSource;
//! # use std::sync::Arc;
//!
//! # async fn run(remote: Arc<dyn RemoteSource>) -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::builder(remote).in_memory().open()?;
//!
//! // One page
//! let page = client.sessions().list().await?;
//! println!("{} sessions, more: {}", page.items.len(), page.next_page_token.is_some());
//!
//! // Everything, capped at 100
//! let recent: Vec<_> = client.sessions().list().limit(100).into_stream().try_collect().await?;
//! println!("{} indexed", recent.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod types;

// Public facade
pub use client::{Client, ClientBuilder, SessionClient, SessionHandle};
pub use error::{Error, Result};
pub use jules_sync::{ActivityStream, ListingCursor, SyncDepth, SyncOptions, SyncPhase, SyncStats};
pub use jules_types::RemoteSource;
