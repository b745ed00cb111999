//! Testing infrastructure for jules cache tests.
//!
//! This crate provides utilities for writing integration tests:
//! - `MockRemote`: scripted in-memory remote service with call counters
//! - `fixtures`: session and activity builders on a fixed clock
//! - `TestWorkspace`: isolated data directory per test
//! - `init_tracing`: opt-in log output via `RUST_LOG`

pub mod fixtures;
pub mod remote;
pub mod workspace;

pub use remote::MockRemote;
pub use workspace::TestWorkspace;

use std::sync::Once;

static TRACING: Once = Once::new();

/// Install a fmt subscriber filtered by `RUST_LOG`. Safe to call from every test.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
