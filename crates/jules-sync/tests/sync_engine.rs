//! Integration tests for the sync engine
//!
//! These drive `SyncEngine::sync` against a scripted remote and check the
//! incremental short-circuit, progress ordering and fail-fast behaviour.

use anyhow::Result;
use jules_store::{
    ActivityStores, MemorySessionIndex, SessionIndex, SqliteSessionIndex, StoreBackend,
};
use jules_sync::{Error, SyncDepth, SyncEngine, SyncOptions, SyncPhase, SyncProgress};
use jules_testing::fixtures::{activity, at, session, sessions_newest_first};
use jules_testing::{MockRemote, TestWorkspace};
use jules_types::{SessionState, SessionSummary};
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    remote: Arc<MockRemote>,
    index: Arc<MemorySessionIndex>,
    engine: SyncEngine,
}

fn harness(remote: MockRemote) -> Harness {
    let remote = Arc::new(remote);
    let index = Arc::new(MemorySessionIndex::new());
    let stores = Arc::new(ActivityStores::in_memory());
    let engine = SyncEngine::new(remote.clone(), index.clone(), stores).with_page_size(2);
    Harness {
        remote,
        index,
        engine,
    }
}

/// Remote with `count` sessions, each holding two activities.
fn remote_with_activities(count: usize) -> (MockRemote, Vec<SessionSummary>) {
    let sessions = sessions_newest_first("s", count);
    let mut remote = MockRemote::new().with_sessions(sessions.clone());
    for (n, summary) in sessions.iter().enumerate() {
        let base = 1_000 + n as i64 * 100;
        remote = remote.with_activities(
            &summary.id,
            vec![
                activity(&format!("{}-a1", summary.id), &summary.id, base),
                activity(&format!("{}-a2", summary.id), &summary.id, base + 10),
            ],
        );
    }
    (remote, sessions)
}

fn hydration_counters(events: &[SyncProgress]) -> Vec<usize> {
    events
        .iter()
        .filter(|p| p.phase == SyncPhase::HydratingRecords)
        .map(|p| p.current)
        .collect()
}

#[tokio::test]
async fn test_metadata_sync_indexes_every_session() -> Result<()> {
    let (remote, _) = remote_with_activities(5);
    let h = harness(remote);

    let mut events = Vec::new();
    let stats = h
        .engine
        .sync(SyncOptions::default(), |p| events.push(p))
        .await?;

    assert_eq!(stats.sessions_processed, 5);
    assert_eq!(stats.activities_ingested, 0);
    assert!(stats.is_complete);
    assert_eq!(h.index.entries()?.len(), 5);
    assert!(h.remote.hydrated_sessions().is_empty());

    let listed: Vec<usize> = events
        .iter()
        .filter(|p| p.phase == SyncPhase::FetchingList)
        .map(|p| p.current)
        .collect();
    assert_eq!(listed, vec![1, 2, 3, 4, 5]);
    assert_eq!(events.last().map(|p| p.phase), Some(SyncPhase::Done));

    Ok(())
}

#[tokio::test]
async fn test_incremental_sync_stops_at_known_session() -> Result<()> {
    // Given: X was indexed and hydrated by an earlier deep sync that
    // stopped before reaching the older W
    let remote = MockRemote::new()
        .with_sessions(vec![
            session("x", 100, SessionState::Completed),
            session("w", 50, SessionState::Completed),
        ])
        .with_activities("x", vec![activity("x-a1", "x", 150)])
        .with_activities("w", vec![activity("w-a1", "w", 60)]);
    let h = harness(remote);
    h.engine
        .sync(
            SyncOptions::default()
                .with_depth(SyncDepth::Activities)
                .with_limit(1),
            |_| {},
        )
        .await?;
    assert!(h.index.contains("x")?);
    assert!(!h.index.contains("w")?);
    assert_eq!(h.remote.list_activities_calls("x"), 1);

    // When: the listing re-returns X at its head
    let sessions_calls_before = h.remote.list_sessions_calls();
    let stats = h.engine.sync(SyncOptions::default(), |_| {}).await?;

    // Then: listing stopped at X without touching W or X's activities
    assert_eq!(stats.sessions_processed, 0);
    assert!(stats.is_complete);
    assert!(!h.index.contains("w")?);
    assert_eq!(h.remote.list_activities_calls("x"), 1);
    assert_eq!(h.remote.list_sessions_calls(), sessions_calls_before + 1);

    Ok(())
}

#[tokio::test]
async fn test_incremental_sync_stops_at_nanosecond_create_time_on_disk() -> Result<()> {
    let workspace = TestWorkspace::new()?;
    let mut head = session("x", 100, SessionState::Completed);
    head.create_time = at(100) + chrono::Duration::nanoseconds(123_456_789);
    let remote = Arc::new(MockRemote::new().with_sessions(vec![head.clone()]));
    let index = Arc::new(SqliteSessionIndex::open(&workspace.index_path())?);
    let engine = SyncEngine::new(
        remote.clone(),
        index.clone(),
        Arc::new(ActivityStores::in_memory()),
    );

    let first = engine.sync(SyncOptions::default(), |_| {}).await?;
    let second = engine.sync(SyncOptions::default(), |_| {}).await?;

    assert_eq!(first.sessions_processed, 1);
    assert_eq!(second.sessions_processed, 0);
    assert_eq!(index.max_create_time()?, Some(head.create_time));

    Ok(())
}

#[tokio::test]
async fn test_incremental_sync_picks_up_new_head_only() -> Result<()> {
    let h = harness(MockRemote::new().with_sessions(sessions_newest_first("s", 4)));
    h.engine.sync(SyncOptions::default(), |_| {}).await?;

    h.remote.add_session(session("fresh", 1_000, SessionState::Queued));
    let stats = h.engine.sync(SyncOptions::default(), |_| {}).await?;

    assert_eq!(stats.sessions_processed, 1);
    assert!(h.index.contains("fresh")?);
    let newest = h.index.entries()?.into_iter().next().map(|e| e.id);
    assert_eq!(newest.as_deref(), Some("fresh"));

    Ok(())
}

#[tokio::test]
async fn test_full_sync_walks_past_known_sessions() -> Result<()> {
    let h = harness(MockRemote::new().with_sessions(sessions_newest_first("s", 4)));
    h.engine.sync(SyncOptions::default(), |_| {}).await?;

    let stats = h.engine.sync(SyncOptions::default().full(), |_| {}).await?;

    assert_eq!(stats.sessions_processed, 4);
    assert!(stats.is_complete);

    Ok(())
}

#[tokio::test]
async fn test_limit_truncates_discovery() -> Result<()> {
    let h = harness(MockRemote::new().with_sessions(sessions_newest_first("s", 5)));

    let stats = h
        .engine
        .sync(SyncOptions::default().with_limit(2), |_| {})
        .await?;

    assert_eq!(stats.sessions_processed, 2);
    assert!(!stats.is_complete);
    assert_eq!(h.index.entries()?.len(), 2);
    assert_eq!(h.remote.requested_page_sizes(), vec![2]);

    Ok(())
}

#[tokio::test]
async fn test_deep_sync_updates_bookmarks() -> Result<()> {
    let (remote, sessions) = remote_with_activities(3);
    let h = harness(remote);

    let stats = h
        .engine
        .sync(
            SyncOptions::default().with_depth(SyncDepth::Activities),
            |_| {},
        )
        .await?;

    assert_eq!(stats.activities_ingested, 6);
    for (n, summary) in sessions.iter().enumerate() {
        let entry = h.index.entry(&summary.id)?.expect("indexed");
        assert_eq!(entry.activity_count, 2);
        assert_eq!(
            entry.activity_high_water_mark,
            Some(at(1_000 + n as i64 * 100 + 10))
        );
    }

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_progress_is_monotonic_for_every_pool_size() -> Result<()> {
    const N: usize = 6;

    for k in 1..=N {
        let (mut remote, sessions) = remote_with_activities(N);
        // Uneven delays so completion order differs from listing order.
        for (n, summary) in sessions.iter().enumerate() {
            let delay = Duration::from_millis(100 * (1 + ((n * 4) % N) as u64));
            remote = remote.with_activity_delay(&summary.id, delay);
        }
        let h = harness(remote);

        let mut events = Vec::new();
        let stats = h
            .engine
            .sync(
                SyncOptions::default()
                    .with_depth(SyncDepth::Activities)
                    .with_concurrency(k),
                |p| events.push(p),
            )
            .await?;

        assert_eq!(stats.sessions_processed, N);
        assert_eq!(hydration_counters(&events), (1..=N).collect::<Vec<_>>());
        assert_eq!(h.remote.max_concurrent_activity_fetches(), k);
    }

    Ok(())
}

#[tokio::test]
async fn test_hydration_failure_aborts_sync() -> Result<()> {
    let (remote, sessions) = remote_with_activities(5);
    let h = harness(remote);
    let failing = &sessions[2].id;
    h.remote.fail_activities_for(failing, "500 Internal Server Error");

    let mut events = Vec::new();
    let result = h
        .engine
        .sync(
            SyncOptions::default()
                .with_depth(SyncDepth::Activities)
                .with_concurrency(1),
            |p| events.push(p),
        )
        .await;

    assert!(matches!(result, Err(Error::Remote(_))));
    assert_eq!(hydration_counters(&events), vec![1, 2]);
    assert!(events.iter().all(|p| p.phase != SyncPhase::Done));

    // Queued sessions were never started.
    for later in &sessions[3..] {
        assert_eq!(h.remote.list_activities_calls(&later.id), 0);
    }

    // Work committed before the failure is kept.
    for earlier in &sessions[..2] {
        let entry = h.index.entry(&earlier.id)?.expect("indexed");
        assert_eq!(entry.activity_count, 2);
    }

    Ok(())
}

#[tokio::test]
async fn test_listing_failure_aborts_sync() -> Result<()> {
    let h = harness(MockRemote::new().with_sessions(sessions_newest_first("s", 3)));
    h.remote.fail_session_listing("401 Unauthorized");

    let result = h.engine.sync(SyncOptions::default(), |_| {}).await;

    assert!(matches!(result, Err(Error::Remote(_))));
    assert!(h.index.entries()?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_deep_sync_persists_to_disk() -> Result<()> {
    let workspace = TestWorkspace::new()?;
    let (remote, sessions) = remote_with_activities(2);
    let remote = Arc::new(remote);

    {
        let index = Arc::new(SqliteSessionIndex::open(&workspace.index_path())?);
        let stores = Arc::new(ActivityStores::new(
            StoreBackend::Jsonl,
            workspace.data_dir(),
        ));
        let engine = SyncEngine::new(remote.clone(), index, stores);
        engine
            .sync(
                SyncOptions::default().with_depth(SyncDepth::Activities),
                |_| {},
            )
            .await?;
    }

    // Reopened cache already knows everything; no further hydration.
    let index = Arc::new(SqliteSessionIndex::open(&workspace.index_path())?);
    let stores = Arc::new(ActivityStores::new(
        StoreBackend::Jsonl,
        workspace.data_dir(),
    ));
    let engine = SyncEngine::new(remote.clone(), index.clone(), stores.clone());
    let stats = engine
        .sync(
            SyncOptions::default().with_depth(SyncDepth::Activities),
            |_| {},
        )
        .await?;

    assert_eq!(stats.sessions_processed, 0);
    assert_eq!(index.entries()?.len(), 2);
    let store = stores.for_session(&sessions[0].id)?;
    assert_eq!(store.scan()?.count(), 2);
    assert_eq!(remote.list_activities_calls(&sessions[0].id), 1);

    Ok(())
}
