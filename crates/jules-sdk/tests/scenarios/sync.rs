use anyhow::Result;
use futures::TryStreamExt;
use jules_sdk::types::SyncProgress;
use jules_sdk::{Client, Error, SyncDepth, SyncOptions, SyncPhase};
use jules_testing::fixtures::{activity, sessions_newest_first};
use jules_testing::{MockRemote, TestWorkspace, init_tracing};
use jules_types::Activity;
use std::sync::Arc;

fn remote_with_logs(count: usize) -> Arc<MockRemote> {
    let sessions = sessions_newest_first("s", count);
    let mut remote = MockRemote::new().with_sessions(sessions.clone());
    for summary in &sessions {
        remote = remote.with_activities(
            &summary.id,
            (0..3)
                .map(|n| activity(&format!("{}-a{}", summary.id, n), &summary.id, 100 + n))
                .collect(),
        );
    }
    Arc::new(remote)
}

#[tokio::test]
async fn test_deep_sync_then_offline_history() -> Result<()> {
    init_tracing();

    // Given
    let workspace = TestWorkspace::new()?;
    let remote = remote_with_logs(4);
    let client = Client::connect(remote.clone(), workspace.data_dir())?;

    // When
    let mut progress: Vec<SyncProgress> = Vec::new();
    let stats = client
        .sync(
            SyncOptions::default().with_depth(SyncDepth::Activities),
            |p| progress.push(p),
        )
        .await?;

    // Then
    assert_eq!(stats.sessions_processed, 4);
    assert_eq!(stats.activities_ingested, 12);
    assert!(stats.is_complete);
    assert_eq!(progress.last().map(|p| p.phase), Some(SyncPhase::Done));

    let calls_after_sync = remote.total_calls();
    let history: Vec<Activity> = client
        .session("s-0")
        .activities()?
        .history()
        .try_collect()
        .await?;
    assert_eq!(history.len(), 3);
    assert_eq!(remote.total_calls(), calls_after_sync);

    let entry = client.session("s-0").entry()?.expect("indexed");
    assert_eq!(entry.activity_count, 3);

    Ok(())
}

#[tokio::test]
async fn test_second_sync_is_incremental() -> Result<()> {
    let remote = remote_with_logs(3);
    let client = Client::builder(remote.clone()).in_memory().open()?;

    client.sync(SyncOptions::default(), |_| {}).await?;
    let stats = client.sync(SyncOptions::default(), |_| {}).await?;

    assert_eq!(stats.sessions_processed, 0);
    assert!(stats.is_complete);

    Ok(())
}

#[tokio::test]
async fn test_zero_concurrency_is_invalid_input() -> Result<()> {
    let client = Client::builder(remote_with_logs(1)).in_memory().open()?;

    let result = client
        .sync(SyncOptions::default().with_concurrency(0), |_| {})
        .await;

    assert!(matches!(result, Err(Error::InvalidInput(_))));

    Ok(())
}

#[tokio::test]
async fn test_sync_failure_reports_remote_error() -> Result<()> {
    let remote = remote_with_logs(2);
    remote.fail_activities_for("s-0", "quota exceeded");
    let client = Client::builder(remote.clone()).in_memory().open()?;

    let result = client
        .sync(
            SyncOptions::default()
                .with_depth(SyncDepth::Activities)
                .with_concurrency(1),
            |_| {},
        )
        .await;

    assert!(matches!(result, Err(Error::Remote(_))));
    // The newer session finished before the failing one and keeps its bookmark.
    let entry = client.session("s-1").entry()?.expect("indexed");
    assert_eq!(entry.activity_count, 3);

    Ok(())
}
