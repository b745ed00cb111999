use anyhow::Result;
use chrono::{Duration, Utc};
use jules_sdk::types::SessionIndex;
use jules_sdk::{Client, Error};
use jules_store::SqliteSessionIndex;
use jules_testing::fixtures::session;
use jules_testing::{MockRemote, TestWorkspace};
use jules_types::{SessionState, SessionSummary};
use std::sync::Arc;

/// Seed the on-disk index as if `summary` had been synced `ago` before now.
fn seed(workspace: &TestWorkspace, summary: &SessionSummary, ago: Duration) -> Result<()> {
    let index = SqliteSessionIndex::open(&workspace.index_path())?;
    index.upsert(summary, Utc::now() - ago)?;
    Ok(())
}

fn connect(workspace: &TestWorkspace, remote: &Arc<MockRemote>) -> Result<Client> {
    Ok(Client::connect(remote.clone(), workspace.data_dir())?)
}

#[tokio::test]
async fn test_frozen_session_is_served_without_network() -> Result<()> {
    // Given: a completed session last synced 25 hours ago
    let workspace = TestWorkspace::new()?;
    let done = session("done", 0, SessionState::Completed);
    seed(&workspace, &done, Duration::hours(25))?;
    let remote = Arc::new(MockRemote::new().with_sessions(vec![done.clone()]));
    let client = connect(&workspace, &remote)?;

    // When
    let cached = client.sessions().get("done").await?;

    // Then
    assert_eq!(cached.summary, done);
    assert_eq!(remote.total_calls(), 0);

    Ok(())
}

#[tokio::test]
async fn test_stale_active_session_is_refreshed() -> Result<()> {
    // Given: an in-progress session synced 31 seconds ago that has since
    // moved on remotely
    let workspace = TestWorkspace::new()?;
    let running = session("run", 0, SessionState::InProgress);
    seed(&workspace, &running, Duration::seconds(31))?;

    let mut moved_on = running.clone();
    moved_on.state = SessionState::AwaitingUserFeedback;
    let remote = Arc::new(MockRemote::new().with_sessions(vec![moved_on.clone()]));
    let client = connect(&workspace, &remote)?;

    // When
    let before = Utc::now();
    let fresh = client.sessions().get("run").await?;

    // Then
    assert_eq!(remote.get_session_calls(), 1);
    assert_eq!(fresh.summary.state, SessionState::AwaitingUserFeedback);
    assert!(fresh.last_synced_at >= before);

    let entry = client.session("run").entry()?.expect("indexed");
    assert_eq!(entry.state, SessionState::AwaitingUserFeedback);

    Ok(())
}

#[tokio::test]
async fn test_uncached_session_is_fetched_once() -> Result<()> {
    let workspace = TestWorkspace::new()?;
    let remote = Arc::new(
        MockRemote::new().with_sessions(vec![session("s1", 0, SessionState::Planning)]),
    );
    let client = connect(&workspace, &remote)?;

    client.sessions().get("s1").await?;
    client.sessions().get("s1").await?;

    // Second read falls inside the hot window.
    assert_eq!(remote.get_session_calls(), 1);

    Ok(())
}

#[tokio::test]
async fn test_remote_404_evicts_cached_copy() -> Result<()> {
    // Given: a stale cached session that was deleted remotely
    let workspace = TestWorkspace::new()?;
    let gone = session("gone", 0, SessionState::Queued);
    seed(&workspace, &gone, Duration::minutes(10))?;
    let remote = Arc::new(MockRemote::new());
    let client = connect(&workspace, &remote)?;
    assert_eq!(client.sessions().cached()?.len(), 1);

    // When
    let result = client.sessions().get("gone").await;

    // Then
    assert!(matches!(result, Err(Error::NotFound(_))));
    assert!(client.sessions().cached()?.is_empty());
    assert!(client.session("gone").entry()?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_transport_error_keeps_cache() -> Result<()> {
    let workspace = TestWorkspace::new()?;
    let flaky = session("flaky", 0, SessionState::InProgress);
    seed(&workspace, &flaky, Duration::minutes(10))?;
    let remote = Arc::new(MockRemote::new().with_sessions(vec![flaky.clone()]));
    remote.fail_get_session("502 Bad Gateway");
    let client = connect(&workspace, &remote)?;

    let result = client.sessions().get("flaky").await;

    assert!(matches!(result, Err(Error::Remote(_))));
    assert_eq!(client.sessions().cached()?.len(), 1);

    Ok(())
}
