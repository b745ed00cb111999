use anyhow::Result;
use futures::{StreamExt, TryStreamExt};
use jules_sdk::Client;
use jules_sdk::types::{Config, StoreBackend};
use jules_testing::fixtures::{activity, session};
use jules_testing::{MockRemote, TestWorkspace};
use jules_types::{Activity, SessionState};
use std::sync::Arc;
use std::time::Duration;

fn remote() -> Arc<MockRemote> {
    Arc::new(
        MockRemote::new()
            .with_sessions(vec![session("s1", 0, SessionState::InProgress)])
            .with_activities(
                "s1",
                vec![activity("a1", "s1", 100), activity("a2", "s1", 200)],
            ),
    )
}

#[tokio::test]
async fn test_history_survives_reopen() -> Result<()> {
    let workspace = TestWorkspace::new()?;
    let remote = remote();

    {
        let client = Client::connect(remote.clone(), workspace.data_dir())?;
        let history: Vec<Activity> = client
            .session("s1")
            .activities()?
            .history()
            .try_collect()
            .await?;
        assert_eq!(history.len(), 2);
    }

    let client = Client::connect(remote.clone(), workspace.data_dir())?;
    let history: Vec<Activity> = client
        .session("s1")
        .activities()?
        .history()
        .try_collect()
        .await?;

    assert_eq!(history.len(), 2);
    assert_eq!(remote.list_activities_calls("s1"), 1);
    assert!(workspace.data_dir().join("activities").join("s1.jsonl").exists());

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_live_tail_uses_configured_poll_interval() -> Result<()> {
    let workspace = TestWorkspace::new()?;
    let mut config = Config::default();
    config.sync.poll_interval_ms = 60_000;
    config.storage.backend = StoreBackend::Sqlite;
    config.save_to(&workspace.config_path())?;

    let remote = remote();
    let client = Client::connect(remote.clone(), workspace.data_dir())?;
    let activities = client.session("s1").activities()?;

    let mut stream = activities.stream();
    let mut seen = Vec::new();
    for _ in 0..2 {
        seen.push(stream.next().await.transpose()?.map(|a| a.id));
    }
    remote.push_activity(activity("a3", "s1", 300));

    // Nothing polled before the configured minute has passed.
    let early = tokio::time::timeout(Duration::from_secs(30), stream.next()).await;
    assert!(early.is_err());
    seen.push(stream.next().await.transpose()?.map(|a| a.id));

    let seen: Vec<String> = seen.into_iter().flatten().collect();
    assert_eq!(seen, vec!["a1", "a2", "a3"]);
    assert!(workspace.data_dir().join("activities.db").exists());

    Ok(())
}
