use anyhow::Result;
use futures::TryStreamExt;
use jules_sdk::Client;
use jules_testing::MockRemote;
use jules_testing::fixtures::sessions_newest_first;
use jules_types::SessionSummary;
use std::sync::Arc;

#[tokio::test]
async fn test_awaited_listing_writes_one_page_through() -> Result<()> {
    let remote = Arc::new(MockRemote::new().with_sessions(sessions_newest_first("s", 7)));
    let client = Client::builder(remote.clone()).in_memory().open()?;

    let page = client.sessions().list().page_size(3).await?;

    assert_eq!(page.items.len(), 3);
    assert!(page.next_page_token.is_some());
    let cached: Vec<String> = client
        .sessions()
        .cached()?
        .into_iter()
        .map(|e| e.id)
        .collect();
    assert_eq!(cached, vec!["s-6", "s-5", "s-4"]);

    Ok(())
}

#[tokio::test]
async fn test_streamed_listing_respects_limit() -> Result<()> {
    let remote = Arc::new(MockRemote::new().with_sessions(sessions_newest_first("s", 7)));
    let client = Client::builder(remote.clone()).in_memory().open()?;

    let listed: Vec<SessionSummary> = client
        .sessions()
        .list()
        .page_size(3)
        .limit(5)
        .into_stream()
        .try_collect()
        .await?;

    assert_eq!(listed.len(), 5);
    assert_eq!(remote.requested_page_sizes(), vec![3, 2]);
    assert_eq!(client.sessions().cached()?.len(), 5);

    Ok(())
}
