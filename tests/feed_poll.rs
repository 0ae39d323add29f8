// tests/feed_poll.rs
mod common;

use std::sync::Arc;

use common::{feed_fetcher, profile, rss, FlakyStore, MockFeedSource};
use timescroll_fetcher::ingest::parser::XmlFeedParser;
use timescroll_fetcher::ingest::worker::FeedFetcher;
use timescroll_fetcher::ingest::FeedPoller;
use timescroll_fetcher::store::StoreOp;
use timescroll_fetcher::{content_id, MemoryStore, Profile, Store};

fn poller(store: Arc<dyn Store>, source: MockFeedSource) -> FeedPoller {
    FeedPoller::new(store, feed_fetcher(source), 3)
}

fn ops_for(journal: &[StoreOp], pid: &str) -> Vec<StoreOp> {
    journal
        .iter()
        .filter(|op| match op {
            StoreOp::ListFollowers { pid: p }
            | StoreOp::Unfollow { pid: p, .. }
            | StoreOp::Follow { pid: p, .. } => p == pid,
            StoreOp::Upsert { .. } | StoreOp::Update { .. } => false,
        })
        .cloned()
        .collect()
}

#[tokio::test]
async fn new_items_are_stored_without_images() {
    let store = Arc::new(MemoryStore::new().with_journal());
    store.insert_profile(profile("p1")).unwrap();
    let source = MockFeedSource::new().with_feed("http://feeds.test/p1", rss(&[("a1", "First"), ("a2", "Second")]));

    let summary = poller(store.clone(), source).poll().await.unwrap();

    assert_eq!(summary.profiles, 1);
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.items_upserted, 2);

    let items = store.items_for("p1");
    assert_eq!(items.len(), 2);
    for guid in ["a1", "a2"] {
        let item = store.item(&content_id(guid)).expect("item stored under content id");
        assert_eq!(item.pid, "p1");
        assert!(item.image.is_empty());
        assert_eq!(item.link, format!("https://pages.test/{guid}"));
    }

    // No followers: the snapshot is taken, nothing is unfollowed or refollowed.
    let journal = store.journal();
    assert_eq!(
        ops_for(&journal, "p1"),
        vec![StoreOp::ListFollowers { pid: "p1".into() }]
    );
}

#[tokio::test]
async fn a_failed_feed_leaves_its_profile_and_others_alone() {
    let store = Arc::new(MemoryStore::new().with_journal());
    for pid in ["p1", "p2", "p3"] {
        store.insert_profile(profile(pid)).unwrap();
    }
    store.follow("u1", "p1").await.unwrap();

    let source = MockFeedSource::new()
        .with_error("http://feeds.test/p1", "connection refused")
        .with_feed("http://feeds.test/p2", rss(&[("b1", "Two")]))
        .with_feed("http://feeds.test/p3", rss(&[("c1", "Three")]));
    store.clear_journal();

    let summary = poller(store.clone(), source).poll().await.unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.updated, 2);
    assert!(store.items_for("p1").is_empty());
    assert_eq!(store.items_for("p2").len(), 1);
    assert_eq!(store.items_for("p3").len(), 1);

    // p1 was never touched: no snapshot, no unfollow.
    assert!(ops_for(&store.journal(), "p1").is_empty());
    assert_eq!(store.following("u1"), vec!["p1".to_string()]);
}

#[tokio::test]
async fn reorder_unfollows_upserts_then_refollows_each_follower_once() {
    let store = Arc::new(MemoryStore::new().with_journal());
    store.insert_profile(profile("p")).unwrap();
    store.insert_profile(Profile::new("q", "")).unwrap();
    store.follow("u1", "p").await.unwrap();
    store.follow("u1", "q").await.unwrap();
    store.follow("u2", "p").await.unwrap();
    assert_eq!(store.following("u1"), vec!["q".to_string(), "p".to_string()]);
    store.clear_journal();

    let source = MockFeedSource::new().with_feed("http://feeds.test/p", rss(&[("n1", "Fresh")]));
    poller(store.clone(), source).poll().await.unwrap();

    let journal = store.journal();
    let upsert_at = journal
        .iter()
        .position(|op| *op == StoreOp::Upsert { id: content_id("n1") })
        .expect("item upserted");

    for follower in ["u1", "u2"] {
        let unfollow = StoreOp::Unfollow { follower: follower.into(), pid: "p".into() };
        let follow = StoreOp::Follow { follower: follower.into(), pid: "p".into() };
        assert_eq!(journal.iter().filter(|op| **op == unfollow).count(), 1);
        assert_eq!(journal.iter().filter(|op| **op == follow).count(), 1);

        let u = journal.iter().position(|op| *op == unfollow).unwrap();
        let f = journal.iter().position(|op| *op == follow).unwrap();
        assert!(u < upsert_at, "{follower} unfollowed before the write");
        assert!(upsert_at < f, "{follower} refollowed after the write");
    }

    // The refreshed profile moves to the front; the edge count is unchanged.
    let u1 = store.following("u1");
    assert_eq!(u1.len(), 2);
    assert_eq!(u1[0], "p");
    assert_eq!(store.profile("p").unwrap().follower_count, 2);
}

#[tokio::test]
async fn an_empty_feed_still_refreshes_followers() {
    let store = Arc::new(MemoryStore::new().with_journal());
    store.insert_profile(profile("p")).unwrap();
    store.follow("u1", "p").await.unwrap();
    store.clear_journal();

    let source = MockFeedSource::new().with_feed("http://feeds.test/p", rss(&[]));
    let summary = poller(store.clone(), source).poll().await.unwrap();

    assert_eq!(summary.items_upserted, 0);
    assert_eq!(
        ops_for(&store.journal(), "p"),
        vec![
            StoreOp::ListFollowers { pid: "p".into() },
            StoreOp::Unfollow { follower: "u1".into(), pid: "p".into() },
            StoreOp::Follow { follower: "u1".into(), pid: "p".into() },
        ]
    );
}

#[tokio::test]
async fn a_malformed_feed_is_handled_as_empty() {
    let store = Arc::new(MemoryStore::new().with_journal());
    store.insert_profile(profile("p")).unwrap();
    store.follow("u1", "p").await.unwrap();
    store.clear_journal();

    let source = MockFeedSource::new().with_feed("http://feeds.test/p", "<html><body>moved</body></html>");
    let summary = poller(store.clone(), source).poll().await.unwrap();

    assert_eq!(summary.malformed, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.updated, 1);
    assert_eq!(store.item_count(), 0);
    assert_eq!(store.following("u1"), vec!["p".to_string()]);
    assert_eq!(
        ops_for(&store.journal(), "p")
            .iter()
            .filter(|op| matches!(op, StoreOp::Follow { .. }))
            .count(),
        1
    );
}

#[tokio::test]
async fn repeated_polls_do_not_duplicate_items() {
    let store = Arc::new(MemoryStore::new().with_journal());
    store.insert_profile(profile("p")).unwrap();
    let body = rss(&[("x1", "One"), ("x2", "Two")]);

    let source = MockFeedSource::new().with_feed("http://feeds.test/p", body.clone());
    poller(store.clone(), source).poll().await.unwrap();
    let first = store.items_for("p");

    let source = MockFeedSource::new().with_feed("http://feeds.test/p", body);
    poller(store.clone(), source).poll().await.unwrap();

    assert_eq!(store.item_count(), 2);
    assert_eq!(store.items_for("p"), first);
}

#[tokio::test]
async fn snapshot_failure_skips_the_profile_entirely() {
    let inner = MemoryStore::new().with_journal();
    inner.insert_profile(profile("p")).unwrap();
    inner.insert_profile(profile("ok")).unwrap();
    inner.follow("u1", "p").await.unwrap();
    inner.clear_journal();

    let mut flaky = FlakyStore::new(inner);
    flaky.fail_snapshot_for.insert("p".to_string());
    let store = Arc::new(flaky);

    let source = MockFeedSource::new()
        .with_feed("http://feeds.test/p", rss(&[("s1", "Skipped")]))
        .with_feed("http://feeds.test/ok", rss(&[("k1", "Kept")]));
    let summary = poller(store.clone(), source).poll().await.unwrap();

    assert_eq!(summary.snapshot_failures, 1);
    assert_eq!(summary.updated, 1);
    assert!(store.inner.item(&content_id("s1")).is_none());
    assert!(store.inner.item(&content_id("k1")).is_some());
    assert!(!store
        .inner
        .journal()
        .iter()
        .any(|op| matches!(op, StoreOp::Unfollow { .. })));
    assert_eq!(store.inner.following("u1"), vec!["p".to_string()]);
}

#[tokio::test]
async fn a_failed_refollow_does_not_stop_the_others() {
    let inner = MemoryStore::new().with_journal();
    inner.insert_profile(profile("p")).unwrap();
    inner.follow("u1", "p").await.unwrap();
    inner.follow("u2", "p").await.unwrap();

    let mut flaky = FlakyStore::new(inner);
    flaky.fail_follow_for.insert("u1".to_string());
    let store = Arc::new(flaky);

    let source = MockFeedSource::new().with_feed("http://feeds.test/p", rss(&[("r1", "Item")]));
    let summary = poller(store.clone(), source).poll().await.unwrap();

    assert_eq!(summary.updated, 1);
    assert_eq!(summary.items_upserted, 1);
    // u1's edge is lost; u2 is refollowed.
    assert!(store.inner.following("u1").is_empty());
    assert_eq!(store.inner.following("u2"), vec!["p".to_string()]);
}

#[tokio::test]
async fn profiles_without_a_feed_url_are_not_polled() {
    let store = Arc::new(MemoryStore::new().with_journal());
    store.insert_profile(profile("p")).unwrap();
    store.insert_profile(Profile::new("human", "")).unwrap();

    let source = Arc::new(MockFeedSource::new().with_feed("http://feeds.test/p", rss(&[])));
    let fetcher = Arc::new(FeedFetcher::new(source.clone(), Arc::new(XmlFeedParser)));
    let summary = FeedPoller::new(store.clone(), fetcher, 2).poll().await.unwrap();

    assert_eq!(summary.profiles, 1);
    assert_eq!(*source.calls.lock().unwrap(), vec!["http://feeds.test/p".to_string()]);
}
