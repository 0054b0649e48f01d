//! End-to-end behavior of the to-do store.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Tests can unwrap and panic

use statecraft_runtime::retry::RetryPolicy;
use statecraft_runtime::{StoreConfig, StoreError};
use statecraft_testing::{init_test_tracing, Recorder};
use futures::future::BoxFuture;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use todo::{
    add_item, open_store, refresh, selectors, DataSource, DataSourceError, InMemoryDataSource, RefreshError,
    TodoAction, TodoEnvironment, TodoId, TodoItem, TodoStore, ValidationError,
};

async fn open_with(source: Arc<InMemoryDataSource>) -> TodoStore {
    init_test_tracing();
    let env = TodoEnvironment::new(source as Arc<dyn DataSource>).with_retry(
        RetryPolicy::builder()
            .max_retries(2)
            .initial_delay(Duration::from_millis(1))
            .build(),
    );
    open_store(env, StoreConfig::default()).await.unwrap()
}

async fn open_empty() -> TodoStore {
    let store = open_with(Arc::new(InMemoryDataSource::empty())).await;
    store.ready().await;
    store
}

#[tokio::test]
async fn init_fetch_seeds_the_store_once() {
    let source = Arc::new(InMemoryDataSource::default());
    let store = open_with(Arc::clone(&source)).await;

    store.ready().await;

    assert_eq!(store.select(&selectors::all_items), vec![TodoItem::with_id("1", "Buy Milk")]);
    assert_eq!(source.calls(), 1);
    assert!(store.state(|s| s.pending_fetches.is_empty()));
}

#[tokio::test]
async fn buy_milk_scenario() {
    let store = open_empty().await;

    let id = add_item(&store, "Buy Milk").await.unwrap();
    let item = store.select(&todo::selectors::item_by_id(id.clone())).unwrap();
    assert_eq!(item.title, "Buy Milk");
    assert!(!item.done);
    assert_eq!(store.state(|s| s.items.len()), 1);

    store.send(TodoAction::ToggleDone { id: id.clone() }).await.unwrap();
    assert!(store.state(|s| s.items[0].done));

    store.send(TodoAction::Delete { id }).await.unwrap();
    assert!(store.state(|s| s.items.is_empty()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_adds_both_land() {
    let store = open_empty().await;

    let (first, second) = tokio::join!(add_item(&store, "Walk dog"), add_item(&store, "Write docs"));
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_ne!(first, second);
    let ids: Vec<TodoId> = store.state(|s| s.items.iter().map(|item| item.id.clone()).collect());
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&first) && ids.contains(&second));
}

#[tokio::test]
async fn blank_title_is_surfaced_and_does_not_notify() {
    let store = open_empty().await;
    let counts = Recorder::new();
    let _sub = store.subscribe(selectors::incomplete_count, counts.callback());
    let before = store.snapshot();

    let result = add_item(&store, "").await;

    let Err(StoreError::Rejected(ValidationError::EmptyTitle { action })) = result else {
        panic!("expected an empty-title rejection, got {result:?}");
    };
    assert_eq!(action, "[Todo] Add");
    assert!(Arc::ptr_eq(&before, &store.snapshot()));
    assert!(counts.is_empty());
}

#[tokio::test]
async fn incomplete_count_fires_only_on_real_changes() {
    let store = open_empty().await;
    let counts = Recorder::new();
    let _sub = store.subscribe(selectors::incomplete_count, counts.callback());

    let id = add_item(&store, "Walk dog").await.unwrap();
    store
        .send(TodoAction::Edit(TodoItem::with_id(id.clone(), "Walk the dog")))
        .await
        .unwrap();
    store.send(TodoAction::ToggleDone { id: id.clone() }).await.unwrap();
    store.send(TodoAction::Delete { id: "missing".into() }).await.unwrap();
    store.send(TodoAction::ToggleDone { id }).await.unwrap();
    store.send(TodoAction::Logout).await.unwrap();

    assert_eq!(counts.values(), vec![1, 0, 1, 0]);
}

#[tokio::test]
async fn logout_is_idempotent() {
    let store = open_with(Arc::new(InMemoryDataSource::default())).await;
    store.ready().await;

    store.send(TodoAction::Logout).await.unwrap();
    let once = store.snapshot();
    store.send(TodoAction::Logout).await.unwrap();

    assert!(once.items.is_empty());
    assert_eq!(*once, *store.snapshot());
}

#[tokio::test]
async fn stale_fetch_after_logout_does_not_resurrect_items() {
    let source = Arc::new(InMemoryDataSource::default().with_latency(Duration::from_millis(50)));
    let store = open_with(Arc::clone(&source)).await;

    // Init fetch is still in flight
    store.send(TodoAction::Logout).await.unwrap();
    store.ready().await;

    assert!(store.state(|s| s.items.is_empty()));
    assert!(store.state(|s| s.pending_fetches.is_empty()));
}

#[tokio::test]
async fn add_completes_while_fetch_is_pending() {
    let source = Arc::new(InMemoryDataSource::default().with_latency(Duration::from_millis(200)));
    let store = open_with(source).await;

    let added = tokio::time::timeout(Duration::from_millis(100), add_item(&store, "Walk dog")).await;
    assert!(added.is_ok());
    assert_eq!(store.state(|s| s.items.len()), 1);

    store.ready().await;
    let titles: Vec<String> = store.state(|s| s.items.iter().map(|item| item.title.clone()).collect());
    assert_eq!(titles, vec!["Walk dog", "Buy Milk"]);
}

#[tokio::test]
async fn repeated_fetch_does_not_duplicate_items() {
    let store = open_with(Arc::new(InMemoryDataSource::default())).await;
    store.ready().await;

    let total = refresh(&store, Duration::from_secs(1)).await.unwrap();

    assert_eq!(total, 1);
}

#[tokio::test]
async fn transient_failures_are_retried() {
    let source = Arc::new(InMemoryDataSource::empty());
    let store = open_with(Arc::clone(&source)).await;
    store.ready().await;
    source.fail_next(DataSourceError::Unavailable("blip".into()));

    let total = refresh(&store, Duration::from_secs(1)).await.unwrap();

    assert_eq!(total, 0);
    assert_eq!(source.calls(), 3);
}

#[tokio::test]
async fn failed_fetch_leaves_state_and_reports_the_error() {
    let source = Arc::new(InMemoryDataSource::default());
    let store = open_with(Arc::clone(&source)).await;
    store.ready().await;
    store.send(TodoAction::add("Walk dog")).await.unwrap();
    let before = store.state(|s| s.items.clone());
    source.fail_next(DataSourceError::Malformed("not a list".into()));

    let result = refresh(&store, Duration::from_secs(1)).await;

    assert!(matches!(result, Err(RefreshError::Source(DataSourceError::Malformed(_)))));
    assert_eq!(store.state(|s| s.items.clone()), before);
    assert!(store.state(|s| s.pending_fetches.is_empty()));
}

/// First call fails quickly, every later call succeeds slowly.
struct FlakyThenSlow {
    calls: AtomicUsize,
}

impl DataSource for FlakyThenSlow {
    fn fetch_all_items(&self) -> BoxFuture<'_, Result<Vec<TodoItem>, DataSourceError>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            if call == 0 {
                tokio::time::sleep(Duration::from_millis(30)).await;
                Err(DataSourceError::Malformed("init".into()))
            } else {
                tokio::time::sleep(Duration::from_millis(80)).await;
                Ok(vec![TodoItem::with_id("1", "Buy Milk")])
            }
        })
    }
}

#[tokio::test]
async fn refresh_ignores_the_result_of_an_earlier_fetch() {
    init_test_tracing();
    let source = Arc::new(FlakyThenSlow {
        calls: AtomicUsize::new(0),
    });
    let env = TodoEnvironment::new(source).with_retry(RetryPolicy::no_retry());
    let store = open_store(env, StoreConfig::default()).await.unwrap();

    // The init fetch fails while this refresh's fetch is still running
    let total = refresh(&store, Duration::from_secs(1)).await.unwrap();

    assert_eq!(total, 1);
    assert_eq!(store.select(&selectors::all_items), vec![TodoItem::with_id("1", "Buy Milk")]);
}

#[tokio::test]
async fn replayed_add_after_delete_is_rejected() {
    let store = open_empty().await;
    let add = TodoAction::add("Walk dog");
    let id = add.added_id().cloned().unwrap();

    store.send(add.clone()).await.unwrap();
    store.send(TodoAction::Delete { id: id.clone() }).await.unwrap();
    let replay = store.send(add).await;

    let Err(StoreError::Rejected(ValidationError::DuplicateId(rejected))) = replay else {
        panic!("expected the replay to be rejected as a duplicate");
    };
    assert_eq!(rejected, id);
    assert!(store.state(|s| s.items.is_empty()));
}

#[tokio::test]
async fn closed_store_refuses_actions() {
    let store = open_empty().await;

    store.close().await.unwrap();

    let result = add_item(&store, "Too late").await;
    assert!(matches!(result, Err(StoreError::ShutdownInProgress)));
}
