use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;
use usertable_core::UserRecord;
use usertable_source::{page_of, FetchError, FetchRequest, MockSource, UserSource, UsersPage};
use usertable_store::{LoadOutcome, RecordStore};

fn rec(id: u64, first: &str) -> UserRecord {
    serde_json::from_value(serde_json::json!({
        "id": id, "firstName": first, "lastName": "Doe", "age": 20 + id, "gender": "female",
        "email": format!("{}@example.com", first.to_lowercase()), "phone": "+1 555-0100"
    }))
    .unwrap()
}

/// Source whose n-th call waits for the n-th gate before replying.
struct GatedSource {
    replies: Mutex<VecDeque<(oneshot::Receiver<()>, Result<UsersPage, FetchError>)>>,
    calls: Mutex<usize>,
}

impl GatedSource {
    fn new() -> Self { Self { replies: Mutex::new(VecDeque::new()), calls: Mutex::new(0) } }

    fn script(&self, result: Result<UsersPage, FetchError>) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.replies.lock().unwrap().push_back((rx, result));
        tx
    }

    fn calls(&self) -> usize { *self.calls.lock().unwrap() }
}

#[async_trait::async_trait]
impl UserSource for GatedSource {
    async fn fetch_users(&self, _req: FetchRequest) -> Result<UsersPage, FetchError> {
        let (gate, result) = self.replies.lock().unwrap().pop_front().unwrap();
        *self.calls.lock().unwrap() += 1;
        let _ = gate.await;
        result
    }
}

async fn wait_for_calls(src: &GatedSource, n: usize) {
    while src.calls() < n {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn successful_load_commits_snapshot_and_bumps_epoch() {
    let store = RecordStore::new(Arc::new(MockSource::new(vec![rec(1, "Anna"), rec(2, "Bob")])));
    let rx = store.subscribe_epoch();
    assert_eq!(store.current().epoch, 0);
    assert!(store.current().is_empty());

    let outcome = store.load().await.unwrap();
    assert_eq!(outcome, LoadOutcome::Committed { epoch: 1, count: 2 });
    assert_eq!(*rx.borrow(), 1);
    let snap = store.current();
    assert_eq!(snap.len(), 2);
    assert_eq!(snap.get(2).map(|r| r.first_name.as_str()), Some("Bob"));
    assert!(snap.get(99).is_none());
    let status = store.status();
    assert!(!status.loading);
    assert!(status.error.is_none());
    assert_eq!(status.epoch, 1);
}

#[tokio::test]
async fn failure_preserves_previous_collection_and_retry_recovers() {
    let src = Arc::new(MockSource::new(vec![rec(1, "Anna")]));
    let store = RecordStore::new(src.clone());
    store.load().await.unwrap();

    src.push_err(FetchError::Network("connection reset".into()));
    let err = store.load().await.unwrap_err();
    assert_eq!(err, FetchError::Network("connection reset".into()));
    assert_eq!(store.error(), Some(err));
    assert_eq!(store.current().len(), 1);
    assert_eq!(store.current().epoch, 1);

    src.push_ok(vec![rec(1, "Anna"), rec(2, "Bob"), rec(3, "Cleo")]);
    let outcome = store.retry().await.unwrap();
    assert_eq!(outcome, LoadOutcome::Committed { epoch: 2, count: 3 });
    assert!(store.error().is_none());
    assert_eq!(src.calls(), 3);
}

#[tokio::test]
async fn first_load_failure_leaves_store_empty() {
    let store = RecordStore::new(Arc::new(MockSource::failing(FetchError::Server { status: 500 })));
    assert!(store.load().await.is_err());
    assert!(store.current().is_empty());
    assert_eq!(store.status().error, Some(FetchError::Server { status: 500 }));
}

#[tokio::test]
async fn loading_flag_tracks_in_flight_call() {
    let src = Arc::new(GatedSource::new());
    let gate = src.script(Ok(page_of(vec![rec(1, "Anna")])));
    let store = Arc::new(RecordStore::new(src.clone()));

    let task = tokio::spawn({
        let store = store.clone();
        async move { store.load().await }
    });
    wait_for_calls(&src, 1).await;
    assert!(store.is_loading());
    assert!(store.current().is_empty());

    gate.send(()).unwrap();
    task.await.unwrap().unwrap();
    assert!(!store.is_loading());
    assert_eq!(store.current().len(), 1);
}

#[tokio::test]
async fn superseded_load_does_not_overwrite_newer_data() {
    let src = Arc::new(GatedSource::new());
    let slow = src.script(Ok(page_of(vec![rec(1, "Old")])));
    let fast = src.script(Ok(page_of(vec![rec(2, "New"), rec(3, "Newer")])));
    let store = Arc::new(RecordStore::new(src.clone()));

    let first = tokio::spawn({
        let store = store.clone();
        async move { store.load().await }
    });
    wait_for_calls(&src, 1).await;
    let second = tokio::spawn({
        let store = store.clone();
        async move { store.retry().await }
    });
    wait_for_calls(&src, 2).await;

    fast.send(()).unwrap();
    assert_eq!(second.await.unwrap().unwrap(), LoadOutcome::Committed { epoch: 1, count: 2 });
    assert!(store.is_loading());

    slow.send(()).unwrap();
    assert_eq!(first.await.unwrap().unwrap(), LoadOutcome::Superseded);
    let snap = store.current();
    assert_eq!(snap.epoch, 1);
    assert_eq!(snap.records.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2, 3]);
    assert!(!store.is_loading());
}

#[tokio::test]
async fn superseded_failure_does_not_set_error() {
    let src = Arc::new(GatedSource::new());
    let slow = src.script(Err(FetchError::Network("timeout".into())));
    let fast = src.script(Ok(page_of(vec![rec(1, "Anna")])));
    let store = Arc::new(RecordStore::new(src.clone()));

    let first = tokio::spawn({
        let store = store.clone();
        async move { store.load().await }
    });
    wait_for_calls(&src, 1).await;
    let second = tokio::spawn({
        let store = store.clone();
        async move { store.load().await }
    });
    wait_for_calls(&src, 2).await;

    fast.send(()).unwrap();
    second.await.unwrap().unwrap();
    slow.send(()).unwrap();
    assert_eq!(first.await.unwrap().unwrap(), LoadOutcome::Superseded);
    assert!(store.error().is_none());
    assert_eq!(store.current().len(), 1);
}

#[tokio::test]
async fn dropped_load_clears_loading_flag() {
    let src = Arc::new(GatedSource::new());
    let _gate = src.script(Ok(page_of(vec![rec(1, "Anna")])));
    let store = Arc::new(RecordStore::new(src.clone()));

    let task = tokio::spawn({
        let store = store.clone();
        async move { store.load().await }
    });
    wait_for_calls(&src, 1).await;
    assert!(store.is_loading());
    task.abort();
    let _ = task.await;
    assert!(!store.is_loading());
    assert!(store.current().is_empty());
}

#[tokio::test]
async fn error_stays_visible_while_retry_is_in_flight() {
    let src = Arc::new(GatedSource::new());
    let first = src.script(Err(FetchError::Server { status: 500 }));
    let second = src.script(Ok(page_of(vec![rec(1, "Anna")])));
    let store = Arc::new(RecordStore::new(src.clone()));

    first.send(()).unwrap();
    assert!(store.load().await.is_err());

    let task = tokio::spawn({
        let store = store.clone();
        async move { store.retry().await }
    });
    wait_for_calls(&src, 2).await;
    let status = store.status();
    assert!(status.loading);
    assert_eq!(status.error, Some(FetchError::Server { status: 500 }));

    second.send(()).unwrap();
    task.await.unwrap().unwrap();
    assert!(store.error().is_none());
    assert_eq!(store.current().len(), 1);
}

#[tokio::test]
async fn dropped_retry_keeps_last_decided_error() {
    let src = Arc::new(GatedSource::new());
    let first = src.script(Err(FetchError::Server { status: 500 }));
    let _second = src.script(Ok(page_of(vec![rec(1, "Anna")])));
    let store = Arc::new(RecordStore::new(src.clone()));

    first.send(()).unwrap();
    assert!(store.load().await.is_err());

    let task = tokio::spawn({
        let store = store.clone();
        async move { store.retry().await }
    });
    wait_for_calls(&src, 2).await;
    task.abort();
    let _ = task.await;

    let status = store.status();
    assert!(!status.loading);
    assert_eq!(status.error, Some(FetchError::Server { status: 500 }));
    assert!(store.current().is_empty());
}
