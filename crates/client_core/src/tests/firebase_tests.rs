use super::*;
use std::{
    convert::Infallible,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream};
use serde_json::{json, Map};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct MockDatabase {
    records: Arc<Mutex<Map<String, Value>>>,
    next_key: Arc<AtomicUsize>,
    stream_events: Arc<Vec<(&'static str, Value)>>,
}

fn key_from_file(file: &str) -> String {
    file.trim_end_matches(".json").to_string()
}

async fn push_record(
    State(db): State<MockDatabase>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let key = format!("-key{}", db.next_key.fetch_add(1, Ordering::SeqCst));
    db.records.lock().await.insert(key.clone(), body);
    Json(json!({ "name": key }))
}

async fn read_record(State(db): State<MockDatabase>, Path(file): Path<String>) -> Json<Value> {
    let records = db.records.lock().await;
    Json(records.get(&key_from_file(&file)).cloned().unwrap_or(Value::Null))
}

async fn patch_record(
    State(db): State<MockDatabase>,
    Path(file): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let mut records = db.records.lock().await;
    let record = records
        .entry(key_from_file(&file))
        .or_insert_with(|| json!({}));
    if let (Value::Object(target), Value::Object(fields)) = (record, body.clone()) {
        target.extend(fields);
    }
    Json(body)
}

async fn delete_record(State(db): State<MockDatabase>, Path(file): Path<String>) -> Json<Value> {
    db.records.lock().await.remove(&key_from_file(&file));
    Json(Value::Null)
}

async fn stream_records(
    State(db): State<MockDatabase>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events: Vec<Result<Event, Infallible>> = db
        .stream_events
        .iter()
        .map(|(name, data)| Ok(Event::default().event(*name).data(data.to_string())))
        .collect();
    Sse::new(stream::iter(events).chain(stream::pending()))
}

async fn locked() -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "Permission denied" })),
    )
}

async fn spawn_mock(db: MockDatabase) -> String {
    let app = Router::new()
        .route("/users.json", post(push_record).get(stream_records))
        .route(
            "/users/:file",
            get(read_record).patch(patch_record).delete(delete_record),
        )
        .route("/locked.json", post(locked).get(locked))
        .with_state(db);

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}")
}

async fn next_snapshot(subscription: &mut Subscription) -> SnapshotDelivery {
    tokio::time::timeout(Duration::from_secs(5), subscription.next())
        .await
        .expect("delivery within timeout")
        .expect("subscription open")
}

#[test]
fn rejects_non_http_urls_and_empty_collections() {
    assert!(FirebaseStore::new("ftp://example.com", "users").is_err());
    assert!(FirebaseStore::new("not a url", "users").is_err());
    assert!(FirebaseStore::new("https://example.firebaseio.com", "/").is_err());
}

#[test]
fn builds_collection_and_record_urls() {
    let store = FirebaseStore::new("https://example.firebaseio.com/", "/users/").expect("store");
    assert_eq!(
        store.collection_url(),
        "https://example.firebaseio.com/users.json"
    );
    assert_eq!(
        store.record_url(&ItemId::new("-abc")),
        "https://example.firebaseio.com/users/-abc.json"
    );
}

#[tokio::test]
async fn append_posts_record_and_returns_generated_key() {
    let db = MockDatabase::default();
    let base = spawn_mock(db.clone()).await;
    let store = FirebaseStore::new(&base, "users").expect("store");

    let id = store
        .append(ItemRecord::new_task("Buy milk"))
        .await
        .expect("append");

    assert_eq!(id, ItemId::new("-key0"));
    assert_eq!(
        db.records.lock().await.get("-key0"),
        Some(&json!({ "Name": "Buy milk", "isDone": false }))
    );
}

#[tokio::test]
async fn patch_merges_fields_into_existing_record() {
    let db = MockDatabase::default();
    db.records
        .lock()
        .await
        .insert("-a".to_string(), json!({ "Name": "Walk dog", "isDone": false }));
    let base = spawn_mock(db.clone()).await;
    let store = FirebaseStore::new(&base, "users").expect("store");

    store
        .patch(&ItemId::new("-a"), ItemPatch::set_done(true))
        .await
        .expect("patch");

    assert_eq!(
        db.records.lock().await.get("-a"),
        Some(&json!({ "Name": "Walk dog", "isDone": true }))
    );
}

#[tokio::test]
async fn patch_of_missing_record_is_not_found_and_writes_nothing() {
    let db = MockDatabase::default();
    let base = spawn_mock(db.clone()).await;
    let store = FirebaseStore::new(&base, "users").expect("store");

    let err = store
        .patch(&ItemId::new("-ghost"), ItemPatch::rename("boo"))
        .await
        .expect_err("missing");

    assert_eq!(err, RemoteError::NotFound(ItemId::new("-ghost")));
    assert!(db.records.lock().await.is_empty());
}

#[tokio::test]
async fn delete_removes_record() {
    let db = MockDatabase::default();
    db.records
        .lock()
        .await
        .insert("-a".to_string(), json!({ "Name": "Walk dog" }));
    let base = spawn_mock(db.clone()).await;
    let store = FirebaseStore::new(&base, "users").expect("store");

    store.delete(&ItemId::new("-a")).await.expect("delete");

    assert!(db.records.lock().await.is_empty());
}

#[tokio::test]
async fn rejected_write_surfaces_status_and_server_message() {
    let base = spawn_mock(MockDatabase::default()).await;
    let store = FirebaseStore::new(&base, "locked").expect("store");

    let err = store
        .append(ItemRecord::new_task("nope"))
        .await
        .expect_err("rejected");

    assert_eq!(
        err,
        RemoteError::Rejected {
            status: 401,
            message: "Permission denied".to_string(),
        }
    );
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let store = FirebaseStore::new(&format!("http://{addr}"), "users").expect("store");

    let err = store
        .delete(&ItemId::new("-a"))
        .await
        .expect_err("no server");

    assert!(matches!(err, RemoteError::Transport(_)), "{err:?}");
}

#[tokio::test]
async fn subscription_applies_put_and_patch_events() {
    let db = MockDatabase {
        stream_events: Arc::new(vec![
            ("put", json!({ "path": "/", "data": null })),
            (
                "put",
                json!({ "path": "/", "data": { "-a": { "Name": "Buy milk", "isDone": false } } }),
            ),
            ("keep-alive", Value::Null),
            ("patch", json!({ "path": "/-a", "data": { "isDone": true } })),
            (
                "put",
                json!({ "path": "/-b", "data": { "Name": "Walk dog", "isDone": false } }),
            ),
            ("put", json!({ "path": "/-a", "data": null })),
        ]),
        ..MockDatabase::default()
    };
    let base = spawn_mock(db).await;
    let store = FirebaseStore::new(&base, "users").expect("store");
    let mut subscription = store.subscribe().await.expect("subscribe");

    let empty = next_snapshot(&mut subscription).await.expect("snapshot");
    assert!(empty.is_empty());

    let one = next_snapshot(&mut subscription).await.expect("snapshot");
    assert_eq!(one.len(), 1);
    assert!(!one.get(&ItemId::new("-a")).expect("record").is_done);

    let done = next_snapshot(&mut subscription).await.expect("snapshot");
    assert!(done.get(&ItemId::new("-a")).expect("record").is_done);

    let two = next_snapshot(&mut subscription).await.expect("snapshot");
    assert_eq!(two.len(), 2);

    let after_delete = next_snapshot(&mut subscription).await.expect("snapshot");
    let names: Vec<_> = after_delete
        .into_items()
        .into_iter()
        .map(|item| item.name)
        .collect();
    assert_eq!(names, vec!["Walk dog"]);
}

#[tokio::test]
async fn cancel_event_ends_subscription_with_error() {
    let db = MockDatabase {
        stream_events: Arc::new(vec![
            ("put", json!({ "path": "/", "data": null })),
            ("cancel", json!("Permission denied")),
        ]),
        ..MockDatabase::default()
    };
    let base = spawn_mock(db).await;
    let store = FirebaseStore::new(&base, "users").expect("store");
    let mut subscription = store.subscribe().await.expect("subscribe");

    assert!(next_snapshot(&mut subscription).await.is_ok());
    let err = next_snapshot(&mut subscription).await.expect_err("cancelled");
    assert!(matches!(err, RemoteError::Cancelled(_)), "{err:?}");
    assert!(subscription.next().await.is_none());
}

#[tokio::test]
async fn rejected_stream_is_reported_in_band() {
    let base = spawn_mock(MockDatabase::default()).await;
    let store = FirebaseStore::new(&base, "locked")
        .expect("store")
        .with_reconnect_delay(Duration::from_millis(10));
    let mut subscription = store.subscribe().await.expect("subscribe");

    let err = next_snapshot(&mut subscription).await.expect_err("rejected");
    assert!(matches!(err, RemoteError::Rejected { status: 401, .. }), "{err:?}");
}
