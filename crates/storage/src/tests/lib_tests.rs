use super::*;
use std::time::Duration;

async fn memory_store() -> SqliteStore {
    SqliteStore::open("sqlite::memory:", DEFAULT_COLLECTION)
        .await
        .expect("db")
}

async fn next_snapshot(subscription: &mut Subscription) -> Snapshot {
    tokio::time::timeout(Duration::from_secs(5), subscription.next())
        .await
        .expect("snapshot within timeout")
        .expect("subscription open")
        .expect("snapshot delivery")
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let store = memory_store().await;
    store.health_check().await.expect("health check");
}

#[tokio::test]
async fn empty_collection_yields_empty_snapshot() {
    let store = memory_store().await;
    let snapshot = store.load_snapshot().await.expect("snapshot");
    assert!(snapshot.is_empty());
}

#[tokio::test]
async fn appended_records_are_stored_as_open_tasks() {
    let store = memory_store().await;
    let id = store
        .append(ItemRecord::new_task("Buy milk"))
        .await
        .expect("append");
    assert_eq!(id.as_str().len(), keys::KEY_LEN);

    let snapshot = store.load_snapshot().await.expect("snapshot");
    assert_eq!(
        snapshot.get(&id),
        Some(&ItemRecord {
            name: "Buy milk".to_string(),
            is_done: false,
        })
    );
}

#[tokio::test]
async fn snapshot_lists_records_in_creation_order() {
    let store = memory_store().await;
    for name in ["first", "second", "third"] {
        store.append(ItemRecord::new_task(name)).await.expect("append");
    }
    let names: Vec<_> = store
        .load_snapshot()
        .await
        .expect("snapshot")
        .into_items()
        .into_iter()
        .map(|item| item.name)
        .collect();
    assert_eq!(names, vec!["first", "second", "third"]);
}

#[tokio::test]
async fn patch_merges_only_given_fields() {
    let store = memory_store().await;
    let id = store
        .append(ItemRecord::new_task("Walk dog"))
        .await
        .expect("append");

    store
        .patch(&id, ItemPatch::set_done(true))
        .await
        .expect("patch done");
    store
        .patch(&id, ItemPatch::rename("Walk the dog"))
        .await
        .expect("patch name");

    let snapshot = store.load_snapshot().await.expect("snapshot");
    let record = snapshot.get(&id).expect("record");
    assert_eq!(record.name, "Walk the dog");
    assert!(record.is_done);
}

#[tokio::test]
async fn patch_of_missing_record_is_rejected() {
    let store = memory_store().await;
    let missing = ItemId::new("-does-not-exist");
    let err = store
        .patch(&missing, ItemPatch::set_done(true))
        .await
        .expect_err("missing record");
    assert_eq!(err, RemoteError::NotFound(missing));
}

#[tokio::test]
async fn delete_removes_record_and_tolerates_missing_keys() {
    let store = memory_store().await;
    let id = store
        .append(ItemRecord::new_task("Temporary"))
        .await
        .expect("append");
    store.delete(&id).await.expect("delete");
    store.delete(&id).await.expect("second delete is a no-op");
    assert!(store.load_snapshot().await.expect("snapshot").is_empty());
}

#[tokio::test]
async fn collections_are_isolated() {
    let store = memory_store().await;
    store
        .append(ItemRecord::new_task("in users"))
        .await
        .expect("append");

    let other = SqliteStore {
        collection: "archive".to_string(),
        ..store.clone()
    };
    assert!(other.load_snapshot().await.expect("snapshot").is_empty());
    assert_eq!(store.load_snapshot().await.expect("snapshot").len(), 1);
}

#[tokio::test]
async fn subscription_delivers_initial_state_then_every_change() {
    let store = memory_store().await;
    let mut subscription = store.subscribe().await.expect("subscribe");
    assert!(next_snapshot(&mut subscription).await.is_empty());

    let id = store
        .append(ItemRecord::new_task("Buy milk"))
        .await
        .expect("append");
    let snapshot = next_snapshot(&mut subscription).await;
    assert_eq!(snapshot.len(), 1);
    assert!(!snapshot.get(&id).expect("record").is_done);

    store
        .patch(&id, ItemPatch::set_done(true))
        .await
        .expect("patch");
    let snapshot = next_snapshot(&mut subscription).await;
    assert!(snapshot.get(&id).expect("record").is_done);

    store.delete(&id).await.expect("delete");
    assert!(next_snapshot(&mut subscription).await.is_empty());
}

#[tokio::test]
async fn unsubscribed_handle_stops_receiving() {
    let store = memory_store().await;
    let mut subscription = store.subscribe().await.expect("subscribe");
    next_snapshot(&mut subscription).await;
    subscription.unsubscribe();

    store
        .append(ItemRecord::new_task("after unsubscribe"))
        .await
        .expect("append still works without subscribers");
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("todo.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let store = SqliteStore::open(&database_url, DEFAULT_COLLECTION)
        .await
        .expect("db");
    drop(store);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );
}

#[test]
fn memory_urls_have_no_parent_directory() {
    assert_eq!(sqlite_path("sqlite::memory:"), None);
    assert_eq!(
        sqlite_path("sqlite://./data/todo.db?mode=rwc"),
        Some(PathBuf::from("./data/todo.db"))
    );
}

#[tokio::test]
async fn subscription_sees_writes_from_another_connection_to_the_same_file() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("shared.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let watcher = SqliteStore::open(&database_url, DEFAULT_COLLECTION)
        .await
        .expect("watcher db")
        .with_poll_interval(Duration::from_millis(50));
    let writer = SqliteStore::open(&database_url, DEFAULT_COLLECTION)
        .await
        .expect("writer db");

    let mut subscription = watcher.subscribe().await.expect("subscribe");
    assert!(next_snapshot(&mut subscription).await.is_empty());

    let id = writer
        .append(ItemRecord::new_task("from the other client"))
        .await
        .expect("append");
    let snapshot = next_snapshot(&mut subscription).await;
    assert_eq!(
        snapshot.get(&id).map(|record| record.name.as_str()),
        Some("from the other client")
    );

    writer.delete(&id).await.expect("delete");
    assert!(next_snapshot(&mut subscription).await.is_empty());
}

#[tokio::test]
async fn unchanged_collection_is_not_redelivered() {
    let store = memory_store().await.with_poll_interval(Duration::from_millis(20));
    let mut subscription = store.subscribe().await.expect("subscribe");
    next_snapshot(&mut subscription).await;

    let quiet = tokio::time::timeout(Duration::from_millis(200), subscription.next()).await;
    assert!(quiet.is_err(), "no change should mean no delivery");
}
